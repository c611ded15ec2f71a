//! Store traits consumed by the notification worker.
//!
//! The worker depends on these narrow traits rather than on the pool so
//! each component can be constructed with the exact handles it needs.
//! [`PgStore`] implements all of them on top of the repositories; one
//! instance is created per process and shared behind an `Arc`.

use async_trait::async_trait;
use wardrobe_core::settings::NotificationSettings;
use wardrobe_core::types::{DbId, Timestamp};

use crate::models::endpoint::PushEndpoint;
use crate::models::moderation::{UserBlock, UserReport};
use crate::models::trigger::{NotificationTrigger, TriggerCompletion};
use crate::repositories::{
    LegacyDeviceRepo, ModerationRepo, PushEndpointRepo, TriggerRepo, UserSettingsRepo,
};
use crate::DbPool;

/// Access to notification trigger records.
#[async_trait]
pub trait TriggerStore: Send + Sync {
    /// Load the current snapshot of a trigger.
    async fn get_trigger(&self, id: DbId) -> Result<Option<NotificationTrigger>, sqlx::Error>;

    /// Write the terminal state; `false` when the trigger was already terminal.
    async fn complete_trigger(
        &self,
        id: DbId,
        completion: &TriggerCompletion,
    ) -> Result<bool, sqlx::Error>;

    /// Unsent triggers created at or after `since`, oldest first.
    async fn list_unsent_since(
        &self,
        since: Timestamp,
        limit: i64,
    ) -> Result<Vec<NotificationTrigger>, sqlx::Error>;

    /// Delete up to `limit` triggers created before `cutoff` atomically.
    ///
    /// `None` means another sweep currently holds the sweep lock.
    async fn delete_created_before(
        &self,
        cutoff: Timestamp,
        limit: i64,
    ) -> Result<Option<u64>, sqlx::Error>;
}

/// Access to recipient notification preferences.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn notification_settings(
        &self,
        user_id: &str,
    ) -> Result<Option<NotificationSettings>, sqlx::Error>;
}

/// Access to registered push endpoints.
#[async_trait]
pub trait EndpointStore: Send + Sync {
    /// Active endpoints from the primary `fcm_tokens` table.
    async fn active_endpoints(&self, user_id: &str) -> Result<Vec<PushEndpoint>, sqlx::Error>;

    /// Active endpoints from the legacy `user_devices` table.
    async fn legacy_active_endpoints(
        &self,
        user_id: &str,
    ) -> Result<Vec<PushEndpoint>, sqlx::Error>;

    /// Mark every endpoint with this token inactive; returns rows updated.
    async fn deactivate_token(&self, fcm_token: &str) -> Result<u64, sqlx::Error>;
}

/// Access to moderation records.
#[async_trait]
pub trait ModerationStore: Send + Sync {
    async fn get_report(&self, id: DbId) -> Result<Option<UserReport>, sqlx::Error>;
    async fn get_block(&self, id: DbId) -> Result<Option<UserBlock>, sqlx::Error>;
}

// ---------------------------------------------------------------------------
// PgStore
// ---------------------------------------------------------------------------

/// PostgreSQL implementation of every store trait.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TriggerStore for PgStore {
    async fn get_trigger(&self, id: DbId) -> Result<Option<NotificationTrigger>, sqlx::Error> {
        TriggerRepo::find_by_id(&self.pool, id).await
    }

    async fn complete_trigger(
        &self,
        id: DbId,
        completion: &TriggerCompletion,
    ) -> Result<bool, sqlx::Error> {
        TriggerRepo::complete(&self.pool, id, completion).await
    }

    async fn list_unsent_since(
        &self,
        since: Timestamp,
        limit: i64,
    ) -> Result<Vec<NotificationTrigger>, sqlx::Error> {
        TriggerRepo::list_unsent_since(&self.pool, since, limit).await
    }

    async fn delete_created_before(
        &self,
        cutoff: Timestamp,
        limit: i64,
    ) -> Result<Option<u64>, sqlx::Error> {
        TriggerRepo::delete_created_before(&self.pool, cutoff, limit).await
    }
}

#[async_trait]
impl SettingsStore for PgStore {
    async fn notification_settings(
        &self,
        user_id: &str,
    ) -> Result<Option<NotificationSettings>, sqlx::Error> {
        UserSettingsRepo::get_notification_settings(&self.pool, user_id).await
    }
}

#[async_trait]
impl EndpointStore for PgStore {
    async fn active_endpoints(&self, user_id: &str) -> Result<Vec<PushEndpoint>, sqlx::Error> {
        PushEndpointRepo::list_active_for_user(&self.pool, user_id).await
    }

    async fn legacy_active_endpoints(
        &self,
        user_id: &str,
    ) -> Result<Vec<PushEndpoint>, sqlx::Error> {
        LegacyDeviceRepo::list_active_for_user(&self.pool, user_id).await
    }

    async fn deactivate_token(&self, fcm_token: &str) -> Result<u64, sqlx::Error> {
        PushEndpointRepo::deactivate_token(&self.pool, fcm_token).await
    }
}

#[async_trait]
impl ModerationStore for PgStore {
    async fn get_report(&self, id: DbId) -> Result<Option<UserReport>, sqlx::Error> {
        ModerationRepo::find_report(&self.pool, id).await
    }

    async fn get_block(&self, id: DbId) -> Result<Option<UserBlock>, sqlx::Error> {
        ModerationRepo::find_block(&self.pool, id).await
    }
}
