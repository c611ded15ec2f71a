//! Repository for the `user_reports` and `user_blocks` tables.

use sqlx::PgPool;
use wardrobe_core::types::DbId;

use crate::models::moderation::{UserBlock, UserReport};

/// Read access to moderation records.
pub struct ModerationRepo;

impl ModerationRepo {
    /// Fetch a user report by id.
    pub async fn find_report(pool: &PgPool, id: DbId) -> Result<Option<UserReport>, sqlx::Error> {
        sqlx::query_as::<_, UserReport>(
            "SELECT id, reporter_user_id, reported_user_id, reason, details, created_at \
             FROM user_reports WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Fetch a user block by id.
    pub async fn find_block(pool: &PgPool, id: DbId) -> Result<Option<UserBlock>, sqlx::Error> {
        sqlx::query_as::<_, UserBlock>(
            "SELECT id, blocker_user_id, blocked_user_id, created_at \
             FROM user_blocks WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}
