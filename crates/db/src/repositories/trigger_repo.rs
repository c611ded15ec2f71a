//! Repository for the `notification_triggers` table.

use sqlx::PgPool;
use wardrobe_core::types::{DbId, Timestamp};

use crate::models::trigger::{NotificationTrigger, TriggerCompletion};

/// Column list for `notification_triggers` queries.
const COLUMNS: &str = "id, recipient_user_id, notification_type, title, body, data, \
    created_at, sent, skipped, skip_reason, sent_at, tokens_count";

/// Advisory lock key held for the duration of a retention sweep so that
/// only one worker process deletes at a time.
const SWEEP_LOCK_KEY: i64 = 0x5744_5242_5357_4550;

/// DTO for inserting a trigger (the mobile client's write).
#[derive(Debug, Clone, Default)]
pub struct CreateTrigger {
    pub recipient_user_id: Option<String>,
    pub notification_type: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub data: Option<serde_json::Value>,
    /// Overrides `NOW()` when set.
    pub created_at: Option<Timestamp>,
}

/// Provides query operations for notification triggers.
pub struct TriggerRepo;

impl TriggerRepo {
    /// Insert a new trigger.
    pub async fn create(
        pool: &PgPool,
        input: &CreateTrigger,
    ) -> Result<NotificationTrigger, sqlx::Error> {
        let query = format!(
            "INSERT INTO notification_triggers \
                (recipient_user_id, notification_type, title, body, data, created_at) \
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, NOW())) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationTrigger>(&query)
            .bind(&input.recipient_user_id)
            .bind(&input.notification_type)
            .bind(&input.title)
            .bind(&input.body)
            .bind(&input.data)
            .bind(input.created_at)
            .fetch_one(pool)
            .await
    }

    /// Fetch a trigger by id.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<NotificationTrigger>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM notification_triggers WHERE id = $1");
        sqlx::query_as::<_, NotificationTrigger>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Write the terminal state onto a trigger.
    ///
    /// The update only applies while `sent = false`; returns `false` when
    /// the trigger was already terminal (or no longer exists).
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        completion: &TriggerCompletion,
    ) -> Result<bool, sqlx::Error> {
        let result = match completion {
            TriggerCompletion::Skipped(reason) => {
                sqlx::query(
                    "UPDATE notification_triggers \
                     SET sent = true, skipped = true, skip_reason = $2 \
                     WHERE id = $1 AND sent = false",
                )
                .bind(id)
                .bind(reason.as_str())
                .execute(pool)
                .await?
            }
            TriggerCompletion::Sent {
                sent_at,
                tokens_count,
            } => {
                sqlx::query(
                    "UPDATE notification_triggers \
                     SET sent = true, sent_at = $2, tokens_count = $3 \
                     WHERE id = $1 AND sent = false",
                )
                .bind(id)
                .bind(sent_at)
                .bind(tokens_count)
                .execute(pool)
                .await?
            }
        };
        Ok(result.rows_affected() > 0)
    }

    /// List unsent triggers created at or after `since`, oldest first.
    pub async fn list_unsent_since(
        pool: &PgPool,
        since: Timestamp,
        limit: i64,
    ) -> Result<Vec<NotificationTrigger>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_triggers \
             WHERE sent = false AND created_at >= $1 \
             ORDER BY created_at, id \
             LIMIT $2"
        );
        sqlx::query_as::<_, NotificationTrigger>(&query)
            .bind(since)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Delete up to `limit` triggers created strictly before `cutoff`,
    /// oldest first, in a single statement.
    ///
    /// Returns `None` without deleting anything when another sweep holds
    /// the advisory lock.
    pub async fn delete_created_before(
        pool: &PgPool,
        cutoff: Timestamp,
        limit: i64,
    ) -> Result<Option<u64>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let acquired: bool = sqlx::query_scalar("SELECT pg_try_advisory_xact_lock($1)")
            .bind(SWEEP_LOCK_KEY)
            .fetch_one(&mut *tx)
            .await?;
        if !acquired {
            tracing::debug!("Sweep lock held by another session");
            tx.rollback().await?;
            return Ok(None);
        }

        let result = sqlx::query(
            "DELETE FROM notification_triggers WHERE id IN ( \
                SELECT id FROM notification_triggers \
                WHERE created_at < $1 \
                ORDER BY created_at, id \
                LIMIT $2)",
        )
        .bind(cutoff)
        .bind(limit)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(result.rows_affected()))
    }
}
