//! Repository for the `fcm_tokens` table.

use sqlx::PgPool;

use crate::models::endpoint::PushEndpoint;

/// Column list for `fcm_tokens` queries.
const COLUMNS: &str = "id, user_id, fcm_token, is_active, last_active_at";

/// Provides query operations for registered push endpoints.
pub struct PushEndpointRepo;

impl PushEndpointRepo {
    /// Register a push endpoint for a user.
    pub async fn create(
        pool: &PgPool,
        user_id: &str,
        fcm_token: &str,
    ) -> Result<PushEndpoint, sqlx::Error> {
        let query = format!(
            "INSERT INTO fcm_tokens (user_id, fcm_token, is_active, last_active_at) \
             VALUES ($1, $2, true, NOW()) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PushEndpoint>(&query)
            .bind(user_id)
            .bind(fcm_token)
            .fetch_one(pool)
            .await
    }

    /// List the active endpoints of a user.
    pub async fn list_active_for_user(
        pool: &PgPool,
        user_id: &str,
    ) -> Result<Vec<PushEndpoint>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM fcm_tokens \
             WHERE user_id = $1 AND is_active = true \
             ORDER BY id"
        );
        sqlx::query_as::<_, PushEndpoint>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Mark every endpoint carrying `fcm_token` inactive in one statement.
    ///
    /// Returns the number of rows updated.
    pub async fn deactivate_token(pool: &PgPool, fcm_token: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE fcm_tokens SET is_active = false, last_active_at = NOW() \
             WHERE fcm_token = $1",
        )
        .bind(fcm_token)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
