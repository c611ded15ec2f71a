//! Repository for the legacy `user_devices` table.

use sqlx::PgPool;

use crate::models::endpoint::PushEndpoint;

/// Column list for `user_devices` queries.
const COLUMNS: &str = "id, user_id, fcm_token, is_active, last_active_at";

/// Read-only access to device registrations made by older app versions.
pub struct LegacyDeviceRepo;

impl LegacyDeviceRepo {
    /// List the active legacy device registrations of a user.
    pub async fn list_active_for_user(
        pool: &PgPool,
        user_id: &str,
    ) -> Result<Vec<PushEndpoint>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM user_devices \
             WHERE user_id = $1 AND is_active = true \
             ORDER BY id"
        );
        sqlx::query_as::<_, PushEndpoint>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }
}
