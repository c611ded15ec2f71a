//! Repository for notification preferences stored on the `users` table.

use sqlx::PgPool;
use wardrobe_core::settings::NotificationSettings;

/// Reads the `settings -> 'notifications'` object of a user profile.
pub struct UserSettingsRepo;

impl UserSettingsRepo {
    /// Load a user's notification settings.
    ///
    /// Returns `None` when the user does not exist or has never stored any
    /// notification settings.
    pub async fn get_notification_settings(
        pool: &PgPool,
        user_id: &str,
    ) -> Result<Option<NotificationSettings>, sqlx::Error> {
        let row: Option<Option<serde_json::Value>> =
            sqlx::query_scalar("SELECT settings -> 'notifications' FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(pool)
                .await?;

        Ok(row
            .flatten()
            .filter(|value| value.is_object())
            .map(|value| NotificationSettings::from_value(&value)))
    }

    /// Insert or replace a user's notification settings object.
    pub async fn upsert_notification_settings(
        pool: &PgPool,
        user_id: &str,
        notifications: &serde_json::Value,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO users (id, settings) \
             VALUES ($1, jsonb_build_object('notifications', $2::jsonb)) \
             ON CONFLICT (id) DO UPDATE SET \
                settings = jsonb_set(users.settings, '{notifications}', $2::jsonb), \
                updated_at = NOW()",
        )
        .bind(user_id)
        .bind(notifications)
        .execute(pool)
        .await?;
        Ok(())
    }
}
