//! Recipient preference resolution and quiet-hours checks.

use std::sync::Arc;

use chrono::NaiveTime;
use wardrobe_core::quiet_hours;
use wardrobe_core::settings::NotificationSettings;
use wardrobe_db::store::SettingsStore;

/// Loads notification settings, degrading to defaults on any failure.
#[derive(Clone)]
pub struct PreferenceResolver {
    store: Arc<dyn SettingsStore>,
}

impl PreferenceResolver {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    /// Settings for `user_id`.
    ///
    /// A missing user, missing settings object, or lookup error all yield
    /// [`NotificationSettings::default`] (everything enabled, no quiet
    /// hours); errors are logged.
    pub async fn resolve(&self, user_id: &str) -> NotificationSettings {
        match self.store.notification_settings(user_id).await {
            Ok(Some(settings)) => settings,
            Ok(None) => {
                tracing::warn!(user_id, "No notification settings stored for user");
                NotificationSettings::default()
            }
            Err(e) => {
                tracing::error!(user_id, error = %e, "Error getting notification settings");
                NotificationSettings::default()
            }
        }
    }
}

/// Whether quiet hours suppress delivery at wall-clock time `now`.
///
/// Malformed boundaries fail open: the error is logged and delivery is
/// allowed.
pub fn is_quiet_hours(settings: &NotificationSettings, now: NaiveTime) -> bool {
    match quiet_hours::evaluate(settings, now) {
        Ok(quiet) => quiet,
        Err(e) => {
            tracing::warn!(
                error = %e,
                start = ?settings.quiet_hours_start,
                end = ?settings.quiet_hours_end,
                "Error checking quiet hours, delivering anyway"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_quiet_hours_do_not_suppress() {
        let settings = NotificationSettings {
            quiet_hours_start: Some("ten pm".into()),
            quiet_hours_end: Some("08:00".into()),
            ..Default::default()
        };
        let late = NaiveTime::from_hms_opt(23, 0, 0).unwrap();
        assert!(!is_quiet_hours(&settings, late));
    }

    #[test]
    fn configured_window_suppresses() {
        let settings = NotificationSettings {
            quiet_hours_start: Some("22:00".into()),
            quiet_hours_end: Some("08:00".into()),
            ..Default::default()
        };
        let early = NaiveTime::from_hms_opt(3, 0, 0).unwrap();
        assert!(is_quiet_hours(&settings, early));
    }
}
