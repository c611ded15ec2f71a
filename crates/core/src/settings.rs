//! Per-recipient notification preferences.
//!
//! Stored by the mobile client under `users.settings -> 'notifications'`.
//! Every field is optional; a missing per-type flag means "enabled" and a
//! missing quiet-hours boundary disables quiet hours.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::notification::NotificationType;

/// Notification preferences of a single user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub friend_requests: Option<bool>,
    pub friend_accepts: Option<bool>,
    pub dm_messages: Option<bool>,
    pub cloth_likes: Option<bool>,
    pub cloth_comments: Option<bool>,
    /// Local wall-clock start of the quiet window, `"HH:MM"`.
    pub quiet_hours_start: Option<String>,
    /// Local wall-clock end of the quiet window, `"HH:MM"`.
    pub quiet_hours_end: Option<String>,
}

impl NotificationSettings {
    /// Read settings leniently from the stored JSON object.
    ///
    /// Values of an unexpected JSON type are treated as absent rather than
    /// failing the whole read, so a flag stored as the string `"false"` does
    /// not disable anything.
    pub fn from_value(value: &Value) -> Self {
        let flag = |key: &str| value.get(key).and_then(Value::as_bool);
        let time = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Self {
            friend_requests: flag("friendRequests"),
            friend_accepts: flag("friendAccepts"),
            dm_messages: flag("dmMessages"),
            cloth_likes: flag("clothLikes"),
            cloth_comments: flag("clothComments"),
            quiet_hours_start: time("quietHoursStart"),
            quiet_hours_end: time("quietHoursEnd"),
        }
    }

    /// Whether pushes of the given type may be delivered.
    ///
    /// Only an explicit `false` disables a known type; unrecognized types
    /// are always enabled.
    pub fn is_enabled(&self, notification_type: &NotificationType) -> bool {
        let flag = match notification_type {
            NotificationType::FriendRequest => self.friend_requests,
            NotificationType::FriendAccept => self.friend_accepts,
            NotificationType::DmMessage => self.dm_messages,
            NotificationType::ClothLike => self.cloth_likes,
            NotificationType::ClothComment => self.cloth_comments,
            NotificationType::Other(_) => None,
        };
        flag != Some(false)
    }

    /// Both quiet-hours boundaries, if configured.
    pub fn quiet_window(&self) -> Option<(&str, &str)> {
        match (&self.quiet_hours_start, &self.quiet_hours_end) {
            (Some(start), Some(end)) if !start.is_empty() && !end.is_empty() => {
                Some((start.as_str(), end.as_str()))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_flags_default_to_enabled() {
        let settings = NotificationSettings::default();
        assert!(settings.is_enabled(&NotificationType::FriendRequest));
        assert!(settings.is_enabled(&NotificationType::ClothComment));
    }

    #[test]
    fn explicit_false_disables_only_that_type() {
        let settings = NotificationSettings::from_value(&json!({
            "dmMessages": false,
            "clothLikes": true,
        }));
        assert!(!settings.is_enabled(&NotificationType::DmMessage));
        assert!(settings.is_enabled(&NotificationType::ClothLike));
        assert!(settings.is_enabled(&NotificationType::FriendAccept));
    }

    #[test]
    fn unknown_types_are_always_enabled() {
        let settings = NotificationSettings {
            friend_requests: Some(false),
            friend_accepts: Some(false),
            dm_messages: Some(false),
            cloth_likes: Some(false),
            cloth_comments: Some(false),
            ..Default::default()
        };
        assert!(settings.is_enabled(&NotificationType::Other("promo".into())));
    }

    #[test]
    fn non_boolean_flag_is_ignored() {
        let settings = NotificationSettings::from_value(&json!({ "friendRequests": "false" }));
        assert_eq!(settings.friend_requests, None);
        assert!(settings.is_enabled(&NotificationType::FriendRequest));
    }

    #[test]
    fn quiet_window_requires_both_boundaries() {
        let only_start = NotificationSettings::from_value(&json!({ "quietHoursStart": "22:00" }));
        assert!(only_start.quiet_window().is_none());

        let empty_end = NotificationSettings::from_value(&json!({
            "quietHoursStart": "22:00",
            "quietHoursEnd": "",
        }));
        assert!(empty_end.quiet_window().is_none());

        let both = NotificationSettings::from_value(&json!({
            "quietHoursStart": "22:00",
            "quietHoursEnd": "08:00",
        }));
        assert_eq!(both.quiet_window(), Some(("22:00", "08:00")));
    }

    #[test]
    fn deserializes_camel_case_fields() {
        let settings: NotificationSettings =
            serde_json::from_value(json!({ "clothComments": false, "quietHoursEnd": "07:30" }))
                .unwrap();
        assert_eq!(settings.cloth_comments, Some(false));
        assert_eq!(settings.quiet_hours_end.as_deref(), Some("07:30"));
    }
}
