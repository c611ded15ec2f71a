//! Notification trigger vocabulary.
//!
//! The string values here must match what the mobile client writes into
//! `notification_triggers.type` and what the worker writes into
//! `notification_triggers.skip_reason`.

use serde::{Deserialize, Serialize};

/// Title used when a trigger carries none.
pub const DEFAULT_TITLE: &str = "Notification";

/// Body used when a trigger carries none.
pub const DEFAULT_BODY: &str = "You have a new notification";

// ---------------------------------------------------------------------------
// NotificationType
// ---------------------------------------------------------------------------

/// Kind of social event a trigger announces.
///
/// Anything the client writes that is not one of the known kinds maps to
/// [`NotificationType::Other`], which is always delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationType {
    FriendRequest,
    FriendAccept,
    DmMessage,
    ClothLike,
    ClothComment,
    Other(String),
}

impl NotificationType {
    /// Map the stored `type` column onto a notification type.
    pub fn from_wire(value: &str) -> Self {
        match value {
            "friend_request" => Self::FriendRequest,
            "friend_accept" => Self::FriendAccept,
            "dm_message" => Self::DmMessage,
            "cloth_like" => Self::ClothLike,
            "cloth_comment" => Self::ClothComment,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::FriendRequest => "friend_request",
            Self::FriendAccept => "friend_accept",
            Self::DmMessage => "dm_message",
            Self::ClothLike => "cloth_like",
            Self::ClothComment => "cloth_comment",
            Self::Other(raw) => raw,
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SkipReason
// ---------------------------------------------------------------------------

/// Why a trigger reached its terminal state without a push being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The recipient switched this notification type off.
    NotificationTypeDisabled,
    /// The recipient's quiet-hours window was active.
    QuietHours,
    /// The recipient has no active push endpoint.
    NoActiveTokens,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotificationTypeDisabled => "notification_type_disabled",
            Self::QuietHours => "quiet_hours",
            Self::NoActiveTokens => "no_active_tokens",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_types_map_from_wire() {
        assert_eq!(
            NotificationType::from_wire("friend_request"),
            NotificationType::FriendRequest
        );
        assert_eq!(
            NotificationType::from_wire("cloth_comment"),
            NotificationType::ClothComment
        );
    }

    #[test]
    fn unknown_type_keeps_raw_value() {
        let ty = NotificationType::from_wire("outfit_of_the_day");
        assert_eq!(ty, NotificationType::Other("outfit_of_the_day".to_string()));
        assert_eq!(ty.as_str(), "outfit_of_the_day");
    }

    #[test]
    fn skip_reason_serializes_snake_case() {
        let json = serde_json::to_string(&SkipReason::NoActiveTokens).unwrap();
        assert_eq!(json, "\"no_active_tokens\"");
        assert_eq!(SkipReason::QuietHours.as_str(), "quiet_hours");
    }
}
