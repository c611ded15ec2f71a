//! Notification trigger models.

use serde::Serialize;
use sqlx::FromRow;
use wardrobe_core::notification::{NotificationType, SkipReason};
use wardrobe_core::types::{DbId, Timestamp};

/// A row from the `notification_triggers` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationTrigger {
    pub id: DbId,
    pub recipient_user_id: Option<String>,
    pub notification_type: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub data: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub sent: bool,
    pub skipped: Option<bool>,
    pub skip_reason: Option<String>,
    pub sent_at: Option<Timestamp>,
    pub tokens_count: Option<i32>,
}

impl NotificationTrigger {
    /// The parsed notification type; a missing type is unrecognized.
    pub fn kind(&self) -> NotificationType {
        NotificationType::from_wire(self.notification_type.as_deref().unwrap_or_default())
    }

    /// The recipient id, if present and non-empty.
    pub fn recipient(&self) -> Option<&str> {
        self.recipient_user_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// The terminal state written onto a trigger by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerCompletion {
    /// Delivery was deliberately not attempted.
    Skipped(SkipReason),
    /// The push was handed to the transport for `tokens_count` tokens.
    Sent { sent_at: Timestamp, tokens_count: i32 },
}
