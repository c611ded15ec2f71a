//! Push endpoint models.

use serde::Serialize;
use sqlx::FromRow;
use wardrobe_core::types::{DbId, Timestamp};

/// A row from the `fcm_tokens` table or the legacy `user_devices` table.
///
/// Both tables share this shape; `fcm_token` may be missing or empty on
/// rows written by older clients.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PushEndpoint {
    pub id: DbId,
    pub user_id: String,
    pub fcm_token: Option<String>,
    pub is_active: bool,
    pub last_active_at: Option<Timestamp>,
}
