//! User report and block models.

use serde::Serialize;
use sqlx::FromRow;
use wardrobe_core::types::{DbId, Timestamp};

/// A row from the `user_reports` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserReport {
    pub id: DbId,
    pub reporter_user_id: String,
    pub reported_user_id: String,
    pub reason: String,
    pub details: Option<String>,
    pub created_at: Timestamp,
}

/// A row from the `user_blocks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserBlock {
    pub id: DbId,
    pub blocker_user_id: String,
    pub blocked_user_id: String,
    pub created_at: Timestamp,
}
