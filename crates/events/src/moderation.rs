//! Moderation alert emails for user reports and blocks.

use wardrobe_db::models::moderation::{UserBlock, UserReport};

/// A plain-text email ready to be handed to an [`AlertMailer`](crate::AlertMailer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertEmail {
    pub subject: String,
    pub body: String,
}

/// Summarize a new user report for the support inbox.
pub fn report_alert(report: &UserReport) -> AlertEmail {
    AlertEmail {
        subject: format!("[Wardrobe] User report #{}: {}", report.id, report.reason),
        body: format!(
            "A user has been reported.\n\n\
             Report ID: {}\n\
             Reporter: {}\n\
             Reported user: {}\n\
             Reason: {}\n\
             Details: {}\n\
             Created at: {}",
            report.id,
            report.reporter_user_id,
            report.reported_user_id,
            report.reason,
            report.details.as_deref().unwrap_or("(none)"),
            report.created_at.to_rfc3339(),
        ),
    }
}

/// Summarize a new user block for the support inbox.
pub fn block_alert(block: &UserBlock) -> AlertEmail {
    AlertEmail {
        subject: format!("[Wardrobe] User block #{}", block.id),
        body: format!(
            "A user has been blocked.\n\n\
             Block ID: {}\n\
             Blocker: {}\n\
             Blocked user: {}\n\
             Created at: {}",
            block.id,
            block.blocker_user_id,
            block.blocked_user_id,
            block.created_at.to_rfc3339(),
        ),
    }
}
