//! Support-inbox alerts for new user reports and blocks.

use std::sync::Arc;

use wardrobe_core::types::DbId;
use wardrobe_db::store::ModerationStore;
use wardrobe_events::moderation::{block_alert, report_alert, AlertEmail};
use wardrobe_events::AlertMailer;

/// Emails the support address about moderation records.
///
/// Every failure is logged and swallowed; alerts are never retried.
pub struct ModerationAlerts {
    store: Arc<dyn ModerationStore>,
    mailer: Arc<dyn AlertMailer>,
    support_email: String,
}

impl ModerationAlerts {
    pub fn new(
        store: Arc<dyn ModerationStore>,
        mailer: Arc<dyn AlertMailer>,
        support_email: String,
    ) -> Self {
        Self {
            store,
            mailer,
            support_email,
        }
    }

    /// Alert about user report `id`. Returns whether an email was sent.
    pub async fn handle_report(&self, id: DbId) -> bool {
        match self.store.get_report(id).await {
            Ok(Some(report)) => self.deliver("report", id, &report_alert(&report)).await,
            Ok(None) => {
                tracing::warn!(report_id = id, "User report not found");
                false
            }
            Err(e) => {
                tracing::error!(report_id = id, error = %e, "Failed to load user report");
                false
            }
        }
    }

    /// Alert about user block `id`. Returns whether an email was sent.
    pub async fn handle_block(&self, id: DbId) -> bool {
        match self.store.get_block(id).await {
            Ok(Some(block)) => self.deliver("block", id, &block_alert(&block)).await,
            Ok(None) => {
                tracing::warn!(block_id = id, "User block not found");
                false
            }
            Err(e) => {
                tracing::error!(block_id = id, error = %e, "Failed to load user block");
                false
            }
        }
    }

    async fn deliver(&self, kind: &'static str, id: DbId, email: &AlertEmail) -> bool {
        match self.mailer.send(&self.support_email, email).await {
            Ok(()) => {
                tracing::info!(kind, id, "Moderation alert sent");
                true
            }
            Err(e) => {
                tracing::error!(kind, id, error = %e, "Failed to send moderation alert");
                false
            }
        }
    }
}
