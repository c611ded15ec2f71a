//! Postgres change-notification ingestion.
//!
//! Insert triggers on `notification_triggers`, `user_reports` and
//! `user_blocks` call `pg_notify` with the new row id. [`ChangeListener`]
//! subscribes to those channels and routes each id to the
//! [`TriggerRunner`] or to [`ModerationAlerts`].
//!
//! Notifications are not queued while the listener is disconnected, so the
//! unsent-trigger backlog is replayed after every (re)connect.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::postgres::PgListener;
use tokio_util::sync::CancellationToken;
use wardrobe_core::types::DbId;
use wardrobe_db::DbPool;

use crate::moderation::ModerationAlerts;
use crate::runner::TriggerRunner;

pub const TRIGGER_CREATED_CHANNEL: &str = "notification_trigger_created";
pub const REPORT_CREATED_CHANNEL: &str = "user_report_created";
pub const BLOCK_CREATED_CHANNEL: &str = "user_block_created";

const INITIAL_RECONNECT_DELAY: Duration = Duration::from_secs(1);
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

/// A row-creation notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEvent {
    TriggerCreated(DbId),
    ReportCreated(DbId),
    BlockCreated(DbId),
}

/// Decode a notification. Unknown channels and non-numeric payloads yield
/// `None`.
pub fn parse_notification(channel: &str, payload: &str) -> Option<ChangeEvent> {
    let id: DbId = payload.trim().parse().ok()?;
    match channel {
        TRIGGER_CREATED_CHANNEL => Some(ChangeEvent::TriggerCreated(id)),
        REPORT_CREATED_CHANNEL => Some(ChangeEvent::ReportCreated(id)),
        BLOCK_CREATED_CHANNEL => Some(ChangeEvent::BlockCreated(id)),
        _ => None,
    }
}

/// Listens for row-creation notifications and dispatches them.
pub struct ChangeListener {
    pool: DbPool,
    runner: TriggerRunner,
    alerts: Arc<ModerationAlerts>,
    retention: chrono::Duration,
}

impl ChangeListener {
    pub fn new(
        pool: DbPool,
        runner: TriggerRunner,
        alerts: Arc<ModerationAlerts>,
        retention: chrono::Duration,
    ) -> Self {
        Self {
            pool,
            runner,
            alerts,
            retention,
        }
    }

    /// Run until `cancel` is triggered, reconnecting with exponential
    /// backoff whenever the connection drops.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut delay = INITIAL_RECONNECT_DELAY;

        loop {
            match self.connect().await {
                Ok(mut listener) => {
                    delay = INITIAL_RECONNECT_DELAY;
                    self.runner.replay_backlog(Utc::now(), self.retention).await;

                    if self.receive(&mut listener, &cancel).await {
                        return;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to subscribe to change notifications");
                }
            }

            tracing::info!(delay_ms = delay.as_millis() as u64, "Reconnecting change listener");
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            delay = (delay * 2).min(MAX_RECONNECT_DELAY);
        }
    }

    async fn connect(&self) -> Result<PgListener, sqlx::Error> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener
            .listen_all([
                TRIGGER_CREATED_CHANNEL,
                REPORT_CREATED_CHANNEL,
                BLOCK_CREATED_CHANNEL,
            ])
            .await?;
        tracing::info!("Listening for change notifications");
        Ok(listener)
    }

    /// Receive until the connection drops (`false`) or shutdown (`true`).
    async fn receive(&self, listener: &mut PgListener, cancel: &CancellationToken) -> bool {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Change listener stopping");
                    return true;
                }
                result = listener.try_recv() => {
                    match result {
                        Ok(Some(notification)) => {
                            self.route(notification.channel(), notification.payload());
                        }
                        Ok(None) => {
                            tracing::warn!("Change listener connection lost");
                            return false;
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Change listener receive failed");
                            return false;
                        }
                    }
                }
            }
        }
    }

    fn route(&self, channel: &str, payload: &str) {
        let Some(event) = parse_notification(channel, payload) else {
            tracing::warn!(channel, payload, "Ignoring unrecognized notification");
            return;
        };

        match event {
            ChangeEvent::TriggerCreated(id) => {
                self.runner.submit(id);
            }
            ChangeEvent::ReportCreated(id) => {
                let alerts = Arc::clone(&self.alerts);
                tokio::spawn(async move {
                    alerts.handle_report(id).await;
                });
            }
            ChangeEvent::BlockCreated(id) => {
                let alerts = Arc::clone(&self.alerts);
                tokio::spawn(async move {
                    alerts.handle_block(id).await;
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_known_channels() {
        assert_eq!(
            parse_notification(TRIGGER_CREATED_CHANNEL, "42"),
            Some(ChangeEvent::TriggerCreated(42))
        );
        assert_eq!(
            parse_notification(REPORT_CREATED_CHANNEL, " 7 "),
            Some(ChangeEvent::ReportCreated(7))
        );
        assert_eq!(
            parse_notification(BLOCK_CREATED_CHANNEL, "3"),
            Some(ChangeEvent::BlockCreated(3))
        );
    }

    #[test]
    fn rejects_unknown_channel_and_bad_payload() {
        assert_eq!(parse_notification("other_channel", "1"), None);
        assert_eq!(parse_notification(TRIGGER_CREATED_CHANNEL, "abc"), None);
        assert_eq!(parse_notification(TRIGGER_CREATED_CHANNEL, ""), None);
    }
}
