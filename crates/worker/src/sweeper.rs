//! Periodic deletion of old notification triggers.
//!
//! Runs once at startup and then on a fixed interval using
//! `tokio::time::interval`. Each pass deletes at most `batch_limit` of the
//! oldest triggers created before `now - retention`, whatever their state.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use wardrobe_core::types::Timestamp;
use wardrobe_db::store::TriggerStore;

pub struct RetentionSweeper {
    triggers: Arc<dyn TriggerStore>,
    retention: chrono::Duration,
    batch_limit: i64,
    interval: Duration,
}

impl RetentionSweeper {
    pub fn new(
        triggers: Arc<dyn TriggerStore>,
        retention: chrono::Duration,
        batch_limit: i64,
        interval: Duration,
    ) -> Self {
        Self {
            triggers,
            retention,
            batch_limit,
            interval,
        }
    }

    /// Run the sweep loop until `cancel` is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            retention_days = self.retention.num_days(),
            batch_limit = self.batch_limit,
            interval_secs = self.interval.as_secs(),
            "Trigger retention sweeper started"
        );

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Trigger retention sweeper stopping");
                    break;
                }
                _ = interval.tick() => {
                    self.sweep_once(Utc::now()).await;
                }
            }
        }
    }

    /// Delete one batch of expired triggers; returns the rows deleted.
    ///
    /// Errors are logged and reported as zero deletions.
    pub async fn sweep_once(&self, now: Timestamp) -> u64 {
        let cutoff = now - self.retention;
        match self
            .triggers
            .delete_created_before(cutoff, self.batch_limit)
            .await
        {
            Ok(Some(0)) => {
                tracing::info!(%cutoff, "No old notification triggers to clean up");
                0
            }
            Ok(Some(deleted)) => {
                tracing::info!(deleted, %cutoff, "Cleaned up old notification triggers");
                deleted
            }
            Ok(None) => {
                tracing::info!("Another sweep is running, skipping this pass");
                0
            }
            Err(e) => {
                tracing::error!(error = %e, "Error cleaning up old notification triggers");
                0
            }
        }
    }
}
