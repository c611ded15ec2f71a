//! Bounded, retrying execution of trigger events.
//!
//! Each submitted trigger id runs on its own task under a semaphore permit.
//! An id already queued or running is not submitted again, so replay and
//! live notifications never process the same record concurrently.
//! Every attempt reloads the record so a retry observes any terminal state
//! written in the meantime. Failed attempts back off exponentially; after
//! the last attempt the record is left unsent for backlog replay.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use wardrobe_core::types::{DbId, Timestamp};
use wardrobe_db::store::TriggerStore;

use crate::processor::{Outcome, ProcessError, TriggerEvent, TriggerProcessor};

/// Maximum number of unsent triggers replayed per backlog pass.
pub const BACKLOG_REPLAY_LIMIT: i64 = 500;

/// Attempts and backoff for one trigger event.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, first try included.
    pub attempts: u32,
    /// Delay after the first failure; doubles after each further failure.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// Runs trigger events with bounded concurrency and wholesale retry.
#[derive(Clone)]
pub struct TriggerRunner {
    processor: Arc<TriggerProcessor>,
    triggers: Arc<dyn TriggerStore>,
    permits: Arc<Semaphore>,
    retry: RetryPolicy,
    tracker: TaskTracker,
    cancel: CancellationToken,
    in_flight: Arc<Mutex<HashSet<DbId>>>,
}

/// Releases a trigger id from the in-flight set when its task ends.
struct InFlight {
    ids: Arc<Mutex<HashSet<DbId>>>,
    trigger_id: DbId,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.trigger_id);
    }
}

impl TriggerRunner {
    pub fn new(
        processor: Arc<TriggerProcessor>,
        triggers: Arc<dyn TriggerStore>,
        max_concurrent: usize,
        retry: RetryPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            processor,
            triggers,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            retry,
            tracker: TaskTracker::new(),
            cancel,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Process `trigger_id` on a background task.
    ///
    /// Returns `None` without spawning when the id is already in flight.
    pub fn submit(&self, trigger_id: DbId) -> Option<JoinHandle<Option<Outcome>>> {
        let claimed = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(trigger_id);
        if !claimed {
            tracing::debug!(trigger_id, "Notification trigger already in flight");
            return None;
        }

        let guard = InFlight {
            ids: Arc::clone(&self.in_flight),
            trigger_id,
        };
        let runner = self.clone();
        Some(self.tracker.spawn(async move {
            let _guard = guard;
            let _permit = match Arc::clone(&runner.permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return None,
            };
            runner.run_with_retry(trigger_id).await.ok()
        }))
    }

    /// Load and process `trigger_id`, retrying failed attempts.
    pub async fn run_with_retry(&self, trigger_id: DbId) -> Result<Outcome, ProcessError> {
        let mut attempt = 1;
        loop {
            let result = match self.triggers.get_trigger(trigger_id).await {
                Ok(snapshot) => {
                    self.processor
                        .process(&TriggerEvent {
                            trigger_id,
                            snapshot,
                        })
                        .await
                }
                Err(e) => Err(ProcessError::Store(e)),
            };

            let err = match result {
                Ok(outcome) => return Ok(outcome),
                Err(e) => e,
            };

            if attempt >= self.retry.attempts {
                tracing::error!(
                    trigger_id,
                    attempts = attempt,
                    error = %err,
                    "Giving up on notification trigger"
                );
                return Err(err);
            }

            let delay = self.retry.delay_after(attempt);
            tracing::warn!(
                trigger_id,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Notification trigger failed, retrying"
            );

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!(trigger_id, "Shutdown requested, abandoning retries");
                    return Err(err);
                }
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }

    /// Resubmit unsent triggers created within `retention` of `now`.
    ///
    /// Returns the number of unsent triggers found.
    pub async fn replay_backlog(&self, now: Timestamp, retention: chrono::Duration) -> usize {
        let since = now - retention;
        match self
            .triggers
            .list_unsent_since(since, BACKLOG_REPLAY_LIMIT)
            .await
        {
            Ok(pending) => {
                if !pending.is_empty() {
                    tracing::info!(count = pending.len(), "Replaying unsent notification triggers");
                }
                for trigger in &pending {
                    self.submit(trigger.id);
                }
                pending.len()
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load unsent notification triggers");
                0
            }
        }
    }

    /// Stop accepting work and wait for in-flight triggers to finish.
    pub async fn shutdown(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        tracing::info!("Trigger runner drained");
    }
}
