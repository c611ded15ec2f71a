//! Per-trigger decision pipeline.
//!
//! [`TriggerProcessor`] turns one trigger snapshot into at most one terminal
//! write and at most one push dispatch:
//!
//! 1. ignore vanished, already-sent, or recipient-less triggers
//! 2. skip when the recipient disabled the type or is in quiet hours
//! 3. skip when the recipient has no active endpoint
//! 4. otherwise dispatch and record `sent_at` and `tokens_count`
//!
//! A failed dispatch leaves the trigger untouched and is returned as an
//! error so the caller can retry the whole invocation.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use wardrobe_core::notification::{SkipReason, DEFAULT_BODY, DEFAULT_TITLE};
use wardrobe_core::types::{DbId, Timestamp};
use wardrobe_db::models::trigger::{NotificationTrigger, TriggerCompletion};
use wardrobe_db::store::TriggerStore;
use wardrobe_events::{DispatchReport, PushDispatcher, PushError};

use crate::endpoints::EndpointResolver;
use crate::preferences::{is_quiet_hours, PreferenceResolver};

/// One trigger creation event with the record as it looked when loaded.
#[derive(Debug, Clone)]
pub struct TriggerEvent {
    pub trigger_id: DbId,
    /// `None` when the record no longer exists.
    pub snapshot: Option<NotificationTrigger>,
}

/// Why an event was dropped without touching the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    MissingSnapshot,
    AlreadySent,
    MissingRecipient,
}

/// Result of processing one event.
#[derive(Debug)]
pub enum Outcome {
    Ignored(IgnoreReason),
    Skipped(SkipReason),
    Sent {
        tokens_count: i32,
        report: DispatchReport,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("push dispatch failed: {0}")]
    Dispatch(#[from] PushError),

    #[error("trigger store error: {0}")]
    Store(#[from] sqlx::Error),
}

/// Decides and performs delivery for notification triggers.
pub struct TriggerProcessor {
    triggers: Arc<dyn TriggerStore>,
    preferences: PreferenceResolver,
    endpoints: EndpointResolver,
    dispatcher: PushDispatcher,
}

impl TriggerProcessor {
    pub fn new(
        triggers: Arc<dyn TriggerStore>,
        preferences: PreferenceResolver,
        endpoints: EndpointResolver,
        dispatcher: PushDispatcher,
    ) -> Self {
        Self {
            triggers,
            preferences,
            endpoints,
            dispatcher,
        }
    }

    /// Process `event` against the current UTC time.
    pub async fn process(&self, event: &TriggerEvent) -> Result<Outcome, ProcessError> {
        self.process_at(event, Utc::now()).await
    }

    /// Process `event` as if the current time were `now`.
    ///
    /// Quiet hours are checked against the UTC wall-clock time of `now`.
    pub async fn process_at(
        &self,
        event: &TriggerEvent,
        now: Timestamp,
    ) -> Result<Outcome, ProcessError> {
        let trigger_id = event.trigger_id;
        let Some(trigger) = event.snapshot.as_ref() else {
            tracing::info!(trigger_id, "Trigger record not found, ignoring event");
            return Ok(Outcome::Ignored(IgnoreReason::MissingSnapshot));
        };

        if trigger.sent {
            tracing::info!(trigger_id, "Notification already sent, skipping");
            return Ok(Outcome::Ignored(IgnoreReason::AlreadySent));
        }

        let Some(recipient) = trigger.recipient() else {
            tracing::error!(trigger_id, "Trigger has no recipient_user_id");
            return Ok(Outcome::Ignored(IgnoreReason::MissingRecipient));
        };

        let kind = trigger.kind();
        tracing::info!(
            trigger_id,
            recipient,
            notification_type = %kind,
            "Processing notification trigger"
        );

        let settings = self.preferences.resolve(recipient).await;

        if !settings.is_enabled(&kind) {
            tracing::info!(
                trigger_id,
                recipient,
                notification_type = %kind,
                "Notification type disabled for user"
            );
            return self.skip(trigger_id, SkipReason::NotificationTypeDisabled).await;
        }

        if is_quiet_hours(&settings, now.time()) {
            tracing::info!(trigger_id, recipient, "Quiet hours active for user");
            return self.skip(trigger_id, SkipReason::QuietHours).await;
        }

        let tokens = self.endpoints.active_tokens(recipient).await;
        if tokens.is_empty() {
            tracing::warn!(trigger_id, recipient, "No active FCM tokens for user");
            return self.skip(trigger_id, SkipReason::NoActiveTokens).await;
        }

        let empty = Map::new();
        let data = trigger
            .data
            .as_ref()
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        let report = self
            .dispatcher
            .dispatch(&tokens, title_of(trigger), body_of(trigger), data)
            .await?;

        let tokens_count = i32::try_from(report.attempted).unwrap_or(i32::MAX);
        let written = self
            .triggers
            .complete_trigger(
                trigger_id,
                &TriggerCompletion::Sent {
                    sent_at: now,
                    tokens_count,
                },
            )
            .await?;
        if !written {
            tracing::warn!(trigger_id, "Trigger was completed concurrently");
        }

        tracing::info!(
            trigger_id,
            recipient,
            tokens_count,
            successes = report.success_count,
            failures = report.failure_count,
            "Notification sent"
        );
        Ok(Outcome::Sent {
            tokens_count,
            report,
        })
    }

    async fn skip(&self, trigger_id: DbId, reason: SkipReason) -> Result<Outcome, ProcessError> {
        let written = self
            .triggers
            .complete_trigger(trigger_id, &TriggerCompletion::Skipped(reason))
            .await?;
        if written {
            tracing::info!(trigger_id, skip_reason = %reason, "Trigger skipped");
        } else {
            tracing::warn!(trigger_id, skip_reason = %reason, "Trigger was completed concurrently");
        }
        Ok(Outcome::Skipped(reason))
    }
}

fn title_of(trigger: &NotificationTrigger) -> &str {
    trigger
        .title
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_TITLE)
}

fn body_of(trigger: &NotificationTrigger) -> &str {
    trigger
        .body
        .as_deref()
        .filter(|b| !b.is_empty())
        .unwrap_or(DEFAULT_BODY)
}
