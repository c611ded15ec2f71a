//! In-memory stores and a scripted push transport for worker tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use wardrobe_core::settings::NotificationSettings;
use wardrobe_core::types::{DbId, Timestamp};
use wardrobe_db::models::endpoint::PushEndpoint;
use wardrobe_db::models::moderation::{UserBlock, UserReport};
use wardrobe_db::models::trigger::{NotificationTrigger, TriggerCompletion};
use wardrobe_db::store::{EndpointStore, ModerationStore, SettingsStore, TriggerStore};
use wardrobe_events::delivery::email::EmailError;
use wardrobe_events::moderation::AlertEmail;
use wardrobe_events::push::{
    BatchResponse, FailureCode, MulticastMessage, PushError, PushTransport, SendFailure,
};
use wardrobe_events::{AlertMailer, PushDispatcher};
use wardrobe_worker::endpoints::EndpointResolver;
use wardrobe_worker::preferences::PreferenceResolver;
use wardrobe_worker::processor::TriggerProcessor;

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Backs every store trait with in-memory collections.
#[derive(Default)]
pub struct MemoryStore {
    pub triggers: Mutex<BTreeMap<DbId, NotificationTrigger>>,
    pub settings: Mutex<HashMap<String, NotificationSettings>>,
    pub endpoints: Mutex<Vec<PushEndpoint>>,
    pub legacy_endpoints: Mutex<Vec<PushEndpoint>>,
    pub reports: Mutex<HashMap<DbId, UserReport>>,
    pub blocks: Mutex<HashMap<DbId, UserBlock>>,
    /// Every terminal write that was applied.
    pub completions: Mutex<Vec<(DbId, TriggerCompletion)>>,
    pub deactivated: Mutex<Vec<String>>,
    pub legacy_lookups: AtomicUsize,
    pub fail_settings: AtomicBool,
    pub fail_endpoints: AtomicBool,
    pub fail_legacy_endpoints: AtomicBool,
    pub fail_triggers: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert_trigger(&self, trigger: NotificationTrigger) {
        self.triggers.lock().unwrap().insert(trigger.id, trigger);
    }

    pub fn trigger(&self, id: DbId) -> Option<NotificationTrigger> {
        self.triggers.lock().unwrap().get(&id).cloned()
    }

    pub fn set_settings(&self, user_id: &str, settings: NotificationSettings) {
        self.settings
            .lock()
            .unwrap()
            .insert(user_id.to_string(), settings);
    }

    pub fn add_endpoint(&self, user_id: &str, token: Option<&str>) {
        let mut endpoints = self.endpoints.lock().unwrap();
        let id = endpoints.len() as DbId + 1;
        endpoints.push(endpoint(id, user_id, token));
    }

    pub fn add_legacy_endpoint(&self, user_id: &str, token: &str) {
        let mut endpoints = self.legacy_endpoints.lock().unwrap();
        let id = endpoints.len() as DbId + 1;
        endpoints.push(endpoint(id, user_id, Some(token)));
    }

    pub fn completion_count(&self) -> usize {
        self.completions.lock().unwrap().len()
    }

    fn check(flag: &AtomicBool) -> Result<(), sqlx::Error> {
        if flag.load(Ordering::SeqCst) {
            Err(sqlx::Error::PoolTimedOut)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TriggerStore for MemoryStore {
    async fn get_trigger(&self, id: DbId) -> Result<Option<NotificationTrigger>, sqlx::Error> {
        Self::check(&self.fail_triggers)?;
        Ok(self.trigger(id))
    }

    async fn complete_trigger(
        &self,
        id: DbId,
        completion: &TriggerCompletion,
    ) -> Result<bool, sqlx::Error> {
        Self::check(&self.fail_triggers)?;
        let mut triggers = self.triggers.lock().unwrap();
        let Some(trigger) = triggers.get_mut(&id).filter(|t| !t.sent) else {
            return Ok(false);
        };
        trigger.sent = true;
        match completion {
            TriggerCompletion::Skipped(reason) => {
                trigger.skipped = Some(true);
                trigger.skip_reason = Some(reason.as_str().to_string());
            }
            TriggerCompletion::Sent {
                sent_at,
                tokens_count,
            } => {
                trigger.sent_at = Some(*sent_at);
                trigger.tokens_count = Some(*tokens_count);
            }
        }
        self.completions.lock().unwrap().push((id, *completion));
        Ok(true)
    }

    async fn list_unsent_since(
        &self,
        since: Timestamp,
        limit: i64,
    ) -> Result<Vec<NotificationTrigger>, sqlx::Error> {
        Self::check(&self.fail_triggers)?;
        let mut pending: Vec<NotificationTrigger> = self
            .triggers
            .lock()
            .unwrap()
            .values()
            .filter(|t| !t.sent && t.created_at >= since)
            .cloned()
            .collect();
        pending.sort_by_key(|t| (t.created_at, t.id));
        pending.truncate(limit as usize);
        Ok(pending)
    }

    async fn delete_created_before(
        &self,
        cutoff: Timestamp,
        limit: i64,
    ) -> Result<Option<u64>, sqlx::Error> {
        Self::check(&self.fail_triggers)?;
        let mut triggers = self.triggers.lock().unwrap();
        let mut expired: Vec<(Timestamp, DbId)> = triggers
            .values()
            .filter(|t| t.created_at < cutoff)
            .map(|t| (t.created_at, t.id))
            .collect();
        expired.sort();
        expired.truncate(limit as usize);
        for (_, id) in &expired {
            triggers.remove(id);
        }
        Ok(Some(expired.len() as u64))
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn notification_settings(
        &self,
        user_id: &str,
    ) -> Result<Option<NotificationSettings>, sqlx::Error> {
        Self::check(&self.fail_settings)?;
        Ok(self.settings.lock().unwrap().get(user_id).cloned())
    }
}

#[async_trait]
impl EndpointStore for MemoryStore {
    async fn active_endpoints(&self, user_id: &str) -> Result<Vec<PushEndpoint>, sqlx::Error> {
        Self::check(&self.fail_endpoints)?;
        Ok(active_for(&self.endpoints.lock().unwrap(), user_id))
    }

    async fn legacy_active_endpoints(
        &self,
        user_id: &str,
    ) -> Result<Vec<PushEndpoint>, sqlx::Error> {
        self.legacy_lookups.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.fail_legacy_endpoints)?;
        Ok(active_for(&self.legacy_endpoints.lock().unwrap(), user_id))
    }

    async fn deactivate_token(&self, fcm_token: &str) -> Result<u64, sqlx::Error> {
        let mut updated = 0;
        for endpoint in self.endpoints.lock().unwrap().iter_mut() {
            if endpoint.fcm_token.as_deref() == Some(fcm_token) {
                endpoint.is_active = false;
                endpoint.last_active_at = Some(Utc::now());
                updated += 1;
            }
        }
        self.deactivated.lock().unwrap().push(fcm_token.to_string());
        Ok(updated)
    }
}

#[async_trait]
impl ModerationStore for MemoryStore {
    async fn get_report(&self, id: DbId) -> Result<Option<UserReport>, sqlx::Error> {
        Ok(self.reports.lock().unwrap().get(&id).cloned())
    }

    async fn get_block(&self, id: DbId) -> Result<Option<UserBlock>, sqlx::Error> {
        Ok(self.blocks.lock().unwrap().get(&id).cloned())
    }
}

fn active_for(endpoints: &[PushEndpoint], user_id: &str) -> Vec<PushEndpoint> {
    endpoints
        .iter()
        .filter(|e| e.user_id == user_id && e.is_active)
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// FakeTransport
// ---------------------------------------------------------------------------

/// Push transport that records messages and fails scripted tokens or calls.
#[derive(Default)]
pub struct FakeTransport {
    pub sent: Mutex<Vec<MulticastMessage>>,
    pub failing_tokens: Mutex<HashMap<String, FailureCode>>,
    /// Number of upcoming calls that fail as a whole.
    pub failing_calls: AtomicUsize,
    /// Calls that succeed before every later call fails.
    pub fail_after: Mutex<Option<usize>>,
    /// Time each call spends in flight.
    pub latency: Mutex<Option<Duration>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_token(&self, token: &str, code: FailureCode) {
        self.failing_tokens
            .lock()
            .unwrap()
            .insert(token.to_string(), code);
    }

    pub fn fail_next_calls(&self, count: usize) {
        self.failing_calls.store(count, Ordering::SeqCst);
    }

    pub fn fail_calls_after(&self, successes: usize) {
        *self.fail_after.lock().unwrap() = Some(successes);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    /// Every token a message was delivered to, in send order.
    pub fn delivered_tokens(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .flat_map(|m| m.tokens.iter().cloned())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl PushTransport for FakeTransport {
    async fn send_multicast(&self, message: &MulticastMessage) -> Result<BatchResponse, PushError> {
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let fail_after = *self.fail_after.lock().unwrap();
        if fail_after.is_some_and(|n| self.call_count() >= n) {
            return Err(PushError::Unavailable("connection reset".into()));
        }

        let remaining = self.failing_calls.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_calls.store(remaining - 1, Ordering::SeqCst);
            return Err(PushError::Unavailable("fcm down".into()));
        }

        self.sent.lock().unwrap().push(message.clone());
        let failing = self.failing_tokens.lock().unwrap();
        let responses = message
            .tokens
            .iter()
            .map(|token| match failing.get(token) {
                Some(code) => Err(SendFailure {
                    code: code.clone(),
                    message: "rejected".into(),
                }),
                None => Ok(format!("projects/test/messages/{token}")),
            })
            .collect();
        Ok(BatchResponse { responses })
    }
}

// ---------------------------------------------------------------------------
// RecordingMailer
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<(String, AlertEmail)>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl AlertMailer for RecordingMailer {
    async fn send(&self, to_email: &str, email: &AlertEmail) -> Result<(), EmailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EmailError::Build("smtp rejected".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((to_email.to_string(), email.clone()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Wire a processor over `store` and `transport`.
pub fn processor(store: &Arc<MemoryStore>, transport: &Arc<FakeTransport>) -> TriggerProcessor {
    TriggerProcessor::new(
        store.clone(),
        PreferenceResolver::new(store.clone()),
        EndpointResolver::new(store.clone()),
        PushDispatcher::new(transport.clone(), store.clone()),
    )
}

/// An unsent trigger created at `created_at`.
pub fn trigger_at(
    id: DbId,
    recipient: &str,
    notification_type: &str,
    created_at: DateTime<Utc>,
) -> NotificationTrigger {
    NotificationTrigger {
        id,
        recipient_user_id: Some(recipient.to_string()),
        notification_type: Some(notification_type.to_string()),
        title: Some("New message".to_string()),
        body: Some("Alice sent you a message".to_string()),
        data: None,
        created_at,
        sent: false,
        skipped: None,
        skip_reason: None,
        sent_at: None,
        tokens_count: None,
    }
}

/// An unsent trigger created just now.
pub fn trigger(id: DbId, recipient: &str, notification_type: &str) -> NotificationTrigger {
    trigger_at(id, recipient, notification_type, Utc::now())
}

pub fn endpoint(id: DbId, user_id: &str, token: Option<&str>) -> PushEndpoint {
    PushEndpoint {
        id,
        user_id: user_id.to_string(),
        fcm_token: token.map(str::to_string),
        is_active: true,
        last_active_at: None,
    }
}

/// 2026-03-01 at `hour:minute` UTC.
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, hour, minute, 0).unwrap()
}
