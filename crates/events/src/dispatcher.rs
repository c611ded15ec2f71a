//! Multicast push dispatch with dead-endpoint invalidation.
//!
//! [`PushDispatcher`] sends one notification to every resolved token of a
//! recipient. Tokens are submitted in batches of at most
//! [`MAX_MULTICAST_TOKENS`], one transport call per batch. Once a batch has
//! been delivered the dispatch counts as done: a later failed batch is
//! logged and its tokens reported as undelivered, never resent. For each token
//! FCM reports as permanently invalid, a detached task marks the matching
//! endpoint rows inactive; those tasks are never awaited by the dispatch
//! path and their failures are only logged.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use wardrobe_db::store::EndpointStore;

use crate::push::{stringify_data, MulticastMessage, PushError, PushTransport};

/// FCM's upper bound on tokens in one multicast.
pub const MAX_MULTICAST_TOKENS: usize = 500;

/// Characters of a token shown in logs.
const TOKEN_PREVIEW_LEN: usize = 20;

/// Outcome of a successful dispatch.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Tokens the message was submitted to.
    pub attempted: usize,
    pub success_count: usize,
    pub failure_count: usize,
    /// Tokens left unsent because a later batch's transport call failed.
    pub undelivered: usize,
    /// Tokens handed to the invalidation task.
    pub invalidated_tokens: Vec<String>,
    /// Detached invalidation tasks. Dropping the handles does not cancel
    /// them; they are exposed so callers that care can observe completion.
    pub invalidations: Vec<JoinHandle<()>>,
}

/// Sends pushes and retires endpoints the provider rejects permanently.
#[derive(Clone)]
pub struct PushDispatcher {
    transport: Arc<dyn PushTransport>,
    endpoints: Arc<dyn EndpointStore>,
}

impl PushDispatcher {
    pub fn new(transport: Arc<dyn PushTransport>, endpoints: Arc<dyn EndpointStore>) -> Self {
        Self {
            transport,
            endpoints,
        }
    }

    /// Send one notification to `tokens`.
    ///
    /// An empty token list is a successful no-op. Per-token failures are
    /// logged and never fail the dispatch. A failed transport call is
    /// returned as an error only when no earlier batch went out.
    pub async fn dispatch(
        &self,
        tokens: &[String],
        title: &str,
        body: &str,
        data: &Map<String, Value>,
    ) -> Result<DispatchReport, PushError> {
        let mut report = DispatchReport::default();
        if tokens.is_empty() {
            tracing::warn!("No active tokens found, skipping notification");
            return Ok(report);
        }

        let data = stringify_data(data);

        for batch in tokens.chunks(MAX_MULTICAST_TOKENS) {
            let message = MulticastMessage {
                tokens: batch.to_vec(),
                title: title.to_string(),
                body: body.to_string(),
                data: data.clone(),
            };

            let response = match self.transport.send_multicast(&message).await {
                Ok(response) => response,
                Err(e) if report.attempted == 0 => {
                    tracing::error!(error = %e, tokens = batch.len(), "Push transport call failed");
                    return Err(e);
                }
                Err(e) => {
                    report.undelivered = tokens.len() - report.attempted;
                    tracing::error!(
                        error = %e,
                        delivered = report.attempted,
                        undelivered = report.undelivered,
                        "Push transport call failed after partial delivery"
                    );
                    break;
                }
            };

            let successes = response.success_count();
            let failures = response.failure_count();
            tracing::info!(successes, tokens = batch.len(), "Push batch sent");
            if failures > 0 {
                tracing::warn!(failures, "Push batch had failed tokens");
            }

            for (token, outcome) in batch.iter().zip(&response.responses) {
                let Err(failure) = outcome else { continue };
                tracing::error!(
                    token = %token_preview(token),
                    code = %failure.code,
                    message = %failure.message,
                    "Push to token failed"
                );
                if failure.code.is_permanent_token_failure() {
                    report.invalidations.push(self.spawn_invalidation(token.clone()));
                    report.invalidated_tokens.push(token.clone());
                }
            }

            report.attempted += batch.len();
            report.success_count += successes;
            report.failure_count += failures;
        }

        Ok(report)
    }

    /// Mark every endpoint carrying `token` inactive on a detached task.
    fn spawn_invalidation(&self, token: String) -> JoinHandle<()> {
        let endpoints = Arc::clone(&self.endpoints);
        tokio::spawn(async move {
            match endpoints.deactivate_token(&token).await {
                Ok(rows) => {
                    tracing::info!(token = %token_preview(&token), rows, "Marked token as inactive");
                }
                Err(e) => {
                    tracing::error!(
                        token = %token_preview(&token),
                        error = %e,
                        "Failed to mark token as inactive"
                    );
                }
            }
        })
    }
}

/// Shorten a token for logging.
pub fn token_preview(token: &str) -> String {
    match token.char_indices().nth(TOKEN_PREVIEW_LEN) {
        Some((idx, _)) => format!("{}...", &token[..idx]),
        None => token.to_string(),
    }
}
