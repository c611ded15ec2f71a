//! Active push-token resolution.

use std::sync::Arc;

use wardrobe_db::models::endpoint::PushEndpoint;
use wardrobe_db::store::EndpointStore;

/// Resolves the push tokens a notification should be sent to.
#[derive(Clone)]
pub struct EndpointResolver {
    store: Arc<dyn EndpointStore>,
}

impl EndpointResolver {
    pub fn new(store: Arc<dyn EndpointStore>) -> Self {
        Self { store }
    }

    /// Active, non-empty tokens of `user_id`.
    ///
    /// The legacy device table is consulted only when the primary lookup
    /// fails; an empty primary result is returned as is. A failing legacy
    /// lookup yields no tokens.
    pub async fn active_tokens(&self, user_id: &str) -> Vec<String> {
        match self.store.active_endpoints(user_id).await {
            Ok(endpoints) => {
                let tokens = tokens_of(endpoints);
                tracing::info!(user_id, count = tokens.len(), "Found active FCM tokens");
                tokens
            }
            Err(e) => {
                tracing::error!(user_id, error = %e, "Error getting FCM tokens, trying legacy devices");
                match self.store.legacy_active_endpoints(user_id).await {
                    Ok(endpoints) => tokens_of(endpoints),
                    Err(e) => {
                        tracing::error!(user_id, error = %e, "Error getting FCM tokens (fallback)");
                        Vec::new()
                    }
                }
            }
        }
    }
}

fn tokens_of(endpoints: Vec<PushEndpoint>) -> Vec<String> {
    endpoints
        .into_iter()
        .filter_map(|e| e.fcm_token)
        .filter(|token| !token.is_empty())
        .collect()
}
