//! Firebase Cloud Messaging (HTTP v1) transport.
//!
//! FCM v1 accepts one token per request, so a multicast is fanned out as
//! concurrent requests (at most [`MAX_IN_FLIGHT`] at a time) whose outcomes
//! are collected in token order. Requests are authorized with a short-lived
//! OAuth2 access token obtained by exchanging a service-account JWT
//! assertion; the token is cached until shortly before it expires.
//!
//! Configuration is read from the environment; if
//! `GOOGLE_APPLICATION_CREDENTIALS` is not set, [`FcmConfig::from_env`]
//! returns `None`.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;

use super::{
    BatchResponse, FailureCode, MulticastMessage, PushError, PushTransport, SendFailure,
    SendResponse,
};

/// OAuth2 scope required by the FCM send endpoint.
const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

/// Token endpoint used when the service account does not name one.
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Base URL of the FCM v1 API.
const FCM_API_BASE: &str = "https://fcm.googleapis.com/v1";

/// HTTP request timeout for a single send or token exchange.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum concurrent send requests per multicast.
pub const MAX_IN_FLIGHT: usize = 50;

/// Lifetime requested for the JWT assertion.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Refresh the cached access token this long before it expires.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

// ---------------------------------------------------------------------------
// FcmConfig
// ---------------------------------------------------------------------------

/// Configuration for the FCM transport.
#[derive(Debug, Clone)]
pub struct FcmConfig {
    /// Path to the service-account JSON key.
    pub credentials_path: PathBuf,
    /// Firebase project id; defaults to the one in the service account.
    pub project_id: Option<String>,
}

impl FcmConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable                         | Required | Default               |
    /// |----------------------------------|----------|-----------------------|
    /// | `GOOGLE_APPLICATION_CREDENTIALS` | yes      | -                     |
    /// | `FCM_PROJECT_ID`                 | no       | service account value |
    pub fn from_env() -> Option<Self> {
        let credentials_path = std::env::var("GOOGLE_APPLICATION_CREDENTIALS").ok()?;
        Some(Self {
            credentials_path: PathBuf::from(credentials_path),
            project_id: std::env::var("FCM_PROJECT_ID")
                .ok()
                .filter(|p| !p.is_empty()),
        })
    }
}

// ---------------------------------------------------------------------------
// Service account
// ---------------------------------------------------------------------------

/// The fields of a Google service-account key file used for signing.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: Option<String>,
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_json(raw: &str) -> Result<Self, PushError> {
        serde_json::from_str(raw).map_err(|e| PushError::ServiceAccount(e.to_string()))
    }

    pub async fn load(path: &std::path::Path) -> Result<Self, PushError> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            PushError::ServiceAccount(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// FcmClient
// ---------------------------------------------------------------------------

/// Sends multicast pushes through FCM HTTP v1.
pub struct FcmClient {
    http: reqwest::Client,
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    send_url: String,
    cached_token: Mutex<Option<AccessToken>>,
}

impl FcmClient {
    /// Build a client from a parsed service account.
    ///
    /// `project_id` overrides the project named in the key.
    pub fn new(key: ServiceAccountKey, project_id: Option<String>) -> Result<Self, PushError> {
        let project_id = project_id
            .or_else(|| key.project_id.clone())
            .ok_or_else(|| PushError::ServiceAccount("no project id configured".to_string()))?;
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http,
            send_url: format!("{FCM_API_BASE}/projects/{project_id}/messages:send"),
            key,
            signing_key,
            cached_token: Mutex::new(None),
        })
    }

    /// Read the service-account file named by `config` and build a client.
    pub async fn from_config(config: &FcmConfig) -> Result<Self, PushError> {
        let key = ServiceAccountKey::load(&config.credentials_path).await?;
        Self::new(key, config.project_id.clone())
    }

    /// Return a valid access token, exchanging a fresh assertion if needed.
    async fn access_token(&self) -> Result<String, PushError> {
        let mut cached = self.cached_token.lock().await;
        let now = Utc::now();
        if let Some(token) = cached.as_ref() {
            if token.expires_at - chrono::Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) > now {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.exchange_assertion(now).await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    async fn exchange_assertion(&self, now: DateTime<Utc>) -> Result<AccessToken, PushError> {
        let iat = now.timestamp();
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: FCM_SCOPE,
            aud: &self.key.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        let assertion =
            jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)?;

        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PushError::TokenExchange { status, body });
        }

        let token: TokenResponse = response.json().await?;
        tracing::debug!(expires_in = token.expires_in, "Obtained FCM access token");
        Ok(AccessToken {
            value: token.access_token,
            expires_at: now + chrono::Duration::seconds(token.expires_in),
        })
    }

    /// Send the message to one token and classify the outcome.
    async fn send_one(&self, bearer: &str, message: &MulticastMessage, token: &str) -> SendResponse {
        let body = json!({ "message": message.to_fcm_message(token) });
        let response = match self
            .http
            .post(&self.send_url)
            .bearer_auth(bearer)
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                return Err(SendFailure {
                    code: FailureCode::Unavailable,
                    message: e.to_string(),
                })
            }
        };

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if status.is_success() {
            let name = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v.get("name").and_then(|n| n.as_str()).map(str::to_string))
                .unwrap_or_default();
            Ok(name)
        } else {
            Err(classify_error(status.as_u16(), &text))
        }
    }
}

#[async_trait]
impl PushTransport for FcmClient {
    async fn send_multicast(&self, message: &MulticastMessage) -> Result<BatchResponse, PushError> {
        let bearer = self.access_token().await?;

        let responses = stream::iter(0..message.tokens.len())
            .map(|i| self.send_one(&bearer, message, &message.tokens[i]))
            .buffered(MAX_IN_FLIGHT)
            .collect::<Vec<_>>()
            .await;

        Ok(BatchResponse { responses })
    }
}

// ---------------------------------------------------------------------------
// Error classification
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(rename = "errorCode")]
    error_code: Option<String>,
}

/// Map an FCM v1 error response onto a [`SendFailure`].
///
/// The FCM-specific `errorCode` detail wins over the generic RPC status.
pub(crate) fn classify_error(http_status: u16, body: &str) -> SendFailure {
    let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) else {
        let code = if http_status >= 500 {
            FailureCode::Unavailable
        } else {
            FailureCode::Unknown(format!("http-{http_status}"))
        };
        return SendFailure {
            code,
            message: body.to_string(),
        };
    };

    let error = envelope.error;
    let code_name = error
        .details
        .iter()
        .find_map(|d| d.error_code.clone())
        .unwrap_or_else(|| error.status.clone());

    let code = match code_name.as_str() {
        "UNREGISTERED" | "NOT_FOUND" => FailureCode::RegistrationTokenNotRegistered,
        "INVALID_ARGUMENT" if error.message.to_lowercase().contains("registration token") => {
            FailureCode::InvalidRegistrationToken
        }
        "INVALID_ARGUMENT" => FailureCode::InvalidArgument,
        "SENDER_ID_MISMATCH" => FailureCode::SenderIdMismatch,
        "QUOTA_EXCEEDED" | "RESOURCE_EXHAUSTED" => FailureCode::QuotaExceeded,
        "UNAVAILABLE" => FailureCode::Unavailable,
        "INTERNAL" => FailureCode::Internal,
        "THIRD_PARTY_AUTH_ERROR" => FailureCode::ThirdPartyAuthError,
        "" => FailureCode::Unknown(format!("http-{http_status}")),
        other => FailureCode::Unknown(other.to_string()),
    };

    SendFailure {
        code,
        message: error.message,
    }
}
