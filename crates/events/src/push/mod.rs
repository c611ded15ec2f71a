//! Push delivery model and transport seam.
//!
//! A [`MulticastMessage`] is one notification addressed to many tokens. A
//! [`PushTransport`] submits it in a single call and reports an outcome per
//! token, aligned with [`MulticastMessage::tokens`]. Failure of the call as a
//! whole is a [`PushError`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{json, Value};

pub mod fcm;

/// Android notification channel the app registers for server pushes.
pub const ANDROID_CHANNEL_ID: &str = "scheduled_notifications";

/// Android notification accent color.
pub const ANDROID_ACCENT_COLOR: &str = "#7C3AED";

/// Sound played on both platforms.
pub const DEFAULT_SOUND: &str = "default";

/// Badge count set on iOS.
pub const APNS_BADGE: u32 = 1;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Failure of a whole transport call (not of an individual token).
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// The HTTP client could not complete a request.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service-account credentials could not be read or parsed.
    #[error("Service account error: {0}")]
    ServiceAccount(String),

    /// Signing the OAuth2 assertion failed.
    #[error("JWT signing failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// The OAuth2 token endpoint rejected the assertion.
    #[error("Token exchange returned HTTP {status}: {body}")]
    TokenExchange { status: u16, body: String },

    /// The transport is not usable right now.
    #[error("Push transport unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// Per-token outcome
// ---------------------------------------------------------------------------

/// Reason a single token could not be delivered to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCode {
    /// The token is malformed.
    InvalidRegistrationToken,
    /// The app instance was uninstalled or the token expired.
    RegistrationTokenNotRegistered,
    /// The token belongs to a different sender.
    SenderIdMismatch,
    /// The payload was rejected.
    InvalidArgument,
    /// Sending rate exceeded for the project or device.
    QuotaExceeded,
    /// FCM or the network was unavailable.
    Unavailable,
    /// APNs or web-push credentials were rejected.
    ThirdPartyAuthError,
    /// FCM reported an internal error.
    Internal,
    /// Any other error code, kept verbatim.
    Unknown(String),
}

impl FailureCode {
    /// Stable `messaging/*` identifier used in logs.
    pub fn as_str(&self) -> &str {
        match self {
            Self::InvalidRegistrationToken => "messaging/invalid-registration-token",
            Self::RegistrationTokenNotRegistered => "messaging/registration-token-not-registered",
            Self::SenderIdMismatch => "messaging/mismatched-credential",
            Self::InvalidArgument => "messaging/invalid-argument",
            Self::QuotaExceeded => "messaging/message-rate-exceeded",
            Self::Unavailable => "messaging/server-unavailable",
            Self::ThirdPartyAuthError => "messaging/third-party-auth-error",
            Self::Internal => "messaging/internal-error",
            Self::Unknown(code) => code,
        }
    }

    /// Whether the token can never succeed again and should be retired.
    pub fn is_permanent_token_failure(&self) -> bool {
        matches!(
            self,
            Self::InvalidRegistrationToken | Self::RegistrationTokenNotRegistered
        )
    }
}

impl std::fmt::Display for FailureCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed send to one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendFailure {
    pub code: FailureCode,
    pub message: String,
}

/// Outcome for one token: the provider's message id, or the failure.
pub type SendResponse = Result<String, SendFailure>;

/// Outcomes of one multicast call, aligned with the message's tokens.
#[derive(Debug, Clone, Default)]
pub struct BatchResponse {
    pub responses: Vec<SendResponse>,
}

impl BatchResponse {
    pub fn success_count(&self) -> usize {
        self.responses.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.responses.len() - self.success_count()
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// One notification addressed to a batch of device tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MulticastMessage {
    pub tokens: Vec<String>,
    pub title: String,
    pub body: String,
    /// Data payload; FCM only accepts string values.
    pub data: BTreeMap<String, String>,
}

impl MulticastMessage {
    /// Build the FCM v1 `message` object for a single token.
    ///
    /// Platform hints are fixed: high Android priority on the app's
    /// notification channel with the default sound and accent color, and
    /// the default sound with a badge of 1 on iOS.
    pub fn to_fcm_message(&self, token: &str) -> Value {
        json!({
            "token": token,
            "notification": {
                "title": self.title,
                "body": self.body,
            },
            "data": self.data,
            "android": {
                "priority": "HIGH",
                "notification": {
                    "channel_id": ANDROID_CHANNEL_ID,
                    "sound": DEFAULT_SOUND,
                    "color": ANDROID_ACCENT_COLOR,
                },
            },
            "apns": {
                "payload": {
                    "aps": {
                        "sound": DEFAULT_SOUND,
                        "badge": APNS_BADGE,
                    },
                },
            },
        })
    }
}

/// Coerce an arbitrary JSON object into the string-only data payload.
///
/// Strings pass through unchanged; every other value is rendered as its
/// JSON text (`42`, `true`, `null`, `{"a":1}`).
pub fn stringify_data(data: &serde_json::Map<String, Value>) -> BTreeMap<String, String> {
    data.iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), text)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// A push provider able to deliver a multicast message.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Submit `message` to every token in one call.
    ///
    /// The returned responses are aligned with `message.tokens`. An `Err`
    /// means the call itself failed and nothing can be assumed delivered.
    async fn send_multicast(&self, message: &MulticastMessage) -> Result<BatchResponse, PushError>;
}
