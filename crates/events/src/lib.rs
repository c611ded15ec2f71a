//! Outbound delivery for the Wardrobe notification backend.
//!
//! - [`push`]: the [`PushTransport`] seam, the multicast message model,
//!   and the FCM HTTP v1 client.
//! - [`PushDispatcher`]: sends one multicast push and retires endpoints
//!   that FCM reports as dead.
//! - [`delivery`]: SMTP email delivery and its logging stand-in.
//! - [`moderation`]: formatting of report/block alert emails.

pub mod delivery;
pub mod dispatcher;
pub mod moderation;
pub mod push;

pub use delivery::email::{AlertMailer, EmailConfig, EmailDelivery, LogMailer};
pub use dispatcher::{DispatchReport, PushDispatcher};
pub use push::fcm::{FcmClient, FcmConfig};
pub use push::{PushError, PushTransport};
