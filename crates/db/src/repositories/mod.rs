//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` as the first argument.

pub mod legacy_device_repo;
pub mod moderation_repo;
pub mod push_endpoint_repo;
pub mod trigger_repo;
pub mod user_settings_repo;

pub use legacy_device_repo::LegacyDeviceRepo;
pub use moderation_repo::ModerationRepo;
pub use push_endpoint_repo::PushEndpointRepo;
pub use trigger_repo::{CreateTrigger, TriggerRepo};
pub use user_settings_repo::UserSettingsRepo;
