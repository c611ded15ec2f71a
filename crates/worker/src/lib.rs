//! Notification dispatch worker.
//!
//! Reacts to newly inserted notification triggers, decides per recipient
//! whether to deliver, sends pushes through FCM, and keeps the trigger table
//! bounded. Also forwards new user reports and blocks to the support inbox.
//!
//! - [`processor`]: the per-trigger decision pipeline.
//! - [`runner`]: bounded concurrency, retry, and backlog replay.
//! - [`listener`]: `LISTEN`/`NOTIFY` ingestion.
//! - [`sweeper`]: retention cleanup.
//! - [`moderation`]: report/block alert emails.

pub mod config;
pub mod endpoints;
pub mod listener;
pub mod moderation;
pub mod preferences;
pub mod processor;
pub mod runner;
pub mod sweeper;
