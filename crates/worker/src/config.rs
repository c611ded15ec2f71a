//! Worker configuration loaded from environment variables.

/// Default maximum number of triggers processed concurrently.
const DEFAULT_MAX_CONCURRENT_TRIGGERS: usize = 10;

/// Default number of attempts (first try included) per trigger event.
const DEFAULT_TRIGGER_RETRY_ATTEMPTS: u32 = 5;

/// Default age after which trigger records are deleted.
const DEFAULT_RETENTION_DAYS: i64 = 7;

/// Upper bound on `RETENTION_DAYS`.
const MAX_RETENTION_DAYS: i64 = 3650;

/// Default maximum number of records deleted per sweep.
const DEFAULT_CLEANUP_BATCH_LIMIT: i64 = 500;

/// Default interval between sweeps: 24 hours.
const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 86_400;

const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 20;
const DEFAULT_SUPPORT_EMAIL: &str = "support@wardrobe.chat";
const DEFAULT_DEPLOY_REGION: &str = "us-central1";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Worker configuration.
///
/// Push (`GOOGLE_APPLICATION_CREDENTIALS`, `FCM_PROJECT_ID`) and SMTP
/// settings are read by their own config types in `wardrobe_events`.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    /// Upper bound on concurrently processed triggers.
    pub max_concurrent_triggers: usize,
    /// Attempts per trigger event before giving up, first try included.
    pub trigger_retry_attempts: u32,
    pub retention_days: i64,
    pub cleanup_batch_limit: i64,
    pub cleanup_interval_secs: u64,
    /// Recipient of report/block alert emails.
    pub support_email: String,
    /// Deployment region, reported in logs only.
    pub deploy_region: String,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                 |
    /// |----------------------------|-------------------------|
    /// | `DATABASE_URL`             | required                |
    /// | `DATABASE_MAX_CONNECTIONS` | `20`                    |
    /// | `MAX_CONCURRENT_TRIGGERS`  | `10`                    |
    /// | `TRIGGER_RETRY_ATTEMPTS`   | `5`                     |
    /// | `RETENTION_DAYS`           | `7`                     |
    /// | `CLEANUP_BATCH_LIMIT`      | `500`                   |
    /// | `CLEANUP_INTERVAL_SECS`    | `86400`                 |
    /// | `SUPPORT_EMAIL`            | `support@wardrobe.chat` |
    /// | `DEPLOY_REGION`            | `us-central1`           |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        Ok(Self {
            database_url,
            database_max_connections: parse_or(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                DEFAULT_DATABASE_MAX_CONNECTIONS,
            )?,
            max_concurrent_triggers: positive(
                parse_or(&lookup, "MAX_CONCURRENT_TRIGGERS", DEFAULT_MAX_CONCURRENT_TRIGGERS)?,
                "MAX_CONCURRENT_TRIGGERS",
            )?,
            trigger_retry_attempts: positive(
                parse_or(&lookup, "TRIGGER_RETRY_ATTEMPTS", DEFAULT_TRIGGER_RETRY_ATTEMPTS)?,
                "TRIGGER_RETRY_ATTEMPTS",
            )?,
            retention_days: at_most(
                positive(
                    parse_or(&lookup, "RETENTION_DAYS", DEFAULT_RETENTION_DAYS)?,
                    "RETENTION_DAYS",
                )?,
                MAX_RETENTION_DAYS,
                "RETENTION_DAYS",
            )?,
            cleanup_batch_limit: positive(
                parse_or(&lookup, "CLEANUP_BATCH_LIMIT", DEFAULT_CLEANUP_BATCH_LIMIT)?,
                "CLEANUP_BATCH_LIMIT",
            )?,
            cleanup_interval_secs: positive(
                parse_or(&lookup, "CLEANUP_INTERVAL_SECS", DEFAULT_CLEANUP_INTERVAL_SECS)?,
                "CLEANUP_INTERVAL_SECS",
            )?,
            support_email: lookup("SUPPORT_EMAIL")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_SUPPORT_EMAIL.to_string()),
            deploy_region: lookup("DEPLOY_REGION")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_DEPLOY_REGION.to_string()),
        })
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.retention_days)
    }

    pub fn cleanup_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cleanup_interval_secs)
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}

fn positive<T: PartialOrd + Default + ToString>(
    value: T,
    var: &'static str,
) -> Result<T, ConfigError> {
    if value > T::default() {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
        })
    }
}

fn at_most<T: PartialOrd + ToString>(
    value: T,
    max: T,
    var: &'static str,
) -> Result<T, ConfigError> {
    if value <= max {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
        })
    }
}
