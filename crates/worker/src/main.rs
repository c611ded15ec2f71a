use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wardrobe_db::store::PgStore;
use wardrobe_events::{
    AlertMailer, EmailConfig, EmailDelivery, FcmClient, FcmConfig, LogMailer, PushDispatcher,
};
use wardrobe_worker::config::WorkerConfig;
use wardrobe_worker::endpoints::EndpointResolver;
use wardrobe_worker::listener::ChangeListener;
use wardrobe_worker::moderation::ModerationAlerts;
use wardrobe_worker::preferences::PreferenceResolver;
use wardrobe_worker::processor::TriggerProcessor;
use wardrobe_worker::runner::{RetryPolicy, TriggerRunner};
use wardrobe_worker::sweeper::RetentionSweeper;

/// Grace period for background loops after shutdown is requested.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "wardrobe_worker=debug,wardrobe_events=debug,wardrobe_db=info".into()
            }),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    // --- Configuration ---
    let config = WorkerConfig::from_env().context("Invalid worker configuration")?;
    tracing::info!(
        region = %config.deploy_region,
        max_concurrent_triggers = config.max_concurrent_triggers,
        retention_days = config.retention_days,
        "Loaded worker configuration"
    );

    // --- Database ---
    let pool = wardrobe_db::create_pool(&config.database_url, config.database_max_connections)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    wardrobe_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    tracing::info!("Database health check passed");

    wardrobe_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    let store = Arc::new(PgStore::new(pool.clone()));

    // --- Push transport ---
    let fcm_config =
        FcmConfig::from_env().context("GOOGLE_APPLICATION_CREDENTIALS must be set")?;
    let fcm = FcmClient::from_config(&fcm_config)
        .await
        .context("Failed to initialise FCM client")?;
    tracing::info!("FCM client initialised");

    // --- Alert mailer ---
    let mailer: Arc<dyn AlertMailer> = match EmailConfig::from_env() {
        Some(email_config) => {
            tracing::info!(smtp_host = %email_config.smtp_host, "SMTP email delivery enabled");
            Arc::new(EmailDelivery::new(email_config).context("Invalid SMTP configuration")?)
        }
        None => {
            tracing::warn!("SMTP_HOST not set, moderation alerts will only be logged");
            Arc::new(LogMailer)
        }
    };

    // --- Services ---
    let cancel = CancellationToken::new();

    let dispatcher = PushDispatcher::new(Arc::new(fcm), store.clone());
    let processor = Arc::new(TriggerProcessor::new(
        store.clone(),
        PreferenceResolver::new(store.clone()),
        EndpointResolver::new(store.clone()),
        dispatcher,
    ));
    let runner = TriggerRunner::new(
        processor,
        store.clone(),
        config.max_concurrent_triggers,
        RetryPolicy {
            attempts: config.trigger_retry_attempts,
            ..RetryPolicy::default()
        },
        cancel.clone(),
    );
    let alerts = Arc::new(ModerationAlerts::new(
        store.clone(),
        mailer,
        config.support_email.clone(),
    ));

    let sweeper = RetentionSweeper::new(
        store.clone(),
        config.retention(),
        config.cleanup_batch_limit,
        config.cleanup_interval(),
    );
    let sweeper_cancel = cancel.clone();
    let sweeper_handle = tokio::spawn(async move {
        sweeper.run(sweeper_cancel).await;
    });

    let listener = ChangeListener::new(pool, runner.clone(), alerts, config.retention());
    let listener_cancel = cancel.clone();
    let listener_handle = tokio::spawn(async move {
        listener.run(listener_cancel).await;
    });

    tracing::info!("Notification worker started (listener, retention sweeper)");

    shutdown_signal().await;

    // --- Shutdown ---
    cancel.cancel();
    let _ = tokio::time::timeout(SHUTDOWN_TIMEOUT, listener_handle).await;
    let _ = tokio::time::timeout(SHUTDOWN_TIMEOUT, sweeper_handle).await;
    tracing::info!("Background loops stopped");

    if tokio::time::timeout(SHUTDOWN_TIMEOUT, runner.shutdown()).await.is_err() {
        tracing::warn!("Timed out waiting for in-flight notification triggers");
    }

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for SIGINT or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
