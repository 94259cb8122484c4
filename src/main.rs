//! TaskHub Daemon — in-process background task scheduler
//!
//! Main entry point that wires the engine together, runs the scheduler
//! loop and shuts down gracefully on Ctrl+C or SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use tracing;
use tracing_subscriber::{EnvFilter, fmt};

use taskhub_core::config::AppConfig;
use taskhub_core::error::AppError;
use taskhub_worker::jobs::builtin_registry;
use taskhub_worker::{FileSettingsStore, TaskEngine};

/// Simulated latency of the built-in handlers
const BUILTIN_LATENCY: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Daemon error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let config_path =
        std::env::var("TASKHUB_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());

    AppConfig::load(&config_path)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main daemon run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting TaskHub v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Settings store ───────────────────────────────────
    let settings = Arc::new(FileSettingsStore::new(&config.settings.path));
    tracing::info!("Settings file: {}", settings.path().display());

    // ── Step 2: Engine ───────────────────────────────────────────
    let engine = TaskEngine::load(
        builtin_registry(BUILTIN_LATENCY),
        config.scheduler,
        settings,
    )
    .await?;

    let effective = engine.get_config();
    tracing::info!(
        "Scheduler config: enabled={}, interval={}ms, max_concurrent={}, retry_attempts={}, timeout={}ms",
        effective.enabled,
        effective.interval_ms,
        effective.max_concurrent_tasks,
        effective.retry_attempts,
        effective.timeout_ms
    );

    // ── Step 3: Scheduler loop ───────────────────────────────────
    engine.start().await;
    if !engine.is_running().await {
        tracing::warn!("Scheduler is disabled; tasks will not be admitted until it is enabled");
    }

    // ── Step 4: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");

    engine.shutdown().await;

    let stats = engine.get_stats().await;
    tracing::info!(
        "TaskHub stopped: total={}, completed={}, failed={}, pending={}",
        stats.total,
        stats.completed,
        stats.failed,
        stats.pending
    );
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
