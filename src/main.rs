//! SIS Server: school information system auth core.
//!
//! Main entry point that wires all crates together and keeps the sweeper
//! running until shutdown.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use sis_auth::AuthState;
use sis_core::config::AppConfig;
use sis_core::error::AppError;
use sis_database::DatabasePool;
use sis_database::repositories::{AccountRepository, PermissionRepository, RevokedTokenRepository};
use sis_database::{AccountStore, PermissionStore, RevocationStore};
use sis_worker::CronScheduler;

#[tokio::main]
async fn main() {
    let env = std::env::var("SIS_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
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

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting SIS v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database connection + migrations ─────────────────
    let db = DatabasePool::connect(&config.database).await?;

    // ── Step 2: Repositories ─────────────────────────────────────
    let accounts: Arc<dyn AccountStore> = Arc::new(AccountRepository::new(db.pool().clone()));
    let permissions: Arc<dyn PermissionStore> =
        Arc::new(PermissionRepository::new(db.pool().clone()));
    let revocations: Arc<dyn RevocationStore> =
        Arc::new(RevokedTokenRepository::new(db.pool().clone()));

    // ── Step 3: Auth core (plants seed permissions) ──────────────
    let auth = AuthState::build(
        &config,
        Arc::clone(&accounts),
        Arc::clone(&permissions),
        Arc::clone(&revocations),
    )
    .await?;
    tracing::info!(?auth, "Auth core ready");

    // ── Step 4: Sweeper ──────────────────────────────────────────
    let scheduler = if config.worker.enabled {
        let scheduler = CronScheduler::new().await?;
        scheduler
            .register_sweeps(&config.worker, revocations, accounts)
            .await?;
        scheduler.start().await?;
        Some(scheduler)
    } else {
        tracing::info!("Sweeper disabled");
        None
    };

    // ── Step 5: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");

    if let Some(mut scheduler) = scheduler {
        if let Err(e) = scheduler.shutdown().await {
            tracing::warn!("Scheduler shutdown failed: {}", e);
        }
    }
    db.close().await;

    tracing::info!("SIS server shut down gracefully");
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
