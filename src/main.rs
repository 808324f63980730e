//! Media Cache daemon
//!
//! Runs the cache with background maintenance and serves the admin API.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use media_cache::api::{create_router, AppState};
use media_cache::cache::NoopWarmupSource;
use media_cache::{spawn_maintenance_task, Config};

/// Main entry point for the media cache daemon.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load and validate configuration from environment variables
/// 3. Create the cache with the media codecs
/// 4. Load the snapshot if auto-persistence is enabled
/// 5. Run warmup
/// 6. Start background maintenance task
/// 7. Start HTTP server on configured port
/// 8. On SIGINT/SIGTERM stop maintenance and save a final snapshot
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "media_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Media Cache");

    let config = Config::from_env();
    config.validate().context("invalid configuration")?;
    info!(
        "Configuration loaded: max_memory={}B, default_expiration={}s, invalidation={}, warmup={}, port={}",
        config.max_memory_bytes,
        config.default_expiration_seconds,
        config.invalidation_strategy,
        config.warmup_strategy,
        config.server_port
    );

    let state = AppState::from_config(&config);
    let cache = state.cache.clone();

    match cache.initialize() {
        Ok(loaded) => info!("Cache initialized with {} entries", loaded),
        Err(e) => warn!("Starting with an empty cache: {}", e),
    }
    cache.warmup(&NoopWarmupSource);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let maintenance_handle = spawn_maintenance_task(
        cache.clone(),
        config.maintenance_interval(),
        config.persistence_interval(),
        shutdown_rx,
    );

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Admin API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    // Stop maintenance before the final save
    let _ = shutdown_tx.send(true);
    if let Err(e) = maintenance_handle.await {
        warn!("Maintenance task ended abnormally: {}", e);
    }

    let final_cache = cache.clone();
    match tokio::task::spawn_blocking(move || final_cache.shutdown()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Final snapshot failed: {}", e),
        Err(e) => error!("Shutdown task panicked: {}", e),
    }

    info!("Media cache shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
