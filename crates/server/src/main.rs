use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dhtinfo_core::{
    load_config, validate_config, BtdiggFetcher, CacheOrchestrator, FreshnessPolicy,
    RecordStore, S3Store, SqliteStore, StoreBackend, UpstreamFetcher,
};
use dhtinfo_server::{api::create_router, state::AppState};

/// How long shutdown waits for background refreshes to finish
const REFRESH_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("DHTINFO_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Max age: {}s", config.cache.max_age_secs);
    info!("Store backend: {:?}", config.store.backend);

    // Create record store
    let store: Arc<dyn RecordStore> = match config.store.backend {
        StoreBackend::Sqlite => {
            info!("Database path: {:?}", config.store.sqlite.path);
            Arc::new(
                SqliteStore::new(&config.store.sqlite.path)
                    .context("Failed to create SQLite store")?,
            )
        }
        StoreBackend::S3 => {
            let s3_config = config
                .store
                .s3
                .as_ref()
                .context("S3 backend selected but no [store.s3] config provided")?;
            info!("Using S3 bucket {}", s3_config.bucket);
            Arc::new(S3Store::new(s3_config).await)
        }
    };
    info!("Record store initialized: {}", store.name());

    // Create upstream fetcher
    let fetcher: Arc<dyn UpstreamFetcher> = Arc::new(
        BtdiggFetcher::new(config.upstream.clone()).context("Failed to create upstream fetcher")?,
    );
    match config.upstream.proxy() {
        Some(proxy) => info!("Upstream {} via proxy {}", config.upstream.base_url, proxy),
        None => info!("Upstream {} without proxy", config.upstream.base_url),
    }

    // Create orchestrator
    let orchestrator = Arc::new(CacheOrchestrator::new(
        store,
        fetcher,
        FreshnessPolicy::new(config.cache.max_age()),
    ));

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), Arc::clone(&orchestrator)));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    info!(
        "Waiting for {} background refreshes",
        orchestrator.refreshes_in_flight()
    );
    if orchestrator.drain(REFRESH_DRAIN_TIMEOUT).await {
        info!("Background refreshes finished");
    } else {
        warn!("Background refreshes still running, exiting anyway");
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
