use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hardware_inventory::config::Config;
use hardware_inventory::db::SqliteStore;
use hardware_inventory::AppState;

#[derive(Parser, Debug)]
#[command(name = "hardware-inventory")]
#[command(author, version, about = "Hardware asset inventory backend", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "INVENTORY_CONFIG", default_value = "inventory.toml")]
    config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;

    // Initialize logging
    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting hardware-inventory v{}", env!("CARGO_PKG_VERSION"));

    // Ensure data directory exists
    std::fs::create_dir_all(&config.server.data_dir).with_context(|| {
        format!(
            "Failed to create data directory: {}",
            config.server.data_dir.display()
        )
    })?;

    // Initialize database
    let db = hardware_inventory::db::init(&config.server.data_dir).await?;
    let store = Arc::new(SqliteStore::new(db));

    // Ensure bootstrap admin user exists
    hardware_inventory::api::auth::ensure_admin_user(store.as_ref(), &config.auth).await?;

    let metrics_handle = hardware_inventory::api::metrics::init_metrics()?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, store).with_metrics(metrics_handle));

    let app = hardware_inventory::api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install signal handler");
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

    tracing::info!("Shutdown signal received");
}
