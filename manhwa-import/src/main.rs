//! manhwa-import - Generated Asset Import Microservice
//!
//! Watches the platform's object store bucket for generated manhwa
//! payloads, imports new titles into the catalog, and relocates
//! handled payloads into the archive prefix. Runs the scan on a fixed
//! interval and exposes a small administrative HTTP surface.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use manhwa_import::catalog::SqliteCatalog;
use manhwa_import::config::ImportConfig;
use manhwa_import::services::{ImportScheduler, ImportService};
use manhwa_import::storage::S3ObjectStore;
use manhwa_import::AppState;

#[derive(Debug, Parser)]
#[command(name = "manhwa-import", about = "Generated manhwa import service")]
struct Args {
    /// Path to a TOML config file
    #[arg(long, env = "MANHWA_IMPORT_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address override, e.g. 0.0.0.0:8090
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = ImportConfig::resolve(args.config.as_deref())?;
    let bind = args.bind.unwrap_or_else(|| config.bind.clone());

    info!("Starting manhwa-import microservice");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        endpoint = %config.object_store.endpoint,
        bucket = %config.object_store.bucket,
        "Object store"
    );
    info!("Catalog database: {}", config.catalog_db.display());

    let catalog = Arc::new(SqliteCatalog::open(&config.catalog_db).await?);
    let store = Arc::new(S3ObjectStore::new(config.object_store.clone())?);

    let import = Arc::new(ImportService::new(
        store,
        catalog,
        config.source_prefix.clone(),
        config.archive_prefix.clone(),
    ));
    let scheduler = Arc::new(ImportScheduler::new(
        Arc::clone(&import),
        config.scheduler.clone(),
    ));
    scheduler.start().await;

    let state = AppState::new(import, Arc::clone(&scheduler));
    let app = manhwa_import::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("Listening on http://{}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cancel the periodic task and wait for it before exiting
    scheduler.stop().await;
    info!("manhwa-import shut down");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
