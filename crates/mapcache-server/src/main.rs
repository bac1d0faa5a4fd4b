//! Mapcache Server - HTTP endpoint for cached map locations.
//!
//! Serves `GET /api/map` from an in-memory snapshot of the location
//! collection, refreshed in the background on a fixed interval.

mod handler;
mod import;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mapcache_core::{
    connect_store, CancellationToken, PeriodicRefresher, RefreshCoordinator, ServiceConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "mapcache-server")]
#[command(about = "HTTP server for cached map locations")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Storage backend URI (sqlite://<path>, a bare path, or http(s)://...)
    #[arg(long)]
    store_uri: Option<String>,

    /// Collection holding the location documents
    #[arg(long)]
    collection: Option<String>,

    /// Port to listen on (0 = auto-assign)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Seconds between background refreshes
    #[arg(long)]
    refresh_interval_secs: Option<u64>,

    /// Seconds before a backend fetch is abandoned
    #[arg(long)]
    fetch_timeout_secs: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the map endpoint (default)
    Serve,
    /// Replace the SQLite collection with locations from a JSON file
    Import {
        /// JSON array of location documents
        file: PathBuf,
    },
}

impl Args {
    /// Flags win over environment and `.env` values.
    fn apply_to(&self, config: &mut ServiceConfig) {
        if let Some(uri) = &self.store_uri {
            config.store_uri = uri.clone();
        }
        if let Some(collection) = &self.collection {
            config.collection = collection.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(secs) = self.refresh_interval_secs {
            config.refresh_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = self.fetch_timeout_secs {
            config.fetch_timeout = Duration::from_secs(secs);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging; RUST_LOG overrides --debug
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str()));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    let mut config = ServiceConfig::from_env()?;
    args.apply_to(&mut config);
    config.validate()?;

    match args.command {
        Some(Command::Import { file }) => {
            import::run_import(&config, &file)?;
            Ok(())
        }
        Some(Command::Serve) | None => serve(config).await,
    }
}

async fn serve(config: ServiceConfig) -> Result<()> {
    info!("Starting map cache server");

    // Fail before binding if the backend is unreachable
    let store = connect_store(&config).await?;

    let coordinator = Arc::new(RefreshCoordinator::new(store, config.fetch_timeout));
    let shutdown = CancellationToken::new();

    let refresher = PeriodicRefresher::new(Arc::clone(&coordinator), config.refresh_interval)
        .spawn(shutdown.clone());

    let (addr, server) =
        server::start_server(coordinator, &config.bind_addr(), shutdown.clone()).await?;

    // Intentional stdout so wrappers and tests can discover an auto-assigned port
    println!("MAP_PORT={}", addr.port());

    info!("Map cache server running on {}", addr);

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");
    shutdown.cancel();

    if let Err(e) = server.await {
        warn!("Server task ended abnormally: {}", e);
    }
    match refresher.await {
        Ok(summary) => info!(
            "Refresher finished: {} ticks, {} failed",
            summary.ticks, summary.failures
        ),
        Err(e) => warn!("Refresher task ended abnormally: {}", e),
    }

    Ok(())
}
