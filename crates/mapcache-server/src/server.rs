//! HTTP server implementation using Axum.

use crate::handler::{handle_health, handle_map};
use anyhow::Context;
use axum::{http::Method, routing::get, Router};
use mapcache_core::config::ServerConfig;
use mapcache_core::{CancellationToken, RefreshCoordinator};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Application state shared across handlers.
pub struct AppState {
    /// Sole gateway to the location cache
    pub coordinator: Arc<RefreshCoordinator>,
}

/// Build the router with all routes and layers.
pub fn build_router(coordinator: Arc<RefreshCoordinator>) -> Router {
    let state = Arc::new(AppState { coordinator });

    // The map is fetched by browser clients on other origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    Router::new()
        .route(ServerConfig::MAP_ROUTE, get(handle_map))
        .route(ServerConfig::HEALTH_ROUTE, get(handle_health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server on `bind_addr` (`host:port`).
///
/// Returns the bound address (useful when port=0) and the serving task, which
/// finishes once `shutdown` is cancelled and in-flight requests complete.
pub async fn start_server(
    coordinator: Arc<RefreshCoordinator>,
    bind_addr: &str,
    shutdown: CancellationToken,
) -> anyhow::Result<(SocketAddr, JoinHandle<()>)> {
    let app = build_router(coordinator);

    // Parse the address
    let addr: SocketAddr = bind_addr
        .parse()
        .with_context(|| format!("Invalid listen address {}", bind_addr))?;

    // Bind to the address
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    let handle = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await;
        if let Err(e) = result {
            error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, handle))
}
