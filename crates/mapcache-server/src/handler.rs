//! HTTP request handlers.

use crate::server::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use mapcache_core::{MapCacheError, MapLocation};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

/// Health check endpoint with cache state.
///
/// Never triggers a fetch, so it stays cheap even while the cache is cold.
pub async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cache = state.coordinator.status().await;
    Json(json!({"status": "ok", "cache": cache}))
}

/// `GET /api/map`: every cached location as a JSON array.
pub async fn handle_map(State(state): State<Arc<AppState>>) -> Response {
    let records = match state.coordinator.handle_request().await {
        Ok(records) => records,
        Err(e) => {
            error!("Map request failed: {}", e);
            return error_response(&e);
        }
    };

    match encode_locations(&records) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Map response encoding failed: {}", e);
            error_response(&e)
        }
    }
}

/// Serialize locations as a newline-terminated JSON array.
pub fn encode_locations(records: &[MapLocation]) -> mapcache_core::Result<Vec<u8>> {
    let mut body = serde_json::to_vec(records).map_err(MapCacheError::encode)?;
    body.push(b'\n');
    Ok(body)
}

/// Plain-text 500 carrying only the client-safe part of the error.
fn error_response(err: &MapCacheError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        format!("{}\n", err.public_message()),
    )
        .into_response()
}
