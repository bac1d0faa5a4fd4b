//! Storage backends for map locations.
//!
//! The cache only depends on the [`LocationStore`] trait. Concrete backends:
//! - SQLite document tables (`sqlite://<path>` or a bare path)
//! - HTTP document endpoints (`http://` / `https://`)
//! - an in-memory store for tests and embedding

mod http;
mod memory;
mod sqlite;
mod traits;

pub use http::HttpLocationStore;
pub use memory::MemoryLocationStore;
pub use sqlite::{write_collection, SqliteLocationStore};
pub use traits::LocationStore;

use crate::config::{ServiceConfig, StoreConfig};
use crate::error::{MapCacheError, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Backend a store URI points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// SQLite database file
    Sqlite(PathBuf),
    /// Base URL of an HTTP document endpoint
    Http(String),
}

/// Resolve a store URI to a backend location.
///
/// `http://` and `https://` URIs are HTTP stores. `sqlite://<path>` and bare
/// paths are SQLite files. Any other scheme is a `Config` error.
pub fn parse_store_uri(uri: &str) -> Result<StoreLocation> {
    if uri.is_empty() {
        return Err(MapCacheError::Config {
            message: "store URI is empty".to_string(),
        });
    }

    if uri.starts_with("http://") || uri.starts_with("https://") {
        return Ok(StoreLocation::Http(uri.to_string()));
    }

    let path = uri.strip_prefix(StoreConfig::SQLITE_SCHEME).unwrap_or(uri);
    if path.is_empty() || path.contains("://") {
        return Err(MapCacheError::Config {
            message: format!("unsupported store URI: {}", uri),
        });
    }
    Ok(StoreLocation::Sqlite(PathBuf::from(path)))
}

/// Build the backend named by `config.store_uri` without contacting it.
pub fn open_store(config: &ServiceConfig) -> Result<Arc<dyn LocationStore>> {
    let store: Arc<dyn LocationStore> = match parse_store_uri(&config.store_uri)? {
        StoreLocation::Http(base) => Arc::new(HttpLocationStore::new(&base, &config.collection)?),
        StoreLocation::Sqlite(path) => Arc::new(SqliteLocationStore::open(path, &config.collection)?),
    };
    Ok(store)
}

/// Open the configured backend and verify it answers.
///
/// Any failure here is a [`MapCacheError::Startup`] (or `Config`) so the
/// process can refuse to start serving.
pub async fn connect_store(config: &ServiceConfig) -> Result<Arc<dyn LocationStore>> {
    let store = open_store(config)?;

    match tokio::time::timeout(config.fetch_timeout, store.ping()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) if e.is_fatal() => return Err(e),
        Ok(Err(e)) => {
            return Err(MapCacheError::Startup {
                message: format!("{}: {}", store.describe(), e),
            })
        }
        Err(_) => {
            return Err(MapCacheError::Startup {
                message: format!(
                    "{}: no answer within {:?}",
                    store.describe(),
                    config.fetch_timeout
                ),
            })
        }
    }

    info!("Connected to {}", store.describe());
    Ok(store)
}
