//! Mapcache Core - cached access to a collection of map locations.
//!
//! The crate keeps one in-memory snapshot of every location in a document
//! store, fills it on first use, and refreshes it from a background task.
//! It has no HTTP surface of its own; see the `mapcache-server` crate.
//!
//! # Example
//!
//! ```rust,ignore
//! use mapcache_core::{connect_store, PeriodicRefresher, RefreshCoordinator, ServiceConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> mapcache_core::Result<()> {
//!     let config = ServiceConfig::from_env()?;
//!     config.validate()?;
//!
//!     let store = connect_store(&config).await?;
//!     let coordinator = Arc::new(RefreshCoordinator::new(store, config.fetch_timeout));
//!     let token = mapcache_core::CancellationToken::new();
//!     PeriodicRefresher::new(coordinator.clone(), config.refresh_interval).spawn(token);
//!
//!     let locations = coordinator.handle_request().await?;
//!     println!("Serving {} locations", locations.len());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod cancel;
pub mod config;
pub mod error;
pub mod models;
pub mod store;

// Re-export commonly used types
pub use cache::{
    CacheStatus, CacheStore, PeriodicRefresher, RefreshCoordinator, RefreshSummary, Snapshot,
};
pub use cancel::CancellationToken;
pub use config::ServiceConfig;
pub use error::{MapCacheError, Result};
pub use models::{Coordinates, MapLocation};
pub use store::{
    connect_store, open_store, parse_store_uri, write_collection, HttpLocationStore,
    LocationStore, MemoryLocationStore, SqliteLocationStore, StoreLocation,
};
