//! Refresh coordinator: the only code that reads or writes the cache store.
//!
//! Both the on-demand fill and the periodic refresh take the store lock
//! before touching the backend and keep it until the snapshot is settled.
//! Fetches are therefore totally ordered, and a reader never sees a snapshot
//! assembled from two fetches.
//!
//! Holding the lock across the backend call means one slow fetch blocks every
//! reader, including those that could have been served from cache. The fetch
//! timeout bounds how long that can last.

use super::snapshot::CacheStore;
use crate::error::{MapCacheError, Result};
use crate::models::MapLocation;
use crate::store::LocationStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Point-in-time view of the cache for status reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatus {
    pub populated: bool,
    pub record_count: usize,
    pub generation: u64,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub fetch_failures: u64,
}

/// Decides when to fetch and applies results to the cache store.
pub struct RefreshCoordinator {
    cache: CacheStore,
    store: Arc<dyn LocationStore>,
    fetch_timeout: Duration,
    fetch_failures: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new(store: Arc<dyn LocationStore>, fetch_timeout: Duration) -> Self {
        Self {
            cache: CacheStore::new(),
            store,
            fetch_timeout,
            fetch_failures: AtomicU64::new(0),
        }
    }

    /// Serve the current snapshot, filling it first if it was never populated.
    ///
    /// A failed fill leaves the cache untouched and returns the fetch error;
    /// the next request (or tick) will try again.
    pub async fn handle_request(&self) -> Result<Arc<[MapLocation]>> {
        let mut snapshot = self.cache.lock().await;

        if !snapshot.is_populated() {
            debug!("Cache empty, fetching from {}", self.store.describe());
            let records = self.fetch().await?;
            let count = records.len();
            let generation = snapshot.replace(records);
            info!("Cache updated (generation {}, {} records)", generation, count);
        }

        Ok(snapshot.get())
    }

    /// Fetch and replace unconditionally. Used by the periodic refresher.
    ///
    /// Returns the new generation. On failure the previous snapshot stays.
    pub async fn refresh(&self) -> Result<u64> {
        let mut snapshot = self.cache.lock().await;

        let records = self.fetch().await?;
        let count = records.len();
        let generation = snapshot.replace(records);
        info!("Cache updated (generation {}, {} records)", generation, count);
        Ok(generation)
    }

    /// Current cache state. Takes the lock but never fetches.
    pub async fn status(&self) -> CacheStatus {
        let snapshot = self.cache.lock().await;
        CacheStatus {
            populated: snapshot.is_populated(),
            record_count: snapshot.len(),
            generation: snapshot.generation(),
            refreshed_at: snapshot.refreshed_at(),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
        }
    }

    /// One backend call under a fresh timeout. Callers must hold the lock.
    async fn fetch(&self) -> Result<Vec<MapLocation>> {
        let result = match tokio::time::timeout(self.fetch_timeout, self.store.find_all()).await {
            Ok(result) => result,
            Err(_) => Err(MapCacheError::Timeout(self.fetch_timeout)),
        };

        if result.is_err() {
            self.fetch_failures.fetch_add(1, Ordering::Relaxed);
        }
        result
    }
}
