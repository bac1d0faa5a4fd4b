//! In-process location store.
//!
//! Holds a scripted response that can be swapped at runtime, and counts how
//! often it was fetched. Used by tests and by embedders that already have the
//! records in memory.

use super::traits::LocationStore;
use crate::error::{MapCacheError, Result};
use crate::models::MapLocation;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Response {
    Records(Vec<MapLocation>),
    Unavailable,
    Malformed,
}

/// Store whose next answer is set by the caller.
#[derive(Debug)]
pub struct MemoryLocationStore {
    response: Mutex<Response>,
    latency: Mutex<Duration>,
    fetches: AtomicUsize,
}

impl MemoryLocationStore {
    pub fn new(records: Vec<MapLocation>) -> Self {
        Self {
            response: Mutex::new(Response::Records(records)),
            latency: Mutex::new(Duration::ZERO),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Start in the unavailable state.
    pub fn unavailable() -> Self {
        let store = Self::new(Vec::new());
        store.set_unavailable();
        store
    }

    /// Serve `records` on subsequent fetches.
    pub fn set_records(&self, records: Vec<MapLocation>) {
        self.set_response(Response::Records(records));
    }

    /// Fail subsequent fetches as if the backend were unreachable.
    pub fn set_unavailable(&self) {
        self.set_response(Response::Unavailable);
    }

    /// Fail subsequent fetches as if the backend returned garbage.
    pub fn set_malformed(&self) {
        self.set_response(Response::Malformed);
    }

    /// Delay every fetch by `latency` (tokio time, so paused clocks apply).
    pub fn set_latency(&self, latency: Duration) {
        if let Ok(mut guard) = self.latency.lock() {
            *guard = latency;
        }
    }

    /// Number of `find_all` calls started so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn set_response(&self, response: Response) {
        if let Ok(mut guard) = self.response.lock() {
            *guard = response;
        }
    }

    fn current(&self) -> Result<Response> {
        self.response
            .lock()
            .map(|guard| guard.clone())
            .map_err(|e| MapCacheError::Fetch {
                message: format!("memory store poisoned: {}", e),
                source: None,
            })
    }
}

impl Default for MemoryLocationStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl LocationStore for MemoryLocationStore {
    async fn find_all(&self) -> Result<Vec<MapLocation>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        // Snapshot the scripted answer before sleeping so a test can change
        // it mid-fetch without affecting the call already in flight.
        let response = self.current()?;
        let latency = self.latency.lock().map(|d| *d).unwrap_or_default();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        match response {
            Response::Records(records) => Ok(records),
            Response::Unavailable => Err(MapCacheError::Fetch {
                message: "memory store is unavailable".to_string(),
                source: None,
            }),
            Response::Malformed => Err(MapCacheError::Decode {
                message: "memory store returned malformed documents".to_string(),
                source: None,
            }),
        }
    }

    async fn ping(&self) -> Result<()> {
        match self.current()? {
            Response::Unavailable => Err(MapCacheError::Fetch {
                message: "memory store is unavailable".to_string(),
                source: None,
            }),
            _ => Ok(()),
        }
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
