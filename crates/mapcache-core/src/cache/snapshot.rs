//! Cache store: the current snapshot behind one exclusive lock.

use crate::models::MapLocation;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Records as of the last successful fetch.
///
/// Only reachable through [`CacheStore::lock`], so every read and every
/// replacement happens with the lock held.
#[derive(Debug)]
pub struct Snapshot {
    records: Arc<[MapLocation]>,
    generation: u64,
    refreshed_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    fn new() -> Self {
        Self {
            records: Arc::from(Vec::new()),
            generation: 0,
            refreshed_at: None,
        }
    }

    /// Shared view of the current records. Cheap; the slice is never mutated.
    pub fn get(&self) -> Arc<[MapLocation]> {
        Arc::clone(&self.records)
    }

    /// Swap in a complete new record set, returning the new generation.
    pub fn replace(&mut self, records: Vec<MapLocation>) -> u64 {
        self.records = Arc::from(records);
        self.generation += 1;
        self.refreshed_at = Some(Utc::now());
        self.generation
    }

    /// True once any fetch has succeeded, even one that returned no records.
    pub fn is_populated(&self) -> bool {
        self.generation > 0
    }

    /// Number of successful replacements so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Owner of the snapshot and its lock.
///
/// There is no reader/writer split: readers and the refresher take the same
/// lock. `tokio::sync::Mutex` queues waiters in FIFO order and may be held
/// across the backend call.
#[derive(Debug)]
pub struct CacheStore {
    snapshot: Mutex<Snapshot>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self {
            snapshot: Mutex::new(Snapshot::new()),
        }
    }

    /// Acquire the exclusive lock. Released when the guard drops.
    pub async fn lock(&self) -> MutexGuard<'_, Snapshot> {
        self.snapshot.lock().await
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}
