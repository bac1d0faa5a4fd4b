//! Time-refreshed snapshot cache.
//!
//! - [`CacheStore`] owns the snapshot and the single lock guarding it
//! - [`RefreshCoordinator`] fills the snapshot on demand and on refresh
//! - [`PeriodicRefresher`] drives refreshes on a fixed interval

mod coordinator;
mod refresher;
mod snapshot;

pub use coordinator::{CacheStatus, RefreshCoordinator};
pub use refresher::{PeriodicRefresher, RefreshSummary};
pub use snapshot::{CacheStore, Snapshot};
