//! Storage backend trait.

use crate::error::Result;
use crate::models::MapLocation;
use async_trait::async_trait;

/// Authoritative source of map locations.
///
/// Implementations are expected to be idempotent and side-effect free: the
/// cache may call `find_all` at any time, from any task, and treats every
/// call as a complete replacement for what it held before.
#[async_trait]
pub trait LocationStore: Send + Sync {
    /// Fetch the complete record set, in the backend's natural order.
    ///
    /// Unbounded on its own; callers apply their own timeout.
    async fn find_all(&self) -> Result<Vec<MapLocation>>;

    /// Check that the backend is reachable and the collection exists.
    async fn ping(&self) -> Result<()>;

    /// Human-readable description for logs.
    fn describe(&self) -> String;
}
