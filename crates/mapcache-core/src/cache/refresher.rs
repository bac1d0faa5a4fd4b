//! Background task that refreshes the cache on a fixed period.

use super::coordinator::RefreshCoordinator;
use crate::cancel::CancellationToken;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

/// Outcome counts of a refresher run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub ticks: u64,
    pub failures: u64,
}

/// Periodic driver for [`RefreshCoordinator::refresh`].
///
/// The first tick fires one full interval after start. A failed tick is
/// logged and the loop carries on; only the cancellation token stops it.
pub struct PeriodicRefresher {
    coordinator: Arc<RefreshCoordinator>,
    interval: Duration,
}

impl PeriodicRefresher {
    pub fn new(coordinator: Arc<RefreshCoordinator>, interval: Duration) -> Self {
        Self {
            coordinator,
            interval,
        }
    }

    /// Run on the current runtime until `token` is cancelled.
    pub fn spawn(self, token: CancellationToken) -> JoinHandle<RefreshSummary> {
        tokio::spawn(self.run(token))
    }

    pub async fn run(self, token: CancellationToken) -> RefreshSummary {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        // A tick that overran (slow fetch) pushes the schedule back instead of bursting
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Starting periodic cache refresh every {:?}", self.interval);
        let mut summary = RefreshSummary::default();

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            summary.ticks += 1;
            if !self.tick().await {
                summary.failures += 1;
            }
        }

        info!(
            "Periodic cache refresh stopped after {} ticks ({} failed)",
            summary.ticks, summary.failures
        );
        summary
    }

    /// Perform a single refresh. Returns whether it succeeded.
    pub async fn tick(&self) -> bool {
        match self.coordinator.refresh().await {
            Ok(_) => true,
            Err(e) => {
                warn!("Periodic cache refresh failed, keeping previous data: {}", e);
                false
            }
        }
    }
}
