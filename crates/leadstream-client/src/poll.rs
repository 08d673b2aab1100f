//! Background refresh of the activity feed.

use crate::store::ActivityTreeStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Default interval between silent refreshes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Periodically reloads the feed until dropped.
///
/// Failures are logged by the store and never stop the schedule. The first
/// refresh happens one full interval after spawning.
pub struct Poller {
    handle: JoinHandle<()>,
}

impl Poller {
    pub fn spawn(store: Arc<ActivityTreeStore>, interval: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                tracing::debug!(lead = store.lead_id(), "background refresh");
                let _ = store.load_feed(true).await;
            }
        });
        Self { handle }
    }

    /// Stop refreshing. Equivalent to dropping the poller.
    pub fn stop(self) {}

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
