//! Periodic statistics emission.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::observability::stats::Stats;

/// Logs a [`Stats`] snapshot on a fixed interval until shutdown.
pub struct StatsReporter {
    stats: Arc<Stats>,
    interval: Duration,
}

impl StatsReporter {
    pub fn new(stats: Arc<Stats>, interval: Duration) -> Self {
        Self { stats, interval }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::debug!(interval = ?self.interval, "Statistics reporter starting");

        // First tick after one full interval, not at startup.
        let start = time::Instant::now() + self.interval;
        let mut ticker = time::interval_at(start, self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.stats.snapshot().log();
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Statistics reporter received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
