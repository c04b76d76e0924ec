use super::stats::SourceStats;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Periodically logs prefetch buffer occupancy for every source of a running merge.
pub struct MergeMonitor {
    sources: Vec<Arc<SourceStats>>,
    capacity: usize,
}

impl MergeMonitor {
    pub fn new(capacity: usize) -> Self {
        Self {
            sources: Vec::new(),
            capacity,
        }
    }

    pub fn register(&mut self, stats: Arc<SourceStats>) {
        self.sources.push(stats);
        debug!("Total monitored sources: {}", self.sources.len());
    }

    /// Spawns the reporting task. The caller aborts the handle when the merge ends.
    pub fn start(self, period: Duration) -> JoinHandle<()> {
        debug!("Starting merge monitor for {} sources", self.sources.len());
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                info!("Merge buffers:");
                for (index, stats) in self.sources.iter().enumerate() {
                    info!(
                        "source {}: {}/{} buffered, {} fetched, high water {}",
                        index,
                        stats.buffered(),
                        self.capacity,
                        stats.fetched(),
                        stats.high_water()
                    );
                }
            }
        })
    }
}
