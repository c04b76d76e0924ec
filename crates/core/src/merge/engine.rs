//! Bounded-prefetch asynchronous k-way merge.
//!
//! Every source gets a fill controller task that fetches ahead into a bounded buffer. The
//! driver keeps one candidate per source in a [`Frontier`] and repeatedly emits the oldest,
//! replacing it with the next buffered entry of the same source.

use super::fill_controller::{FetchResult, FillController};
use super::frontier::{Frontier, FrontierEntry};
use super::monitor::MergeMonitor;
use super::stats::{MergeSummary, SourceStats};
use crate::config::{MergeConfig, SourceErrorPolicy};
use crate::entry::LogEntry;
use crate::error::{MergeError, Result, SourceError};
use crate::sinks::LogSink;
use crate::sources::LogSource;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePhase {
    Seeding,
    Draining,
    Done,
}

/// Merges sources that each yield entries in timestamp order into one ordered stream.
pub struct MergeEngine<S: LogSource> {
    sources: Vec<S>,
    config: MergeConfig,
}

impl<S: LogSource> MergeEngine<S> {
    pub fn new(sources: Vec<S>) -> Self {
        MergeEngine::with_config(sources, MergeConfig::default())
    }

    pub fn with_config(sources: Vec<S>, config: MergeConfig) -> Self {
        MergeEngine { sources, config }
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Runs the merge to completion, emitting into `sink`.
    ///
    /// Source indices follow the order of the sources passed to the constructor. On any fatal
    /// error every fill task is aborted and joined before the error is returned.
    pub async fn run<K>(self, mut sink: K) -> Result<MergeSummary>
    where
        K: LogSink<Payload = S::Payload>,
    {
        self.config.validate()?;
        info!(
            "Starting async merge of {} sources, buffer size {}",
            self.sources.len(),
            self.config.max_buffer_size
        );

        let mut driver = MergeDriver::start(self.sources, &self.config);
        let result = driver.drive(&mut sink).await;
        driver.shutdown().await;

        let summary = result?;
        info!("Async merge complete, {} entries emitted", summary.emitted);
        Ok(summary)
    }
}

/// Convenience wrapper around [`MergeEngine::run`].
pub async fn merge<S, K>(sources: Vec<S>, sink: K, config: MergeConfig) -> Result<MergeSummary>
where
    S: LogSource,
    K: LogSink<Payload = S::Payload>,
{
    MergeEngine::with_config(sources, config).run(sink).await
}

/// Per-source state owned by the driver.
struct SourceLane<S: LogSource> {
    buffer: mpsc::Receiver<FetchResult<S::Payload>>,
    controller: FillController<S>,
    stats: Arc<SourceStats>,
    seed: Option<LogEntry<S::Payload>>,
    last_timestamp: Option<DateTime<Utc>>,
    exhausted: bool,
}

struct MergeDriver<S: LogSource> {
    lanes: Vec<SourceLane<S>>,
    frontier: Frontier<S::Payload>,
    policy: SourceErrorPolicy,
    source_errors: Vec<MergeError>,
    emitted: u64,
    phase: MergePhase,
    monitor: Option<JoinHandle<()>>,
}

impl<S: LogSource> MergeDriver<S> {
    /// Starts a fill controller per source. Seeding happens in [`drive`](Self::drive).
    fn start(sources: Vec<S>, config: &MergeConfig) -> Self {
        let mut monitor = MergeMonitor::new(config.max_buffer_size);
        let lanes: Vec<_> = sources
            .into_iter()
            .enumerate()
            .map(|(index, source)| {
                let seed = source.peek_last().cloned();
                let stats = Arc::new(SourceStats::default());
                monitor.register(Arc::clone(&stats));

                let (sender, buffer) = mpsc::channel(config.max_buffer_size);
                let controller = FillController::start(index, source, sender, Arc::clone(&stats));

                SourceLane {
                    buffer,
                    controller,
                    stats,
                    seed,
                    last_timestamp: None,
                    exhausted: false,
                }
            })
            .collect();

        let monitor = config.monitor_interval.map(|period| monitor.start(period));

        MergeDriver {
            frontier: Frontier::with_capacity(lanes.len()),
            lanes,
            policy: config.source_error_policy,
            source_errors: Vec::new(),
            emitted: 0,
            phase: MergePhase::Seeding,
            monitor,
        }
    }

    async fn drive<K>(&mut self, sink: &mut K) -> Result<MergeSummary>
    where
        K: LogSink<Payload = S::Payload>,
    {
        self.seed().await?;
        self.transition(MergePhase::Draining);

        while let Some(FrontierEntry {
            source_index,
            entry,
        }) = self.frontier.extract_minimum()
        {
            sink.emit(entry)?;
            self.emitted += 1;
            self.lanes[source_index].stats.record_emitted();

            if let Some(next) = self.next_entry(source_index).await? {
                self.frontier.insert(source_index, next);
            }
        }

        debug_assert!(self.lanes.iter().all(|lane| lane.exhausted));
        self.transition(MergePhase::Done);
        sink.complete()?;

        Ok(MergeSummary {
            emitted: self.emitted,
            sources: self
                .lanes
                .iter()
                .enumerate()
                .map(|(index, lane)| lane.stats.snapshot(index))
                .collect(),
            source_errors: std::mem::take(&mut self.source_errors),
        })
    }

    async fn seed(&mut self) -> Result<()> {
        for index in 0..self.lanes.len() {
            let first = match self.lanes[index].seed.take() {
                Some(peeked) => {
                    self.lanes[index].stats.record_fetched();
                    self.check_order(index, &peeked)?;
                    Some(peeked)
                }
                None => self.next_entry(index).await?,
            };

            match first {
                Some(entry) => self.frontier.insert(index, entry),
                None => debug!("Source {} is empty", index),
            }
        }
        debug!("Seeded frontier with {} sources", self.frontier.len());
        Ok(())
    }

    /// Takes the next entry of `index` out of its buffer.
    ///
    /// Suspends while the buffer is empty and the source is still live. Returns `None` only once
    /// the source is exhausted: its buffer closed after end of stream, or it failed.
    async fn next_entry(&mut self, index: usize) -> Result<Option<LogEntry<S::Payload>>> {
        let lane = &mut self.lanes[index];
        if lane.exhausted {
            return Ok(None);
        }

        let received = loop {
            let SourceLane {
                buffer, controller, ..
            } = &mut *lane;

            match controller.handle_mut() {
                Some(handle) => {
                    tokio::select! {
                        biased;
                        received = buffer.recv() => break received,
                        // The fill task stopped while we wait on an empty buffer: re-arm it.
                        joined = handle => controller.on_stopped(joined)?,
                    }
                }
                None => break buffer.recv().await,
            }
        };

        match received {
            Some(Ok(entry)) => {
                lane.stats.record_consumed();
                lane.controller.rearm_if_idle().await?;
                self.check_order(index, &entry)?;
                Ok(Some(entry))
            }
            Some(Err(error)) => {
                lane.stats.record_consumed();
                lane.exhausted = true;
                lane.buffer.close();
                lane.controller.retire().await?;
                self.on_source_error(index, error)?;
                Ok(None)
            }
            None => {
                lane.exhausted = true;
                lane.controller.retire().await?;
                debug!("Source {} exhausted", index);
                Ok(None)
            }
        }
    }

    fn check_order(&mut self, index: usize, entry: &LogEntry<S::Payload>) -> Result<()> {
        let lane = &mut self.lanes[index];
        if let Some(previous) = lane.last_timestamp {
            if entry.timestamp < previous {
                return Err(MergeError::OrderingViolation {
                    source_index: index,
                    previous,
                    found: entry.timestamp,
                });
            }
        }
        lane.last_timestamp = Some(entry.timestamp);
        Ok(())
    }

    fn on_source_error(&mut self, index: usize, error: SourceError) -> Result<()> {
        let error = MergeError::SourceFetch {
            source_index: index,
            error,
        };
        match self.policy {
            SourceErrorPolicy::Continue => {
                warn!("Retiring source {}: {}", index, error);
                self.source_errors.push(error);
                Ok(())
            }
            SourceErrorPolicy::Abort => Err(error),
        }
    }

    fn transition(&mut self, phase: MergePhase) {
        debug!("Merge phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    /// Stops the monitor and joins every fill task still around.
    async fn shutdown(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            monitor.abort();
        }
        for lane in &mut self.lanes {
            lane.buffer.close();
            lane.controller.shutdown().await;
        }
    }
}
