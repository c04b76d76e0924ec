use crate::error::MergeError;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters shared between a source's fill controller and the merge driver.
#[derive(Debug, Default)]
pub struct SourceStats {
    fetched: AtomicU64,
    emitted: AtomicU64,
    rearms: AtomicU64,
    buffered: AtomicUsize,
    high_water: AtomicUsize,
}

impl SourceStats {
    /// Called by the fill controller right before a result enters the buffer.
    pub(crate) fn record_buffered(&self) {
        let now = self.buffered.fetch_add(1, Ordering::AcqRel) + 1;
        self.high_water.fetch_max(now, Ordering::AcqRel);
    }

    pub(crate) fn record_fetched(&self) {
        self.fetched.fetch_add(1, Ordering::Relaxed);
    }

    /// Called by the driver after taking a result out of the buffer.
    pub(crate) fn record_consumed(&self) {
        self.buffered.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn record_emitted(&self) {
        self.emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rearm(&self) {
        self.rearms.fetch_add(1, Ordering::Relaxed);
    }

    pub fn buffered(&self) -> usize {
        self.buffered.load(Ordering::Acquire)
    }

    pub fn high_water(&self) -> usize {
        self.high_water.load(Ordering::Acquire)
    }

    pub fn fetched(&self) -> u64 {
        self.fetched.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self, source_index: usize) -> SourceSummary {
        SourceSummary {
            source_index,
            fetched: self.fetched(),
            emitted: self.emitted.load(Ordering::Relaxed),
            rearms: self.rearms.load(Ordering::Relaxed),
            buffer_high_water: self.high_water(),
        }
    }
}

/// Per-source counters at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSummary {
    pub source_index: usize,
    /// Entries obtained from the source, including a peeked seed entry.
    pub fetched: u64,
    pub emitted: u64,
    /// How many times the fill controller was restarted after stopping on a full buffer.
    pub rearms: u64,
    /// Largest number of results the prefetch buffer held at once.
    pub buffer_high_water: usize,
}

/// Outcome of a completed merge.
#[derive(Debug, Default)]
pub struct MergeSummary {
    pub emitted: u64,
    pub sources: Vec<SourceSummary>,
    /// Fetch failures that retired a source without aborting the run.
    pub source_errors: Vec<MergeError>,
}

impl MergeSummary {
    pub fn failed_sources(&self) -> Vec<usize> {
        self.source_errors
            .iter()
            .filter_map(|e| match e {
                MergeError::SourceFetch { source_index, .. } => Some(*source_index),
                _ => None,
            })
            .collect()
    }
}
