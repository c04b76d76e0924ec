use crate::entry::LogEntry;
use crate::error::SinkError;
use crate::sinks::LogSink;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Records everything it receives so tests can inspect the merged output.
#[derive(Clone)]
pub struct CollectingSink<T> {
    pub results: Arc<Mutex<Vec<LogEntry<T>>>>,
    pub completions: Arc<Mutex<usize>>,
    /// Number of `emit` calls that arrived after `complete`.
    pub late_emits: Arc<Mutex<usize>>,
}

impl<T> CollectingSink<T> {
    pub fn new() -> Self {
        CollectingSink {
            results: Arc::new(Mutex::new(Vec::new())),
            completions: Arc::new(Mutex::new(0)),
            late_emits: Arc::new(Mutex::new(0)),
        }
    }

    pub fn completions(&self) -> usize {
        self.completions.lock().map(|c| *c).unwrap_or_default()
    }

    pub fn late_emits(&self) -> usize {
        self.late_emits.lock().map(|c| *c).unwrap_or_default()
    }

    pub fn timestamps_millis(&self) -> Vec<i64> {
        self.results
            .lock()
            .map(|results| results.iter().map(LogEntry::timestamp_millis).collect())
            .unwrap_or_default()
    }
}

impl<T: Clone> CollectingSink<T> {
    pub fn payloads(&self) -> Vec<T> {
        self.results
            .lock()
            .map(|results| results.iter().map(|e| e.payload.clone()).collect())
            .unwrap_or_default()
    }
}

impl<T> Default for CollectingSink<T> {
    fn default() -> Self {
        CollectingSink::new()
    }
}

impl<T> LogSink for CollectingSink<T> {
    type Payload = T;

    fn emit(&mut self, entry: LogEntry<T>) -> Result<(), SinkError> {
        if self.completions() > 0 {
            if let Ok(mut late) = self.late_emits.lock() {
                *late += 1;
            }
        }
        if let Ok(mut results) = self.results.lock() {
            results.push(entry);
            debug!("CollectingSink stored entry {}", results.len());
        }
        Ok(())
    }

    fn complete(&mut self) -> Result<(), SinkError> {
        if let Ok(mut completions) = self.completions.lock() {
            *completions += 1;
        }
        debug!("CollectingSink completed");
        Ok(())
    }
}
