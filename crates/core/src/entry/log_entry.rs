use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single timestamped record produced by a log source.
///
/// Entries are ordered by `timestamp` only; the payload is opaque to the merge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry<T> {
    pub timestamp: DateTime<Utc>,
    pub payload: T,
}

impl<T: fmt::Display> fmt::Display for LogEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.timestamp.to_rfc3339(), self.payload)
    }
}

impl<T> LogEntry<T> {
    pub fn new(timestamp: DateTime<Utc>, payload: T) -> Self {
        LogEntry { timestamp, payload }
    }

    /// Builds an entry from a Unix timestamp in milliseconds.
    ///
    /// Returns `None` when `millis` is outside the range `DateTime<Utc>` can represent.
    pub fn at_millis(millis: i64, payload: T) -> Option<Self> {
        let timestamp = Utc.timestamp_millis_opt(millis).single()?;
        Some(LogEntry { timestamp, payload })
    }

    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}
