//! Chronological merge of independently timestamped log sources.
//!
//! [`MergeEngine`] prefetches from every [`LogSource`] concurrently into bounded per-source
//! buffers and emits a single timestamp-ordered stream into a [`LogSink`]. [`merge_sync`] is
//! the blocking baseline over [`SyncLogSource`]s.

pub mod config;
pub mod entry;
pub mod error;
pub mod merge;
pub mod sinks;
pub mod sources;
pub mod test_utils;

pub use config::{MergeConfig, SourceErrorPolicy, DEFAULT_MAX_BUFFER_SIZE};
pub use entry::LogEntry;
pub use error::{MergeError, SinkError, SourceError};
pub use merge::{merge, merge_sync, MergeEngine, MergeSummary, SourceSummary};
pub use sinks::{ChannelSink, LogSink, PrinterSink};
pub use sources::{FileSource, LogSource, SyncLogSource, VecSource};
