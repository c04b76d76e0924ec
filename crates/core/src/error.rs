use chrono::{DateTime, Utc};

/// A fetch against a log source failed.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed entry at line {line}: {message}")]
    Malformed { line: usize, message: String },

    #[error("{0}")]
    Other(String),
}

impl SourceError {
    pub fn other(message: impl Into<String>) -> Self {
        SourceError::Other(message.into())
    }
}

/// The sink refused an entry or the completion signal.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sink is closed")]
    Closed,

    #[error("{0}")]
    Other(String),
}

/// Errors surfaced by the merge engines.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// Fetching from a source failed; the source is treated as exhausted.
    #[error("source {source_index} failed to fetch: {error}")]
    SourceFetch {
        source_index: usize,
        #[source]
        error: SourceError,
    },

    /// A source produced an entry older than one it had already produced.
    #[error(
        "source {source_index} went back in time: {found} follows {previous}"
    )]
    OrderingViolation {
        source_index: usize,
        previous: DateTime<Utc>,
        found: DateTime<Utc>,
    },

    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// A fill controller task panicked or was cancelled unexpectedly.
    #[error("fill controller for source {source_index} failed: {message}")]
    TaskFailed { source_index: usize, message: String },
}

pub type Result<T, E = MergeError> = std::result::Result<T, E>;
