use crate::entry::LogEntry;
use crate::error::SourceError;
use std::future::Future;

/// An independent producer of entries in non-decreasing timestamp order.
///
/// The async merge moves each source into its own fill task, hence the `Send + 'static` bound.
pub trait LogSource: Send + 'static {
    type Payload: Send + Clone + 'static;

    /// An entry the source has already loaded and will not hand out through
    /// [`fetch_next`](Self::fetch_next).
    ///
    /// Consulted once, before the first fetch. Sources that load lazily return `None`.
    fn peek_last(&self) -> Option<&LogEntry<Self::Payload>>;

    /// Resolves to the next entry, or `None` once the source is exhausted.
    ///
    /// After returning `None` the source must keep returning `None`.
    fn fetch_next(
        &mut self,
    ) -> impl Future<Output = Result<Option<LogEntry<Self::Payload>>, SourceError>> + Send;
}

/// Blocking counterpart of [`LogSource`] used by the synchronous baseline merge.
pub trait SyncLogSource {
    type Payload;

    fn pop(&mut self) -> Option<LogEntry<Self::Payload>>;
}
