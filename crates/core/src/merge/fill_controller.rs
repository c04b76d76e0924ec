use super::stats::SourceStats;
use crate::entry::LogEntry;
use crate::error::{MergeError, SourceError};
use crate::sources::LogSource;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, warn};

/// One slot of a prefetch buffer: a fetched entry or the failure that ended the source.
pub(crate) type FetchResult<T> = Result<LogEntry<T>, SourceError>;

pub(crate) type BufferSender<T> = mpsc::Sender<FetchResult<T>>;

/// Why a fill task returned.
pub(crate) enum FillStop<S: LogSource> {
    /// The buffer had no free slot. The source and the buffer's sending half are handed back
    /// so the controller can be re-armed once the driver has consumed something.
    Full {
        source: S,
        sender: BufferSender<S::Payload>,
    },
    /// End of stream, a fetch failure, or the driver dropped the buffer. The sender is gone,
    /// so the buffer closes once drained.
    Finished,
}

/// Owns the task that keeps one source's prefetch buffer topped up.
///
/// At most one fill task exists per controller. A finished handle is the idle flag: the task
/// only returns when the buffer is full or the source is done.
pub(crate) struct FillController<S: LogSource> {
    source_index: usize,
    handle: Option<JoinHandle<FillStop<S>>>,
    stats: Arc<SourceStats>,
}

impl<S: LogSource> FillController<S> {
    pub(crate) fn start(
        source_index: usize,
        source: S,
        sender: BufferSender<S::Payload>,
        stats: Arc<SourceStats>,
    ) -> Self {
        let mut controller = FillController {
            source_index,
            handle: None,
            stats,
        };
        controller.spawn(source, sender);
        controller
    }

    fn spawn(&mut self, source: S, sender: BufferSender<S::Payload>) {
        let stats = Arc::clone(&self.stats);
        self.handle = Some(tokio::spawn(fill(self.source_index, source, sender, stats)));
    }

    pub(crate) fn handle_mut(&mut self) -> Option<&mut JoinHandle<FillStop<S>>> {
        self.handle.as_mut()
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| handle.is_finished())
    }

    /// Consumes the result of a fill task that has returned, restarting it if it stopped on a
    /// full buffer that now has room.
    pub(crate) fn on_stopped(
        &mut self,
        joined: Result<FillStop<S>, JoinError>,
    ) -> Result<(), MergeError> {
        self.handle = None;
        match joined {
            Ok(FillStop::Full { source, sender }) => {
                debug!("Re-arming fill controller {}", self.source_index);
                self.stats.record_rearm();
                self.spawn(source, sender);
                Ok(())
            }
            Ok(FillStop::Finished) => Ok(()),
            Err(e) => {
                error!("Fill controller {} failed: {:?}", self.source_index, e);
                Err(MergeError::TaskFailed {
                    source_index: self.source_index,
                    message: e.to_string(),
                })
            }
        }
    }

    /// Restarts the fill task if it has gone idle. Never waits on an in-flight fetch.
    pub(crate) async fn rearm_if_idle(&mut self) -> Result<(), MergeError> {
        if !self.is_idle() {
            return Ok(());
        }
        match self.handle.take() {
            Some(handle) => {
                let joined = handle.await;
                self.on_stopped(joined)
            }
            None => Ok(()),
        }
    }

    /// Joins the fill task of a source whose buffer has closed.
    pub(crate) async fn retire(&mut self) -> Result<(), MergeError> {
        match self.handle.take() {
            Some(handle) => {
                let joined = handle.await;
                match joined {
                    Ok(FillStop::Full { .. }) => {
                        warn!(
                            "Fill controller {} parked on a full buffer after retirement",
                            self.source_index
                        );
                        Ok(())
                    }
                    other => self.on_stopped(other),
                }
            }
            None => Ok(()),
        }
    }

    /// Aborts the fill task, if any, and waits for it to go away.
    pub(crate) async fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            if let Err(e) = handle.await {
                if e.is_panic() {
                    error!("Fill controller {} panicked: {:?}", self.source_index, e);
                }
            }
        }
    }
}

impl<S: LogSource> Drop for FillController<S> {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }
}

/// Fetches from `source` one entry at a time until the buffer is full or the source ends.
///
/// A slot is reserved before each fetch is issued, so the buffer bound counts in-flight
/// fetches as well as resolved ones.
async fn fill<S: LogSource>(
    source_index: usize,
    mut source: S,
    mut sender: BufferSender<S::Payload>,
    stats: Arc<SourceStats>,
) -> FillStop<S> {
    debug!("Fill controller {} starting", source_index);

    loop {
        let permit = match sender.try_reserve_owned() {
            Ok(permit) => permit,
            Err(TrySendError::Full(sender)) => {
                debug!("Fill controller {} idle, buffer full", source_index);
                return FillStop::Full { source, sender };
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Fill controller {} stopping, buffer dropped", source_index);
                return FillStop::Finished;
            }
        };

        match source.fetch_next().await {
            Ok(Some(entry)) => {
                stats.record_fetched();
                stats.record_buffered();
                sender = permit.send(Ok(entry));
            }
            Ok(None) => {
                debug!("Fill controller {} reached end of stream", source_index);
                return FillStop::Finished;
            }
            Err(e) => {
                warn!("Source {} fetch failed: {}", source_index, e);
                stats.record_buffered();
                permit.send(Err(e));
                return FillStop::Finished;
            }
        }
    }
}
