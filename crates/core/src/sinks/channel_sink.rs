use crate::entry::LogEntry;
use crate::error::SinkError;
use crate::sinks::LogSink;
use crossbeam_channel::{Receiver, Sender};
use tracing::debug;

/// Forwards merged entries to a consumer on another thread.
///
/// `complete` drops the sender, so the receiving side sees a disconnect once it has drained
/// every entry.
///
/// `emit` on a full [`bounded`](Self::bounded) channel blocks the calling thread, which during
/// an async merge is a tokio worker. If the receiver is drained by a task on the same runtime,
/// a current-thread runtime deadlocks and a multi-thread one loses a worker. Drain a bounded
/// sink from a dedicated thread (`std::thread::spawn` or `spawn_blocking`), or use
/// [`unbounded`](Self::unbounded) when the consumer lives on the runtime.
pub struct ChannelSink<T> {
    sender: Option<Sender<LogEntry<T>>>,
}

impl<T> ChannelSink<T> {
    pub fn new(sender: Sender<LogEntry<T>>) -> Self {
        ChannelSink {
            sender: Some(sender),
        }
    }

    /// Creates a sink bounded to `capacity` in-flight entries, with its receiving end.
    ///
    /// The receiver must be drained off the merge's runtime; see the type docs.
    pub fn bounded(capacity: usize) -> (Self, Receiver<LogEntry<T>>) {
        let (s, r) = crossbeam_channel::bounded(capacity);
        (ChannelSink::new(s), r)
    }

    pub fn unbounded() -> (Self, Receiver<LogEntry<T>>) {
        let (s, r) = crossbeam_channel::unbounded();
        (ChannelSink::new(s), r)
    }
}

impl<T> LogSink for ChannelSink<T> {
    type Payload = T;

    fn emit(&mut self, entry: LogEntry<T>) -> Result<(), SinkError> {
        let sender = self.sender.as_ref().ok_or(SinkError::Closed)?;
        sender.send(entry).map_err(|_| SinkError::Closed)
    }

    fn complete(&mut self) -> Result<(), SinkError> {
        match self.sender.take() {
            Some(_) => {
                debug!("ChannelSink closed");
                Ok(())
            }
            None => Err(SinkError::Closed),
        }
    }
}
