use crate::entry::LogEntry;
use crate::error::SinkError;

/// Receives merged entries in global timestamp order.
pub trait LogSink {
    type Payload;

    /// Called once per entry, in output order.
    fn emit(&mut self, entry: LogEntry<Self::Payload>) -> Result<(), SinkError>;

    /// Called exactly once, after the last `emit`.
    fn complete(&mut self) -> Result<(), SinkError>;
}

impl<K: LogSink + ?Sized> LogSink for &mut K {
    type Payload = K::Payload;

    fn emit(&mut self, entry: LogEntry<Self::Payload>) -> Result<(), SinkError> {
        (**self).emit(entry)
    }

    fn complete(&mut self) -> Result<(), SinkError> {
        (**self).complete()
    }
}
