use crate::entry::LogEntry;
use crate::error::SinkError;
use crate::sinks::LogSink;
use std::marker::PhantomData;

/// Accepts `fail_after` entries, then rejects every further `emit`.
pub struct FailingSink<T> {
    fail_after: usize,
    accepted: usize,
    pub completed: bool,
    _phantom: PhantomData<T>,
}

impl<T> FailingSink<T> {
    pub fn new(fail_after: usize) -> Self {
        FailingSink {
            fail_after,
            accepted: 0,
            completed: false,
            _phantom: PhantomData,
        }
    }

    pub fn accepted(&self) -> usize {
        self.accepted
    }
}

impl<T> LogSink for FailingSink<T> {
    type Payload = T;

    fn emit(&mut self, _entry: LogEntry<T>) -> Result<(), SinkError> {
        if self.accepted >= self.fail_after {
            return Err(SinkError::Other(format!(
                "refusing entry after {} accepted",
                self.accepted
            )));
        }
        self.accepted += 1;
        Ok(())
    }

    fn complete(&mut self) -> Result<(), SinkError> {
        self.completed = true;
        Ok(())
    }
}
