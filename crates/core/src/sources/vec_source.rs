use crate::entry::LogEntry;
use crate::error::SourceError;
use crate::sources::{LogSource, SyncLogSource};
use std::collections::VecDeque;
use tracing::debug;

/// In-memory source over a pre-sorted list of entries.
#[derive(Clone, Debug)]
pub struct VecSource<T> {
    primed: Option<LogEntry<T>>,
    entries: VecDeque<LogEntry<T>>,
}

impl<T> VecSource<T> {
    pub fn new(entries: Vec<LogEntry<T>>) -> Self {
        VecSource {
            primed: None,
            entries: entries.into(),
        }
    }

    /// Loads the first entry up front so that it is visible through `peek_last`.
    pub fn primed(entries: Vec<LogEntry<T>>) -> Self {
        let mut entries: VecDeque<_> = entries.into();
        VecSource {
            primed: entries.pop_front(),
            entries,
        }
    }

    pub fn empty() -> Self {
        VecSource {
            primed: None,
            entries: VecDeque::new(),
        }
    }

    /// Entries not yet handed out, the primed one included.
    pub fn remaining(&self) -> usize {
        self.entries.len() + usize::from(self.primed.is_some())
    }
}

impl<T: Send + Clone + 'static> LogSource for VecSource<T> {
    type Payload = T;

    fn peek_last(&self) -> Option<&LogEntry<T>> {
        self.primed.as_ref()
    }

    async fn fetch_next(&mut self) -> Result<Option<LogEntry<T>>, SourceError> {
        let next = self.entries.pop_front();
        if next.is_none() {
            debug!("VecSource drained");
        }
        Ok(next)
    }
}

impl<T> SyncLogSource for VecSource<T> {
    type Payload = T;

    fn pop(&mut self) -> Option<LogEntry<T>> {
        self.primed.take().or_else(|| self.entries.pop_front())
    }
}
