use crate::entry::LogEntry;
use crate::error::SourceError;
use crate::sources::LogSource;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

enum Step<T> {
    Entry(LogEntry<T>, Duration),
    Fail(String, Duration),
}

/// Observations about how a [`ScriptedSource`] was driven.
#[derive(Debug, Default)]
pub struct FetchTracker {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    after_end: AtomicUsize,
}

impl FetchTracker {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of concurrent `fetch_next` calls seen.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Fetches issued after the source had already reported end of stream.
    pub fn calls_after_end(&self) -> usize {
        self.after_end.load(Ordering::SeqCst)
    }
}

/// A source that replays a fixed script with a per-entry delay, optionally failing part way.
pub struct ScriptedSource<T> {
    steps: VecDeque<Step<T>>,
    primed: Option<LogEntry<T>>,
    ended: bool,
    tracker: Arc<FetchTracker>,
}

impl<T> ScriptedSource<T> {
    pub fn new() -> Self {
        ScriptedSource {
            steps: VecDeque::new(),
            primed: None,
            ended: false,
            tracker: Arc::new(FetchTracker::default()),
        }
    }

    /// Entries at the given millisecond timestamps, all delivered with the same delay.
    pub fn from_millis(items: Vec<(i64, T)>, delay: Duration) -> Self {
        items
            .into_iter()
            .fold(ScriptedSource::new(), |source, (millis, payload)| {
                source.delayed_entry(millis, payload, delay)
            })
    }

    pub fn entry(self, millis: i64, payload: T) -> Self {
        self.delayed_entry(millis, payload, Duration::ZERO)
    }

    /// An out-of-range `millis` is scripted as a fetch failure at that position.
    pub fn delayed_entry(mut self, millis: i64, payload: T, delay: Duration) -> Self {
        let step = match LogEntry::at_millis(millis, payload) {
            Some(entry) => Step::Entry(entry, delay),
            None => Step::Fail(format!("timestamp {millis}ms is out of range"), delay),
        };
        self.steps.push_back(step);
        self
    }

    /// The next fetch after the entries scripted so far fails with `message`.
    pub fn fail_with(mut self, message: impl Into<String>, delay: Duration) -> Self {
        self.steps.push_back(Step::Fail(message.into(), delay));
        self
    }

    /// Moves the first scripted entry into `peek_last`.
    pub fn primed(mut self) -> Self {
        match self.steps.pop_front() {
            Some(Step::Entry(entry, _)) => self.primed = Some(entry),
            Some(other) => self.steps.push_front(other),
            None => {}
        }
        self
    }

    pub fn tracker(&self) -> Arc<FetchTracker> {
        Arc::clone(&self.tracker)
    }
}

impl<T> Default for ScriptedSource<T> {
    fn default() -> Self {
        ScriptedSource::new()
    }
}

impl<T: Send + Clone + 'static> LogSource for ScriptedSource<T> {
    type Payload = T;

    fn peek_last(&self) -> Option<&LogEntry<T>> {
        self.primed.as_ref()
    }

    async fn fetch_next(&mut self) -> Result<Option<LogEntry<T>>, SourceError> {
        let tracker = Arc::clone(&self.tracker);
        tracker.calls.fetch_add(1, Ordering::SeqCst);
        if self.ended {
            tracker.after_end.fetch_add(1, Ordering::SeqCst);
            return Ok(None);
        }

        let now = tracker.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        tracker.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let result = match self.steps.pop_front() {
            Some(Step::Entry(entry, delay)) => {
                tokio::time::sleep(delay).await;
                Ok(Some(entry))
            }
            Some(Step::Fail(message, delay)) => {
                tokio::time::sleep(delay).await;
                debug!("ScriptedSource failing: {}", message);
                self.ended = true;
                Err(SourceError::other(message))
            }
            None => {
                self.ended = true;
                Ok(None)
            }
        };

        tracker.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
