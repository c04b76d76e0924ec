use crate::entry::LogEntry;
use chrono::{DateTime, Utc};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// The current candidate entry of one source.
#[derive(Debug)]
pub struct FrontierEntry<T> {
    pub source_index: usize,
    pub entry: LogEntry<T>,
}

impl<T> FrontierEntry<T> {
    fn key(&self) -> (DateTime<Utc>, usize) {
        (self.entry.timestamp, self.source_index)
    }
}

// Ordering ignores the payload: timestamp first, then the lower source index wins ties.
impl<T> PartialEq for FrontierEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<T> Eq for FrontierEntry<T> {}

impl<T> PartialOrd for FrontierEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for FrontierEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Min-heap over the head entry of every active source.
pub struct Frontier<T> {
    heap: BinaryHeap<Reverse<FrontierEntry<T>>>,
}

impl<T> Frontier<T> {
    pub fn with_capacity(sources: usize) -> Self {
        Frontier {
            heap: BinaryHeap::with_capacity(sources),
        }
    }

    pub fn insert(&mut self, source_index: usize, entry: LogEntry<T>) {
        self.heap.push(Reverse(FrontierEntry {
            source_index,
            entry,
        }));
    }

    /// Removes and returns the oldest candidate.
    pub fn extract_minimum(&mut self) -> Option<FrontierEntry<T>> {
        self.heap.pop().map(|Reverse(candidate)| candidate)
    }

    pub fn peek_timestamp(&self) -> Option<DateTime<Utc>> {
        self.heap.peek().map(|Reverse(candidate)| candidate.entry.timestamp)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
