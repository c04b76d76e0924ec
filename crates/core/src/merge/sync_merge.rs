//! Blocking baseline merge: one `pop` per source at a time, no prefetch.

use super::frontier::{Frontier, FrontierEntry};
use super::stats::{MergeSummary, SourceSummary};
use crate::error::{MergeError, Result};
use crate::sinks::LogSink;
use crate::sources::SyncLogSource;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// Merges `sources` into `sink` in timestamp order, ties going to the lower source index.
pub fn merge_sync<S, K>(sources: &mut [S], mut sink: K) -> Result<MergeSummary>
where
    S: SyncLogSource,
    K: LogSink<Payload = S::Payload>,
{
    debug!("Starting sync merge of {} sources", sources.len());
    let mut frontier = Frontier::with_capacity(sources.len());
    let mut last_seen: Vec<Option<DateTime<Utc>>> = vec![None; sources.len()];
    let mut summaries: Vec<SourceSummary> = (0..sources.len())
        .map(|source_index| SourceSummary {
            source_index,
            ..SourceSummary::default()
        })
        .collect();

    for index in 0..sources.len() {
        pop_into(&mut frontier, sources, &mut last_seen, &mut summaries, index)?;
    }

    let mut emitted = 0;
    while let Some(FrontierEntry {
        source_index,
        entry,
    }) = frontier.extract_minimum()
    {
        sink.emit(entry)?;
        emitted += 1;
        summaries[source_index].emitted += 1;
        pop_into(&mut frontier, sources, &mut last_seen, &mut summaries, source_index)?;
    }
    sink.complete()?;

    info!("Sync merge complete, {} entries emitted", emitted);
    Ok(MergeSummary {
        emitted,
        sources: summaries,
        source_errors: Vec::new(),
    })
}

fn pop_into<S: SyncLogSource>(
    frontier: &mut Frontier<S::Payload>,
    sources: &mut [S],
    last_seen: &mut [Option<DateTime<Utc>>],
    summaries: &mut [SourceSummary],
    index: usize,
) -> Result<()> {
    let Some(entry) = sources[index].pop() else {
        debug!("Source {} exhausted", index);
        return Ok(());
    };

    if let Some(previous) = last_seen[index] {
        if entry.timestamp < previous {
            return Err(MergeError::OrderingViolation {
                source_index: index,
                previous,
                found: entry.timestamp,
            });
        }
    }
    last_seen[index] = Some(entry.timestamp);
    summaries[index].fetched += 1;
    frontier.insert(index, entry);
    Ok(())
}
