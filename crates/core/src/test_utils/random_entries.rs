use crate::entry::LogEntry;
use rand::Rng;

/// `count` entries with strictly non-decreasing timestamps, starting at `start_millis` and
/// advancing by up to `max_gap_millis` each step. Payloads are `"{label}-{n}"`.
///
/// Returns `None` if a timestamp would leave the range `DateTime<Utc>` can represent.
pub fn random_sorted_entries<R: Rng>(
    rng: &mut R,
    label: &str,
    count: usize,
    start_millis: i64,
    max_gap_millis: i64,
) -> Option<Vec<LogEntry<String>>> {
    let mut millis = start_millis;
    (0..count)
        .map(|n| {
            millis += rng.gen_range(0..=max_gap_millis);
            LogEntry::at_millis(millis, format!("{label}-{n}"))
        })
        .collect()
}
