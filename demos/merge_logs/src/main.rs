use chrono::{Duration as ChronoDuration, Utc};
use logmerge::{
    merge_sync, LogEntry, LogSource, MergeConfig, MergeEngine, PrinterSink, SourceError,
    VecSource,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};
use tracing::{error, info};

/**
 * A source that pretends to live behind a slow network: every fetch sleeps for a random
 * few milliseconds before handing out the next entry.
 */
struct RandomLatencySource {
    entries: VecSource<String>,
    rng: StdRng,
    max_latency_ms: u64,
}

impl RandomLatencySource {
    fn new(entries: Vec<LogEntry<String>>, seed: u64, max_latency_ms: u64) -> Self {
        RandomLatencySource {
            entries: VecSource::primed(entries),
            rng: StdRng::seed_from_u64(seed),
            max_latency_ms,
        }
    }
}

impl LogSource for RandomLatencySource {
    type Payload = String;

    fn peek_last(&self) -> Option<&LogEntry<String>> {
        self.entries.peek_last()
    }

    async fn fetch_next(&mut self) -> Result<Option<LogEntry<String>>, SourceError> {
        let latency = self.rng.gen_range(0..=self.max_latency_ms);
        tokio::time::sleep(Duration::from_millis(latency)).await;
        self.entries.fetch_next().await
    }
}

fn generate_entries(rng: &mut StdRng, source: usize, count: usize) -> Vec<LogEntry<String>> {
    let mut timestamp = Utc::now() - ChronoDuration::days(rng.gen_range(1..=3));
    (0..count)
        .map(|n| {
            timestamp += ChronoDuration::seconds(rng.gen_range(1..=3600));
            LogEntry::new(timestamp, format!("source {source} message {n}"))
        })
        .collect()
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let source_count: usize = env_or("MERGE_LOGS_SOURCES", 10);
    let entries_per_source: usize = env_or("MERGE_LOGS_ENTRIES", 200);
    let max_latency_ms: u64 = env_or("MERGE_LOGS_MAX_LATENCY_MS", 8);

    let config = match MergeConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    // Same entries for both runs so the outputs can be compared.
    let mut rng = StdRng::seed_from_u64(7);
    let inputs: Vec<Vec<LogEntry<String>>> = (0..source_count)
        .map(|source| generate_entries(&mut rng, source, entries_per_source))
        .collect();

    info!(
        "Merging {} sources of {} entries each",
        source_count, entries_per_source
    );

    let mut sync_sources: Vec<VecSource<String>> =
        inputs.iter().cloned().map(VecSource::primed).collect();
    let started = Instant::now();
    match merge_sync(&mut sync_sources, PrinterSink::new("[sync] ")) {
        Ok(summary) => info!(
            "Sync merge printed {} entries in {:?}",
            summary.emitted,
            started.elapsed()
        ),
        Err(e) => error!("Sync merge failed: {}", e),
    }

    let async_sources: Vec<RandomLatencySource> = inputs
        .into_iter()
        .enumerate()
        .map(|(index, entries)| RandomLatencySource::new(entries, index as u64, max_latency_ms))
        .collect();
    let started = Instant::now();
    match MergeEngine::with_config(async_sources, config)
        .run(PrinterSink::new("[async] "))
        .await
    {
        Ok(summary) => {
            info!(
                "Async merge printed {} entries in {:?}",
                summary.emitted,
                started.elapsed()
            );
            for source in &summary.sources {
                info!(
                    "  source {}: {} fetched, {} re-arms, buffer high water {}",
                    source.source_index, source.fetched, source.rearms, source.buffer_high_water
                );
            }
        }
        Err(e) => {
            error!("Async merge failed: {}", e);
            std::process::exit(1);
        }
    }
}
