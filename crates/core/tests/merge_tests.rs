use logmerge::test_utils::{random_sorted_entries, CollectingSink, FailingSink, ScriptedSource};
use logmerge::{
    LogEntry, LogSource, MergeConfig, MergeEngine, MergeError, SourceError, SourceErrorPolicy,
    VecSource,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

/// Hands out one entry per fetch until fetch number `panic_on`, which panics.
struct PanickingSource {
    fetches: usize,
    panic_on: usize,
}

impl LogSource for PanickingSource {
    type Payload = String;

    fn peek_last(&self) -> Option<&LogEntry<String>> {
        None
    }

    async fn fetch_next(&mut self) -> Result<Option<LogEntry<String>>, SourceError> {
        self.fetches += 1;
        if self.fetches == self.panic_on {
            panic!("fetch {} blew up", self.fetches);
        }
        Ok(LogEntry::at_millis(self.fetches as i64, format!("x{}", self.fetches)))
    }
}

fn scripted(timestamps: &[i64], label: &str, delay: Duration) -> ScriptedSource<String> {
    ScriptedSource::from_millis(
        timestamps
            .iter()
            .map(|t| (*t, format!("{label}{t}")))
            .collect(),
        delay,
    )
}

#[tokio::test]
async fn test_three_sources_with_buffer_of_one() {
    init_tracing();
    let sources = vec![
        scripted(&[1, 4, 7], "a", millis(3)),
        scripted(&[2, 5], "b", millis(1)),
        scripted(&[3, 6], "c", millis(2)),
    ];
    let sink = CollectingSink::new();
    let config = MergeConfig::default().with_max_buffer_size(1);

    let summary = MergeEngine::with_config(sources, config)
        .run(sink.clone())
        .await
        .unwrap();

    assert_eq!(sink.timestamps_millis(), vec![1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(
        sink.payloads(),
        vec!["a1", "b2", "c3", "a4", "b5", "c6", "a7"]
    );
    assert_eq!(sink.completions(), 1);
    assert_eq!(sink.late_emits(), 0);
    assert_eq!(summary.emitted, 7);
    assert!(summary.source_errors.is_empty());
}

#[tokio::test]
async fn test_empty_source_next_to_non_empty_one() {
    let sources = vec![scripted(&[], "e", millis(0)), scripted(&[1, 2], "x", millis(1))];
    let sink = CollectingSink::new();

    let summary = MergeEngine::new(sources).run(sink.clone()).await.unwrap();

    assert_eq!(sink.timestamps_millis(), vec![1, 2]);
    assert_eq!(sink.completions(), 1);
    assert_eq!(summary.sources[0].emitted, 0);
    assert_eq!(summary.sources[1].emitted, 2);
}

#[tokio::test]
async fn test_all_sources_empty_completes_once() {
    let sources: Vec<VecSource<String>> = vec![VecSource::empty(), VecSource::empty()];
    let sink = CollectingSink::new();

    let summary = MergeEngine::new(sources).run(sink.clone()).await.unwrap();

    assert_eq!(summary.emitted, 0);
    assert!(sink.timestamps_millis().is_empty());
    assert_eq!(sink.completions(), 1);
}

#[tokio::test]
async fn test_no_sources_completes_once() {
    let sink: CollectingSink<String> = CollectingSink::new();

    let summary = MergeEngine::<VecSource<String>>::new(Vec::new())
        .run(sink.clone())
        .await
        .unwrap();

    assert_eq!(summary.emitted, 0);
    assert!(summary.sources.is_empty());
    assert_eq!(sink.completions(), 1);
}

#[tokio::test]
async fn test_fetch_error_retires_only_the_failing_source() {
    let failing = scripted(&[2], "b", millis(1)).fail_with("disk went away", millis(1));
    let sources = vec![
        scripted(&[1, 4, 7], "a", millis(1)),
        failing,
        scripted(&[3, 6], "c", millis(1)),
    ];
    let sink = CollectingSink::new();

    let summary = MergeEngine::new(sources).run(sink.clone()).await.unwrap();

    assert_eq!(sink.timestamps_millis(), vec![1, 2, 3, 4, 6, 7]);
    assert_eq!(sink.completions(), 1);
    assert_eq!(summary.failed_sources(), vec![1]);
    assert!(matches!(
        &summary.source_errors[0],
        MergeError::SourceFetch { source_index: 1, .. }
    ));
}

#[tokio::test]
async fn test_abort_policy_returns_fetch_error() {
    let sources = vec![
        scripted(&[1, 2, 3], "a", millis(1)),
        scripted(&[], "b", millis(0)).fail_with("boom", millis(0)),
    ];
    let sink = CollectingSink::new();
    let config = MergeConfig::default().with_source_error_policy(SourceErrorPolicy::Abort);

    let result = MergeEngine::with_config(sources, config)
        .run(sink.clone())
        .await;

    assert!(matches!(
        result,
        Err(MergeError::SourceFetch { source_index: 1, .. })
    ));
    assert_eq!(sink.completions(), 0);
}

#[tokio::test]
async fn test_out_of_order_source_is_reported() {
    let sources = vec![
        scripted(&[1, 3, 5], "a", millis(0)),
        scripted(&[2, 8, 4], "b", millis(0)),
    ];
    let sink = CollectingSink::new();

    let result = MergeEngine::new(sources).run(sink.clone()).await;

    match result {
        Err(MergeError::OrderingViolation {
            source_index,
            previous,
            found,
        }) => {
            assert_eq!(source_index, 1);
            assert_eq!(previous.timestamp_millis(), 8);
            assert_eq!(found.timestamp_millis(), 4);
        }
        other => panic!("expected an ordering violation, got {other:?}"),
    }
    assert_eq!(sink.completions(), 0);
}

#[tokio::test]
async fn test_sink_error_stops_the_merge() {
    let sources = vec![
        scripted(&[1, 3, 5, 7], "a", millis(0)),
        scripted(&[2, 4, 6, 8], "b", millis(0)),
    ];
    let mut sink = FailingSink::new(3);

    let result = MergeEngine::new(sources).run(&mut sink).await;

    assert!(matches!(result, Err(MergeError::Sink(_))));
    assert_eq!(sink.accepted(), 3);
    assert!(!sink.completed);
}

#[tokio::test]
async fn test_zero_buffer_size_is_a_config_error() {
    let sink = CollectingSink::new();
    let config = MergeConfig::default().with_max_buffer_size(0);

    let result = MergeEngine::with_config(vec![scripted(&[1], "a", millis(0))], config)
        .run(sink.clone())
        .await;

    assert!(matches!(result, Err(MergeError::Config(_))));
    assert_eq!(sink.completions(), 0);
}

#[tokio::test]
async fn test_equal_timestamps_prefer_lower_source_index() {
    let sources = vec![
        scripted(&[5, 5], "a", millis(2)),
        scripted(&[1, 5], "b", millis(0)),
        scripted(&[5], "c", millis(1)),
    ];
    let sink = CollectingSink::new();

    MergeEngine::new(sources).run(sink.clone()).await.unwrap();

    assert_eq!(sink.payloads(), vec!["b1", "a5", "a5", "b5", "c5"]);
}

#[tokio::test]
async fn test_peeked_entries_seed_the_frontier() {
    let sources = vec![
        VecSource::primed(vec![
            LogEntry::at_millis(1, "a1".to_string()).unwrap(),
            LogEntry::at_millis(3, "a3".to_string()).unwrap(),
        ]),
        VecSource::new(vec![LogEntry::at_millis(2, "b2".to_string()).unwrap()]),
        VecSource::primed(vec![LogEntry::at_millis(4, "c4".to_string()).unwrap()]),
    ];
    let sink = CollectingSink::new();

    let summary = MergeEngine::new(sources).run(sink.clone()).await.unwrap();

    assert_eq!(sink.payloads(), vec!["a1", "b2", "a3", "c4"]);
    assert_eq!(summary.sources[0].fetched, 2);
    assert_eq!(summary.sources[2].fetched, 1);
}

#[tokio::test]
async fn test_primed_scripted_source_is_not_emitted_twice() {
    let source = scripted(&[10, 20, 30], "p", millis(1)).primed();
    let tracker = source.tracker();
    let sink = CollectingSink::new();

    MergeEngine::new(vec![source, scripted(&[15], "q", millis(1))])
        .run(sink.clone())
        .await
        .unwrap();

    assert_eq!(sink.payloads(), vec!["p10", "q15", "p20", "p30"]);
    // Two scripted entries plus the end-of-stream fetch.
    assert_eq!(tracker.calls(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_random_sources_merge_completely_and_in_order() {
    init_tracing();
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut sources = Vec::new();
    let mut trackers = Vec::new();
    let mut expected = Vec::new();

    for index in 0..8 {
        let count = rng.gen_range(0..60);
        let entries = random_sorted_entries(&mut rng, &format!("s{index}"), count, 0, 5).unwrap();
        for (seq, entry) in entries.iter().enumerate() {
            expected.push((entry.timestamp_millis(), index, seq, entry.payload.clone()));
        }

        let delay = millis(rng.gen_range(0..3));
        let source = ScriptedSource::from_millis(
            entries
                .into_iter()
                .map(|e| (e.timestamp_millis(), e.payload))
                .collect(),
            delay,
        );
        trackers.push(source.tracker());
        sources.push(source);
    }
    expected.sort();

    let sink = CollectingSink::new();
    let config = MergeConfig::default().with_max_buffer_size(4);
    let summary = MergeEngine::with_config(sources, config)
        .run(sink.clone())
        .await
        .unwrap();

    let expected_payloads: Vec<String> = expected.into_iter().map(|(_, _, _, p)| p).collect();
    assert_eq!(sink.payloads(), expected_payloads);
    assert_eq!(summary.emitted as usize, expected_payloads.len());
    assert_eq!(sink.completions(), 1);

    for source_summary in &summary.sources {
        assert!(source_summary.buffer_high_water <= 4);
        assert_eq!(source_summary.fetched, source_summary.emitted);
    }
    for tracker in &trackers {
        assert!(tracker.max_in_flight() <= 1);
        assert_eq!(tracker.calls_after_end(), 0);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_fast_source_stays_bounded_behind_slow_source() {
    let entries: Vec<(i64, String)> = (0..50).map(|t| (t, format!("fast{t}"))).collect();
    let fast = ScriptedSource::from_millis(entries, Duration::ZERO);
    let slow = scripted(&[10, 20, 30, 40], "slow", millis(5));
    let sink = CollectingSink::new();
    let config = MergeConfig::default().with_max_buffer_size(3);

    let summary = MergeEngine::with_config(vec![fast, slow], config)
        .run(sink.clone())
        .await
        .unwrap();

    assert_eq!(summary.emitted, 54);
    assert!(summary.sources.iter().all(|s| s.buffer_high_water <= 3));
    // The fast source fills its buffer while the slow one holds the frontier back, stops,
    // and has to be re-armed by the consumer.
    assert_eq!(summary.sources[0].fetched, 50);
    assert_eq!(summary.sources[0].emitted, 50);
    assert_eq!(summary.sources[0].buffer_high_water, 3);
    assert!(summary.sources[0].rearms >= 1);

    let slow_order: Vec<i64> = sink
        .results
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.payload.starts_with("slow"))
        .map(|e| e.timestamp_millis())
        .collect();
    assert_eq!(slow_order, vec![10, 20, 30, 40]);
}

#[tokio::test]
async fn test_monitor_does_not_disturb_the_merge() {
    let sources = vec![
        scripted(&[1, 3, 5], "a", millis(4)),
        scripted(&[2, 4, 6], "b", millis(4)),
    ];
    let sink = CollectingSink::new();
    let config = MergeConfig::default()
        .with_max_buffer_size(2)
        .with_monitor_interval(millis(2));

    MergeEngine::with_config(sources, config)
        .run(sink.clone())
        .await
        .unwrap();

    assert_eq!(sink.timestamps_millis(), vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(sink.completions(), 1);
}

#[tokio::test]
async fn test_panicking_fetch_fails_the_merge() {
    init_tracing();
    let sink = CollectingSink::new();

    let result = tokio::time::timeout(
        Duration::from_secs(2),
        MergeEngine::new(vec![PanickingSource {
            fetches: 0,
            panic_on: 3,
        }])
        .run(sink.clone()),
    )
    .await
    .expect("merge hung after a fill task panicked");

    assert!(matches!(
        result,
        Err(MergeError::TaskFailed { source_index: 0, .. })
    ));
    assert_eq!(sink.completions(), 0);
}

#[tokio::test]
async fn test_out_of_range_timestamp_fails_its_source() {
    let sources = vec![
        scripted(&[1, 3], "a", millis(0)),
        scripted(&[2, i64::MAX], "b", millis(0)),
    ];
    let sink = CollectingSink::new();

    let summary = MergeEngine::new(sources).run(sink.clone()).await.unwrap();

    assert_eq!(sink.payloads(), vec!["a1", "b2", "a3"]);
    assert_eq!(summary.failed_sources(), vec![1]);
    assert_eq!(sink.completions(), 1);
}

#[tokio::test]
async fn test_merge_function_uses_the_given_config() {
    let sources = vec![scripted(&[1, 4], "a", millis(1)), scripted(&[2, 3], "b", millis(1))];
    let config = MergeConfig::default().with_max_buffer_size(1);
    let engine = MergeEngine::with_config(Vec::<ScriptedSource<String>>::new(), config.clone());
    assert_eq!(engine.config().max_buffer_size, 1);

    let sink = CollectingSink::new();
    let summary = logmerge::merge(sources, sink.clone(), config).await.unwrap();

    assert_eq!(sink.payloads(), vec!["a1", "b2", "b3", "a4"]);
    assert!(summary.sources.iter().all(|s| s.buffer_high_water <= 1));
    assert_eq!(sink.completions(), 1);
}
