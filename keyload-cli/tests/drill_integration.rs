//! Drill runs against the simulated store

use keyload_cli::config::{
    ExperimentConfig, KeysConfig, OutputConfig, ProfileConfig, StoreConfig, WorkersConfig,
};
use keyload_cli::drill::run_drill;
use std::time::Duration;

fn profile(end_key: i64, max_writes: u64, store: StoreConfig) -> ProfileConfig {
    ProfileConfig {
        experiment: ExperimentConfig {
            name: "drill-test".into(),
            description: None,
            seed: Some(1234),
            duration: Duration::from_secs(30),
            max_writes: Some(max_writes),
            drain_timeout: Duration::from_secs(10),
        },
        keys: KeysConfig {
            start_key: 0,
            end_key,
            prefix: Some("drill:".into()),
            max_read_attempts: 16,
        },
        workers: WorkersConfig { writers: 4, readers: 2, min_reads_per_reader: 0 },
        store,
        output: OutputConfig::default(),
    }
}

#[test]
fn test_reliable_store_drill_is_clean() {
    let results = run_drill(&profile(2_000, 3_000, StoreConfig::default())).unwrap();

    assert!(results.fill_complete);
    assert!(results.watermark_settled);
    assert_eq!(results.max_generated_key, 1_999);
    assert_eq!(results.tracker.watermark, 1_999);
    assert_eq!(results.tracker.pending_successes, 0);
    assert_eq!(results.writes_failed, 0);
    // Every fresh id is written once; a claim may find no key while id 0 is unconfirmed
    assert!((2_000..=3_000).contains(&results.writes_ok));
    assert_eq!(results.stored_keys, 2_000);
    assert!(results.is_clean());
}

#[test]
fn test_failed_writes_do_not_stall_watermark() {
    let store = StoreConfig { write_failure_rate: 0.2, corruption_rate: 0.0 };
    let results = run_drill(&profile(2_000, 2_500, store)).unwrap();

    assert!(results.writes_failed > 0);
    assert!(results.watermark_settled);
    assert_eq!(results.tracker.watermark, 1_999);
    assert!(results.tracker.failed_keys > 0);
    // Readers skip failed keys, so nothing is ever missing
    assert_eq!(results.missing_reads, 0);
    assert_eq!(results.verification.failed, 0);
}

#[test]
fn test_corruption_is_reported() {
    let store = StoreConfig { write_failure_rate: 0.0, corruption_rate: 1.0 };
    let mut config = profile(200, 20_000, store);
    config.workers = WorkersConfig { writers: 1, readers: 2, min_reads_per_reader: 50 };
    let results = run_drill(&config).unwrap();

    assert!(results.watermark_settled);
    assert_eq!(results.stored_keys, 200);
    assert_eq!(results.missing_reads, 0);
    assert!(results.reads >= 100, "only {} reads", results.reads);
    // Every stored payload is damaged, so every read is flagged
    assert_eq!(results.verification.total_verifications, results.reads);
    assert_eq!(results.verification.failed, results.reads);
    assert!(!results.is_clean());
    assert!(!results.mismatches.is_empty());
    assert!(results.mismatches[0].actual.ends_with('~'));
}

#[test]
fn test_readers_meet_their_floor_after_writers_stop() {
    let mut config = profile(100, 100, StoreConfig::default());
    config.workers = WorkersConfig { writers: 1, readers: 3, min_reads_per_reader: 200 };
    let results = run_drill(&config).unwrap();

    assert!(results.reads >= 600, "only {} reads", results.reads);
    assert_eq!(results.verification.failed, 0);
    assert!(results.is_clean());
}

#[test]
fn test_unrepresentable_duration_is_an_error() {
    let mut config = profile(100, 100, StoreConfig::default());
    config.experiment.duration = Duration::MAX;
    let err = run_drill(&config).unwrap_err();
    assert!(err.to_string().contains("duration"));
}
