//! End-to-end tests for the key engine driven from multiple threads

use keyload_core::seed::{components, worker_seed};
use keyload_core::workload::{Key, LoadGenerator};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const SETTLE: Duration = Duration::from_secs(10);

fn write_fresh(generator: &LoadGenerator, n: usize) -> Vec<Key> {
    (0..n).map(|_| generator.get_key_to_write().expect("fresh key")).collect()
}

#[test]
fn sequential_successes_reach_last_id() {
    let generator = LoadGenerator::new(0, 5).unwrap();
    for key in write_fresh(&generator, 5) {
        generator.record_write_success(&key);
    }
    assert!(generator.wait_for_watermark(4, SETTLE));
    assert_eq!(generator.watermark(), 4);
}

#[test]
fn out_of_order_successes_wait_for_the_gap() {
    let generator = LoadGenerator::new(0, 5).unwrap();
    let keys = write_fresh(&generator, 3);

    generator.record_write_success(&keys[2]);
    generator.record_write_success(&keys[0]);
    assert!(!generator.wait_for_watermark(2, Duration::from_millis(50)));

    generator.record_write_success(&keys[1]);
    assert!(generator.wait_for_watermark(2, SETTLE));
}

#[test]
fn failed_key_does_not_block_watermark() {
    let generator = LoadGenerator::new(0, 5).unwrap();
    let keys = write_fresh(&generator, 3);

    generator.record_write_failure(&keys[1]);
    generator.record_write_success(&keys[0]);
    generator.record_write_success(&keys[2]);
    assert!(generator.wait_for_watermark(2, SETTLE));

    // Only id 0 is readable: the draw range is [0, 2) and 1 failed
    for _ in 0..50 {
        assert_eq!(generator.get_key_to_read().unwrap().as_number(), 0);
    }
}

#[test]
fn nothing_recorded_nothing_to_read() {
    let generator = LoadGenerator::new(0, 5).unwrap();
    assert!(generator.get_key_to_read().is_none());
}

#[test]
fn key_codec_round_trip() {
    let key = Key::new(7, "p-");
    assert_eq!(key.as_string(), "p-7");
    assert_eq!(key.expected_payload(), "val:7");
    assert!(key.verify("val:7").is_ok());
    assert!(key.verify("val:8").is_err());
}

fn fails(id: i64) -> bool {
    id % 11 == 5
}

#[test]
fn concurrent_writers_and_readers() {
    const END_KEY: i64 = 20_000;
    const WRITERS: usize = 6;
    const READERS: usize = 3;

    let generator = Arc::new(LoadGenerator::new(0, END_KEY).unwrap());
    generator.set_key_prefix("it:");
    let writers_done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..READERS)
        .map(|r| {
            let generator = generator.clone();
            let writers_done = writers_done.clone();
            thread::spawn(move || {
                let mut rng = SmallRng::seed_from_u64(worker_seed(9, components::READ_WORKER, r));
                let mut reads = 0u64;
                while !writers_done.load(Ordering::Acquire) {
                    if let Some(key) = generator.get_key_to_read_with(&mut rng) {
                        let id = key.as_number();
                        assert!(!fails(id), "read selected failed id {}", id);
                        assert!(id <= generator.watermark());
                        assert!(generator.verify(&key, &key.expected_payload()));
                        reads += 1;
                    }
                }
                reads
            })
        })
        .collect();

    let writers: Vec<_> = (0..WRITERS)
        .map(|w| {
            let generator = generator.clone();
            thread::spawn(move || {
                let mut rng = SmallRng::seed_from_u64(worker_seed(9, components::WRITE_WORKER, w));
                let mut batch = Vec::new();
                while !generator.fill_complete() {
                    let Some(key) = generator.get_key_to_write_with(&mut rng) else { continue };
                    batch.push(key);
                    if batch.len() == 32 {
                        // Complete in scrambled order
                        batch.shuffle(&mut rng);
                        for key in batch.drain(..) {
                            if fails(key.as_number()) {
                                generator.record_write_failure(&key);
                            } else {
                                generator.record_write_success(&key);
                            }
                        }
                    }
                }
                for key in batch {
                    if fails(key.as_number()) {
                        generator.record_write_failure(&key);
                    } else {
                        generator.record_write_success(&key);
                    }
                }
            })
        })
        .collect();

    for writer in writers {
        writer.join().unwrap();
    }
    assert!(generator.wait_for_watermark(END_KEY - 1, SETTLE));
    writers_done.store(true, Ordering::Release);

    for reader in readers {
        reader.join().unwrap();
    }

    let snapshot = generator.tracker_snapshot();
    assert_eq!(snapshot.watermark, END_KEY - 1);
    assert_eq!(snapshot.pending_successes, 0);
    assert!(snapshot.failed_keys > 0);
    assert_eq!(generator.verification_stats().failed, 0);
    assert!(generator.mismatches().is_empty());
}
