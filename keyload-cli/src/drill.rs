//! In-process fill/verify drill
//!
//! Writer threads fill the key range of a [`LoadGenerator`] into an in-memory
//! [`SimulatedStore`] and keep updating existing keys once the range is full.
//! Reader threads concurrently read keys the generator reports as written and
//! verify their payloads. The store can be told to reject or damage a fraction
//! of writes, which exercises failure tracking and mismatch reporting without
//! a real target system.

use crate::config::{ProfileConfig, StoreConfig};
use crate::output::DrillResults;
use anyhow::{Context, Result};
use keyload_core::seed::{components, worker_seed};
use keyload_core::threading::ThreadingRuntime;
use keyload_core::LoadGenerator;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread;
use std::time::Instant;

/// Thread-safe key/value map with injectable write faults
#[derive(Debug, Default)]
pub struct SimulatedStore {
    data: RwLock<HashMap<String, String>>,
    write_failure_rate: f64,
    corruption_rate: f64,
}

impl SimulatedStore {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            write_failure_rate: config.write_failure_rate,
            corruption_rate: config.corruption_rate,
        }
    }

    /// Store `payload` under `key`; returns whether the write was accepted
    pub fn put<R: Rng>(&self, key: &str, payload: &str, rng: &mut R) -> bool {
        if self.write_failure_rate > 0.0 && rng.random_bool(self.write_failure_rate) {
            return false;
        }

        let stored = if self.corruption_rate > 0.0 && rng.random_bool(self.corruption_rate) {
            format!("{payload}~")
        } else {
            payload.to_string()
        };
        self.data.write().unwrap_or_else(PoisonError::into_inner).insert(key.to_string(), stored);
        true
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.data.read().unwrap_or_else(PoisonError::into_inner).get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.data.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-thread counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub writes_ok: u64,
    pub writes_failed: u64,
    pub reads: u64,
    /// Reads of keys the generator called written but the store did not have
    pub missing_reads: u64,
    /// Calls that found no key to use yet
    pub idle_polls: u64,
}

impl WorkerStats {
    fn merge(mut self, other: WorkerStats) -> WorkerStats {
        self.writes_ok += other.writes_ok;
        self.writes_failed += other.writes_failed;
        self.reads += other.reads;
        self.missing_reads += other.missing_reads;
        self.idle_polls += other.idle_polls;
        self
    }
}

struct DrillContext {
    generator: LoadGenerator,
    store: SimulatedStore,
    deadline: Instant,
    max_writes: Option<u64>,
    min_reads: u64,
    writes_issued: AtomicU64,
    writers_running: AtomicUsize,
    master_seed: Option<u64>,
}

impl DrillContext {
    fn rng_for(&self, component: &str, index: usize) -> SmallRng {
        match self.master_seed {
            Some(seed) => SmallRng::seed_from_u64(worker_seed(seed, component, index)),
            None => SmallRng::from_os_rng(),
        }
    }

    fn claim_write(&self) -> bool {
        if Instant::now() >= self.deadline {
            return false;
        }
        match self.max_writes {
            Some(max) => self.writes_issued.fetch_add(1, Ordering::Relaxed) < max,
            None => true,
        }
    }

    fn run_writer(&self, index: usize) -> WorkerStats {
        let mut rng = self.rng_for(components::WRITE_WORKER, index);
        let mut store_rng = self.rng_for(components::STORE_FAULTS, index);
        let mut stats = WorkerStats::default();

        while self.claim_write() {
            let Some(key) = self.generator.get_key_to_write_with(&mut rng) else {
                // Range used up before anything was confirmed
                stats.idle_polls += 1;
                thread::yield_now();
                continue;
            };

            if self.store.put(&key.as_string(), &key.expected_payload(), &mut store_rng) {
                self.generator.record_write_success(&key);
                stats.writes_ok += 1;
            } else {
                self.generator.record_write_failure(&key);
                stats.writes_failed += 1;
            }
        }

        self.writers_running.fetch_sub(1, Ordering::AcqRel);
        stats
    }

    fn run_reader(&self, index: usize) -> WorkerStats {
        let mut rng = self.rng_for(components::READ_WORKER, index);
        let mut stats = WorkerStats::default();

        while (self.writers_running.load(Ordering::Acquire) > 0 || stats.reads < self.min_reads)
            && Instant::now() < self.deadline
        {
            let Some(key) = self.generator.get_key_to_read_with(&mut rng) else {
                stats.idle_polls += 1;
                thread::yield_now();
                continue;
            };

            stats.reads += 1;
            match self.store.get(&key.as_string()) {
                Some(payload) => {
                    self.generator.verify(&key, &payload);
                }
                None => {
                    tracing::error!(
                        key = %key.as_string(),
                        "Key below watermark missing from store"
                    );
                    stats.missing_reads += 1;
                }
            }
        }
        stats
    }
}

/// Run the drill described by `config`
pub fn run_drill(config: &ProfileConfig) -> Result<DrillResults> {
    let started = Instant::now();
    let deadline = started
        .checked_add(config.experiment.duration)
        .context("Experiment duration overflows the clock")?;
    let generator = LoadGenerator::from_config(&config.generator_config())?;
    let writers = config.workers.writers;
    let readers = config.workers.readers;

    tracing::info!(
        "Drill '{}': keys {}..{} with prefix '{}', {} writers, {} readers",
        config.experiment.name,
        config.keys.start_key,
        config.keys.end_key,
        generator.key_prefix(),
        writers,
        readers
    );

    let ctx = Arc::new(DrillContext {
        generator,
        store: SimulatedStore::new(&config.store),
        deadline,
        max_writes: config.experiment.max_writes,
        min_reads: config.workers.min_reads_per_reader,
        writes_issued: AtomicU64::new(0),
        writers_running: AtomicUsize::new(writers),
        master_seed: config.experiment.seed,
    });

    let worker_ctx = ctx.clone();
    let per_thread = ThreadingRuntime::new(writers + readers).run_workers(move |thread_id| {
        Ok(if thread_id < writers {
            worker_ctx.run_writer(thread_id)
        } else {
            worker_ctx.run_reader(thread_id - writers)
        })
    })?;
    let elapsed = started.elapsed();

    let totals = per_thread.into_iter().fold(WorkerStats::default(), WorkerStats::merge);
    let last_generated = ctx.generator.max_generated_key();
    let settled = ctx.generator.wait_for_watermark(last_generated, config.experiment.drain_timeout);
    if !settled {
        tracing::warn!(
            "Watermark stuck at {} after {:?}, last generated key {}",
            ctx.generator.watermark(),
            config.experiment.drain_timeout,
            last_generated
        );
    }

    Ok(DrillResults::new(config, &ctx.generator, totals, elapsed, settled, ctx.store.len()))
}
