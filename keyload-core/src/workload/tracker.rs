//! Completion tracking and the contiguous watermark
//!
//! Writers finish out of order. The tracker collects their outcomes and folds
//! them into the *watermark*: the largest id such that every id in
//! `[0, watermark]` is known to have either been written or failed. Readers use
//! the watermark to sample only keys that exist.
//!
//! Outcomes are recorded under one mutex shared with a dedicated coordination
//! thread. The thread advances the watermark as far as it can, then waits on a
//! condition variable while still holding that mutex, so a completion recorded
//! between its last check and the wait cannot be missed.
//!
//! A failed id covers its position just like a successful one. A key that will
//! never be written must not hold the watermark back forever.

use crate::{Error, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const THREAD_NAME: &str = "written-keys-tracker";

#[derive(Debug)]
struct TrackerState {
    /// Every id in `[0, watermark]` is written or failed
    watermark: i64,
    /// Ids whose write failed. Never shrinks.
    failed: HashSet<i64>,
    /// Ids written above the watermark, waiting for the gap below them to close
    pending: HashSet<i64>,
    successes: u64,
    failures: u64,
    shutdown: bool,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<TrackerState>,
    /// Wakes the coordination thread after a completion is recorded
    updated: Condvar,
    /// Wakes `wait_for_watermark` callers after the watermark moves
    advanced: Condvar,
    /// Lock-free mirror of `TrackerState::watermark`
    watermark: AtomicI64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Read-only view of covered ids, valid while the tracker lock is held
#[derive(Debug, Clone, Copy)]
pub struct Coverage<'a> {
    watermark: i64,
    failed: &'a HashSet<i64>,
}

impl Coverage<'_> {
    pub fn watermark(&self) -> i64 {
        self.watermark
    }

    pub fn is_failed(&self, id: i64) -> bool {
        self.failed.contains(&id)
    }
}

/// Point-in-time tracker counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackerSnapshot {
    pub watermark: i64,
    /// Successful ids above the watermark not yet folded in
    pub pending_successes: usize,
    pub failed_keys: usize,
    pub successes_recorded: u64,
    pub failures_recorded: u64,
}

/// Shared completion state plus the thread that advances the watermark
///
/// Dropping the tracker stops and joins the coordination thread.
#[derive(Debug)]
pub struct CompletionTracker {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl CompletionTracker {
    /// Create a tracker and start its coordination thread
    pub fn new() -> Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(TrackerState {
                watermark: -1,
                failed: HashSet::new(),
                pending: HashSet::new(),
                successes: 0,
                failures: 0,
                shutdown: false,
            }),
            updated: Condvar::new(),
            advanced: Condvar::new(),
            watermark: AtomicI64::new(-1),
        });

        let loop_shared = shared.clone();
        let handle = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || run_coordination_loop(&loop_shared))
            .map_err(|e| Error::Tracker(format!("failed to spawn {THREAD_NAME}: {e}")))?;

        tracing::debug!("Started {} thread", THREAD_NAME);
        Ok(Self { shared, handle: Some(handle) })
    }

    /// Record that the write of `id` succeeded
    pub fn record_success(&self, id: i64) {
        {
            let mut state = self.shared.lock();
            state.successes += 1;
            // At or below the watermark the position is already covered; an
            // entry there would never be folded.
            if id > state.watermark {
                state.pending.insert(id);
            }
        }
        self.shared.updated.notify_one();
    }

    /// Record that the write of `id` failed
    pub fn record_failure(&self, id: i64) {
        {
            let mut state = self.shared.lock();
            state.failures += 1;
            state.failed.insert(id);
        }
        self.shared.updated.notify_one();
    }

    /// Current watermark, -1 until id 0 is covered
    pub fn watermark(&self) -> i64 {
        self.shared.watermark.load(Ordering::Acquire)
    }

    /// Block until the watermark reaches `target` or `timeout` elapses
    ///
    /// Returns whether the target was reached.
    pub fn wait_for_watermark(&self, target: i64, timeout: Duration) -> bool {
        let guard = self.shared.lock();
        let (state, _) = self
            .shared
            .advanced
            .wait_timeout_while(guard, timeout, |state| state.watermark < target)
            .unwrap_or_else(PoisonError::into_inner);
        state.watermark >= target
    }

    /// Run `f` against a consistent view of the watermark and failed ids
    ///
    /// The tracker lock is held for the duration of `f`; keep it short.
    pub fn with_coverage<R>(&self, f: impl FnOnce(Coverage<'_>) -> R) -> R {
        let state = self.shared.lock();
        f(Coverage { watermark: state.watermark, failed: &state.failed })
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        let state = self.shared.lock();
        TrackerSnapshot {
            watermark: state.watermark,
            pending_successes: state.pending.len(),
            failed_keys: state.failed.len(),
            successes_recorded: state.successes,
            failures_recorded: state.failures,
        }
    }
}

impl Drop for CompletionTracker {
    fn drop(&mut self) {
        self.shared.lock().shutdown = true;
        self.shared.updated.notify_all();

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("{} thread panicked", THREAD_NAME);
            }
        }
        tracing::debug!("Stopped {} thread", THREAD_NAME);
    }
}

fn run_coordination_loop(shared: &Shared) {
    let mut state = shared.lock();
    while !state.shutdown {
        let start = state.watermark;
        loop {
            let candidate = state.watermark + 1;
            let written = state.pending.remove(&candidate);
            if written || state.failed.contains(&candidate) {
                state.watermark = candidate;
            } else {
                break;
            }
        }

        if state.watermark != start {
            shared.watermark.store(state.watermark, Ordering::Release);
            shared.advanced.notify_all();
        }

        // Checked and waited under the same guard: no completion slips in between.
        // Spurious wakeups just re-run the drain above.
        state = shared.updated.wait(state).unwrap_or_else(PoisonError::into_inner);
    }
}
