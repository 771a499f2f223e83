//! Fresh key allocation for the fill phase
//!
//! The allocator hands out ids `0, 1, ..., end_key - 1` exactly once each, to
//! any number of concurrent callers, without taking a lock. After the last id
//! has been claimed it reports [`Allocation::Exhausted`] and callers switch to
//! updating keys that already exist.

use std::sync::atomic::{AtomicI64, Ordering};

/// Outcome of a fresh-key claim
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allocation {
    /// A never-before-issued id
    Fresh(i64),
    /// Every id of the fill range has been issued
    Exhausted,
}

/// Lock-free cursor over the fill range
#[derive(Debug)]
pub struct KeyAllocator {
    start_key: i64,
    end_key: i64,
    /// Highest id handed out so far; -1 before the first claim
    max_generated: AtomicI64,
}

impl KeyAllocator {
    /// Create an allocator for the fill range `(start_key, end_key)`
    ///
    /// Ids always count from 0. `start_key` is retained for reporting only.
    pub fn new(start_key: i64, end_key: i64) -> Self {
        Self { start_key, end_key, max_generated: AtomicI64::new(-1) }
    }

    /// Claim the next fresh id
    pub fn next_fresh(&self) -> Allocation {
        let last = self.end_key.saturating_sub(1);
        let claimed = self.max_generated.fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
            (cur < last).then_some(cur + 1)
        });

        match claimed {
            Ok(prev) => {
                let id = prev + 1;
                if id == last {
                    tracing::debug!(end_key = self.end_key, "Fill range fully allocated");
                }
                Allocation::Fresh(id)
            }
            Err(_) => Allocation::Exhausted,
        }
    }

    /// Highest id handed out so far, or -1
    pub fn max_generated_key(&self) -> i64 {
        self.max_generated.load(Ordering::Acquire)
    }

    /// Whether every id of the fill range has been handed out
    pub fn is_exhausted(&self) -> bool {
        self.max_generated_key() >= self.end_key.saturating_sub(1)
    }

    pub fn start_key(&self) -> i64 {
        self.start_key
    }

    pub fn end_key(&self) -> i64 {
        self.end_key
    }
}
