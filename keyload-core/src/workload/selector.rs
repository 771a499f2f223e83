//! Read key selection below the watermark

use super::tracker::{CompletionTracker, Coverage};
use rand::Rng;
use std::iter;

/// Default number of random draws before falling back to a scan
pub const DEFAULT_MAX_READ_ATTEMPTS: usize = 64;

/// Ids checked per tracker lock during the fallback scan
const SCAN_CHUNK: usize = 1024;

/// Picks ids that are safe to read: covered by the watermark and not failed
///
/// Ids are drawn uniformly from `[0, watermark)`. When failures are so dense
/// that `max_attempts` draws all land on failed ids, the selector scans forward
/// from a random position instead of retrying forever.
#[derive(Debug, Clone, Copy)]
pub struct ReadKeySelector {
    max_attempts: usize,
}

impl Default for ReadKeySelector {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_READ_ATTEMPTS)
    }
}

impl ReadKeySelector {
    pub fn new(max_attempts: usize) -> Self {
        Self { max_attempts }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Select an id to read, or `None` if no written key is known yet
    pub fn select<R: Rng>(&self, tracker: &CompletionTracker, rng: &mut R) -> Option<i64> {
        let watermark = match tracker.with_coverage(|coverage| self.draw(coverage, rng)) {
            Draw::Found(id) => return Some(id),
            Draw::Empty => return None,
            Draw::Missed(watermark) => watermark,
        };

        tracing::debug!(
            watermark,
            attempts = self.max_attempts,
            "Random read key draws exhausted, scanning"
        );

        // Scanned in chunks so recorders and the coordination thread get the
        // lock in between. Ids at or below `watermark` stay covered and a
        // failed id never recovers, so a hit is still valid when it is found.
        let start = rng.random_range(0..watermark);
        let mut remaining =
            (start..watermark).chain(0..start).chain(iter::once(watermark)).peekable();
        while remaining.peek().is_some() {
            let found = tracker.with_coverage(|coverage| {
                remaining.by_ref().take(SCAN_CHUNK).find(|&id| !coverage.is_failed(id))
            });
            if found.is_some() {
                return found;
            }
        }
        None
    }

    fn draw<R: Rng>(&self, coverage: Coverage<'_>, rng: &mut R) -> Draw {
        let watermark = coverage.watermark();
        if watermark < 0 {
            return Draw::Empty;
        }
        if watermark == 0 {
            return if coverage.is_failed(0) { Draw::Empty } else { Draw::Found(0) };
        }

        for _ in 0..self.max_attempts {
            let id = rng.random_range(0..watermark);
            if !coverage.is_failed(id) {
                return Draw::Found(id);
            }
        }
        Draw::Missed(watermark)
    }
}

/// Outcome of the random draws taken under one tracker lock
enum Draw {
    Found(i64),
    /// Nothing readable is covered
    Empty,
    /// Every draw hit a failed id below this watermark
    Missed(i64),
}
