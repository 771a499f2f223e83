//! Read payload verification bookkeeping
//!
//! [`Key::verify`](super::Key::verify) decides whether a single payload is
//! correct. [`PayloadVerifier`] aggregates those outcomes across all reader
//! threads so a run can report how many reads were checked and which keys came
//! back wrong.

use super::key::Key;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Number of mismatches kept for reporting by default
pub const DEFAULT_RETAINED_MISMATCHES: usize = 1024;

/// Represents a verification mismatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationMismatch {
    /// External string form of the key
    pub key: String,
    /// Key id
    pub id: i64,
    /// Expected payload
    pub expected: String,
    /// Payload actually read
    pub actual: String,
}

impl fmt::Display for VerificationMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "value mismatch for key {}: expected {:?}, got {:?}",
            self.key, self.expected, self.actual
        )
    }
}

impl std::error::Error for VerificationMismatch {}

/// Verification statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VerificationStats {
    pub total_verifications: u64,
    pub successful: u64,
    pub failed: u64,
    pub mismatch_rate: f64,
}

/// Thread-safe aggregation of verification outcomes
#[derive(Debug)]
pub struct PayloadVerifier {
    verification_count: AtomicU64,
    failure_count: AtomicU64,
    /// First mismatches seen, capped at `max_retained`
    mismatches: Mutex<Vec<VerificationMismatch>>,
    max_retained: usize,
}

impl Default for PayloadVerifier {
    fn default() -> Self {
        Self::new(DEFAULT_RETAINED_MISMATCHES)
    }
}

impl PayloadVerifier {
    /// Create a verifier that keeps at most `max_retained` mismatches
    pub fn new(max_retained: usize) -> Self {
        Self {
            verification_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
            mismatches: Mutex::new(Vec::new()),
            max_retained,
        }
    }

    /// Verify a payload read for `key`
    ///
    /// # Returns
    /// - `true` if the payload matched
    /// - `false` if it did not (mismatch counted and possibly retained)
    pub fn verify(&self, key: &Key, observed: &str) -> bool {
        self.verification_count.fetch_add(1, Ordering::Relaxed);

        match key.verify(observed) {
            Ok(()) => true,
            Err(mismatch) => {
                self.failure_count.fetch_add(1, Ordering::Relaxed);
                let mut retained =
                    self.mismatches.lock().unwrap_or_else(PoisonError::into_inner);
                if retained.len() < self.max_retained {
                    retained.push(mismatch);
                }
                false
            }
        }
    }

    /// Get verification statistics
    pub fn stats(&self) -> VerificationStats {
        let total = self.verification_count.load(Ordering::Relaxed);
        let failed = self.failure_count.load(Ordering::Relaxed);
        VerificationStats {
            total_verifications: total,
            successful: total.saturating_sub(failed),
            failed,
            mismatch_rate: if total > 0 { failed as f64 / total as f64 } else { 0.0 },
        }
    }

    /// Retained mismatches, oldest first
    pub fn mismatches(&self) -> Vec<VerificationMismatch> {
        self.mismatches.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn has_mismatches(&self) -> bool {
        self.failure_count.load(Ordering::Relaxed) > 0
    }
}
