//! Load generator facade
//!
//! [`LoadGenerator`] is the single object a load run shares between its worker
//! threads. Writers ask it for keys and report how each write went; readers ask
//! it for keys that are known to exist and hand back what they read for
//! verification.
//!
//! ```
//! use keyload_core::workload::LoadGenerator;
//! use std::time::Duration;
//!
//! let generator = LoadGenerator::new(0, 3).unwrap();
//! generator.set_key_prefix("demo:");
//!
//! for _ in 0..3 {
//!     let key = generator.get_key_to_write().unwrap();
//!     // ... store key.expected_payload() under key.as_string() ...
//!     generator.record_write_success(&key);
//! }
//! assert!(generator.wait_for_watermark(2, Duration::from_secs(5)));
//!
//! let key = generator.get_key_to_read().unwrap();
//! assert!(key.as_string().starts_with("demo:"));
//! assert!(generator.verify(&key, &key.expected_payload()));
//! ```

use super::allocator::{Allocation, KeyAllocator};
use super::key::Key;
use super::selector::ReadKeySelector;
use super::tracker::{CompletionTracker, TrackerSnapshot};
use super::verify::{PayloadVerifier, VerificationMismatch, VerificationStats};
use crate::config::GeneratorConfig;
use crate::Result;
use rand::Rng;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

/// Key source and completion sink shared by all workers of a run
#[derive(Debug)]
pub struct LoadGenerator {
    allocator: KeyAllocator,
    tracker: CompletionTracker,
    selector: ReadKeySelector,
    verifier: PayloadVerifier,
    key_prefix: RwLock<Arc<str>>,
}

impl LoadGenerator {
    /// Create a generator for the fill range `(start_key, end_key)`
    pub fn new(start_key: i64, end_key: i64) -> Result<Self> {
        Self::from_config(&GeneratorConfig::new(start_key, end_key))
    }

    pub fn from_config(config: &GeneratorConfig) -> Result<Self> {
        config.validate()?;
        let prefix = config.resolved_prefix();
        tracing::debug!(
            start_key = config.start_key,
            end_key = config.end_key,
            prefix = %prefix,
            "Creating load generator"
        );

        Ok(Self {
            allocator: KeyAllocator::new(config.start_key, config.end_key),
            tracker: CompletionTracker::new()?,
            selector: ReadKeySelector::new(config.max_read_attempts),
            verifier: PayloadVerifier::default(),
            key_prefix: RwLock::new(Arc::from(prefix)),
        })
    }

    /// Replace the prefix of keys generated from now on
    pub fn set_key_prefix(&self, prefix: impl Into<String>) {
        let prefix: Arc<str> = Arc::from(prefix.into());
        *self.key_prefix.write().unwrap_or_else(PoisonError::into_inner) = prefix;
    }

    pub fn key_prefix(&self) -> Arc<str> {
        self.key_prefix.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Next key to write
    ///
    /// A fresh key while the fill range lasts, afterwards an existing key to
    /// update. `None` only when the range is used up and no key is readable.
    pub fn get_key_to_write(&self) -> Option<Key> {
        self.get_key_to_write_with(&mut rand::rng())
    }

    /// [`get_key_to_write`](Self::get_key_to_write) drawing updates from `rng`
    pub fn get_key_to_write_with<R: Rng>(&self, rng: &mut R) -> Option<Key> {
        match self.allocator.next_fresh() {
            Allocation::Fresh(id) => Some(self.generate_key(id)),
            Allocation::Exhausted => self.get_key_to_read_with(rng),
        }
    }

    /// A key known to be written, or `None` before the first one is confirmed
    pub fn get_key_to_read(&self) -> Option<Key> {
        self.get_key_to_read_with(&mut rand::rng())
    }

    pub fn get_key_to_read_with<R: Rng>(&self, rng: &mut R) -> Option<Key> {
        self.selector.select(&self.tracker, rng).map(|id| self.generate_key(id))
    }

    pub fn record_write_success(&self, key: &Key) {
        self.tracker.record_success(key.as_number());
    }

    pub fn record_write_failure(&self, key: &Key) {
        self.tracker.record_failure(key.as_number());
    }

    /// Verify a payload read for `key`, returning whether it matched
    pub fn verify(&self, key: &Key, observed: &str) -> bool {
        self.verifier.verify(key, observed)
    }

    pub fn verification_stats(&self) -> VerificationStats {
        self.verifier.stats()
    }

    pub fn mismatches(&self) -> Vec<VerificationMismatch> {
        self.verifier.mismatches()
    }

    pub fn watermark(&self) -> i64 {
        self.tracker.watermark()
    }

    pub fn max_generated_key(&self) -> i64 {
        self.allocator.max_generated_key()
    }

    /// Whether the fill range is used up and writes have become updates
    pub fn fill_complete(&self) -> bool {
        self.allocator.is_exhausted()
    }

    pub fn wait_for_watermark(&self, target: i64, timeout: Duration) -> bool {
        self.tracker.wait_for_watermark(target, timeout)
    }

    pub fn tracker_snapshot(&self) -> TrackerSnapshot {
        self.tracker.snapshot()
    }

    pub fn start_key(&self) -> i64 {
        self.allocator.start_key()
    }

    pub fn end_key(&self) -> i64 {
        self.allocator.end_key()
    }

    fn generate_key(&self, id: i64) -> Key {
        Key::new(id, self.key_prefix())
    }
}
