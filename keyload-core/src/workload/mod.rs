//! Key workload: allocation, completion tracking, read selection, verification

pub mod allocator;
pub mod generator;
pub mod key;
pub mod selector;
pub mod tracker;
pub mod verify;

// Re-export main types
pub use allocator::{Allocation, KeyAllocator};
pub use generator::LoadGenerator;
pub use key::{Key, VALUE_TAG};
pub use selector::{ReadKeySelector, DEFAULT_MAX_READ_ATTEMPTS};
pub use tracker::{CompletionTracker, Coverage, TrackerSnapshot};
pub use verify::{PayloadVerifier, VerificationMismatch, VerificationStats};
