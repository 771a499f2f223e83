//! keyload core library
//!
//! Key allocation and completion tracking for fill/verify load runs: workers
//! get fresh keys to write, report each write's outcome, and read back only
//! keys that are known to have been written, even though writes complete out of
//! order.

pub mod config;
pub mod error;
pub mod seed;
pub mod threading;
pub mod workload;

pub use config::GeneratorConfig;
pub use error::{Error, Result};
pub use workload::{Key, LoadGenerator};
