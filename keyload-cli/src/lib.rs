//! keyload CLI library
//!
//! This library exposes profile configuration and the drill runner for testing
//! and reuse.

pub mod config;
pub mod drill;
pub mod output;
