//! Configuration types for keyload core

use crate::workload::selector::DEFAULT_MAX_READ_ATTEMPTS;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Key generator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Nominal first key of the fill range. Allocation always counts from 0.
    #[serde(default)]
    pub start_key: i64,
    /// Fresh ids `0..end_key` are handed out before writes turn into updates
    pub end_key: i64,
    /// Key namespace; a per-process unique prefix when unset
    #[serde(default)]
    pub key_prefix: Option<String>,
    /// Random draws per read selection before scanning
    #[serde(default = "default_max_read_attempts")]
    pub max_read_attempts: usize,
}

fn default_max_read_attempts() -> usize {
    DEFAULT_MAX_READ_ATTEMPTS
}

impl GeneratorConfig {
    pub fn new(start_key: i64, end_key: i64) -> Self {
        Self {
            start_key,
            end_key,
            key_prefix: None,
            max_read_attempts: DEFAULT_MAX_READ_ATTEMPTS,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_key < 0 {
            return Err(Error::Config(format!("start_key must be >= 0, got {}", self.start_key)));
        }
        if self.end_key < self.start_key {
            return Err(Error::Config(format!(
                "end_key ({}) must be >= start_key ({})",
                self.end_key, self.start_key
            )));
        }
        Ok(())
    }

    /// The configured prefix, or the process-wide default
    pub fn resolved_prefix(&self) -> String {
        self.key_prefix.clone().unwrap_or_else(|| default_key_prefix().to_string())
    }
}

/// Run-unique key prefix shared by every generator in this process
pub fn default_key_prefix() -> &'static str {
    static PREFIX: OnceLock<String> = OnceLock::new();
    PREFIX.get_or_init(|| format!("{}:", uuid::Uuid::new_v4()))
}
