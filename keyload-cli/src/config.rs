//! Profile configuration for keyload drills
//!
//! A profile is a TOML file describing one fill/verify drill: the key range,
//! how many writer and reader threads to run, how unreliable the simulated
//! store is, and where to put the results. Any value can be overridden from
//! the command line with `--set section.field=value`.

use anyhow::{bail, Context, Result};
use keyload_core::workload::DEFAULT_MAX_READ_ATTEMPTS;
use keyload_core::GeneratorConfig;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Top-level profile configuration
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ProfileConfig {
    pub experiment: ExperimentConfig,
    pub keys: KeysConfig,
    pub workers: WorkersConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Experiment metadata and stop conditions
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ExperimentConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Master seed for reproducibility (None = use entropy)
    #[serde(default)]
    pub seed: Option<u64>,
    /// Upper bound on drill wall time
    #[serde(with = "humantime_serde")]
    #[schemars(with = "String")]
    pub duration: Duration,
    /// Stop after this many write attempts (fresh and update writes)
    #[serde(default)]
    pub max_writes: Option<u64>,
    /// How long to wait for the watermark to settle once writers stop
    #[serde(with = "humantime_serde", default = "default_drain_timeout")]
    #[schemars(with = "String")]
    pub drain_timeout: Duration,
}

fn default_drain_timeout() -> Duration {
    Duration::from_secs(5)
}

/// Key range and naming
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct KeysConfig {
    #[serde(default)]
    pub start_key: i64,
    pub end_key: i64,
    /// Key prefix (None = per-process unique prefix)
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default = "default_max_read_attempts")]
    pub max_read_attempts: usize,
}

fn default_max_read_attempts() -> usize {
    DEFAULT_MAX_READ_ATTEMPTS
}

/// Worker thread counts
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct WorkersConfig {
    pub writers: usize,
    #[serde(default)]
    pub readers: usize,
    /// Reads each reader performs before it stops, even after the writers
    /// are done (still bounded by the experiment duration)
    #[serde(default)]
    pub min_reads_per_reader: u64,
}

/// Fault injection for the in-memory store
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
pub struct StoreConfig {
    /// Probability that a write is rejected
    #[serde(default)]
    pub write_failure_rate: f64,
    /// Probability that an accepted write stores a damaged payload
    #[serde(default)]
    pub corruption_rate: f64,
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
pub struct OutputConfig {
    /// JSON results file
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl ProfileConfig {
    /// Load profile from TOML file
    ///
    /// Validation is left to the caller so that values can still be
    /// overridden; see [`ProfileConfig::from_file_with_overrides`].
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        read_toml(path)?
            .try_into()
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load profile from TOML file, apply `key.path=value` overrides, validate
    pub fn from_file_with_overrides<P: AsRef<Path>>(path: P, overrides: &[String]) -> Result<Self> {
        let mut value = read_toml(path.as_ref())?;
        for override_str in overrides {
            apply_override(&mut value, override_str)
                .with_context(|| format!("Failed to apply override: {override_str}"))?;
        }

        let config: ProfileConfig =
            value.try_into().context("Failed to deserialize modified configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.experiment.name.is_empty() {
            bail!("Experiment name cannot be empty");
        }
        if self.experiment.duration.is_zero() {
            bail!("Experiment duration must be > 0");
        }
        if Instant::now().checked_add(self.experiment.duration).is_none() {
            bail!("Experiment duration {:?} is too large", self.experiment.duration);
        }
        if self.experiment.max_writes == Some(0) {
            bail!("max_writes must be > 0 when set");
        }

        self.generator_config().validate().context("Invalid [keys] section")?;

        if self.workers.writers == 0 {
            bail!("At least one writer thread is required");
        }

        for (name, rate) in [
            ("write_failure_rate", self.store.write_failure_rate),
            ("corruption_rate", self.store.corruption_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                bail!("store.{name} must be in range [0.0, 1.0], got {rate}");
            }
        }

        Ok(())
    }

    /// Generator settings described by the `[keys]` section
    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            start_key: self.keys.start_key,
            end_key: self.keys.end_key,
            key_prefix: self.keys.prefix.clone(),
            max_read_attempts: self.keys.max_read_attempts,
        }
    }
}

fn read_toml(path: &Path) -> Result<toml::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Apply one `a.b.c=value` override to a parsed profile
fn apply_override(root: &mut toml::Value, override_str: &str) -> Result<()> {
    let Some((path, raw)) = override_str.split_once('=') else {
        bail!("Invalid override format '{override_str}'. Expected 'key=value'");
    };

    let segments: Vec<&str> = path.trim().split('.').filter(|s| !s.is_empty()).collect();
    let Some((field, parents)) = segments.split_last() else {
        bail!("Empty path");
    };

    let mut table = root.as_table_mut().context("Profile root is not a table")?;
    for parent in parents {
        table = table
            .entry(parent.to_string())
            .or_insert(toml::Value::Table(toml::Table::new()))
            .as_table_mut()
            .with_context(|| format!("'{parent}' is not a table"))?;
    }

    table.insert(field.to_string(), parse_value(raw));
    Ok(())
}

/// Infer a TOML value from an override's right-hand side
fn parse_value(raw: &str) -> toml::Value {
    let trimmed = raw.trim();

    if let Ok(b) = trimmed.parse::<bool>() {
        return toml::Value::Boolean(b);
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return toml::Value::Integer(i);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        return toml::Value::Float(f);
    }

    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| trimmed.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
        .unwrap_or(trimmed);
    toml::Value::String(unquoted.to_string())
}
