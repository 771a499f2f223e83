//! Results output formatting

use crate::config::ProfileConfig;
use crate::drill::WorkerStats;
use anyhow::{Context, Result};
use keyload_core::workload::{TrackerSnapshot, VerificationMismatch, VerificationStats};
use keyload_core::LoadGenerator;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

/// Mismatches included in a results file
const REPORTED_MISMATCHES: usize = 20;

/// Drill results
#[derive(Debug, Clone, Serialize)]
pub struct DrillResults {
    pub name: String,
    pub key_prefix: String,
    pub start_key: i64,
    pub end_key: i64,
    pub duration_secs: f64,
    pub writes_ok: u64,
    pub writes_failed: u64,
    pub reads: u64,
    pub missing_reads: u64,
    pub idle_polls: u64,
    pub throughput_ops: f64,
    pub max_generated_key: i64,
    pub fill_complete: bool,
    /// Whether the watermark caught up with the last generated key
    pub watermark_settled: bool,
    pub stored_keys: usize,
    pub tracker: TrackerSnapshot,
    pub verification: VerificationStats,
    pub mismatches: Vec<VerificationMismatch>,
}

impl DrillResults {
    pub fn new(
        config: &ProfileConfig,
        generator: &LoadGenerator,
        totals: WorkerStats,
        elapsed: Duration,
        watermark_settled: bool,
        stored_keys: usize,
    ) -> Self {
        let duration_secs = elapsed.as_secs_f64();
        let ops = totals.writes_ok + totals.writes_failed + totals.reads;
        let throughput_ops = if duration_secs > 0.0 { ops as f64 / duration_secs } else { 0.0 };

        let mut mismatches = generator.mismatches();
        mismatches.truncate(REPORTED_MISMATCHES);

        Self {
            name: config.experiment.name.clone(),
            key_prefix: generator.key_prefix().to_string(),
            start_key: generator.start_key(),
            end_key: generator.end_key(),
            duration_secs,
            writes_ok: totals.writes_ok,
            writes_failed: totals.writes_failed,
            reads: totals.reads,
            missing_reads: totals.missing_reads,
            idle_polls: totals.idle_polls,
            throughput_ops,
            max_generated_key: generator.max_generated_key(),
            fill_complete: generator.fill_complete(),
            watermark_settled,
            stored_keys,
            tracker: generator.tracker_snapshot(),
            verification: generator.verification_stats(),
            mismatches,
        }
    }

    /// Whether every read found its key with the expected payload
    pub fn is_clean(&self) -> bool {
        self.verification.failed == 0 && self.missing_reads == 0
    }

    /// Print results to stdout in human-readable format
    pub fn print_human(&self) {
        println!("\n{}", "=".repeat(60));
        println!("keyload drill results: {}", self.name);
        println!("{}", "=".repeat(60));
        println!();
        println!("Keys:");
        println!("  Prefix:          {}", self.key_prefix);
        println!("  Range:           {}..{}", self.start_key, self.end_key);
        println!("  Max generated:   {}", self.max_generated_key);
        println!("  Watermark:       {}", self.tracker.watermark);
        println!("  Settled:         {}", self.watermark_settled);
        println!("  Fill complete:   {}", self.fill_complete);
        println!();
        println!("Operations ({:.2}s):", self.duration_secs);
        println!("  Writes ok:       {}", self.writes_ok);
        println!("  Writes failed:   {}", self.writes_failed);
        println!("  Reads:           {}", self.reads);
        println!("  Missing reads:   {}", self.missing_reads);
        println!("  Rate:            {:.2} ops/s", self.throughput_ops);
        println!();
        println!("Verification:");
        println!("  Checked:         {}", self.verification.total_verifications);
        println!("  Mismatches:      {}", self.verification.failed);
        for mismatch in &self.mismatches {
            println!("    {mismatch}");
        }
        println!();
        println!("{}", "=".repeat(60));
    }

    /// Write results to JSON file
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)
            .with_context(|| format!("Failed to create results file: {}", path.display()))?;
        file.write_all(json.as_bytes())?;
        println!("Results written to: {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExperimentConfig, KeysConfig, WorkersConfig};

    fn profile() -> ProfileConfig {
        ProfileConfig {
            experiment: ExperimentConfig {
                name: "unit".into(),
                description: None,
                seed: Some(1),
                duration: Duration::from_secs(1),
                max_writes: None,
                drain_timeout: Duration::from_secs(1),
            },
            keys: KeysConfig {
                start_key: 0,
                end_key: 10,
                prefix: Some("u:".into()),
                max_read_attempts: 8,
            },
            workers: WorkersConfig { writers: 1, readers: 1, min_reads_per_reader: 0 },
            store: Default::default(),
            output: Default::default(),
        }
    }

    #[test]
    fn test_results_from_generator() {
        let config = profile();
        let generator = LoadGenerator::from_config(&config.generator_config()).unwrap();
        let key = generator.get_key_to_write().unwrap();
        generator.record_write_success(&key);
        generator.verify(&key, "val:0");
        generator.verify(&key, "bogus");

        let totals = WorkerStats { writes_ok: 1, reads: 2, ..Default::default() };
        let results =
            DrillResults::new(&config, &generator, totals, Duration::from_secs(2), true, 1);

        assert_eq!(results.name, "unit");
        assert_eq!(results.key_prefix, "u:");
        assert_eq!(results.throughput_ops, 1.5);
        assert_eq!(results.max_generated_key, 0);
        assert_eq!(results.verification.failed, 1);
        assert_eq!(results.mismatches.len(), 1);
        assert!(!results.is_clean());
    }

    #[test]
    fn test_json_serialization() {
        let config = profile();
        let generator = LoadGenerator::from_config(&config.generator_config()).unwrap();
        let results = DrillResults::new(
            &config,
            &generator,
            WorkerStats::default(),
            Duration::from_secs(1),
            true,
            0,
        );

        let json = serde_json::to_string(&results).unwrap();
        assert!(json.contains("\"name\":\"unit\""));
        assert!(json.contains("\"watermark\":-1"));
        assert!(json.contains("\"total_verifications\":0"));
        assert!(results.is_clean());
    }
}
