use anyhow::bail;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use keyload_cli::config::ProfileConfig;
use keyload_cli::drill::run_drill;
use schemars::schema_for;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// keyload: fill/verify drills for the key allocation and tracking engine
///
/// Example usage:
///   keyload run -P profiles/fill-verify.toml
///   keyload run -P profiles/flaky-store.toml --set store.write_failure_rate=0.2
///   keyload run -P profiles/fill-verify.toml --set experiment.seed=7 --set keys.end_key=500000
///   keyload completions bash > ~/.local/share/bash-completion/completions/keyload
#[derive(Parser)]
#[command(name = "keyload")]
#[command(
    version,
    about = "Fill/verify drills with out-of-order completion tracking",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a drill described by a TOML profile
    Run {
        /// Path to TOML profile configuration file
        #[arg(short = 'P', long, required = true)]
        profile: PathBuf,

        /// Override any configuration value using dot notation (repeatable)
        ///
        /// Examples:
        ///   --set keys.end_key=100000
        ///   --set workers.readers=4
        ///   --set experiment.duration=60s
        ///   --set output.file=/tmp/drill.json
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print the JSON Schema of profile files
    Schema,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Run { profile, set } => run(profile, set),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "keyload", &mut io::stdout());
            Ok(())
        }
        Commands::Schema => {
            let schema = schema_for!(ProfileConfig);
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
    }
}

fn run(profile: PathBuf, set: Vec<String>) -> anyhow::Result<()> {
    tracing::info!("Loading profile: {}", profile.display());
    let config = ProfileConfig::from_file_with_overrides(&profile, &set)?;

    if let Some(desc) = &config.experiment.description {
        tracing::info!("Description: {}", desc);
    }
    match config.experiment.seed {
        Some(seed) => tracing::info!("Seed: {} (reproducible mode)", seed),
        None => tracing::info!("Seed: none (entropy)"),
    }

    let results = run_drill(&config)?;
    results.print_human();
    if let Some(path) = &config.output.file {
        results.write_json(path)?;
    }

    if !results.is_clean() {
        bail!(
            "Data integrity check failed: {} mismatches, {} missing reads",
            results.verification.failed,
            results.missing_reads
        );
    }
    tracing::info!("Drill completed successfully");
    Ok(())
}
