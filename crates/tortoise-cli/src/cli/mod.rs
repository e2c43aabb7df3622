//! CLI for tortoise.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tortoise_core::config;

use commands::{run_clear, run_downloads, run_health, run_populate, run_scan, run_status};

/// Top-level CLI for tortoise.
#[derive(Debug, Parser)]
#[command(name = "tortoise")]
#[command(about = "tortoise: slow, steady, crash-safe scanning and downloading", long_about = None)]
pub struct Cli {
    /// Use this config file instead of ~/.config/tortoise/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Enumerate sources and record discovered items, resuming a previous scan.
    Scan {
        /// File with one source locator per line (`#` comments allowed).
        sources: PathBuf,
    },

    /// Queue every discovered item from the scan results.
    Populate,

    /// Work through the download queue.
    Run {
        /// Concurrent workers (overrides queue.workers).
        #[arg(long, value_name = "N")]
        workers: Option<usize>,
        /// Exit when only not-yet-eligible retries remain instead of waiting for them.
        #[arg(long)]
        no_wait: bool,
    },

    /// Show queue and scan state.
    Status {
        /// Jobs listed per state.
        #[arg(long, default_value = "10", value_name = "N")]
        limit: usize,
    },

    /// Run one operation against a known target and diagnose the result.
    Health {
        /// Target to try (default: collaborator.health_reference).
        reference: Option<String>,
    },

    /// Remove every job from the queue.
    Clear {
        /// Also discard scan progress.
        #[arg(long)]
        scan: bool,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = match &cli.config {
            Some(path) => config::load_or_init_at(path)?,
            None => config::load_or_init()?,
        };
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Scan { sources } => run_scan(&cfg, &sources).await?,
            CliCommand::Populate => run_populate(&cfg)?,
            CliCommand::Run { workers, no_wait } => run_downloads(&cfg, workers, no_wait).await?,
            CliCommand::Status { limit } => run_status(&cfg, limit)?,
            CliCommand::Health { reference } => run_health(&cfg, reference.as_deref()).await?,
            CliCommand::Clear { scan } => run_clear(&cfg, scan)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
