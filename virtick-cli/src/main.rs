//! ## virtick-cli
//! **Command line driver for the virtick simulator**
//!
//! ### Expectations:
//! - `replay` runs a recorded scenario and optionally verifies its digest
//! - `fuzz` runs generated scenarios seed after seed, checking each twice
//! - `generate` prints a generated scenario so a fuzz case can be kept as a file

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use virtick_config::VirtickConfig;
use virtick_telemetry::logging::ClockLogger;
use virtick_telemetry::metrics::MetricsRecorder;

mod commands;
mod error;

use commands::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => VirtickConfig::load_from_path(path),
        None => VirtickConfig::load(),
    }
    .context("failed to load configuration")?;

    let level = cli
        .log_level
        .as_deref()
        .unwrap_or(&config.telemetry.log_level);
    ClockLogger::init_with_level(level);

    let metrics = Arc::new(MetricsRecorder::new());
    match cli.command {
        Commands::Replay(args) => commands::run_replay(args, &config, Arc::clone(&metrics))?,
        Commands::Fuzz(args) => commands::run_fuzz(args, &config, Arc::clone(&metrics))?,
        Commands::Generate(args) => commands::run_generate(args, &config)?,
    }

    if config.telemetry.metrics {
        print!("{}", metrics.gather_metrics()?);
    }
    Ok(())
}
