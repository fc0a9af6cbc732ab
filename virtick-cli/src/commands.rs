use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use virtick_config::VirtickConfig;
use virtick_simulator::{generate, replay_scenario, Scenario, ScenarioError, ScenarioRunner};
use virtick_telemetry::metrics::MetricsRecorder;

use crate::error::FuzzError;

#[derive(Parser)]
#[command(name = "virtick", version, about)]
pub struct Cli {
    /// Configuration file (defaults to config/virtick.yaml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level, overriding the configuration file
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay a scenario file against a fresh virtual clock
    Replay(ReplayArgs),
    /// Run generated scenarios, checking determinism and ordering
    Fuzz(FuzzArgs),
    /// Print a generated scenario as YAML
    Generate(GenerateArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    #[arg(short, long)]
    pub scenario: PathBuf,
    /// Expected timeline digest (hex)
    #[arg(long)]
    pub validate_hash: Option<String>,
    /// Print the timeline
    #[arg(long)]
    pub print: bool,
}

#[derive(Args, Debug, Clone)]
pub struct FuzzArgs {
    /// Initial seed (auto-increments); defaults to the configured seed
    #[arg(long)]
    pub seed: Option<u64>,
    /// Number of fuzzing iterations (0 for unlimited)
    #[arg(long, default_value_t = 100)]
    pub iterations: u64,
    /// Steps per scenario; defaults to the configured maximum
    #[arg(long)]
    pub steps: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(long)]
    pub seed: Option<u64>,
    #[arg(long, default_value_t = 32)]
    pub steps: usize,
}

fn runner(config: &VirtickConfig, metrics: Arc<MetricsRecorder>) -> ScenarioRunner {
    let runner = ScenarioRunner::new(config.simulator.clone());
    if config.telemetry.metrics {
        runner.with_metrics(metrics)
    } else {
        runner
    }
}

pub fn run_replay(
    args: ReplayArgs,
    config: &VirtickConfig,
    metrics: Arc<MetricsRecorder>,
) -> anyhow::Result<()> {
    let runner = runner(config, metrics);
    let timeline = replay_scenario(&runner, &args.scenario, args.validate_hash.as_deref())
        .with_context(|| format!("replay of {} failed", args.scenario.display()))?;

    if args.print {
        print!("{timeline}");
    }
    println!("{}", timeline.digest());
    Ok(())
}

pub fn run_fuzz(
    args: FuzzArgs,
    config: &VirtickConfig,
    metrics: Arc<MetricsRecorder>,
) -> anyhow::Result<()> {
    let runner = runner(config, metrics);
    let steps = args.steps.unwrap_or(config.simulator.max_steps);
    let mut seed = args.seed.unwrap_or(config.simulator.default_seed);
    let mut count = 0;

    loop {
        if args.iterations > 0 && count >= args.iterations {
            break;
        }
        let scenario = generate(seed, steps, runner.config());
        if let Err(err) = fuzz_one(&runner, seed, &scenario) {
            error!(seed, %err, "fuzz iteration failed");
            return Err(err.into());
        }

        seed = seed.wrapping_add(1);
        count += 1;
    }
    info!(iterations = count, "fuzzing finished");
    Ok(())
}

fn fuzz_one(runner: &ScenarioRunner, seed: u64, scenario: &Scenario) -> Result<(), FuzzError> {
    let save = |source: ScenarioError| {
        let saved = PathBuf::from(format!("fuzz-failure-{seed}.yaml"));
        if let Ok(yaml) = scenario.to_yaml() {
            let _ = fs::write(&saved, yaml);
        }
        FuzzError::Failed {
            seed,
            saved,
            source,
        }
    };

    let first = runner.run(scenario).map_err(save)?;
    first.check_consistency().map_err(save)?;

    let expected = scenario.total_advance_ms();
    if first.final_offset_ms() != expected {
        return Err(FuzzError::OffsetMismatch {
            seed,
            expected,
            actual: first.final_offset_ms(),
        });
    }

    let second = runner.run(scenario).map_err(save)?;
    if first.digest() != second.digest() {
        return Err(FuzzError::Nondeterministic {
            seed,
            first: first.digest(),
            second: second.digest(),
        });
    }
    info!(seed, digest = %first.digest(), "fuzz iteration passed");
    Ok(())
}

pub fn run_generate(args: GenerateArgs, config: &VirtickConfig) -> anyhow::Result<()> {
    let seed = args.seed.unwrap_or(config.simulator.default_seed);
    let scenario = generate(seed, args.steps, &config.simulator);
    print!("{}", scenario.to_yaml()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_replay_with_global_config() {
        let cli = Cli::parse_from([
            "virtick",
            "replay",
            "--scenario",
            "s.yaml",
            "--validate-hash",
            "abc",
            "--config",
            "c.yaml",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("c.yaml")));
        match cli.command {
            Commands::Replay(args) => {
                assert_eq!(args.scenario, PathBuf::from("s.yaml"));
                assert_eq!(args.validate_hash.as_deref(), Some("abc"));
            }
            _ => panic!("expected replay"),
        }
    }

    #[test]
    fn fuzz_iterations_pass() {
        let config = VirtickConfig::default();
        let args = FuzzArgs {
            seed: Some(3),
            iterations: 4,
            steps: Some(24),
        };
        run_fuzz(args, &config, Arc::new(MetricsRecorder::new())).unwrap();
    }
}
