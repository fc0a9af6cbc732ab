//! Scenario runner and fuzzer configuration.

use std::path::{Path, PathBuf};

use figment::providers::{Format, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::ConfigError;

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct SimulatorConfig {
    /// Seed used by `fuzz` when none is given on the command line.
    #[serde(default = "default_seed")]
    pub default_seed: u64,

    /// Upper bound on the number of steps a scenario may contain.
    #[serde(default = "default_max_steps")]
    #[validate(range(min = 1, max = 100000))]
    pub max_steps: usize,

    /// Longest duration, in milliseconds, a generated step may use.
    #[serde(default = "default_max_step_ms")]
    #[validate(range(min = 1))]
    pub max_step_ms: u64,

    /// Upper bound on how many ticks a generated ticker may deliver in one
    /// advance, keeping fuzz runs short.
    #[serde(default = "default_max_ticks")]
    #[validate(range(min = 1, max = 10000))]
    pub max_ticks_per_advance: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            default_seed: default_seed(),
            max_steps: default_max_steps(),
            max_step_ms: default_max_step_ms(),
            max_ticks_per_advance: default_max_ticks(),
        }
    }
}

fn default_seed() -> u64 {
    42
}

fn default_max_steps() -> usize {
    1024
}

fn default_max_step_ms() -> u64 {
    5_000
}

fn default_max_ticks() -> u64 {
    64
}

impl SimulatorConfig {
    /// Load only SimulatorConfig from a specific path.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }

        Figment::new()
            .merge(Yaml::file(path))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}
