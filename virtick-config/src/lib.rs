//! # Virtick Configuration System
//!
//! Layered configuration for the virtick tools.
//!
//! ## Features
//! - **Layering**: defaults, then `config/virtick.yaml`, then `VIRTICK_*` environment
//! - **Validation**: every section is checked with `validator` after extraction

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::Validate;

mod error;
mod simulator;
mod telemetry;
mod validation;

pub use error::ConfigError;
pub use simulator::SimulatorConfig;
pub use telemetry::TelemetryConfig;

/// Default location of the base configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/virtick.yaml";

/// Top-level configuration container.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone)]
pub struct VirtickConfig {
    /// Logging and metrics.
    #[validate(nested)]
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Scenario runner and fuzzer bounds.
    #[validate(nested)]
    #[serde(default)]
    pub simulator: SimulatorConfig,
}

impl VirtickConfig {
    /// Load configuration from the default file and environment.
    ///
    /// Hierarchy:
    /// 1. Default values
    /// 2. `config/virtick.yaml`, if present
    /// 3. `VIRTICK_*` environment variables (`__` separates sections)
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(VirtickConfig::default()));

        if Path::new(DEFAULT_CONFIG_PATH).exists() {
            figment = figment.merge(Yaml::file(DEFAULT_CONFIG_PATH));
        } else {
            debug!("{DEFAULT_CONFIG_PATH} not found, using default configuration");
        }

        Self::finish(figment)
    }

    /// Load configuration from a specific path, still honouring the environment.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }

        let figment = Figment::from(Serialized::defaults(VirtickConfig::default()))
            .merge(Yaml::file(path));
        Self::finish(figment)
    }

    fn finish(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .merge(Env::prefixed("VIRTICK_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn jailed(err: ConfigError) -> figment::Error {
        figment::Error::from(err.to_string())
    }

    #[test]
    fn default_config_validates() {
        let config = VirtickConfig::default();
        config.validate().expect("Default config should validate");
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.simulator.max_steps, 1024);
    }

    #[test]
    fn defaults_apply_without_a_file() {
        Jail::expect_with(|_jail| {
            let config = VirtickConfig::load().map_err(jailed)?;
            assert_eq!(config.simulator, SimulatorConfig::default());
            Ok(())
        });
    }

    #[test]
    fn file_then_environment_override() {
        Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file(
                DEFAULT_CONFIG_PATH,
                "telemetry:\n  log_level: debug\nsimulator:\n  max_steps: 10\n",
            )?;
            jail.set_env("VIRTICK_SIMULATOR__MAX_STEPS", "20");

            let config = VirtickConfig::load().map_err(jailed)?;
            assert_eq!(config.telemetry.log_level, "debug");
            assert_eq!(config.simulator.max_steps, 20);
            assert_eq!(config.simulator.default_seed, 42);
            Ok(())
        });
    }

    #[test]
    fn rejects_invalid_values() {
        Jail::expect_with(|jail| {
            jail.create_file("bad.yaml", "telemetry:\n  log_level: loud\n")?;
            let err = VirtickConfig::load_from_path("bad.yaml").unwrap_err();
            assert!(matches!(err, ConfigError::Validation(_)));
            assert!(err.to_string().contains("invalid_log_level"));

            jail.create_file("zero.yaml", "simulator:\n  max_steps: 0\n")?;
            let err = VirtickConfig::load_from_path("zero.yaml").unwrap_err();
            assert!(matches!(err, ConfigError::Validation(_)));
            Ok(())
        });
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = VirtickConfig::load_from_path("does/not/exist.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn simulator_section_loads_alone() {
        Jail::expect_with(|jail| {
            jail.create_file("sim.yaml", "max_step_ms: 250\n")?;
            let config = SimulatorConfig::load_from_path("sim.yaml").map_err(jailed)?;
            assert_eq!(config.max_step_ms, 250);
            assert_eq!(config.max_steps, 1024);
            Ok(())
        });
    }
}
