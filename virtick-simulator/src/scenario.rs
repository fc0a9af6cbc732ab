//! Scenario description loaded from YAML.
//!
//! ```yaml
//! name: interleave
//! steps:
//!   - op: timer
//!     name: a
//!     after_ms: 3000
//!   - op: ticker
//!     name: beat
//!     every_ms: 1000
//!   - op: advance
//!     ms: 5000
//!   - op: stop
//!     name: beat
//!   - op: expect_pending
//!     count: 0
//! ```

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use virtick_config::SimulatorConfig;

use crate::error::ScenarioError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// One-shot timer firing `after_ms` after the current virtual time.
    Timer { name: String, after_ms: u64 },
    /// Ticker firing every `every_ms`, first tick one period from now.
    Ticker { name: String, every_ms: u64 },
    /// Move virtual time forward.
    Advance { ms: u64 },
    /// Stop a timer or ticker defined earlier.
    Stop { name: String },
    /// Fail the run unless exactly `count` sleepers are pending.
    ExpectPending { count: usize },
}

impl Scenario {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ScenarioError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn to_yaml(&self) -> Result<String, ScenarioError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Total virtual time covered by the scenario's advances, saturating at
    /// `u64::MAX` like timeline offsets do.
    pub fn total_advance_ms(&self) -> u64 {
        self.steps
            .iter()
            .filter_map(|step| match step {
                Step::Advance { ms } => Some(*ms),
                _ => None,
            })
            .fold(0, u64::saturating_add)
    }

    /// Checks the scenario against `config` without running it.
    ///
    /// Handle names are unique for the whole scenario, and `stop` may only
    /// name a handle defined by an earlier step. No live ticker may deliver
    /// more than `max_ticks_per_advance` ticks in a single advance.
    pub fn validate(&self, config: &SimulatorConfig) -> Result<(), ScenarioError> {
        if self.steps.len() > config.max_steps {
            return Err(ScenarioError::TooManySteps {
                steps: self.steps.len(),
                limit: config.max_steps,
            });
        }

        let mut defined = HashSet::new();
        let mut tickers: HashMap<&str, u64> = HashMap::new();
        for step in &self.steps {
            match step {
                Step::Timer { name, .. } | Step::Ticker { name, .. } => {
                    if !defined.insert(name.as_str()) {
                        return Err(ScenarioError::DuplicateHandle(name.clone()));
                    }
                    // A zero period is left for the clock to reject.
                    if let Step::Ticker { every_ms, .. } = step {
                        if *every_ms > 0 {
                            tickers.insert(name.as_str(), *every_ms);
                        }
                    }
                }
                Step::Stop { name } => {
                    if !defined.contains(name.as_str()) {
                        return Err(ScenarioError::UnknownHandle(name.clone()));
                    }
                    tickers.remove(name.as_str());
                }
                Step::Advance { ms } => {
                    for (name, every_ms) in &tickers {
                        let ticks = ms / every_ms;
                        if ticks > config.max_ticks_per_advance {
                            return Err(ScenarioError::TooManyTicks {
                                name: name.to_string(),
                                ticks,
                                limit: config.max_ticks_per_advance,
                            });
                        }
                    }
                }
                Step::ExpectPending { .. } => {}
            }
        }
        Ok(())
    }
}
