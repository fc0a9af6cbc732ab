use std::path::PathBuf;

use thiserror::Error;
use virtick_simulator::ScenarioError;

#[derive(Debug, Error)]
pub enum FuzzError {
    #[error("seed {seed} failed (scenario saved to {}): {source}", saved.display())]
    Failed {
        seed: u64,
        saved: PathBuf,
        #[source]
        source: ScenarioError,
    },

    #[error("seed {seed} is not deterministic: {first} != {second}")]
    Nondeterministic {
        seed: u64,
        first: String,
        second: String,
    },

    #[error("seed {seed} ended at {actual}ms, advances add up to {expected}ms")]
    OffsetMismatch { seed: u64, expected: u64, actual: u64 },
}
