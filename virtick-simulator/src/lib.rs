// virtick-simulator/src/lib.rs

/*!
# Virtick Simulator

Deterministic scenario runner for the virtick virtual clock. A scenario is a
list of steps (create timers and tickers, advance, stop, check the pending
count) played against a fresh [`VirtualClock`](virtick_core::VirtualClock).
Every firing is recorded with its virtual offset, and the resulting timeline is
hashed with BLAKE3 so runs can be compared and replayed.

## Key Components:
- **Scenario:** YAML step lists, validated against [`SimulatorConfig`](virtick_config::SimulatorConfig).
- **Runner:** a single consumer thread records firings in delivery order.
- **Timeline:** rendered entries, consistency checks and the hex digest.
- **Generator:** seeded random scenarios for fuzzing.
- **Replay:** re-run a recorded scenario and verify its digest.
*/

mod error;
pub mod generator;
pub mod replay;
pub mod runner;
pub mod scenario;
pub mod timeline;

pub use error::ScenarioError;
pub use generator::generate;
pub use replay::replay_scenario;
pub use runner::ScenarioRunner;
pub use scenario::{Scenario, Step};
pub use timeline::{Timeline, TimelineEvent};
