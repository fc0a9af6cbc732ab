//! # virtick-core
//!
//! Virtual time for deterministic tests of timer-driven code.
//!
//! Code under test depends on the [`Clock`] trait. Tests construct a
//! [`VirtualClock`], hand it to that code and move time forward explicitly with
//! [`VirtualClock::advance`], synchronising with background consumers through
//! [`VirtualClock::block_until`].
//!
//! ### Guarantees:
//! - Sleepers fire in non-decreasing fire-time order, ties in registration order
//! - `now()` observed during a firing is that sleeper's exact fire time
//! - Every firing is received by a consumer before the advance moves on
//!
//! ### Key Submodules:
//! - `clock`: the `Clock` contract
//! - `time`: `VirtualClock`, `Timer`, `Ticker`
//! - `error`: `ClockError`

pub mod clock;
pub mod error;
pub mod time;

pub mod prelude {
    pub use crate::clock::*;
    pub use crate::error::*;
    pub use crate::time::*;
}

pub use clock::Clock;
pub use error::ClockError;
pub use time::{Ticker, Timer, VirtualClock};
