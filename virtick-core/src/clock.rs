//! ## virtick-core::clock
//! **Time source contract shared by production and virtual clocks**
//!
//! Application code takes a `&dyn Clock` (or `Arc<dyn Clock>`) and never calls
//! `Instant::now()` or `thread::sleep()` directly. Tests hand it a
//! [`VirtualClock`](crate::time::VirtualClock) and drive time explicitly.

use std::time::{Duration, Instant};

use crossbeam::channel::Receiver;

use crate::error::ClockError;
use crate::time::{Ticker, Timer};

pub trait Clock: Send + Sync {
    /// Current instant as seen by this clock.
    fn now(&self) -> Instant;

    /// Returns a channel that receives the fire instant once `duration` has elapsed.
    fn after(&self, duration: Duration) -> Receiver<Instant>;

    /// Blocks the calling thread until `duration` has elapsed on this clock.
    fn sleep(&self, duration: Duration);

    /// Time elapsed since `t`, saturating at zero when `t` lies in the future.
    fn since(&self, t: Instant) -> Duration {
        self.now().saturating_duration_since(t)
    }

    /// Time remaining until `t`, saturating at zero when `t` has passed.
    fn until(&self, t: Instant) -> Duration {
        t.saturating_duration_since(self.now())
    }

    /// Creates a one-shot timer.
    fn new_timer(&self, duration: Duration) -> Timer;

    /// Creates a periodic ticker. Rejects a zero period.
    fn new_ticker(&self, period: Duration) -> Result<Ticker, ClockError>;
}
