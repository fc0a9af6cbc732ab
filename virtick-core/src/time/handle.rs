//! User-facing timer and ticker handles.
//!
//! Handles hold only a weak reference to their sleeper. The clock owns it
//! while it is pending; once it fires for the last time, is stopped, or the
//! clock is dropped, the sleeper goes away and the handle's channel
//! disconnects after any delivered value has been read.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use crossbeam::channel::Receiver;

use super::sleeper::Sleeper;
use crate::error::ClockError;

/// One-shot timer created by [`Clock::new_timer`](crate::Clock::new_timer).
#[derive(Debug)]
pub struct Timer {
    c: Receiver<Instant>,
    sleeper: Weak<Sleeper>,
}

impl Timer {
    pub(crate) fn new(c: Receiver<Instant>, sleeper: &Arc<Sleeper>) -> Self {
        Self {
            c,
            sleeper: Arc::downgrade(sleeper),
        }
    }

    /// Channel that receives the fire instant.
    pub fn receiver(&self) -> &Receiver<Instant> {
        &self.c
    }

    /// Prevents the timer from firing.
    ///
    /// Returns `true` if the timer was still pending, `false` if it already
    /// fired (or is firing) or was already stopped.
    pub fn stop(&self) -> bool {
        self.sleeper
            .upgrade()
            .is_some_and(|sleeper| sleeper.cancel())
    }

    /// Rearming a virtual timer is not supported; stop it and create a new one.
    pub fn reset(&self, _duration: Duration) -> Result<bool, ClockError> {
        Err(ClockError::Unsupported("Timer::reset"))
    }

    pub(crate) fn into_receiver(self) -> Receiver<Instant> {
        self.c
    }
}

/// Periodic ticker created by [`Clock::new_ticker`](crate::Clock::new_ticker).
#[derive(Debug)]
pub struct Ticker {
    c: Receiver<Instant>,
    sleeper: Weak<Sleeper>,
}

impl Ticker {
    pub(crate) fn new(c: Receiver<Instant>, sleeper: &Arc<Sleeper>) -> Self {
        Self {
            c,
            sleeper: Arc::downgrade(sleeper),
        }
    }

    /// Channel that receives each tick instant.
    pub fn receiver(&self) -> &Receiver<Instant> {
        &self.c
    }

    /// Stops the ticker. Idempotent; returns whether it was waiting in the
    /// registry at the time of the call.
    pub fn stop(&self) -> bool {
        self.sleeper
            .upgrade()
            .is_some_and(|sleeper| sleeper.cancel())
    }
}
