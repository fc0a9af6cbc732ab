//! ## virtick-core::time
//! **Virtual clock & sleeper scheduler**
//!
//! `VirtualClock` holds a virtual `now` that only moves when a driver calls
//! [`VirtualClock::advance`]. Timers and tickers register sleepers in a
//! fire-time ordered registry; advancing pops due sleepers one by one, moves
//! `now` to each sleeper's exact fire time and hands the instant to a consumer
//! over a rendezvous channel.
//!
//! ### Locking:
//! - `advancing`: held for the whole of an `advance`, so advances never overlap
//! - `state`: guards `now`, the registry and observers; held only for short
//!   mutation windows and never across a delivery, so a consumer reacting to a
//!   firing may register new timers
//!
//! ### Pending count:
//! The count observed by `block_until` is the number of registered sleepers
//! plus the one being delivered, if any. Every change moves it by exactly one
//! and is broadcast to all observers, so a waited-for count can never be skipped.

mod handle;
mod observer;
mod registry;
mod sleeper;

pub use handle::{Ticker, Timer};

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam::channel::{bounded, Receiver};
use parking_lot::Mutex;
use tracing::{debug, instrument, trace, warn};
use virtick_telemetry::MetricsRecorder;

use crate::clock::Clock;
use crate::error::ClockError;
use observer::ObserverSet;
use registry::SleeperRegistry;
use sleeper::{Sleeper, SleeperKind};

pub(crate) struct ClockShared {
    advancing: Mutex<()>,
    state: Mutex<ClockState>,
}

struct ClockState {
    now: Instant,
    sleepers: SleeperRegistry,
    observers: ObserverSet,
    // Sleepers popped by `advance` whose delivery has not completed yet.
    in_flight: usize,
    metrics: Option<Arc<MetricsRecorder>>,
}

impl ClockState {
    fn pending(&self) -> usize {
        self.sleepers.len() + self.in_flight
    }

    fn publish(&mut self) {
        let pending = self.pending();
        self.observers.broadcast(pending);
        if let Some(metrics) = &self.metrics {
            metrics.set_pending(pending);
        }
    }

    fn register(&mut self, when: Instant, sleeper: Arc<Sleeper>) {
        self.sleepers.insert(when, sleeper);
        self.publish();
    }

    fn unregister(&mut self, when: Instant, sleeper: &Arc<Sleeper>) -> bool {
        let removed = self.sleepers.remove(when, sleeper);
        if removed {
            if let Some(metrics) = &self.metrics {
                metrics.inc_stops();
            }
            self.publish();
        }
        removed
    }
}

/// `at + duration`, clamped to the latest instant representable from `at`.
///
/// Every overflowing deadline lands on the same clamped instant, so a
/// `Duration::MAX` timer only fires on an advance that is itself clamped.
fn saturating_add(at: Instant, duration: Duration) -> Instant {
    if let Some(sum) = at.checked_add(duration) {
        return sum;
    }
    let mut reached = at;
    let mut step = duration;
    while !step.is_zero() {
        match reached.checked_add(step) {
            Some(next) => reached = next,
            None => step /= 2,
        }
    }
    reached
}

/// Deterministic clock whose time moves only through [`advance`](Self::advance).
///
/// Cloning yields another handle to the same clock. Separately constructed
/// clocks share nothing.
#[derive(Clone)]
pub struct VirtualClock {
    shared: Arc<ClockShared>,
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualClock {
    /// Creates a clock whose virtual time starts at the real current instant.
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Creates a clock whose virtual time starts at `origin`.
    pub fn starting_at(origin: Instant) -> Self {
        Self::build(origin, None)
    }

    /// Creates a clock that reports its activity to `metrics`.
    pub fn with_metrics(origin: Instant, metrics: Arc<MetricsRecorder>) -> Self {
        Self::build(origin, Some(metrics))
    }

    fn build(origin: Instant, metrics: Option<Arc<MetricsRecorder>>) -> Self {
        Self {
            shared: Arc::new(ClockShared {
                advancing: Mutex::new(()),
                state: Mutex::new(ClockState {
                    now: origin,
                    sleepers: SleeperRegistry::default(),
                    observers: ObserverSet::default(),
                    in_flight: 0,
                    metrics,
                }),
            }),
        }
    }

    /// Number of sleepers that have not finished firing.
    pub fn pending(&self) -> usize {
        self.shared.state.lock().pending()
    }

    /// Fire time of the earliest registered sleeper.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.shared.state.lock().sleepers.next_due()
    }

    fn schedule(&self, kind: SleeperKind, duration: Duration) -> (Arc<Sleeper>, Receiver<Instant>) {
        let (tx, rx) = bounded(0);
        let mut state = self.shared.state.lock();
        let when = saturating_add(state.now, duration);
        let sleeper = Sleeper::new(kind, when, tx, Arc::downgrade(&self.shared));
        state.register(when, Arc::clone(&sleeper));
        if let Some(metrics) = &state.metrics {
            match kind {
                SleeperKind::OneShot => metrics.inc_timers_created(),
                SleeperKind::Periodic { .. } => metrics.inc_tickers_created(),
            }
        }
        debug!(?kind, ?duration, pending = state.pending(), "sleeper registered");
        (sleeper, rx)
    }

    /// Moves virtual time forward by `duration`, firing every sleeper due on
    /// the way in fire-time order.
    ///
    /// Each firing blocks until a consumer receives it. A handle nobody reads
    /// from stalls the advance; a handle whose receivers are all dropped is
    /// detached instead. Advancing by zero does nothing.
    #[instrument(skip(self))]
    pub fn advance(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        let _advancing = self.shared.advancing.lock();
        let target = saturating_add(self.shared.state.lock().now, duration);
        let mut fired = 0usize;

        loop {
            let (when, sleeper) = {
                let mut state = self.shared.state.lock();
                match state.sleepers.pop_due(target) {
                    Some(due) => {
                        if due.0 > state.now {
                            state.now = due.0;
                        }
                        state.in_flight += 1;
                        due
                    }
                    None => {
                        state.now = target;
                        if let Some(metrics) = &state.metrics {
                            metrics.inc_advances();
                        }
                        break;
                    }
                }
            };
            self.deliver(when, sleeper);
            fired += 1;
        }
        debug!(fired, "advance complete");
    }

    fn deliver(&self, when: Instant, sleeper: Arc<Sleeper>) {
        trace!(?sleeper, "firing");
        let delivered = sleeper.fire(when);

        let mut state = self.shared.state.lock();
        state.in_flight -= 1;
        if delivered {
            if let Some(metrics) = &state.metrics {
                metrics.inc_fires();
            }
        } else {
            warn!(kind = ?sleeper.kind(), "every receiver dropped, detaching sleeper");
        }

        let next = if delivered {
            sleeper.reschedule(&self.shared, when)
        } else {
            None
        };
        match next {
            // Requeueing a ticker leaves the pending count unchanged.
            Some(next) => {
                state.sleepers.insert(next, sleeper);
            }
            None => {
                sleeper.detach();
                state.publish();
            }
        }
    }

    /// Blocks until exactly `pending` sleepers are outstanding.
    ///
    /// Returns immediately when the count already matches. There is no
    /// timeout: waiting for a count that is never reached blocks forever.
    #[instrument(skip(self))]
    pub fn block_until(&self, pending: usize) {
        let (id, rx) = {
            let mut state = self.shared.state.lock();
            if state.pending() == pending {
                return;
            }
            state.observers.register()
        };
        for observed in rx.iter() {
            if observed == pending {
                break;
            }
        }
        self.shared.state.lock().observers.deregister(id);
        debug!(pending, "pending count reached");
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Instant {
        self.shared.state.lock().now
    }

    fn after(&self, duration: Duration) -> Receiver<Instant> {
        self.new_timer(duration).into_receiver()
    }

    fn sleep(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        // Errors only when the clock is dropped before the sleeper fires.
        let _ = self.after(duration).recv();
    }

    fn new_timer(&self, duration: Duration) -> Timer {
        let (sleeper, rx) = self.schedule(SleeperKind::OneShot, duration);
        Timer::new(rx, &sleeper)
    }

    fn new_ticker(&self, period: Duration) -> Result<Ticker, ClockError> {
        if period.is_zero() {
            return Err(ClockError::NonPositivePeriod);
        }
        let (sleeper, rx) = self.schedule(SleeperKind::Periodic { period }, period);
        Ok(Ticker::new(rx, &sleeper))
    }
}

impl std::fmt::Debug for VirtualClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("VirtualClock")
            .field("now", &state.now)
            .field("pending", &state.pending())
            .field("waiters", &state.observers.len())
            .finish()
    }
}
