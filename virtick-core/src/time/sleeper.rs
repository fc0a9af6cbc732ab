//! Pending timed events owned by a [`VirtualClock`](super::VirtualClock).

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use crossbeam::channel::Sender;
use parking_lot::Mutex;
use tracing::debug;

use super::ClockShared;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SleeperKind {
    OneShot,
    Periodic { period: Duration },
}

struct SleeperState {
    when: Instant,
    // Cleared on detach; a detached sleeper is never fired or requeued again.
    owner: Option<Weak<ClockShared>>,
}

pub(crate) struct Sleeper {
    kind: SleeperKind,
    tx: Sender<Instant>,
    state: Mutex<SleeperState>,
}

impl Sleeper {
    pub(crate) fn new(
        kind: SleeperKind,
        when: Instant,
        tx: Sender<Instant>,
        owner: Weak<ClockShared>,
    ) -> Arc<Self> {
        Arc::new(Self {
            kind,
            tx,
            state: Mutex::new(SleeperState {
                when,
                owner: Some(owner),
            }),
        })
    }

    pub(crate) fn kind(&self) -> SleeperKind {
        self.kind
    }

    /// Delivers a firing, blocking until a consumer takes it.
    ///
    /// Returns `false` when every receiver is gone.
    pub(crate) fn fire(&self, at: Instant) -> bool {
        self.tx.send(at).is_ok()
    }

    /// Clears the back-reference. Returns the fire time if this call detached it.
    pub(crate) fn detach(&self) -> Option<Instant> {
        let mut state = self.state.lock();
        state.owner.take().map(|_| state.when)
    }

    /// Moves a periodic sleeper to its next fire time, provided it is still
    /// attached to `clock`. A ticker whose next tick lies past the last
    /// representable instant is finished.
    pub(crate) fn reschedule(&self, clock: &Arc<ClockShared>, fired: Instant) -> Option<Instant> {
        let SleeperKind::Periodic { period } = self.kind else {
            return None;
        };
        let mut state = self.state.lock();
        let attached = state
            .owner
            .as_ref()
            .is_some_and(|owner| std::ptr::eq(owner.as_ptr(), Arc::as_ptr(clock)));
        if !attached {
            return None;
        }
        state.when = fired.checked_add(period)?;
        Some(state.when)
    }

    fn owner(&self) -> Option<Arc<ClockShared>> {
        self.state.lock().owner.as_ref().and_then(Weak::upgrade)
    }

    /// Detaches the sleeper and pulls it out of its clock's registry.
    ///
    /// Returns whether it was still pending. A sleeper that is mid-delivery has
    /// already left the registry, so this reports `false` for it while still
    /// preventing any requeue.
    pub(crate) fn cancel(self: &Arc<Self>) -> bool {
        let Some(clock) = self.owner() else {
            return false;
        };
        let mut state = clock.state.lock();
        let Some(when) = self.detach() else {
            return false;
        };
        let removed = state.unregister(when, self);
        debug!(removed, kind = ?self.kind, "sleeper cancelled");
        removed
    }
}

impl std::fmt::Debug for Sleeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Sleeper")
            .field("kind", &self.kind)
            .field("when", &state.when)
            .field("attached", &state.owner.is_some())
            .finish()
    }
}
