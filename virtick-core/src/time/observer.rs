//! Pending-count observers backing [`VirtualClock::block_until`](super::VirtualClock::block_until).

use crossbeam::channel::{unbounded, Receiver, Sender};
use tracing::trace;

/// Observers registered by in-progress `block_until` calls.
///
/// Each observer receives every pending count the clock passes through, in
/// order. Channels are unbounded: a broadcast runs under the clock lock and
/// must never block.
#[derive(Default)]
pub(crate) struct ObserverSet {
    next_id: u64,
    observers: Vec<(u64, Sender<usize>)>,
}

impl ObserverSet {
    pub(crate) fn register(&mut self) -> (u64, Receiver<usize>) {
        let (tx, rx) = unbounded();
        let id = self.next_id;
        self.next_id += 1;
        self.observers.push((id, tx));
        (id, rx)
    }

    pub(crate) fn deregister(&mut self, id: u64) {
        self.observers.retain(|(observer, _)| *observer != id);
    }

    pub(crate) fn broadcast(&mut self, pending: usize) {
        self.observers.retain(|(id, tx)| {
            let delivered = tx.send(pending).is_ok();
            trace!(observer = id, pending, delivered, "pending count broadcast");
            delivered
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcasts_every_count_in_order() {
        let mut set = ObserverSet::default();
        let (_, rx) = set.register();
        for pending in [1, 2, 1, 0] {
            set.broadcast(pending);
        }
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![1, 2, 1, 0]);
    }

    #[test]
    fn each_observer_gets_its_own_copy() {
        let mut set = ObserverSet::default();
        let (_, a) = set.register();
        let (_, b) = set.register();
        set.broadcast(3);
        assert_eq!(a.try_recv(), Ok(3));
        assert_eq!(b.try_recv(), Ok(3));
    }

    #[test]
    fn deregistered_observer_stops_receiving() {
        let mut set = ObserverSet::default();
        let (id, rx) = set.register();
        set.deregister(id);
        set.broadcast(1);
        assert_eq!(set.len(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn prunes_dropped_receivers() {
        let mut set = ObserverSet::default();
        let (_, rx) = set.register();
        let (_, keep) = set.register();
        drop(rx);
        set.broadcast(5);
        assert_eq!(set.len(), 1);
        assert_eq!(keep.try_recv(), Ok(5));
    }
}
