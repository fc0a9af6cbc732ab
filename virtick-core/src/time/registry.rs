//! ## virtick-core::time::registry
//! **Pending sleepers ordered by fire time**
//!
//! Entries sort ascending by fire time. Entries sharing a fire time keep their
//! insertion order, so ties fire FIFO. Every mutation moves the length by
//! exactly one.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use super::sleeper::Sleeper;

struct Entry {
    when: Instant,
    sleeper: Arc<Sleeper>,
}

#[derive(Default)]
pub(crate) struct SleeperRegistry {
    entries: VecDeque<Entry>,
}

impl SleeperRegistry {
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts after every entry due at or before `when`. Returns the new length.
    pub(crate) fn insert(&mut self, when: Instant, sleeper: Arc<Sleeper>) -> usize {
        let idx = self.entries.partition_point(|e| e.when <= when);
        self.entries.insert(idx, Entry { when, sleeper });
        self.entries.len()
    }

    /// Removes `sleeper` by identity. Several sleepers may share `when`, so the
    /// search scans forward across the run of equal fire times.
    pub(crate) fn remove(&mut self, when: Instant, sleeper: &Arc<Sleeper>) -> bool {
        let start = self.entries.partition_point(|e| e.when < when);
        let found = self
            .entries
            .iter()
            .skip(start)
            .take_while(|e| e.when == when)
            .position(|e| Arc::ptr_eq(&e.sleeper, sleeper));
        match found {
            Some(offset) => self.entries.remove(start + offset).is_some(),
            None => false,
        }
    }

    pub(crate) fn next_due(&self) -> Option<Instant> {
        self.entries.front().map(|e| e.when)
    }

    /// Pops the earliest sleeper if it is due at or before `deadline`.
    pub(crate) fn pop_due(&mut self, deadline: Instant) -> Option<(Instant, Arc<Sleeper>)> {
        if self.next_due()? > deadline {
            return None;
        }
        self.entries.pop_front().map(|e| (e.when, e.sleeper))
    }

    #[cfg(test)]
    pub(super) fn fire_times(&self) -> Vec<Instant> {
        self.entries.iter().map(|e| e.when).collect()
    }

    #[cfg(test)]
    fn position_of(&self, sleeper: &Arc<Sleeper>) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| Arc::ptr_eq(&e.sleeper, sleeper))
    }
}
