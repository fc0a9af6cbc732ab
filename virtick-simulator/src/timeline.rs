//! Recorded outcome of a scenario run.
//!
//! Every entry carries its virtual offset from the clock origin in
//! milliseconds, so two runs of the same scenario render, and therefore hash,
//! identically.

use std::fmt;

use blake3::Hasher;

use crate::error::ScenarioError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineEvent {
    /// A consumer received a firing from `name`.
    Fired { name: String, at_ms: u64 },
    /// An advance step completed; virtual time now reads `to_ms`.
    Advanced { to_ms: u64 },
    /// A stop step ran; `was_pending` is what `stop` returned.
    Stopped { name: String, was_pending: bool },
}

impl fmt::Display for TimelineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fired { name, at_ms } => write!(f, "{at_ms:>10}ms fire {name}"),
            Self::Advanced { to_ms } => write!(f, "{to_ms:>10}ms advanced"),
            Self::Stopped { name, was_pending } => {
                write!(f, "{:>12} stop {name} pending={was_pending}", "")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    events: Vec<TimelineEvent>,
}

impl Timeline {
    pub(crate) fn push(&mut self, event: TimelineEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    /// `(name, at_ms)` of every firing, in delivery order.
    pub fn firings(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.events.iter().filter_map(|event| match event {
            TimelineEvent::Fired { name, at_ms } => Some((name.as_str(), *at_ms)),
            _ => None,
        })
    }

    /// Virtual offset after the last advance.
    pub fn final_offset_ms(&self) -> u64 {
        self.events
            .iter()
            .rev()
            .find_map(|event| match event {
                TimelineEvent::Advanced { to_ms } => Some(*to_ms),
                _ => None,
            })
            .unwrap_or(0)
    }

    /// Hex-encoded BLAKE3 hash of the rendered timeline.
    pub fn digest(&self) -> String {
        let mut hasher = Hasher::new();
        for event in &self.events {
            hasher.update(event.to_string().as_bytes());
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize().as_bytes())
    }

    /// Checks the ordering guarantees every run must satisfy: firings never
    /// go back in time, and none lands after the advance that delivered it.
    pub fn check_consistency(&self) -> Result<(), ScenarioError> {
        let mut last_fire = 0;
        let mut last_advance = 0;
        for (index, event) in self.events.iter().enumerate() {
            match event {
                TimelineEvent::Fired { name, at_ms } => {
                    if *at_ms < last_fire {
                        return Err(ScenarioError::Inconsistent(format!(
                            "entry {index}: {name} fired at {at_ms}ms after a firing at {last_fire}ms"
                        )));
                    }
                    if *at_ms < last_advance {
                        return Err(ScenarioError::Inconsistent(format!(
                            "entry {index}: {name} fired at {at_ms}ms, before the advance to {last_advance}ms"
                        )));
                    }
                    last_fire = *at_ms;
                }
                TimelineEvent::Advanced { to_ms } => {
                    if *to_ms < last_fire || *to_ms < last_advance {
                        return Err(ScenarioError::Inconsistent(format!(
                            "entry {index}: advanced to {to_ms}ms behind earlier entries"
                        )));
                    }
                    last_advance = *to_ms;
                }
                TimelineEvent::Stopped { .. } => {}
            }
        }
        Ok(())
    }
}

impl fmt::Display for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for event in &self.events {
            writeln!(f, "{event}")?;
        }
        Ok(())
    }
}
