//! Drives a [`VirtualClock`] through a scenario and records what its
//! consumer sees.
//!
//! One consumer thread selects over every live handle, so firings land in the
//! timeline in the exact order the clock delivered them. After each advance
//! the driver flushes the consumer; every firing of that advance has already
//! been handed over by then, since deliveries are rendezvous sends.

use std::collections::HashMap;
use std::mem;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{bounded, unbounded, Receiver, RecvError, Select, Sender};
use tracing::{debug, info, instrument};
use virtick_config::SimulatorConfig;
use virtick_core::{Clock, Ticker, Timer, VirtualClock};
use virtick_telemetry::MetricsRecorder;

use crate::error::ScenarioError;
use crate::scenario::{Scenario, Step};
use crate::timeline::{Timeline, TimelineEvent};

type Firing = (String, Instant);

enum Control {
    Watch(String, Receiver<Instant>),
    Flush(Sender<Vec<Firing>>),
}

enum Outcome {
    Control(Result<Control, RecvError>),
    Fired(usize, Result<Instant, RecvError>),
}

fn consume(control: Receiver<Control>) -> Vec<Firing> {
    let mut control = Some(control);
    let mut watched: Vec<(String, Receiver<Instant>)> = Vec::new();
    let mut buffered = Vec::new();

    while control.is_some() || !watched.is_empty() {
        let outcome = {
            let mut select = Select::new();
            for (_, rx) in &watched {
                select.recv(rx);
            }
            if let Some(rx) = &control {
                select.recv(rx);
            }
            let op = select.select();
            let index = op.index();
            match &control {
                Some(rx) if index == watched.len() => Outcome::Control(op.recv(rx)),
                _ => Outcome::Fired(index, op.recv(&watched[index].1)),
            }
        };

        match outcome {
            Outcome::Control(Ok(Control::Watch(name, rx))) => watched.push((name, rx)),
            Outcome::Control(Ok(Control::Flush(ack))) => {
                let _ = ack.send(mem::take(&mut buffered));
            }
            Outcome::Control(Err(_)) => control = None,
            Outcome::Fired(index, Ok(at)) => buffered.push((watched[index].0.clone(), at)),
            // Fired for the last time or stopped.
            Outcome::Fired(index, Err(_)) => {
                watched.remove(index);
            }
        }
    }
    buffered
}

enum Handle {
    Timer(Timer),
    Ticker(Ticker),
}

impl Handle {
    fn receiver(&self) -> &Receiver<Instant> {
        match self {
            Handle::Timer(timer) => timer.receiver(),
            Handle::Ticker(ticker) => ticker.receiver(),
        }
    }

    fn stop(&self) -> bool {
        match self {
            Handle::Timer(timer) => timer.stop(),
            Handle::Ticker(ticker) => ticker.stop(),
        }
    }
}

/// State of one scenario execution.
struct Run {
    clock: VirtualClock,
    origin: Instant,
    control: Sender<Control>,
    handles: HashMap<String, Handle>,
    timeline: Timeline,
}

impl Run {
    fn offset_ms(&self, at: Instant) -> u64 {
        u64::try_from(at.saturating_duration_since(self.origin).as_millis()).unwrap_or(u64::MAX)
    }

    fn watch(&mut self, name: &str, handle: Handle) -> Result<(), ScenarioError> {
        self.control
            .send(Control::Watch(name.to_owned(), handle.receiver().clone()))
            .map_err(|_| ScenarioError::ConsumerLost)?;
        self.handles.insert(name.to_owned(), handle);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ScenarioError> {
        let (ack_tx, ack_rx) = bounded(1);
        self.control
            .send(Control::Flush(ack_tx))
            .map_err(|_| ScenarioError::ConsumerLost)?;
        let firings = ack_rx.recv().map_err(|_| ScenarioError::ConsumerLost)?;
        for (name, at) in firings {
            let at_ms = self.offset_ms(at);
            self.timeline.push(TimelineEvent::Fired { name, at_ms });
        }
        Ok(())
    }

    fn apply(&mut self, step: &Step) -> Result<(), ScenarioError> {
        debug!(?step, "applying step");
        match step {
            Step::Timer { name, after_ms } => {
                let timer = self.clock.new_timer(Duration::from_millis(*after_ms));
                self.watch(name, Handle::Timer(timer))?;
            }
            Step::Ticker { name, every_ms } => {
                let ticker = self.clock.new_ticker(Duration::from_millis(*every_ms))?;
                self.watch(name, Handle::Ticker(ticker))?;
            }
            Step::Advance { ms } => {
                self.clock.advance(Duration::from_millis(*ms));
                self.flush()?;
                let to_ms = self.offset_ms(self.clock.now());
                self.timeline.push(TimelineEvent::Advanced { to_ms });
            }
            Step::Stop { name } => {
                let handle = self
                    .handles
                    .get(name)
                    .ok_or_else(|| ScenarioError::UnknownHandle(name.clone()))?;
                let was_pending = handle.stop();
                self.timeline.push(TimelineEvent::Stopped {
                    name: name.clone(),
                    was_pending,
                });
            }
            Step::ExpectPending { count } => {
                let actual = self.clock.pending();
                if actual != *count {
                    return Err(ScenarioError::PendingMismatch {
                        expected: *count,
                        actual,
                    });
                }
            }
        }
        Ok(())
    }

    /// Stops every handle and releases the clock so the consumer can exit.
    fn shutdown(self) -> Timeline {
        for handle in self.handles.values() {
            handle.stop();
        }
        self.timeline
    }
}

/// Runs scenarios against fresh virtual clocks.
#[derive(Debug, Clone, Default)]
pub struct ScenarioRunner {
    config: SimulatorConfig,
    metrics: Option<Arc<MetricsRecorder>>,
}

impl ScenarioRunner {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            metrics: None,
        }
    }

    /// Reports the activity of every clock this runner creates to `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<MetricsRecorder>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    #[instrument(skip_all, fields(scenario = %scenario.name, steps = scenario.steps.len()))]
    pub fn run(&self, scenario: &Scenario) -> Result<Timeline, ScenarioError> {
        scenario.validate(&self.config)?;

        let origin = Instant::now();
        let clock = match &self.metrics {
            Some(metrics) => VirtualClock::with_metrics(origin, Arc::clone(metrics)),
            None => VirtualClock::starting_at(origin),
        };
        let (control, control_rx) = unbounded();
        let consumer = thread::Builder::new()
            .name("virtick-consumer".into())
            .spawn(move || consume(control_rx))?;

        let mut run = Run {
            clock,
            origin,
            control,
            handles: HashMap::new(),
            timeline: Timeline::default(),
        };
        let outcome = scenario.steps.iter().try_for_each(|step| run.apply(step));
        let timeline = run.shutdown();

        let leftover = consumer.join().map_err(|_| ScenarioError::ConsumerLost)?;
        debug_assert!(leftover.is_empty(), "firings outside any advance");
        outcome?;

        info!(
            firings = timeline.firings().count(),
            digest = %timeline.digest(),
            "scenario complete"
        );
        Ok(timeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timer(name: &str, after_ms: u64) -> Step {
        Step::Timer {
            name: name.into(),
            after_ms,
        }
    }

    fn ticker(name: &str, every_ms: u64) -> Step {
        Step::Ticker {
            name: name.into(),
            every_ms,
        }
    }

    fn stop(name: &str) -> Step {
        Step::Stop { name: name.into() }
    }

    fn advance(ms: u64) -> Step {
        Step::Advance { ms }
    }

    fn firings(timeline: &Timeline) -> Vec<(String, u64)> {
        timeline
            .firings()
            .map(|(name, at)| (name.to_owned(), at))
            .collect()
    }

    fn pairs(expected: &[(&str, u64)]) -> Vec<(String, u64)> {
        expected.iter().map(|(n, at)| (n.to_string(), *at)).collect()
    }

    #[test]
    fn timers_fire_in_deadline_order() {
        let scenario = Scenario::new(
            "order",
            vec![
                timer("a", 5000),
                timer("b", 1000),
                timer("c", 3000),
                advance(4000),
                advance(2000),
            ],
        );
        let timeline = ScenarioRunner::default().run(&scenario).unwrap();
        assert_eq!(
            timeline.events(),
            &[
                TimelineEvent::Fired {
                    name: "b".into(),
                    at_ms: 1000
                },
                TimelineEvent::Fired {
                    name: "c".into(),
                    at_ms: 3000
                },
                TimelineEvent::Advanced { to_ms: 4000 },
                TimelineEvent::Fired {
                    name: "a".into(),
                    at_ms: 5000
                },
                TimelineEvent::Advanced { to_ms: 6000 },
            ]
        );
        timeline.check_consistency().unwrap();
    }

    #[test]
    fn equal_deadlines_fire_in_creation_order() {
        let scenario = Scenario::new(
            "ties",
            vec![timer("x", 10), timer("y", 10), timer("z", 10), advance(10)],
        );
        let timeline = ScenarioRunner::default().run(&scenario).unwrap();
        assert_eq!(
            firings(&timeline),
            pairs(&[("x", 10), ("y", 10), ("z", 10)])
        );
    }

    #[test]
    fn ticker_interleaves_with_timers() {
        let scenario = Scenario::new(
            "interleave",
            vec![
                ticker("beat", 1000),
                timer("a", 2500),
                advance(3000),
                stop("beat"),
                advance(2000),
            ],
        );
        let timeline = ScenarioRunner::default().run(&scenario).unwrap();
        assert_eq!(
            firings(&timeline),
            pairs(&[("beat", 1000), ("beat", 2000), ("a", 2500), ("beat", 3000)])
        );
        assert_eq!(timeline.final_offset_ms(), 5000);
        assert!(timeline.events().contains(&TimelineEvent::Stopped {
            name: "beat".into(),
            was_pending: true
        }));
    }

    #[test]
    fn stop_reports_whether_the_timer_was_pending() {
        let scenario = Scenario::new(
            "stops",
            vec![
                timer("early", 100),
                timer("late", 900),
                advance(500),
                stop("early"),
                stop("late"),
                advance(1000),
            ],
        );
        let timeline = ScenarioRunner::default().run(&scenario).unwrap();
        assert_eq!(firings(&timeline), pairs(&[("early", 100)]));
        let stops: Vec<_> = timeline
            .events()
            .iter()
            .filter_map(|event| match event {
                TimelineEvent::Stopped { name, was_pending } => Some((name.as_str(), *was_pending)),
                _ => None,
            })
            .collect();
        assert_eq!(stops, vec![("early", false), ("late", true)]);
    }

    #[test]
    fn expect_pending_checks_the_clock() {
        let ok = Scenario::new(
            "pending",
            vec![
                timer("a", 10),
                ticker("b", 10),
                Step::ExpectPending { count: 2 },
                advance(10),
                Step::ExpectPending { count: 1 },
                stop("b"),
                Step::ExpectPending { count: 0 },
            ],
        );
        ScenarioRunner::default().run(&ok).unwrap();

        let wrong = Scenario::new(
            "wrong",
            vec![timer("a", 10), Step::ExpectPending { count: 3 }],
        );
        assert!(matches!(
            ScenarioRunner::default().run(&wrong),
            Err(ScenarioError::PendingMismatch {
                expected: 3,
                actual: 1
            })
        ));
    }

    #[test]
    fn zero_period_ticker_fails_the_run() {
        let scenario = Scenario::new("zero", vec![timer("a", 5), ticker("z", 0), advance(10)]);
        assert!(matches!(
            ScenarioRunner::default().run(&scenario),
            Err(ScenarioError::Clock(_))
        ));
    }

    #[test]
    fn identical_runs_share_a_digest() {
        let scenario = Scenario::new(
            "repeat",
            vec![
                ticker("t", 7),
                timer("a", 20),
                timer("b", 20),
                advance(50),
                stop("t"),
                advance(50),
            ],
        );
        let runner = ScenarioRunner::default();
        let first = runner.run(&scenario).unwrap();
        let second = runner.run(&scenario).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.digest(), second.digest());
    }

    #[test]
    fn offsets_past_u64_millis_saturate() {
        let scenario = Scenario::new("far", vec![advance(u64::MAX), advance(u64::MAX)]);
        let timeline = ScenarioRunner::default().run(&scenario).unwrap();
        assert_eq!(
            timeline.events(),
            &[
                TimelineEvent::Advanced { to_ms: u64::MAX },
                TimelineEvent::Advanced { to_ms: u64::MAX },
            ]
        );
        assert_eq!(timeline.final_offset_ms(), scenario.total_advance_ms());
        timeline.check_consistency().unwrap();
    }

    #[test]
    fn metrics_follow_the_run() {
        let metrics = Arc::new(MetricsRecorder::new());
        let runner = ScenarioRunner::default().with_metrics(Arc::clone(&metrics));
        let scenario = Scenario::new(
            "metrics",
            vec![timer("a", 1), ticker("b", 1), advance(3), stop("b")],
        );
        runner.run(&scenario).unwrap();
        assert_eq!(metrics.timers_created.get(), 1);
        assert_eq!(metrics.tickers_created.get(), 1);
        assert_eq!(metrics.fires.get(), 4);
        assert_eq!(metrics.advances.get(), 1);
        assert_eq!(metrics.pending.get(), 0);
    }
}
