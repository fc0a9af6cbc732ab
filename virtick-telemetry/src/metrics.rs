//! ## virtick-telemetry::metrics
//! **Prometheus counters for virtual clock activity**
//!
//! ### Metrics:
//! - `virtick_timers_created_total` / `virtick_tickers_created_total`
//! - `virtick_fires_total`: deliveries a consumer received
//! - `virtick_advances_total`: completed `advance` calls
//! - `virtick_stops_total`: stops that removed a pending sleeper
//! - `virtick_pending_sleepers`: current pending count

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    pub timers_created: IntCounter,
    pub tickers_created: IntCounter,
    pub fires: IntCounter,
    pub advances: IntCounter,
    pub stops: IntCounter,
    pub pending: IntGauge,
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRecorder {
    pub fn new() -> Self {
        // Names and help strings are static and unique, so registration cannot fail.
        Self::try_new().expect("static metric definitions are valid")
    }

    pub fn try_new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let counter = |name: &str, help: &str| -> Result<IntCounter, prometheus::Error> {
            let counter = IntCounter::new(name, help)?;
            registry.register(Box::new(counter.clone()))?;
            Ok(counter)
        };

        let timers_created = counter("virtick_timers_created_total", "One-shot timers created")?;
        let tickers_created = counter("virtick_tickers_created_total", "Periodic tickers created")?;
        let fires = counter("virtick_fires_total", "Firings received by a consumer")?;
        let advances = counter("virtick_advances_total", "Completed clock advances")?;
        let stops = counter("virtick_stops_total", "Stops that removed a pending sleeper")?;

        let pending = IntGauge::new("virtick_pending_sleepers", "Sleepers not yet done firing")?;
        registry.register(Box::new(pending.clone()))?;

        Ok(Self {
            registry,
            timers_created,
            tickers_created,
            fires,
            advances,
            stops,
            pending,
        })
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    pub fn inc_timers_created(&self) {
        self.timers_created.inc();
    }

    pub fn inc_tickers_created(&self) {
        self.tickers_created.inc();
    }

    pub fn inc_fires(&self) {
        self.fires.inc();
    }

    pub fn inc_advances(&self) {
        self.advances.inc();
    }

    pub fn inc_stops(&self) {
        self.stops.inc();
    }

    pub fn set_pending(&self, pending: usize) {
        self.pending.set(pending as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let metrics = MetricsRecorder::new();
        assert_eq!(metrics.fires.get(), 0);
        assert_eq!(metrics.pending.get(), 0);
    }

    #[test]
    fn exposition_contains_every_metric() {
        let metrics = MetricsRecorder::new();
        metrics.inc_timers_created();
        metrics.inc_fires();
        metrics.set_pending(4);

        let text = metrics.gather_metrics().unwrap();
        assert!(text.contains("virtick_timers_created_total 1"));
        assert!(text.contains("virtick_tickers_created_total 0"));
        assert!(text.contains("virtick_fires_total 1"));
        assert!(text.contains("virtick_advances_total 0"));
        assert!(text.contains("virtick_stops_total 0"));
        assert!(text.contains("virtick_pending_sleepers 4"));
    }

    #[test]
    fn recorders_are_independent() {
        let a = MetricsRecorder::new();
        let b = MetricsRecorder::new();
        a.inc_advances();
        assert_eq!(a.advances.get(), 1);
        assert_eq!(b.advances.get(), 0);
    }
}
