//! # Virtick Telemetry
//!
//! Crate for logging and metrics of virtual clock activity.

pub mod logging;
pub mod metrics;

pub use logging::ClockLogger;
pub use metrics::MetricsRecorder;
