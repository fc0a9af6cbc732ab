//! ## virtick-telemetry::logging
//! **Structured logging with `tracing`**
//!
//! ### Expectations:
//! - One global subscriber per process; repeated initialisation is ignored
//! - `RUST_LOG` overrides the configured level
//! - Thread names in every line, since firings cross driver and consumer threads

use tracing::info;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone)]
pub struct ClockLogger;

impl ClockLogger {
    /// Installs the global subscriber at `info`, unless `RUST_LOG` says otherwise.
    pub fn init() {
        Self::init_with_level("info");
    }

    /// Installs the global subscriber at `level`, unless `RUST_LOG` says otherwise.
    ///
    /// Returns `false` when a subscriber was already installed.
    pub fn init_with_level(level: &str) -> bool {
        let installed = fmt()
            .with_env_filter(Self::filter(level))
            .with_thread_names(true)
            .with_span_events(FmtSpan::CLOSE)
            .try_init()
            .is_ok();
        if installed {
            info!(level, "logging initialised");
        }
        installed
    }

    fn filter(level: &str) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    }
}
