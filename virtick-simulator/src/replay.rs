//! Replay of recorded scenario files.
//!
//! A scenario run always yields the same timeline, so its digest doubles as a
//! regression fingerprint: record it once, then replay with the digest to
//! confirm the clock still schedules identically.

use std::path::Path;

use tracing::{info, warn};

use crate::error::ScenarioError;
use crate::runner::ScenarioRunner;
use crate::scenario::Scenario;
use crate::timeline::Timeline;

/// Loads the scenario at `path`, runs it and, when `expected_digest` is
/// given, compares the timeline digest against it.
pub fn replay_scenario<P: AsRef<Path>>(
    runner: &ScenarioRunner,
    path: P,
    expected_digest: Option<&str>,
) -> Result<Timeline, ScenarioError> {
    let path = path.as_ref();
    let scenario = Scenario::load_from_path(path)?;
    info!(path = %path.display(), name = %scenario.name, "replaying scenario");

    let timeline = runner.run(&scenario)?;
    timeline.check_consistency()?;

    if let Some(expected) = expected_digest {
        let actual = timeline.digest();
        if !actual.eq_ignore_ascii_case(expected) {
            warn!(%expected, %actual, "timeline digest mismatch");
            return Err(ScenarioError::DigestMismatch {
                expected: expected.to_owned(),
                actual,
            });
        }
    }
    Ok(timeline)
}
