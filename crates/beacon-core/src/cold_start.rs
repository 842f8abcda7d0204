//! Cold-start classification.
//!
//! A session start counts as a cold start when it falls inside
//! `[process_start, process_start + allowed]`, both ends inclusive.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// Default tolerance between process launch and the first session start.
pub const DEFAULT_ALLOWED_COLD_START_INTERVAL: Duration = Duration::from_secs(5);

/// Decides whether `session_start` qualifies as a cold start.
///
/// Returns `false` when the process start time is unknown, when the session
/// starts before the process did, or when it starts after the window closes.
/// An `allowed` window too large for chrono to represent has no upper bound.
#[must_use]
pub fn is_cold_start(
    process_start: Option<DateTime<Utc>>,
    session_start: DateTime<Utc>,
    allowed: Duration,
) -> bool {
    let Some(process_start) = process_start else {
        return false;
    };
    if session_start < process_start {
        return false;
    }

    let upper = TimeDelta::from_std(allowed)
        .ok()
        .and_then(|window| process_start.checked_add_signed(window));

    match upper {
        Some(upper) => session_start <= upper,
        None => true,
    }
}
