//! Duration formatting and serialization helpers.

use std::time::Duration;

use chrono::TimeDelta;
use serde::Serializer;

/// Format a duration the way reports show it: `10ms`, `19.8ms`, `1.5s`, `0s`.
pub fn format_duration(duration: Duration) -> String {
    if duration.is_zero() {
        return "0s".to_string();
    }
    format!("{duration:?}")
}

/// Format a signed budget. Negative budgets keep a leading `-`.
pub fn format_delta(delta: TimeDelta) -> String {
    let magnitude = delta.abs().to_std().unwrap_or(Duration::MAX);
    if delta < TimeDelta::zero() {
        format!("-{}", format_duration(magnitude))
    } else {
        format_duration(magnitude)
    }
}

/// Signed delta from a std duration, saturating at `TimeDelta::MAX`.
pub fn delta_from_std(duration: Duration) -> TimeDelta {
    TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX)
}

/// Clamp a signed delta to a std duration; non-positive deltas become zero.
pub fn clamp_to_std(delta: TimeDelta) -> Duration {
    delta.to_std().unwrap_or(Duration::ZERO)
}

/// Serialize a duration as whole milliseconds.
pub fn serialize_millis<S: Serializer>(
    duration: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
    serializer.serialize_u64(millis)
}
