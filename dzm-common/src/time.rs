//! Timestamp utilities

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Whole seconds in a duration, rounded down
///
/// Dwell times are reported to the catalog in whole seconds.
pub fn whole_seconds(duration: Duration) -> u64 {
    duration.as_secs()
}
