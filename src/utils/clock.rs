//! Wall-clock helpers.

use chrono::Utc;

/// Current UNIX time in seconds, with sub-second precision.
pub fn now_ts() -> f64 {
	Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
