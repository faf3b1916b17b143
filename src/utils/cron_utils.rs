//! Cron schedule helpers.

use chrono::Utc;
use cron::Schedule;

/// Milliseconds between the next two occurrences of `cron_schedule`.
///
/// Returns `None` for an invalid expression or one that never fires twice.
pub fn get_cron_interval_ms(cron_schedule: &str) -> Option<i64> {
	let schedule = cron_schedule.parse::<Schedule>().ok()?;
	let mut occurrences = schedule.after(&Utc::now()).take(2);
	let first = occurrences.next()?;
	let second = occurrences.next()?;
	Some((second - first).num_milliseconds())
}
