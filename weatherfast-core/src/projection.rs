use chrono::{DateTime, Utc};

use crate::model::HourlySnapshot;

/// Maximum number of entries in the short-range hourly strip.
pub const UPCOMING_HOURS: usize = 24;

/// Hourly entries at or after `now`, capped at [`UPCOMING_HOURS`], in source order.
///
/// Not cached: callers recompute whenever the bundle they read from changes.
pub fn upcoming_hourly(hourly: &[HourlySnapshot], now: DateTime<Utc>) -> Vec<&HourlySnapshot> {
    hourly.iter().filter(|h| h.time >= now).take(UPCOMING_HOURS).collect()
}
