//! Clock helper
//!
//! Engine operations take timestamps as explicit `i64` Unix nanoseconds so
//! tests stay deterministic. Only the service edge reads the wall clock.

use chrono::Utc;

/// Nanoseconds per second
pub const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Current wall-clock time in Unix nanoseconds
pub fn now_nanos() -> i64 {
    // Saturates past year 2262, where the nanosecond range ends.
    Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX)
}

/// Convert a `Duration` to nanoseconds, saturating
pub fn duration_nanos(d: std::time::Duration) -> i64 {
    i64::try_from(d.as_nanos()).unwrap_or(i64::MAX)
}
