//! Timestamp utilities

use chrono::Utc;

/// Current time as milliseconds since the Unix epoch
///
/// This is the representation stored in the persisted cache files.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Milliseconds elapsed since `timestamp_ms`, clamped at zero for timestamps in the future
pub fn age_millis(timestamp_ms: i64) -> u64 {
    now_millis().saturating_sub(timestamp_ms).max(0) as u64
}
