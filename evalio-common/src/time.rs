//! Timestamp utilities
//!
//! Lock timestamps are persisted as integer milliseconds since the Unix epoch
//! so that staleness checks are plain integer comparisons inside SQL.

use chrono::{DateTime, TimeZone, Utc};

/// Milliseconds since the Unix epoch for a timestamp
pub fn to_epoch_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

/// Timestamp for milliseconds since the Unix epoch
///
/// Out-of-range values clamp to the epoch rather than failing; they can only
/// come from a corrupted row.
pub fn from_epoch_millis(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
