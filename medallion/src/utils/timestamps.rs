//! Timestamp helpers.
//!
//! All timestamps are UTC and serialized as RFC 3339 strings by serde.

use chrono::{DateTime, Utc};

/// Timestamp type used on every record.
pub type Timestamp = DateTime<Utc>;

/// Returns the current UTC time.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Parses an RFC 3339 string into a UTC timestamp.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Seconds elapsed between two timestamps, with sub-second precision.
#[must_use]
pub fn duration_seconds(started_at: Timestamp, completed_at: Timestamp) -> f64 {
    let delta = completed_at - started_at;
    delta
        .num_microseconds()
        .map_or_else(|| delta.num_milliseconds() as f64 / 1_000.0, |us| us as f64 / 1_000_000.0)
}
