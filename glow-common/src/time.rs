//! Timestamp utilities

use chrono::{DateTime, Duration, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// True when `stamp` is older than `ttl` relative to `at`
///
/// A stamp in the future is never expired.
pub fn is_expired(stamp: DateTime<Utc>, ttl: Duration, at: DateTime<Utc>) -> bool {
    at.signed_duration_since(stamp) > ttl
}
