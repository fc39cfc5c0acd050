//! Date/time utilities for drivedav.
//!
//! Drive reports timestamps as RFC 3339 strings; WebDAV wants RFC 1123 for
//! `getlastmodified` and ISO 8601 for `creationdate`.

use chrono::{DateTime, SecondsFormat, Utc};

/// Parse an RFC 3339 timestamp as reported by the remote store.
///
/// Returns `None` for missing or malformed values.
pub fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Format a timestamp as RFC 1123 (e.g. `Mon, 15 Jan 2024 10:30:00 GMT`).
///
/// A missing timestamp is rendered as the Unix epoch.
pub fn to_rfc1123(dt: Option<&DateTime<Utc>>) -> String {
    dt.copied()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// Format a timestamp as ISO 8601 with millisecond precision
/// (e.g. `2024-01-15T10:30:00.000Z`).
///
/// A missing timestamp is rendered as the Unix epoch.
pub fn to_iso8601(dt: Option<&DateTime<Utc>>) -> String {
    dt.copied()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}
