use chrono::{DateTime, TimeZone, Utc};

/// Convert a unix timestamp in seconds (as sent by payment providers) to UTC.
pub fn from_unix_seconds(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

/// Trim a string and map an empty result to `None`.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
