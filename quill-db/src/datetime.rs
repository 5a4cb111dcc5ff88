use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};

const SQLITE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Timestamps are stored as UTC text in SQLite's own `datetime()` format, so
/// they sort lexically and compare against `datetime('now')`.
pub fn format_db_datetime(value: &DateTime<Utc>) -> String {
    value.format(SQLITE_FORMAT).to_string()
}

/// Parse a stored timestamp. Accepts the SQLite format and RFC3339.
pub fn parse_db_datetime(value: &str) -> Result<DateTime<Utc>> {
    if value.contains('T') {
        Ok(DateTime::parse_from_rfc3339(value)
            .with_context(|| format!("Failed to parse '{}' as RFC3339", value))?
            .with_timezone(&Utc))
    } else {
        Ok(NaiveDateTime::parse_from_str(value, SQLITE_FORMAT)
            .with_context(|| format!("Failed to parse '{}' as SQLite datetime", value))?
            .and_utc())
    }
}
