//! Time utility functions
//!
//! Timestamps are stored as unix epoch seconds and rendered as RFC 3339 UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

/// Current wall-clock time in unix seconds
pub fn now_secs() -> i64 {
    Utc::now().timestamp()
}

/// Convert unix seconds to DateTime<Utc>
pub fn secs_to_datetime(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_else(|| {
        tracing::warn!(secs, "Invalid timestamp, using epoch");
        DateTime::UNIX_EPOCH
    })
}

/// Convert unix seconds to an ISO 8601 string (second precision, `Z` suffix)
pub fn secs_to_iso(secs: i64) -> String {
    secs_to_datetime(secs).to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a client-supplied timestamp into unix seconds.
///
/// Accepts RFC 3339 (`2024-05-01T10:00:00Z`, offsets allowed), a naive
/// datetime interpreted as UTC (`2024-05-01T10:00:00`), or a bare date
/// (`2024-05-01`, midnight UTC).
pub fn parse_timestamp(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc).timestamp());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt.and_utc().timestamp());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}

/// Parse the upper bound of an inclusive range.
///
/// A bare date covers the whole day, so it resolves to 23:59:59 UTC.
pub fn parse_range_end(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").is_ok() {
        return parse_timestamp(trimmed).map(|start| start + 86_399);
    }
    parse_timestamp(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secs_to_iso() {
        // 2024-01-01 00:00:00 UTC
        assert_eq!(secs_to_iso(1_704_067_200), "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let ts = parse_timestamp("2024-01-01T02:00:00+02:00").unwrap();
        assert_eq!(ts, 1_704_067_200);
    }

    #[test]
    fn test_parse_naive_datetime_as_utc() {
        assert_eq!(parse_timestamp("2024-01-01T00:00:00"), Some(1_704_067_200));
        assert_eq!(parse_timestamp("2024-01-01 00:00:00"), Some(1_704_067_200));
    }

    #[test]
    fn test_parse_bare_date() {
        assert_eq!(parse_timestamp("2024-01-01"), Some(1_704_067_200));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_range_end_covers_whole_day() {
        assert_eq!(parse_range_end("2024-01-01"), Some(1_704_067_200 + 86_399));
        assert_eq!(
            parse_range_end("2024-01-01T12:00:00Z"),
            Some(1_704_067_200 + 12 * 3600)
        );
    }
}
