//! Date helpers over `chrono`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Default pattern used by [`format_timestamp`] callers.
pub const DEFAULT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Converts epoch milliseconds to a UTC date time.
pub fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

/// Formats epoch milliseconds with a `strftime` pattern, in UTC.
pub fn format_timestamp(ms: i64, fmt: &str) -> Option<String> {
    from_millis(ms).map(|dt| dt.format(fmt).to_string())
}

/// Parses the date shapes backends commonly send.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (taken as UTC) and `YYYY-MM-DD`
/// (midnight UTC).
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, DEFAULT_FORMAT) {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp(0, DEFAULT_FORMAT).as_deref(),
            Some("1970-01-01 00:00:00")
        );
        assert_eq!(
            format_timestamp(1_700_000_000_000, "%Y/%m/%d").as_deref(),
            Some("2023/11/14")
        );
    }

    #[test]
    fn test_parse_datetime() {
        let expected = from_millis(1_700_000_000_000).unwrap();
        assert_eq!(parse_datetime("2023-11-14T22:13:20Z"), Some(expected));
        assert_eq!(parse_datetime("2023-11-14T23:13:20+01:00"), Some(expected));
        assert_eq!(parse_datetime(" 2023-11-14 22:13:20 "), Some(expected));
        assert_eq!(
            parse_datetime("2023-11-14").map(|dt| dt.timestamp()),
            Some(1_699_920_000)
        );
        assert!(parse_datetime("yesterday").is_none());
    }

    #[test]
    fn test_now_millis_is_recent() {
        assert!(now_millis() > 1_700_000_000_000);
    }
}
