//! Timestamp parsing for backend records
//!
//! Backends have emitted several date formats over time. They are tried in
//! this order, and the first that parses wins:
//!
//! 1. RFC 3339 (`2026-03-01T08:30:00Z`, `2026-03-01T08:30:00.123+02:00`)
//! 2. RFC 2822 / HTTP date (`Sun, 01 Mar 2026 08:30:00 GMT`)
//! 3. Naive ISO date-time, read as UTC (`2026-03-01T08:30:00`, with optional fraction)
//! 4. Naive date-time with a space separator, read as UTC (`2026-03-01 08:30:00`)
//! 5. Plain date, midnight UTC (`2026-03-01`)

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a backend timestamp, or `None` if no known format matches
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn expected() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap()
    }

    #[test]
    fn test_rfc3339() {
        assert_eq!(parse_timestamp("2026-03-01T08:30:00Z"), Some(expected()));
        assert_eq!(parse_timestamp("2026-03-01T10:30:00+02:00"), Some(expected()));
    }

    #[test]
    fn test_http_date() {
        assert_eq!(
            parse_timestamp("Sun, 01 Mar 2026 08:30:00 GMT"),
            Some(expected())
        );
    }

    #[test]
    fn test_naive_formats_are_utc() {
        assert_eq!(parse_timestamp("2026-03-01T08:30:00"), Some(expected()));
        assert_eq!(parse_timestamp("2026-03-01 08:30:00"), Some(expected()));

        let fractional = parse_timestamp("2026-03-01T08:30:00.250000").unwrap();
        assert_eq!(fractional.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_plain_date() {
        assert_eq!(
            parse_timestamp(" 2026-03-01 "),
            Some(Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2026-13-40"), None);
    }
}
