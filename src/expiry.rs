use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Outcome of parsing a raw expiry value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedExpiry {
    /// No value present (NULL or blank).
    Absent,
    Date(DateTime<Utc>),
    /// Value present but not recognizable as a date.
    Unparsable,
}

/// Best-effort parse of an expiry value as it appears in imported data:
/// RFC 3339, bare dates, `MM/DD/YYYY`, epoch seconds or milliseconds, or a
/// Firestore-style `{"seconds": N}` object.
pub fn parse_expiry(raw: Option<&str>) -> ParsedExpiry {
    let raw = match raw.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => return ParsedExpiry::Absent,
    };

    // Firestore export artifact: {"seconds": 1735689600, "nanoseconds": 0}
    if raw.starts_with('{') {
        if let Ok(obj) = serde_json::from_str::<serde_json::Value>(raw) {
            let secs = obj
                .get("seconds")
                .or_else(|| obj.get("_seconds"))
                .and_then(|v| v.as_i64());
            if let Some(secs) = secs {
                if let Some(dt) = Utc.timestamp_opt(secs, 0).single() {
                    return ParsedExpiry::Date(dt);
                }
            }
        }
        return ParsedExpiry::Unparsable;
    }

    // Numeric epoch: 13+ digits are milliseconds, otherwise seconds.
    if raw.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(n) = raw.parse::<i64>() {
            let dt = if raw.len() >= 13 {
                Utc.timestamp_millis_opt(n).single()
            } else {
                Utc.timestamp_opt(n, 0).single()
            };
            return match dt {
                Some(dt) => ParsedExpiry::Date(dt),
                None => ParsedExpiry::Unparsable,
            };
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return ParsedExpiry::Date(dt.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return ParsedExpiry::Date(Utc.from_utc_datetime(&naive));
        }
    }

    // Bare dates expire at the end of the stated day, not its midnight.
    for fmt in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            if let Some(naive) = date.and_hms_opt(23, 59, 59) {
                return ParsedExpiry::Date(Utc.from_utc_datetime(&naive));
            }
        }
    }

    ParsedExpiry::Unparsable
}

/// Decide whether a record should be kept given its raw expiry value.
///
/// Inclusion-biased: absent values, pre-2000 dates (epoch-zero import
/// artifacts), and unparsable values are all kept. Only a cleanly parsed
/// date in the past excludes a record — the system prefers showing a
/// possibly stale coupon over hiding a valid one.
pub fn is_unexpired(raw: Option<&str>, now: DateTime<Utc>) -> bool {
    match parse_expiry(raw) {
        ParsedExpiry::Absent => true,
        ParsedExpiry::Date(dt) => dt.year() < 2000 || dt >= now,
        ParsedExpiry::Unparsable => {
            tracing::warn!("unrecognized expiry value {:?}, keeping record", raw);
            true
        }
    }
}

/// Re-render a raw expiry value as RFC 3339 when it parses; pass the raw
/// value through otherwise so clients see what the data actually holds.
pub fn normalize_expiry(raw: Option<&str>) -> Option<String> {
    match parse_expiry(raw) {
        ParsedExpiry::Absent => None,
        ParsedExpiry::Date(dt) => Some(dt.to_rfc3339()),
        ParsedExpiry::Unparsable => raw.map(|s| s.trim().to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn absent_is_included() {
        assert!(is_unexpired(None, now()));
        assert!(is_unexpired(Some(""), now()));
        assert!(is_unexpired(Some("   "), now()));
    }

    #[test]
    fn pre_2000_is_treated_as_no_expiry() {
        assert!(is_unexpired(Some("1999-12-31"), now()));
        // Epoch zero from a spreadsheet export.
        assert!(is_unexpired(Some("1970-01-01T00:00:00Z"), now()));
    }

    #[test]
    fn unparsable_is_included() {
        assert!(is_unexpired(Some("Invalid Date"), now()));
        assert!(is_unexpired(Some("N/A"), now()));
        assert!(is_unexpired(Some("soon"), now()));
    }

    #[test]
    fn past_date_is_excluded() {
        assert!(!is_unexpired(Some("2024-01-15"), now()));
        assert!(!is_unexpired(Some("2024-01-15T08:30:00Z"), now()));
    }

    #[test]
    fn future_date_is_included() {
        assert!(is_unexpired(Some("2030-01-01"), now()));
        assert!(is_unexpired(Some("12/31/2030"), now()));
    }

    #[test]
    fn epoch_seconds_and_millis() {
        // 2030-01-01T00:00:00Z
        assert!(is_unexpired(Some("1893456000"), now()));
        assert!(is_unexpired(Some("1893456000000"), now()));
        // 2020-01-01T00:00:00Z is in the past
        assert!(!is_unexpired(Some("1577836800"), now()));
    }

    #[test]
    fn firestore_timestamp_object() {
        assert_eq!(
            parse_expiry(Some(r#"{"seconds": 1893456000, "nanoseconds": 0}"#)),
            ParsedExpiry::Date(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap())
        );
        assert!(!is_unexpired(Some(r#"{"_seconds": 1577836800}"#), now()));
        assert!(is_unexpired(Some(r#"{"nope": true}"#), now()));
    }

    #[test]
    fn bare_date_lasts_through_its_day() {
        // Same calendar day as `now` but with no time component: still valid.
        assert!(is_unexpired(Some("2026-06-01"), now()));
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize_expiry(None), None);
        assert_eq!(normalize_expiry(Some(" ")), None);
        assert_eq!(
            normalize_expiry(Some("2030-01-01T00:00:00Z")),
            Some("2030-01-01T00:00:00+00:00".to_owned())
        );
        assert_eq!(
            normalize_expiry(Some("whenever")),
            Some("whenever".to_owned())
        );
    }
}
