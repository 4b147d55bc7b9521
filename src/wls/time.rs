//! WLS timestamps (`yyyyMMddTHHmmssZ`, always UTC).

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::error::TimeFormatError;

/// chrono pattern for the WLS time format.
pub const WLS_TIME_FORMAT: &str = "%Y%m%dT%H%M%SZ";

const WLS_TIME_LEN: usize = 16;

/// Render a timestamp in WLS format. Sub-second precision is dropped.
///
/// Only years 0 to 9999 fit the four-digit year field. Other years are
/// rendered with a sign and extra digits, which [`parse_time`] rejects.
pub fn format_time(t: DateTime<Utc>) -> String {
    t.format(WLS_TIME_FORMAT).to_string()
}

/// Strictly parse a WLS timestamp as UTC.
pub fn parse_time(s: &str) -> Result<DateTime<Utc>, TimeFormatError> {
    let bytes = s.as_bytes();
    let well_shaped = bytes.len() == WLS_TIME_LEN
        && bytes[8] == b'T'
        && bytes[15] == b'Z'
        && bytes[..8].iter().all(u8::is_ascii_digit)
        && bytes[9..15].iter().all(u8::is_ascii_digit);
    if !well_shaped {
        return Err(TimeFormatError(s.to_string()));
    }

    let naive = NaiveDateTime::parse_from_str(s, WLS_TIME_FORMAT)
        .map_err(|_| TimeFormatError(s.to_string()))?;
    Ok(Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_format_time() {
        let t = Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap();
        assert_eq!(format_time(t), "20240115T093000Z");
    }

    #[test]
    fn test_parse_time() {
        let t = parse_time("20240115T093000Z").unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap());
    }

    #[test]
    fn test_roundtrip_truncates_to_seconds() {
        let now = Utc::now();
        let truncated = now.with_nanosecond(0).unwrap();
        assert_eq!(parse_time(&format_time(now)).unwrap(), truncated);

        let early = Utc.with_ymd_and_hms(999, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(format_time(early), "09991231T235959Z");
        assert_eq!(parse_time(&format_time(early)).unwrap(), early);
    }

    #[test]
    fn test_years_outside_format_do_not_parse() {
        let late = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();
        assert!(parse_time(&format_time(late)).is_err());

        let negative = Utc.with_ymd_and_hms(-1, 1, 1, 0, 0, 0).unwrap();
        assert!(parse_time(&format_time(negative)).is_err());

        let last = Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(format_time(last), "99991231T235959Z");
        assert_eq!(parse_time(&format_time(last)).unwrap(), last);
    }

    #[test]
    fn test_parse_rejects_deviations() {
        for bad in [
            "",
            "20240115T093000",
            "20240115 093000Z",
            "20240115T093000z",
            "2024011T093000ZZ",
            "20240115T0930000Z",
            "2024-1-15T09300Z",
            "2024011aT093000Z",
            "20241315T093000Z",
            "20240115T253000Z",
            "+2024015T093000Z",
            "20240115T093000+",
        ] {
            assert!(parse_time(bad).is_err(), "accepted {:?}", bad);
        }
    }
}
