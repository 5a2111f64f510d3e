//! Timestamp conversions: the geometry "M" value, GPX text timestamps and
//! copyright years.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::{GpxError, Result};
use crate::gpx_types::Timestamp;
use crate::options::TimeLayout;

const NANOS_PER_SECOND: f64 = 1e9;

/// Seconds since the Unix epoch, fraction included. An absent time maps to 0.
pub fn time_to_measure(t: Timestamp) -> f64 {
    match t {
        None => 0.0,
        Some(t) => t.timestamp() as f64 + f64::from(t.timestamp_subsec_nanos()) / NANOS_PER_SECOND,
    }
}

/// Inverse of [`time_to_measure`]. A measure of exactly 0 maps back to the
/// absent time, never to the epoch instant.
pub fn measure_to_time(m: f64) -> Timestamp {
    if m == 0.0 || !m.is_finite() {
        return None;
    }
    let mut secs = m.floor() as i64;
    let mut nanos = ((m - m.floor()) * NANOS_PER_SECOND).round() as u32;
    if nanos >= 1_000_000_000 {
        secs += 1;
        nanos -= 1_000_000_000;
    }
    DateTime::from_timestamp(secs, nanos)
}

/// Format as RFC 3339 in UTC with as many fractional digits as needed.
pub fn format_time(t: &DateTime<Utc>) -> String {
    let mut text = t.format("%Y-%m-%dT%H:%M:%S").to_string();
    let nanos = t.timestamp_subsec_nanos();
    if nanos != 0 {
        let fraction = format!("{nanos:09}");
        text.push('.');
        text.push_str(fraction.trim_end_matches('0'));
    }
    text.push('Z');
    text
}

/// Parse with each layout in turn, returning the first success.
pub fn parse_time(text: &str, layouts: &[TimeLayout]) -> Result<DateTime<Utc>> {
    let text = text.trim();
    layouts
        .iter()
        .find_map(|layout| parse_with_layout(text, layout))
        .ok_or_else(|| GpxError::NoMatchingTimeLayout {
            value: text.to_string(),
        })
}

fn parse_with_layout(text: &str, layout: &TimeLayout) -> Option<DateTime<Utc>> {
    match layout {
        TimeLayout::Rfc3339 => DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        TimeLayout::Format(fmt) => {
            if let Ok(t) = DateTime::parse_from_str(text, fmt) {
                return Some(t.with_timezone(&Utc));
            }
            if let Ok(t) = NaiveDateTime::parse_from_str(text, fmt) {
                return Some(t.and_utc());
            }
            NaiveDate::parse_from_str(text, fmt)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|t| t.and_utc())
        }
    }
}

/// Parse a copyright year: `YYYY`, `YYYYZ` or `YYYY±hh:mm`.
pub fn parse_year(text: &str) -> Result<i32> {
    let trimmed = text.trim();
    let invalid = || GpxError::InvalidYear {
        value: trimmed.to_string(),
    };
    let (digits, zone) = trimmed.split_at_checked(4).ok_or_else(invalid)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) || !is_zone_designator(zone) {
        return Err(invalid());
    }
    digits.parse().map_err(|_| invalid())
}

fn is_zone_designator(zone: &str) -> bool {
    match zone.as_bytes() {
        [] | [b'Z'] => true,
        [sign, h1, h2, b':', m1, m2] => {
            matches!(sign, b'+' | b'-')
                && [h1, h2, m1, m2].iter().all(|b| b.is_ascii_digit())
                && (h1 - b'0') * 10 + (h2 - b'0') < 24
                && (m1 - b'0') * 10 + (m2 - b'0') < 60
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::DecodeOptions;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_time_to_measure() {
        assert_eq!(time_to_measure(None), 0.0);
        assert_eq!(time_to_measure(Some(utc(2000, 1, 1, 0, 0, 0))), 946684800.0);
        let half = utc(2006, 1, 2, 15, 4, 5) + chrono::Duration::milliseconds(500);
        assert_eq!(time_to_measure(Some(half)), 1136214245.5);
    }

    #[test]
    fn test_measure_to_time() {
        assert_eq!(measure_to_time(946684800.0), Some(utc(2000, 1, 1, 0, 0, 0)));
        let half = utc(2006, 1, 2, 15, 4, 5) + chrono::Duration::milliseconds(500);
        assert_eq!(measure_to_time(1136214245.5), Some(half));
    }

    #[test]
    fn test_epoch_collapses_to_absent() {
        let epoch = DateTime::from_timestamp(0, 0).unwrap();
        assert_eq!(time_to_measure(Some(epoch)), 0.0);
        assert_eq!(measure_to_time(0.0), None);
        assert_eq!(measure_to_time(time_to_measure(Some(epoch))), None);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(&utc(2001, 11, 28, 21, 5, 28)), "2001-11-28T21:05:28Z");
        let t = utc(2006, 1, 2, 15, 4, 5) + chrono::Duration::milliseconds(500);
        assert_eq!(format_time(&t), "2006-01-02T15:04:05.5Z");
        let t = utc(2006, 1, 2, 15, 4, 5) + chrono::Duration::nanoseconds(123_456_789);
        assert_eq!(format_time(&t), "2006-01-02T15:04:05.123456789Z");
    }

    #[test]
    fn test_parse_time_default_layouts() {
        let opts = DecodeOptions::default();
        assert_eq!(
            parse_time("2001-11-28T21:05:28Z", &opts.time_layouts).unwrap(),
            utc(2001, 11, 28, 21, 5, 28)
        );
        assert_eq!(
            parse_time("2001-11-28T23:05:28+02:00", &opts.time_layouts).unwrap(),
            utc(2001, 11, 28, 21, 5, 28)
        );
        // No zone designator: read as UTC.
        assert_eq!(
            parse_time("2001-11-28T21:05:28.25", &opts.time_layouts).unwrap(),
            utc(2001, 11, 28, 21, 5, 28) + chrono::Duration::milliseconds(250)
        );
    }

    #[test]
    fn test_parse_time_no_match() {
        let err = parse_time("yesterday", &DecodeOptions::default().time_layouts).unwrap_err();
        assert!(err.is_semantic());
        assert!(err.to_string().contains("yesterday"));
    }

    #[test]
    fn test_parse_time_custom_layout() {
        let layouts = [TimeLayout::Format("%d/%m/%Y %H:%M".to_string())];
        assert_eq!(
            parse_time("28/11/2001 21:05", &layouts).unwrap(),
            utc(2001, 11, 28, 21, 5, 0)
        );
        assert!(parse_time("2001-11-28T21:05:28Z", &layouts).is_err());
    }

    #[test]
    fn test_parse_year() {
        assert_eq!(parse_year("2019Z").unwrap(), 2019);
        assert_eq!(parse_year("2013").unwrap(), 2013);
        assert_eq!(parse_year("2011+05:00").unwrap(), 2011);
        assert_eq!(parse_year("1999-08:30").unwrap(), 1999);
    }

    #[test]
    fn test_parse_year_rejects_garbage() {
        for text in ["not-a-year", "201", "20190", "2019+5:00", "2019Y"] {
            match parse_year(text) {
                Err(GpxError::InvalidYear { value }) => assert_eq!(value, text),
                other => panic!("expected InvalidYear for {text:?}, got {other:?}"),
            }
        }
    }
}
