//! Date-window arithmetic and parsing shared by the read paths and the
//! rollup engine.
//!
//! All windows are inclusive on both ends, with microsecond-precision
//! boundaries (`00:00:00.000000` to `23:59:59.999999`), so a record stamped
//! exactly at either edge belongs to the window.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap()
}

/// Inclusive bounds of one calendar day.
pub fn day_window(day: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    (day.and_time(NaiveTime::MIN), day.and_time(end_of_day()))
}

/// Calendar day count of a month, leap-year aware. `None` for an invalid
/// month or a year outside chrono's range.
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((next_first - first).num_days() as u32)
}

/// Inclusive bounds of one calendar month plus its day count.
pub fn month_window(year: i32, month: u32) -> Option<(NaiveDateTime, NaiveDateTime, u32)> {
    let day_count = days_in_month(year, month)?;
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last = NaiveDate::from_ymd_opt(year, month, day_count)?;
    Some((first.and_time(NaiveTime::MIN), last.and_time(end_of_day()), day_count))
}

/// Inclusive bounds of one calendar year.
pub fn year_window(year: i32) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let first = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let last = NaiveDate::from_ymd_opt(year, 12, 31)?;
    Some((first.and_time(NaiveTime::MIN), last.and_time(end_of_day())))
}

/// Parse a timestamp in the canonical storage format
/// (`YYYY-MM-DD HH:MM:SS.ffffff`), with the fractional part optional and a
/// `T` separator tolerated. A bare date maps to midnight.
pub fn parse_timestamp(input: &str) -> Option<NaiveDateTime> {
    let trimmed = input.trim();
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Parse a calendar date, accepting either `YYYY-MM-DD` or a full timestamp
/// (the date component is taken).
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(trimmed).map(|ts| ts.date()))
}

/// Reporting precision for temperatures, averages and efficiency.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn day_window_is_inclusive_with_microsecond_edges() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let (start, end) = day_window(day);
        assert_eq!(start, day.and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(end.time().nanosecond(), 999_999_000);
        assert_eq!(end.date(), day);
    }

    #[test]
    fn month_lengths_follow_the_calendar() {
        assert_eq!(days_in_month(2024, 2), Some(29));
        assert_eq!(days_in_month(2023, 2), Some(28));
        assert_eq!(days_in_month(2100, 2), Some(28));
        assert_eq!(days_in_month(2000, 2), Some(29));
        assert_eq!(days_in_month(2024, 12), Some(31));
        assert_eq!(days_in_month(2024, 4), Some(30));
        assert_eq!(days_in_month(2024, 13), None);
        assert_eq!(days_in_month(2024, 0), None);
    }

    #[test]
    fn month_window_spans_first_to_last_day() {
        let (start, end, day_count) = month_window(2024, 2).unwrap();
        assert_eq!(day_count, 29);
        assert_eq!(start.date(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(end.date(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn parses_canonical_and_lenient_timestamps() {
        let full = parse_timestamp("2021-03-04 20:00:00.000123").unwrap();
        assert_eq!(full.time().nanosecond(), 123_000);
        assert!(parse_timestamp("2021-03-04T20:00:00").is_some());
        assert_eq!(
            parse_timestamp("2021-03-04").unwrap(),
            NaiveDate::from_ymd_opt(2021, 3, 4).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2021-13-01 00:00:00").is_none());
    }

    #[test]
    fn parses_dates_from_dates_and_timestamps() {
        let expected = NaiveDate::from_ymd_opt(2021, 3, 4).unwrap();
        assert_eq!(parse_date("2021-03-04"), Some(expected));
        assert_eq!(parse_date(" 2021-03-04 12:30:00.5 "), Some(expected));
        assert_eq!(parse_date("not-a-date"), None);
    }

    #[test]
    fn rounding_is_two_decimals() {
        assert_eq!(round2(2.499_999), 2.5);
        assert_eq!(round2(30.0 / 12.0), 2.5);
        assert_eq!(round2(-0.005), -0.01);
        assert_eq!(round2(0.0), 0.0);
    }
}
