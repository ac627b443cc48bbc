//! Fixed-bucket rollups over heating intervals.
//!
//! Buckets are dense: every bucket value in the range appears exactly once
//! in the output, ascending, with zero-valued entries where no interval
//! started in that bucket. An interval is assigned to a bucket by the
//! hour/day/month component of its `start_time`; the end time plays no part.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::db::models::HeatingInterval;
use crate::utils::{day_window, month_window, round2, year_window};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyBucket {
    pub hour: u32,
    pub minutes_heating: i64,
    pub avg_indoor_temp: f64,
    pub avg_outdoor_temp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyBucket {
    pub day: u32,
    pub minutes_heating: i64,
    pub avg_indoor_temp: f64,
    pub avg_outdoor_temp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyBucket {
    pub month: u32,
    pub minutes_heating: i64,
    pub avg_indoor_temp: f64,
    pub avg_outdoor_temp: f64,
}

#[derive(Debug, Default)]
struct BucketAccumulator {
    minutes_heating: i64,
    indoor_temps: Vec<f64>,
    outdoor_temps: Vec<f64>,
}

impl BucketAccumulator {
    fn add(&mut self, interval: &HeatingInterval) {
        self.minutes_heating += i64::from(interval.minutes_heating);
        self.indoor_temps.push(interval.average_indoor_temp);
        self.outdoor_temps.push(interval.average_outdoor_temp);
    }

    /// (minutes, avg indoor, avg outdoor), averages rounded to 2 decimals.
    fn emit(&self) -> (i64, f64, f64) {
        (
            self.minutes_heating,
            round2(mean(&self.indoor_temps)),
            round2(mean(&self.outdoor_temps)),
        )
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Group intervals whose `start_time` lies in the inclusive window, keyed by
/// the extracted bucket component.
fn accumulate<K>(
    intervals: &[HeatingInterval],
    window: (NaiveDateTime, NaiveDateTime),
    key: K,
) -> BTreeMap<u32, BucketAccumulator>
where
    K: Fn(&HeatingInterval) -> u32,
{
    let (start, end) = window;
    let mut buckets: BTreeMap<u32, BucketAccumulator> = BTreeMap::new();
    for interval in intervals {
        if interval.start_time < start || interval.start_time > end {
            continue;
        }
        buckets.entry(key(interval)).or_default().add(interval);
    }
    buckets
}

/// 24 hour-of-day buckets for one calendar day.
pub fn hourly_rollup(intervals: &[HeatingInterval], day: NaiveDate) -> Vec<HourlyBucket> {
    let buckets = accumulate(intervals, day_window(day), |i| i.start_time.hour());
    (0..24)
        .map(|hour| match buckets.get(&hour) {
            Some(acc) => {
                let (minutes_heating, avg_indoor_temp, avg_outdoor_temp) = acc.emit();
                HourlyBucket {
                    hour,
                    minutes_heating,
                    avg_indoor_temp,
                    avg_outdoor_temp,
                }
            }
            None => HourlyBucket {
                hour,
                minutes_heating: 0,
                avg_indoor_temp: 0.0,
                avg_outdoor_temp: 0.0,
            },
        })
        .collect()
}

/// Day-of-month buckets for one calendar month; the output length equals the
/// month's actual day count (28-31, leap-year aware). `None` only for an
/// invalid year/month.
pub fn daily_rollup(intervals: &[HeatingInterval], year: i32, month: u32) -> Option<Vec<DailyBucket>> {
    let (start, end, day_count) = month_window(year, month)?;
    let buckets = accumulate(intervals, (start, end), |i| i.start_time.day());
    Some(
        (1..=day_count)
            .map(|day| match buckets.get(&day) {
                Some(acc) => {
                    let (minutes_heating, avg_indoor_temp, avg_outdoor_temp) = acc.emit();
                    DailyBucket {
                        day,
                        minutes_heating,
                        avg_indoor_temp,
                        avg_outdoor_temp,
                    }
                }
                None => DailyBucket {
                    day,
                    minutes_heating: 0,
                    avg_indoor_temp: 0.0,
                    avg_outdoor_temp: 0.0,
                },
            })
            .collect(),
    )
}

/// 12 month-of-year buckets for one calendar year.
pub fn monthly_rollup(intervals: &[HeatingInterval], year: i32) -> Option<Vec<MonthlyBucket>> {
    let window = year_window(year)?;
    let buckets = accumulate(intervals, window, |i| i.start_time.month());
    Some(
        (1..=12)
            .map(|month| match buckets.get(&month) {
                Some(acc) => {
                    let (minutes_heating, avg_indoor_temp, avg_outdoor_temp) = acc.emit();
                    MonthlyBucket {
                        month,
                        minutes_heating,
                        avg_indoor_temp,
                        avg_outdoor_temp,
                    }
                }
                None => MonthlyBucket {
                    month,
                    minutes_heating: 0,
                    avg_indoor_temp: 0.0,
                    avg_outdoor_temp: 0.0,
                },
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn interval(id: i64, start: &str, minutes: i32, indoor: f64, outdoor: f64) -> HeatingInterval {
        let start_time = crate::utils::parse_timestamp(start).expect("valid test timestamp");
        HeatingInterval {
            id,
            start_time,
            end_time: start_time + chrono::Duration::hours(1),
            minutes_heating: minutes,
            average_indoor_temp: indoor,
            average_outdoor_temp: outdoor,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn hourly_rollup_always_yields_24_ascending_buckets() {
        let rows = hourly_rollup(&[], day(2024, 3, 4));
        assert_eq!(rows.len(), 24);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.hour, i as u32);
            assert_eq!(row.minutes_heating, 0);
            assert_eq!(row.avg_indoor_temp, 0.0);
            assert_eq!(row.avg_outdoor_temp, 0.0);
        }
    }

    #[test]
    fn hourly_rollup_groups_and_averages_per_hour() {
        let data = vec![
            interval(1, "2024-03-04 08:10:00.000000", 20, 21.0, 5.0),
            interval(2, "2024-03-04 08:50:00.000000", 10, 22.0, 7.0),
            interval(3, "2024-03-04 13:00:00.000000", 45, 20.5, 3.0),
        ];
        let rows = hourly_rollup(&data, day(2024, 3, 4));
        assert_eq!(rows.len(), 24);

        let eight = &rows[8];
        assert_eq!(eight.minutes_heating, 30);
        assert_eq!(eight.avg_indoor_temp, 21.5);
        assert_eq!(eight.avg_outdoor_temp, 6.0);

        let thirteen = &rows[13];
        assert_eq!(thirteen.minutes_heating, 45);
        assert_eq!(thirteen.avg_indoor_temp, 20.5);

        assert_eq!(rows[9].minutes_heating, 0);
    }

    #[test]
    fn hourly_rollup_keeps_day_boundary_records() {
        let data = vec![
            interval(1, "2024-03-04 00:00:00.000000", 5, 20.0, 0.0),
            interval(2, "2024-03-04 23:59:59.999999", 7, 20.0, 0.0),
            interval(3, "2024-03-05 00:00:00.000000", 99, 20.0, 0.0),
            interval(4, "2024-03-03 23:59:59.999999", 99, 20.0, 0.0),
        ];
        let rows = hourly_rollup(&data, day(2024, 3, 4));
        assert_eq!(rows[0].minutes_heating, 5);
        assert_eq!(rows[23].minutes_heating, 7);
        let total: i64 = rows.iter().map(|r| r.minutes_heating).sum();
        assert_eq!(total, 12);
    }

    #[test]
    fn daily_rollup_length_matches_calendar_month() {
        assert_eq!(daily_rollup(&[], 2024, 2).unwrap().len(), 29);
        assert_eq!(daily_rollup(&[], 2023, 2).unwrap().len(), 28);
        assert_eq!(daily_rollup(&[], 2024, 4).unwrap().len(), 30);
        assert_eq!(daily_rollup(&[], 2024, 1).unwrap().len(), 31);
        assert!(daily_rollup(&[], 2024, 13).is_none());
    }

    #[test]
    fn daily_rollup_assigns_by_day_of_month() {
        let data = vec![
            interval(1, "2024-02-01 10:00:00.000000", 30, 21.0, -2.0),
            interval(2, "2024-02-29 12:00:00.000000", 15, 22.0, 1.0),
            interval(3, "2024-03-01 12:00:00.000000", 99, 22.0, 1.0),
        ];
        let rows = daily_rollup(&data, 2024, 2).unwrap();
        assert_eq!(rows.len(), 29);
        assert_eq!(rows[0].day, 1);
        assert_eq!(rows[0].minutes_heating, 30);
        assert_eq!(rows[28].day, 29);
        assert_eq!(rows[28].minutes_heating, 15);
        assert_eq!(rows[14].minutes_heating, 0);
    }

    #[test]
    fn monthly_rollup_covers_all_twelve_months() {
        let data = vec![
            interval(1, "2024-01-15 10:00:00.000000", 60, 21.0, -5.0),
            interval(2, "2024-01-20 10:00:00.000000", 30, 20.0, -3.0),
            interval(3, "2024-12-01 10:00:00.000000", 10, 21.0, 0.0),
            interval(4, "2025-01-01 00:00:00.000000", 99, 21.0, 0.0),
        ];
        let rows = monthly_rollup(&data, 2024).unwrap();
        assert_eq!(rows.len(), 12);
        assert_eq!(rows[0].month, 1);
        assert_eq!(rows[0].minutes_heating, 90);
        assert_eq!(rows[0].avg_indoor_temp, 20.5);
        assert_eq!(rows[0].avg_outdoor_temp, -4.0);
        assert_eq!(rows[11].minutes_heating, 10);
        assert_eq!(rows[5].minutes_heating, 0);
    }

    #[test]
    fn averages_are_rounded_to_two_decimals() {
        let data = vec![
            interval(1, "2024-03-04 08:00:00.000000", 1, 20.0, 1.0),
            interval(2, "2024-03-04 08:20:00.000000", 1, 20.0, 1.0),
            interval(3, "2024-03-04 08:40:00.000000", 1, 21.0, 2.0),
        ];
        let rows = hourly_rollup(&data, day(2024, 3, 4));
        // 61/3 = 20.333..., 4/3 = 1.333...
        assert_eq!(rows[8].avg_indoor_temp, 20.33);
        assert_eq!(rows[8].avg_outdoor_temp, 1.33);
    }
}
