//! One-pass summary statistics and derived per-record metrics over heating
//! intervals. Empty input is a valid input: everything degrades to zeros or
//! absence, never to an error.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::db::models::HeatingInterval;
use crate::utils::round2;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSummary {
    pub total_records: i64,
    pub total_heating_minutes: i64,
    pub avg_indoor_temp: f64,
    pub avg_outdoor_temp: f64,
    pub min_indoor_temp: f64,
    pub max_indoor_temp: f64,
    pub min_outdoor_temp: f64,
    pub max_outdoor_temp: f64,
}

/// Count/sum/avg/min/max in a single pass. Averages are rounded to 2
/// decimals; extrema are reported unrounded.
pub fn summarize(intervals: &[HeatingInterval]) -> StatsSummary {
    if intervals.is_empty() {
        return StatsSummary::default();
    }

    let mut total_heating_minutes: i64 = 0;
    let mut indoor_sum = 0.0;
    let mut outdoor_sum = 0.0;
    let mut min_indoor = f64::INFINITY;
    let mut max_indoor = f64::NEG_INFINITY;
    let mut min_outdoor = f64::INFINITY;
    let mut max_outdoor = f64::NEG_INFINITY;

    for interval in intervals {
        total_heating_minutes += i64::from(interval.minutes_heating);
        indoor_sum += interval.average_indoor_temp;
        outdoor_sum += interval.average_outdoor_temp;
        min_indoor = min_indoor.min(interval.average_indoor_temp);
        max_indoor = max_indoor.max(interval.average_indoor_temp);
        min_outdoor = min_outdoor.min(interval.average_outdoor_temp);
        max_outdoor = max_outdoor.max(interval.average_outdoor_temp);
    }

    let count = intervals.len() as i64;
    StatsSummary {
        total_records: count,
        total_heating_minutes,
        avg_indoor_temp: round2(indoor_sum / count as f64),
        avg_outdoor_temp: round2(outdoor_sum / count as f64),
        min_indoor_temp: min_indoor,
        max_indoor_temp: max_indoor,
        min_outdoor_temp: min_outdoor,
        max_outdoor_temp: max_outdoor,
    }
}

/// Today's dashboard block. `None` when the day has no records, so the
/// caller can report absence instead of a zeroed summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_heating_minutes: i64,
    pub avg_indoor_temp: f64,
    pub avg_outdoor_temp: f64,
    pub records_count: i64,
}

pub fn daily_summary(intervals: &[HeatingInterval], date: NaiveDate) -> Option<DailySummary> {
    if intervals.is_empty() {
        return None;
    }
    let summary = summarize(intervals);
    Some(DailySummary {
        date,
        total_heating_minutes: summary.total_heating_minutes,
        avg_indoor_temp: summary.avg_indoor_temp,
        avg_outdoor_temp: summary.avg_outdoor_temp,
        records_count: summary.total_records,
    })
}

/// Heating efficiency of one record: minutes of heating per degree of
/// indoor/outdoor difference. A zero or inverted difference collapses to 0
/// rather than erroring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EfficiencyRow {
    pub id: i64,
    pub start_time: NaiveDateTime,
    pub temperature_difference: f64,
    pub heating_minutes: i32,
    pub heating_efficiency: f64,
}

pub fn heating_efficiency(intervals: &[HeatingInterval]) -> Vec<EfficiencyRow> {
    intervals
        .iter()
        .map(|interval| {
            let temp_diff = interval.average_indoor_temp - interval.average_outdoor_temp;
            let efficiency = if temp_diff > 0.0 {
                f64::from(interval.minutes_heating) / temp_diff
            } else {
                0.0
            };
            EfficiencyRow {
                id: interval.id,
                start_time: interval.start_time,
                temperature_difference: round2(temp_diff),
                heating_minutes: interval.minutes_heating,
                heating_efficiency: round2(efficiency),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn empty_set_summarizes_to_all_zeros() {
        let summary = summarize(&[]);
        assert_eq!(summary, StatsSummary::default());
        assert_eq!(summary.total_records, 0);
        assert_eq!(summary.min_indoor_temp, 0.0);
        assert_eq!(summary.max_outdoor_temp, 0.0);
    }

    #[test]
    fn summarize_counts_sums_and_extrema() {
        let data = vec![
            interval(1, "2024-01-01 08:00:00.000000", 30, 21.0, -5.0),
            interval(2, "2024-01-01 09:00:00.000000", 15, 19.0, 3.0),
            interval(3, "2024-01-02 08:00:00.000000", 45, 23.5, 0.0),
        ];
        let summary = summarize(&data);
        assert_eq!(summary.total_records, 3);
        assert_eq!(summary.total_heating_minutes, 90);
        assert_eq!(summary.avg_indoor_temp, 21.17);
        assert_eq!(summary.avg_outdoor_temp, -0.67);
        assert_eq!(summary.min_indoor_temp, 19.0);
        assert_eq!(summary.max_indoor_temp, 23.5);
        assert_eq!(summary.min_outdoor_temp, -5.0);
        assert_eq!(summary.max_outdoor_temp, 3.0);
    }

    #[test]
    fn daily_summary_absent_without_records() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(daily_summary(&[], date).is_none());

        let data = vec![
            interval(1, "2024-01-01 08:00:00.000000", 30, 22.0, 2.0),
            interval(2, "2024-01-01 09:00:00.000000", 10, 20.0, 4.0),
        ];
        let summary = daily_summary(&data, date).unwrap();
        assert_eq!(summary.date, date);
        assert_eq!(summary.total_heating_minutes, 40);
        assert_eq!(summary.avg_indoor_temp, 21.0);
        assert_eq!(summary.avg_outdoor_temp, 3.0);
        assert_eq!(summary.records_count, 2);
    }

    #[test]
    fn efficiency_collapses_non_positive_difference_to_zero() {
        let data = vec![
            interval(1, "2024-01-01 08:00:00.000000", 30, 20.0, 20.0),
            interval(2, "2024-01-01 09:00:00.000000", 30, 20.0, 25.0),
            interval(3, "2024-01-01 10:00:00.000000", 30, 22.0, 10.0),
        ];
        let rows = heating_efficiency(&data);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].heating_efficiency, 0.0);
        assert_eq!(rows[1].heating_efficiency, 0.0);
        assert_eq!(rows[1].temperature_difference, -5.0);
        assert_eq!(rows[2].temperature_difference, 12.0);
        assert_eq!(rows[2].heating_efficiency, 2.5);
    }
}
