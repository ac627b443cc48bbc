//! Persistence operations: latest-value reconciliation upserts, the
//! heating-interval read paths, and the report assembly the HTTP layer
//! calls.
//!
//! Upserts are an explicit find-then-write inside one transaction per
//! logical operation, so a concurrent reader never observes a half-written
//! row. The latest-value tables hold exactly one row per key; writes
//! overwrite in place (last write wins, no history).

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use diesel::PgConnection;
use serde::{Deserialize, Serialize};

use crate::db::models::{
    DailyPowerUsage, ForecastSnapshot, HeatingInterval, NewDailyPowerUsage, NewForecastSnapshot,
    NewHeatingInterval, NewSensorValue, SensorValue,
};
use crate::schema;
use crate::services::power::DailyUsage;
use crate::services::rollup::{self, DailyBucket, HourlyBucket, MonthlyBucket};
use crate::services::stats::{self, EfficiencyRow, StatsSummary};
use crate::utils::{day_window, parse_date, parse_timestamp};

#[derive(Debug)]
pub enum StoreError {
    Db(diesel::result::Error),
    Json(serde_json::Error),
    Validation(String),
}

impl core::fmt::Display for StoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StoreError::Db(e) => write!(f, "database error: {}", e),
            StoreError::Json(e) => write!(f, "serialization error: {}", e),
            StoreError::Validation(msg) => write!(f, "validation error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<diesel::result::Error> for StoreError {
    fn from(value: diesel::result::Error) -> Self {
        StoreError::Db(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        StoreError::Json(value)
    }
}

/// Read-path failures the HTTP layer can map onto status codes. A malformed
/// query parameter is distinct from an empty result: empty stays `Ok`.
#[derive(Debug)]
pub enum ReadError {
    InvalidQuery(String),
    Db(diesel::result::Error),
}

impl core::fmt::Display for ReadError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ReadError::InvalidQuery(msg) => write!(f, "invalid query: {}", msg),
            ReadError::Db(e) => write!(f, "database error: {}", e),
        }
    }
}

impl std::error::Error for ReadError {}

impl From<diesel::result::Error> for ReadError {
    fn from(value: diesel::result::Error) -> Self {
        ReadError::Db(value)
    }
}

// ---------------------------------------------------------------------------
// Reconciliation writes
// ---------------------------------------------------------------------------

/// Upsert a batch of `(entity_id, state)` readings with one shared write
/// timestamp. The batch is a single transaction: any failure rolls back all
/// of it and the caller moves on to the next data family.
pub fn upsert_sensor_values(
    conn: &mut PgConnection,
    readings: &[(String, String)],
    now: DateTime<Utc>,
) -> Result<usize, StoreError> {
    use schema::sensor_values::dsl as S;

    conn.transaction::<usize, diesel::result::Error, _>(|conn| {
        for (entity_id, state) in readings {
            let existing: Option<SensorValue> = S::sensor_values
                .filter(S::entity_id.eq(entity_id))
                .first(conn)
                .optional()?;
            match existing {
                Some(row) => {
                    diesel::update(S::sensor_values.filter(S::id.eq(row.id)))
                        .set((S::state.eq(state), S::timestamp.eq(now)))
                        .execute(conn)?;
                }
                None => {
                    diesel::insert_into(S::sensor_values)
                        .values(NewSensorValue {
                            entity_id: entity_id.clone(),
                            state: state.clone(),
                            timestamp: now,
                        })
                        .execute(conn)?;
                }
            }
        }
        Ok(readings.len())
    })
    .map_err(StoreError::Db)
}

/// Replace the stored forecast for one source key. The entries are
/// serialized to opaque JSON text; a single row per source key.
pub fn upsert_forecast(
    conn: &mut PgConnection,
    entity_id: &str,
    forecast: &[serde_json::Value],
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    use schema::forecast_snapshots::dsl as F;

    let payload = serde_json::to_string(forecast)?;

    conn.transaction::<(), diesel::result::Error, _>(|conn| {
        let existing: Option<ForecastSnapshot> = F::forecast_snapshots
            .filter(F::entity_id.eq(entity_id))
            .first(conn)
            .optional()?;
        match existing {
            Some(row) => {
                diesel::update(F::forecast_snapshots.filter(F::id.eq(row.id)))
                    .set((F::forecast_data.eq(&payload), F::timestamp.eq(now)))
                    .execute(conn)?;
            }
            None => {
                diesel::insert_into(F::forecast_snapshots)
                    .values(NewForecastSnapshot {
                        entity_id: entity_id.to_string(),
                        forecast_data: payload.clone(),
                        timestamp: now,
                    })
                    .execute(conn)?;
            }
        }
        Ok(())
    })
    .map_err(StoreError::Db)
}

/// Write the day's accumulator row: full overwrite of every numeric field,
/// never incremental accumulation, so an intraday re-poll replaces the row
/// with fresher start/end readings and a freshly computed usage.
pub fn upsert_daily_power(
    conn: &mut PgConnection,
    date: NaiveDate,
    usage: &DailyUsage,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    use schema::daily_power_usage::dsl as P;

    conn.transaction::<(), diesel::result::Error, _>(|conn| {
        let existing: Option<DailyPowerUsage> = P::daily_power_usage
            .filter(P::date.eq(date))
            .first(conn)
            .optional()?;
        match existing {
            Some(row) => {
                diesel::update(P::daily_power_usage.filter(P::id.eq(row.id)))
                    .set((
                        P::import_start_value.eq(usage.import.start_value),
                        P::import_end_value.eq(usage.import.end_value),
                        P::daily_import.eq(usage.import.delta),
                        P::export_start_value.eq(usage.export.start_value),
                        P::export_end_value.eq(usage.export.end_value),
                        P::daily_export.eq(usage.export.delta),
                        P::inverter_daily_yield.eq(usage.inverter_yield),
                        P::daily_usage.eq(usage.daily_usage),
                        P::timestamp.eq(now),
                    ))
                    .execute(conn)?;
            }
            None => {
                diesel::insert_into(P::daily_power_usage)
                    .values(NewDailyPowerUsage {
                        date,
                        import_start_value: usage.import.start_value,
                        import_end_value: usage.import.end_value,
                        daily_import: usage.import.delta,
                        export_start_value: usage.export.start_value,
                        export_end_value: usage.export.end_value,
                        daily_export: usage.export.delta,
                        inverter_daily_yield: usage.inverter_yield,
                        daily_usage: usage.daily_usage,
                        timestamp: now,
                    })
                    .execute(conn)?;
            }
        }
        Ok(())
    })
    .map_err(StoreError::Db)
}

// ---------------------------------------------------------------------------
// Latest-value reads
// ---------------------------------------------------------------------------

/// Latest value for each requested key, in the given key order; keys with no
/// row are omitted, so the result may be shorter than the input.
pub fn latest_sensor_values(
    conn: &mut PgConnection,
    entity_ids: &[String],
) -> Result<Vec<SensorValue>, diesel::result::Error> {
    use schema::sensor_values::dsl as S;

    let mut values = Vec::with_capacity(entity_ids.len());
    for entity_id in entity_ids {
        let row: Option<SensorValue> = S::sensor_values
            .filter(S::entity_id.eq(entity_id))
            .order(S::timestamp.desc())
            .first(conn)
            .optional()?;
        if let Some(row) = row {
            values.push(row);
        }
    }
    Ok(values)
}

/// The most recently updated forecast snapshot across all source keys.
pub fn latest_forecast(conn: &mut PgConnection) -> Result<Option<ForecastSnapshot>, diesel::result::Error> {
    use schema::forecast_snapshots::dsl as F;

    F::forecast_snapshots.order(F::timestamp.desc()).first(conn).optional()
}

/// The accumulator row for exactly the given date. Yesterday's row becomes
/// invisible here the moment the date changes; this is an exact-date lookup,
/// not "most recent ever".
pub fn todays_power(
    conn: &mut PgConnection,
    today: NaiveDate,
) -> Result<Option<DailyPowerUsage>, diesel::result::Error> {
    use schema::daily_power_usage::dsl as P;

    P::daily_power_usage.filter(P::date.eq(today)).first(conn).optional()
}

// ---------------------------------------------------------------------------
// Heating-interval reads
// ---------------------------------------------------------------------------

pub(crate) fn intervals_in_day(
    conn: &mut PgConnection,
    day: NaiveDate,
) -> Result<Vec<HeatingInterval>, diesel::result::Error> {
    use schema::heating_intervals::dsl as H;

    let (start, end) = day_window(day);
    H::heating_intervals
        .filter(H::start_time.ge(start))
        .filter(H::start_time.le(end))
        .order(H::start_time.asc())
        .load(conn)
}

/// Intervals whose `start_time` falls on the given calendar date.
pub fn intervals_by_date(conn: &mut PgConnection, date: &str) -> Result<Vec<HeatingInterval>, ReadError> {
    let day = parse_date(date).ok_or_else(|| ReadError::InvalidQuery(format!("unrecognised date: {date}")))?;
    Ok(intervals_in_day(conn, day)?)
}

/// Intervals fully contained in the period: `start_time >= from` and
/// `end_time <= to`.
pub fn intervals_by_period(
    conn: &mut PgConnection,
    start: &str,
    end: &str,
) -> Result<Vec<HeatingInterval>, ReadError> {
    use schema::heating_intervals::dsl as H;

    let from = parse_timestamp(start)
        .ok_or_else(|| ReadError::InvalidQuery(format!("unrecognised start timestamp: {start}")))?;
    let to =
        parse_timestamp(end).ok_or_else(|| ReadError::InvalidQuery(format!("unrecognised end timestamp: {end}")))?;

    let rows = H::heating_intervals
        .filter(H::start_time.ge(from))
        .filter(H::end_time.le(to))
        .order(H::start_time.asc())
        .load(conn)?;
    Ok(rows)
}

/// Paginated list of all intervals, oldest first.
pub fn intervals_page(conn: &mut PgConnection, limit: i64, offset: i64) -> Result<Vec<HeatingInterval>, ReadError> {
    use schema::heating_intervals::dsl as H;

    let rows = H::heating_intervals
        .order(H::start_time.asc())
        .limit(limit.max(0))
        .offset(offset.max(0))
        .load(conn)?;
    Ok(rows)
}

fn all_intervals(conn: &mut PgConnection) -> Result<Vec<HeatingInterval>, diesel::result::Error> {
    use schema::heating_intervals::dsl as H;

    H::heating_intervals.order(H::start_time.asc()).load(conn)
}

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

/// Unvalidated create-one payload as submitted by the ingestion API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalDraft {
    /// Canonical format: `2021-03-04 20:00:00.000000`.
    pub start_time: String,
    pub end_time: String,
    pub minutes_heating: i32,
    pub average_indoor_temp: f64,
    pub average_outdoor_temp: f64,
}

/// Validate and insert one heating interval, returning the persisted row.
pub fn create_interval(conn: &mut PgConnection, draft: &IntervalDraft) -> Result<HeatingInterval, StoreError> {
    use schema::heating_intervals::dsl as H;

    let start_time = parse_timestamp(&draft.start_time)
        .ok_or_else(|| StoreError::Validation(format!("start_time is not a valid timestamp: {}", draft.start_time)))?;
    let end_time = parse_timestamp(&draft.end_time)
        .ok_or_else(|| StoreError::Validation(format!("end_time is not a valid timestamp: {}", draft.end_time)))?;
    if start_time >= end_time {
        return Err(StoreError::Validation(
            "start_time must be earlier than end_time".to_string(),
        ));
    }
    if draft.minutes_heating < 0 {
        return Err(StoreError::Validation("minutes_heating must not be negative".to_string()));
    }

    let row = diesel::insert_into(H::heating_intervals)
        .values(NewHeatingInterval {
            start_time,
            end_time,
            minutes_heating: draft.minutes_heating,
            average_indoor_temp: draft.average_indoor_temp,
            average_outdoor_temp: draft.average_outdoor_temp,
        })
        .get_result(conn)?;
    Ok(row)
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// 24 hourly buckets for the date, or an empty vec when the date has no
/// records at all (the HTTP layer reports that as not-found).
pub fn hourly_report(conn: &mut PgConnection, date: &str) -> Result<Vec<HourlyBucket>, ReadError> {
    let day = parse_date(date).ok_or_else(|| ReadError::InvalidQuery(format!("unrecognised date: {date}")))?;
    let records = intervals_in_day(conn, day)?;
    if records.is_empty() {
        return Ok(Vec::new());
    }
    Ok(rollup::hourly_rollup(&records, day))
}

/// One bucket per calendar day of the month, or empty when the month has no
/// records.
pub fn daily_report(conn: &mut PgConnection, year: i32, month: u32) -> Result<Vec<DailyBucket>, ReadError> {
    use schema::heating_intervals::dsl as H;

    let (start, end, _) = crate::utils::month_window(year, month)
        .ok_or_else(|| ReadError::InvalidQuery(format!("month must be between 1 and 12, got {year}-{month}")))?;
    let records: Vec<HeatingInterval> = H::heating_intervals
        .filter(H::start_time.ge(start))
        .filter(H::start_time.le(end))
        .order(H::start_time.asc())
        .load(conn)?;
    if records.is_empty() {
        return Ok(Vec::new());
    }
    Ok(rollup::daily_rollup(&records, year, month).unwrap_or_default())
}

/// 12 monthly buckets for the year, or empty when the year has no records.
pub fn monthly_report(conn: &mut PgConnection, year: i32) -> Result<Vec<MonthlyBucket>, ReadError> {
    use schema::heating_intervals::dsl as H;

    let (start, end) = crate::utils::year_window(year)
        .ok_or_else(|| ReadError::InvalidQuery(format!("year out of range: {year}")))?;
    let records: Vec<HeatingInterval> = H::heating_intervals
        .filter(H::start_time.ge(start))
        .filter(H::start_time.le(end))
        .order(H::start_time.asc())
        .load(conn)?;
    if records.is_empty() {
        return Ok(Vec::new());
    }
    Ok(rollup::monthly_rollup(&records, year).unwrap_or_default())
}

/// Summary statistics over the whole table or a period. An empty filtered
/// set yields the all-zero summary, never an error.
pub fn statistics(
    conn: &mut PgConnection,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<StatsSummary, ReadError> {
    let records = match (start, end) {
        (Some(start), Some(end)) => intervals_by_period(conn, start, end)?,
        _ => all_intervals(conn)?,
    };
    Ok(stats::summarize(&records))
}

/// Per-record heating efficiency over a period or the whole table.
pub fn efficiency_report(
    conn: &mut PgConnection,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<Vec<EfficiencyRow>, ReadError> {
    let records = match (start, end) {
        (Some(start), Some(end)) => intervals_by_period(conn, start, end)?,
        _ => all_intervals(conn)?,
    };
    Ok(stats::heating_efficiency(&records))
}
