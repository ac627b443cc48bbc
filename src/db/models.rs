//! Diesel model structs representing the persisted telemetry entities.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema;

/// One append-only heating run: a time span, how many minutes the heating
/// was active inside it, and the average temperatures observed.
#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::heating_intervals)]
pub struct HeatingInterval {
    pub id: i64,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub minutes_heating: i32,
    pub average_indoor_temp: f64,
    pub average_outdoor_temp: f64,
}

#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::heating_intervals)]
pub struct NewHeatingInterval {
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub minutes_heating: i32,
    pub average_indoor_temp: f64,
    pub average_outdoor_temp: f64,
}

/// Latest observed state for one entity. Last write wins; no history.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::sensor_values)]
pub struct SensorValue {
    pub id: i64,
    pub entity_id: String,
    pub state: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::sensor_values)]
pub struct NewSensorValue {
    pub entity_id: String,
    pub state: String,
    pub timestamp: DateTime<Utc>,
}

/// Current forecast for one source entity, payload kept as opaque JSON text.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::forecast_snapshots)]
pub struct ForecastSnapshot {
    pub id: i64,
    pub entity_id: String,
    pub forecast_data: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::forecast_snapshots)]
pub struct NewForecastSnapshot {
    pub entity_id: String,
    pub forecast_data: String,
    pub timestamp: DateTime<Utc>,
}

/// Per-day energy accumulator. Intraday re-polls overwrite the row wholesale;
/// `daily_usage` is recomputed by the writer on every update.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = schema::daily_power_usage)]
pub struct DailyPowerUsage {
    pub id: i64,
    pub date: NaiveDate,
    pub import_start_value: f64,
    pub import_end_value: f64,
    pub daily_import: f64,
    pub export_start_value: f64,
    pub export_end_value: f64,
    pub daily_export: f64,
    pub inverter_daily_yield: f64,
    pub daily_usage: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, Serialize, Deserialize)]
#[diesel(table_name = schema::daily_power_usage)]
pub struct NewDailyPowerUsage {
    pub date: NaiveDate,
    pub import_start_value: f64,
    pub import_end_value: f64,
    pub daily_import: f64,
    pub export_start_value: f64,
    pub export_end_value: f64,
    pub daily_export: f64,
    pub inverter_daily_yield: f64,
    pub daily_usage: f64,
    pub timestamp: DateTime<Utc>,
}
