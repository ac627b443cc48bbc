//! Combined dashboard read: everything the landing page needs in one call.

use chrono::{DateTime, Utc};
use diesel::PgConnection;
use serde::Serialize;

use crate::db::models::{DailyPowerUsage, SensorValue};
use crate::services::stats::{self, DailySummary};
use crate::services::store::{self, ReadError};

/// Stored forecast with its payload decoded back into a JSON array. An
/// undecodable payload degrades to an empty array rather than failing the
/// whole dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastReport {
    pub entity_id: String,
    pub forecast: Vec<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardData {
    pub sensor_readings: Vec<SensorValue>,
    pub weather_forecast: Option<ForecastReport>,
    pub daily_power_usage: Option<DailyPowerUsage>,
    pub daily_thermostat_stats: Option<DailySummary>,
}

/// Latest sensor values (in `target_entities` order, absent keys omitted),
/// the most recent forecast, today's power accumulator row, and today's
/// thermostat summary.
pub fn dashboard(conn: &mut PgConnection, target_entities: &[String]) -> Result<DashboardData, ReadError> {
    let sensor_readings = store::latest_sensor_values(conn, target_entities)?;

    let weather_forecast = store::latest_forecast(conn)?.map(|snapshot| ForecastReport {
        forecast: serde_json::from_str(&snapshot.forecast_data).unwrap_or_default(),
        entity_id: snapshot.entity_id,
        timestamp: snapshot.timestamp,
    });

    let today = Utc::now().date_naive();
    let daily_power_usage = store::todays_power(conn, today)?;

    let todays_intervals = store::intervals_in_day(conn, today)?;
    let daily_thermostat_stats = stats::daily_summary(&todays_intervals, today);

    Ok(DashboardData {
        sensor_readings,
        weather_forecast,
        daily_power_usage,
        daily_thermostat_stats,
    })
}
