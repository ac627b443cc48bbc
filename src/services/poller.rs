//! Fixed-interval collection loop against the hub.
//!
//! Each cycle runs three independent sync steps: sensor states, weather
//! forecast, daily power. A failing step is logged and the remaining steps
//! still run in the same cycle; the loop itself never exits on error. The
//! interval is an additive delay after a cycle completes, so a slow cycle
//! pushes the next one back instead of overlapping it.

use chrono::{NaiveDate, Utc};
use diesel::PgConnection;
use log::{info, warn};
use std::thread;

use crate::client::HassClient;
use crate::config::Config;
use crate::services::power::{self, SeriesDelta};
use crate::services::store;

pub fn run_loop(conn: &mut PgConnection, client: &HassClient, cfg: &Config) -> ! {
    info!("Starting collection loop (interval={}s)", cfg.poll_interval.as_secs());
    loop {
        run_cycle(conn, client, cfg);
        thread::sleep(cfg.poll_interval);
    }
}

/// One collection cycle. Every failure is absorbed here; the next scheduled
/// cycle is the only retry.
pub fn run_cycle(conn: &mut PgConnection, client: &HassClient, cfg: &Config) {
    if let Err(e) = sync_sensor_states(conn, client, cfg) {
        warn!("Sensor state sync failed: {}", e);
    }
    if let Err(e) = sync_forecast(conn, client, cfg) {
        warn!("Forecast sync failed: {}", e);
    }
    if let Err(e) = sync_daily_power(conn, client, cfg) {
        warn!("Daily power sync failed: {}", e);
    }
}

fn sync_sensor_states(conn: &mut PgConnection, client: &HassClient, cfg: &Config) -> Result<(), String> {
    let states = client.get_states().map_err(|e| format!("get_states failed: {}", e))?;

    let readings: Vec<(String, String)> = states
        .into_iter()
        .filter(|s| cfg.target_entities.iter().any(|target| target == &s.entity_id))
        .map(|s| (s.entity_id, s.state))
        .collect();

    if readings.is_empty() {
        warn!("No target entities present in the state snapshot");
        return Ok(());
    }

    let count = store::upsert_sensor_values(conn, &readings, Utc::now())
        .map_err(|e| format!("saving sensor values failed: {}", e))?;
    info!("Updated {} sensor value(s)", count);
    Ok(())
}

fn sync_forecast(conn: &mut PgConnection, client: &HassClient, cfg: &Config) -> Result<(), String> {
    let forecast = client
        .get_forecast(&cfg.forecast_entity_id)
        .map_err(|e| format!("get_forecast({}) failed: {}", cfg.forecast_entity_id, e))?;

    if forecast.is_empty() {
        warn!("Forecast response for {} contained no entries", cfg.forecast_entity_id);
        return Ok(());
    }

    store::upsert_forecast(conn, &cfg.forecast_entity_id, &forecast, Utc::now())
        .map_err(|e| format!("saving forecast failed: {}", e))?;
    info!("Stored forecast with {} entries", forecast.len());
    Ok(())
}

fn sync_daily_power(conn: &mut PgConnection, client: &HassClient, cfg: &Config) -> Result<(), String> {
    let today = Utc::now().date_naive();

    let import = fetch_meter_series(client, &cfg.import_entity_id, today);
    let export = fetch_meter_series(client, &cfg.export_entity_id, today);
    let inverter_yield = fetch_current_float(client, &cfg.inverter_yield_entity_id);

    let usage = power::compute_daily_usage(import, export, inverter_yield)?;
    store::upsert_daily_power(conn, today, &usage, Utc::now())
        .map_err(|e| format!("saving daily power usage failed: {}", e))?;
    info!(
        "Stored daily power usage for {}: import={:.3} export={:.3} yield={:.3} usage={:.3} kWh",
        today, usage.import.delta, usage.export.delta, usage.inverter_yield, usage.daily_usage
    );
    Ok(())
}

fn fetch_meter_series(client: &HassClient, entity_id: &str, day: NaiveDate) -> Result<SeriesDelta, String> {
    let samples = client
        .get_history(entity_id, day)
        .map_err(|e| format!("history fetch for {} failed: {}", entity_id, e))?;
    power::series_delta(&samples).map_err(|e| format!("history for {} unusable: {}", entity_id, e))
}

fn fetch_current_float(client: &HassClient, entity_id: &str) -> Result<f64, String> {
    let state = client
        .get_state(entity_id)
        .map_err(|e| format!("get_state({}) failed: {}", entity_id, e))?;
    state
        .state
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("state of {} is not numeric: {:?}", entity_id, state.state))
}
