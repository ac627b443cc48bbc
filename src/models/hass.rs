//! Serde models for the subset of Home Assistant REST API payloads the
//! collector consumes. Unknown fields (attributes, context, ...) are
//! ignored on deserialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One element of `GET /api/states`, also the shape of
/// `GET /api/states/<entity_id>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityState {
    pub entity_id: String,
    pub state: String,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Request body of `POST /api/services/weather/get_forecasts`.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastRequest {
    pub entity_id: String,
    #[serde(rename = "type")]
    pub forecast_type: String,
}

impl ForecastRequest {
    pub fn hourly(entity_id: &str) -> Self {
        ForecastRequest {
            entity_id: entity_id.to_string(),
            forecast_type: "hourly".to_string(),
        }
    }
}

/// Response envelope of the forecast service call with `?return_response`.
/// The forecast array is nested at `service_response.<entity_id>.forecast`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastServiceResponse {
    #[serde(default)]
    pub service_response: BTreeMap<String, ForecastEnvelope>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastEnvelope {
    /// Entries are stored verbatim, so they stay opaque JSON here.
    #[serde(default)]
    pub forecast: Vec<serde_json::Value>,
}

impl ForecastServiceResponse {
    /// Forecast array for one source entity; missing entity means empty.
    pub fn forecast_for(&self, entity_id: &str) -> Vec<serde_json::Value> {
        self.service_response
            .get(entity_id)
            .map(|envelope| envelope.forecast.clone())
            .unwrap_or_default()
    }
}

/// One sample of `GET /api/history/period/<date>` with `minimal_response`:
/// entries after the first carry only `state` and `last_changed`.
#[derive(Debug, Clone, Deserialize)]
pub struct HistorySample {
    pub state: String,
    #[serde(default)]
    pub last_changed: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/data/{name}")).expect("fixture present")
    }

    #[test]
    fn parses_states_response_ignoring_extra_fields() {
        let states: Vec<EntityState> =
            serde_json::from_str(&load_fixture("states-response.json")).expect("parse states");
        assert_eq!(states.len(), 4);
        assert_eq!(states[0].entity_id, "sensor.living_room_temperature");
        assert_eq!(states[0].state, "21.4");
        assert!(states[0].last_updated.is_some());
    }

    #[test]
    fn forecast_response_navigates_to_nested_array() {
        let parsed: ForecastServiceResponse =
            serde_json::from_str(&load_fixture("forecast-response.json")).expect("parse forecast");
        let entries = parsed.forecast_for("weather.home_forecast");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["condition"], "cloudy");
    }

    #[test]
    fn forecast_response_missing_entity_is_empty() {
        let parsed: ForecastServiceResponse =
            serde_json::from_str(&load_fixture("forecast-response.json")).expect("parse forecast");
        assert!(parsed.forecast_for("weather.elsewhere").is_empty());
    }

    #[test]
    fn parses_minimal_history_samples() {
        let history: Vec<Vec<HistorySample>> =
            serde_json::from_str(&load_fixture("history-response.json")).expect("parse history");
        let samples = &history[0];
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].state, "11251.201");
        assert_eq!(samples[2].state, "11263.874");
        // minimal_response entries may omit everything but state
        assert!(samples[1].last_changed.is_some());
    }
}
