//! Standalone HTTP client for the Home Assistant REST API (only the
//! endpoints the collector needs).
//!
//! - Blocking client using `ureq` (no async).
//! - Every request carries a 30 second overall timeout; a hung hub surfaces
//!   as a transport error, never as a stuck call.
//! - Auth via long-lived bearer token in the `Authorization` header when
//!   configured; unauthenticated setups simply omit the header.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::models::hass::{EntityState, ForecastRequest, ForecastServiceResponse, HistorySample};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
pub enum HassClientError {
    Transport(String),
    Http { status: u16, message: String },
    Json(serde_json::Error),
}

impl core::fmt::Display for HassClientError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HassClientError::Transport(s) => write!(f, "transport error: {}", s),
            HassClientError::Http { status, message } => write!(f, "http {}: {}", status, message),
            HassClientError::Json(e) => write!(f, "json error: {}", e),
        }
    }
}

impl std::error::Error for HassClientError {}

impl From<serde_json::Error> for HassClientError {
    fn from(value: serde_json::Error) -> Self {
        HassClientError::Json(value)
    }
}

fn request_error(err: ureq::Error) -> HassClientError {
    match err {
        ureq::Error::Transport(t) => HassClientError::Transport(t.to_string()),
        ureq::Error::Status(status, res) => {
            let body = res.into_string().unwrap_or_else(|_| String::from("<no body>"));
            HassClientError::Http { status, message: body }
        }
    }
}

/// Client for one hub. Constructed once at process start and shared
/// read-only by the collection loop and any on-demand readers.
pub struct HassClient {
    agent: ureq::Agent,
    base_url: String,
    access_token: Option<String>,
}

impl HassClient {
    pub fn new(base_url: impl Into<String>, access_token: Option<String>) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        let base_url = base_url.into().trim_end_matches('/').to_string();
        HassClient {
            agent,
            base_url,
            access_token,
        }
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn with_headers(&self, req: ureq::Request) -> ureq::Request {
        let req = req.set("Accept", "application/json");
        match &self.access_token {
            Some(token) => req.set("Authorization", &format!("Bearer {}", token)),
            None => req,
        }
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, HassClientError> {
        let mut req = self.agent.get(&self.url(path));
        for (k, v) in query {
            req = req.query(k, v);
        }
        req = self.with_headers(req);

        match req.call() {
            Ok(res) => serde_json::from_reader(res.into_reader()).map_err(HassClientError::Json),
            Err(e) => Err(request_error(e)),
        }
    }

    /// `GET /api/states`: current state of every entity the hub knows.
    pub fn get_states(&self) -> Result<Vec<EntityState>, HassClientError> {
        self.get_json("/api/states", &[])
    }

    /// `GET /api/states/<entity_id>`: current state of a single entity.
    pub fn get_state(&self, entity_id: &str) -> Result<EntityState, HassClientError> {
        self.get_json(&format!("/api/states/{}", entity_id), &[])
    }

    /// `POST /api/services/weather/get_forecasts?return_response` for one
    /// forecast source, hourly granularity. Returns the (possibly empty)
    /// forecast array nested in the service response.
    pub fn get_forecast(&self, entity_id: &str) -> Result<Vec<serde_json::Value>, HassClientError> {
        let req = self
            .agent
            .post(&self.url("/api/services/weather/get_forecasts"))
            .query("return_response", "");
        let req = self.with_headers(req);

        match req.send_json(ForecastRequest::hourly(entity_id)) {
            Ok(res) => {
                let parsed: ForecastServiceResponse =
                    serde_json::from_reader(res.into_reader()).map_err(HassClientError::Json)?;
                Ok(parsed.forecast_for(entity_id))
            }
            Err(e) => Err(request_error(e)),
        }
    }

    /// `GET /api/history/period/<YYYY-MM-DD>` for one entity with
    /// `minimal_response` and `significant_changes_only`. The hub answers
    /// with an array of arrays; only the first inner array is meaningful for
    /// a single-entity filter.
    pub fn get_history(&self, entity_id: &str, day: NaiveDate) -> Result<Vec<HistorySample>, HassClientError> {
        let path = format!("/api/history/period/{}", day.format("%Y-%m-%d"));
        let raw: Vec<Vec<HistorySample>> = self.get_json(
            &path,
            &[
                ("filter_entity_id", entity_id),
                ("minimal_response", ""),
                ("significant_changes_only", ""),
            ],
        )?;
        Ok(raw.into_iter().next().unwrap_or_default())
    }
}
