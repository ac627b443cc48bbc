//! Daily energy usage derived from meter history and inverter yield.
//!
//! Three independently fetched inputs feed the calculation. Grid import is
//! the indispensable one: without it the day's usage cannot be stated.
//! Export and inverter yield degrade to zero with a warning, so a house
//! without an export meter or an inverter still gets a usage figure.

use core::fmt;
use log::warn;
use std::fmt::{Display, Formatter};

use crate::models::hass::HistorySample;

/// First/last reading of one meter series for a day, plus their difference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesDelta {
    pub start_value: f64,
    pub end_value: f64,
    pub delta: f64,
}

impl SeriesDelta {
    pub const ZERO: SeriesDelta = SeriesDelta {
        start_value: 0.0,
        end_value: 0.0,
        delta: 0.0,
    };
}

#[derive(Debug)]
pub enum SeriesError {
    /// A meaningful delta needs at least a first and a last sample.
    TooFewSamples(usize),
    /// A sample's state did not parse as a number (e.g. "unavailable").
    BadSample(String),
}

impl Display for SeriesError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SeriesError::TooFewSamples(n) => write!(f, "only {} history sample(s), need at least 2", n),
            SeriesError::BadSample(raw) => write!(f, "non-numeric sample state: {:?}", raw),
        }
    }
}

impl std::error::Error for SeriesError {}

/// Derive `(start, end, delta)` from one day's history samples.
pub fn series_delta(samples: &[HistorySample]) -> Result<SeriesDelta, SeriesError> {
    let (first, last) = match (samples.first(), samples.last()) {
        (Some(first), Some(last)) if samples.len() >= 2 => (first, last),
        _ => return Err(SeriesError::TooFewSamples(samples.len())),
    };
    let start_value = parse_sample(&first.state)?;
    let end_value = parse_sample(&last.state)?;
    Ok(SeriesDelta {
        start_value,
        end_value,
        delta: end_value - start_value,
    })
}

fn parse_sample(raw: &str) -> Result<f64, SeriesError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| SeriesError::BadSample(raw.to_string()))
}

/// The day's combined energy picture.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyUsage {
    pub import: SeriesDelta,
    pub export: SeriesDelta,
    pub inverter_yield: f64,
    pub daily_usage: f64,
}

/// Combine the three independently fetched inputs into the day's usage.
///
/// Self-consumption model: generation that was not exported, plus whatever
/// was imported from the grid, is what the house consumed. The result may
/// legitimately be negative and is not clamped.
pub fn compute_daily_usage<E: Display>(
    import: Result<SeriesDelta, E>,
    export: Result<SeriesDelta, E>,
    inverter_yield: Result<f64, E>,
) -> Result<DailyUsage, E> {
    let import = import?;
    let export = match export {
        Ok(series) => series,
        Err(e) => {
            warn!("Export series unavailable, assuming zero export: {}", e);
            SeriesDelta::ZERO
        }
    };
    let inverter_yield = match inverter_yield {
        Ok(value) => value,
        Err(e) => {
            warn!("Inverter yield unavailable, assuming zero yield: {}", e);
            0.0
        }
    };

    let daily_usage = (inverter_yield - export.delta) + import.delta;
    Ok(DailyUsage {
        import,
        export,
        inverter_yield,
        daily_usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(state: &str) -> HistorySample {
        HistorySample {
            state: state.to_string(),
            last_changed: None,
        }
    }

    fn delta(start: f64, end: f64) -> SeriesDelta {
        SeriesDelta {
            start_value: start,
            end_value: end,
            delta: end - start,
        }
    }

    #[test]
    fn series_delta_uses_first_and_last_sample() {
        let samples = vec![sample("100.5"), sample("103.0"), sample("110.75")];
        let series = series_delta(&samples).unwrap();
        assert_eq!(series.start_value, 100.5);
        assert_eq!(series.end_value, 110.75);
        assert_eq!(series.delta, 10.25);
    }

    #[test]
    fn series_delta_requires_two_samples() {
        assert!(matches!(series_delta(&[]), Err(SeriesError::TooFewSamples(0))));
        assert!(matches!(
            series_delta(&[sample("100.0")]),
            Err(SeriesError::TooFewSamples(1))
        ));
    }

    #[test]
    fn series_delta_rejects_non_numeric_states() {
        let samples = vec![sample("unavailable"), sample("101.0")];
        assert!(matches!(series_delta(&samples), Err(SeriesError::BadSample(_))));
    }

    #[test]
    fn usage_combines_all_three_sources() {
        let usage = compute_daily_usage::<String>(
            Ok(delta(100.0, 110.0)),
            Ok(delta(50.0, 52.0)),
            Ok(5.0),
        )
        .unwrap();
        // (5.0 - 2.0) + 10.0
        assert_eq!(usage.daily_usage, 13.0);
        assert_eq!(usage.import.delta, 10.0);
        assert_eq!(usage.export.delta, 2.0);
        assert_eq!(usage.inverter_yield, 5.0);
    }

    #[test]
    fn import_failure_is_fatal() {
        let result = compute_daily_usage(
            Err("import down".to_string()),
            Ok(delta(50.0, 52.0)),
            Ok(5.0),
        );
        assert_eq!(result.unwrap_err(), "import down");
    }

    #[test]
    fn export_and_yield_failures_degrade_to_zero() {
        let usage = compute_daily_usage(
            Ok(delta(100.0, 110.0)),
            Err("export meter offline".to_string()),
            Err("inverter offline".to_string()),
        )
        .unwrap();
        assert_eq!(usage.export, SeriesDelta::ZERO);
        assert_eq!(usage.inverter_yield, 0.0);
        assert_eq!(usage.daily_usage, 10.0);
    }

    #[test]
    fn usage_may_be_negative() {
        let usage = compute_daily_usage::<String>(
            Ok(delta(100.0, 101.0)),
            Ok(delta(50.0, 58.0)),
            Ok(4.0),
        )
        .unwrap();
        // (4.0 - 8.0) + 1.0
        assert_eq!(usage.daily_usage, -3.0);
    }
}
