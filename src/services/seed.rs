//! Deterministic sample-data generator for local development: ~30 days of
//! plausible one-hour heating sessions, inserted through the normal insert
//! path so constraints stay honest.

use chrono::{Duration, NaiveTime, Utc};
use diesel::prelude::*;
use diesel::PgConnection;
use log::info;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::db::models::NewHeatingInterval;
use crate::schema;

const SEED_DAYS: i64 = 30;
const RNG_SEED: u64 = 0x7EE0_57A7_0420_1337;

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn run(conn: &mut PgConnection) -> Result<usize, String> {
    use schema::heating_intervals::dsl as H;

    let mut rng = SmallRng::seed_from_u64(RNG_SEED);
    let today = Utc::now().date_naive();
    let first_day = today - Duration::days(SEED_DAYS - 1);
    let morning = NaiveTime::from_hms_opt(8, 0, 0).unwrap();

    let mut batch: Vec<NewHeatingInterval> = Vec::new();
    let mut day = first_day;
    while day <= today {
        // 8-16 back-to-back one-hour sessions starting at 08:00
        let sessions = rng.random_range(8..=16);
        let mut start_time = day.and_time(morning);
        for _ in 0..sessions {
            let end_time = start_time + Duration::hours(1);
            batch.push(NewHeatingInterval {
                start_time,
                end_time,
                minutes_heating: rng.random_range(5..=60),
                average_indoor_temp: round1(rng.random_range(18.0..24.0)),
                average_outdoor_temp: round1(rng.random_range(-10.0..25.0)),
            });
            start_time = end_time;
        }
        day += Duration::days(1);
    }

    info!(
        "Seeding {} heating interval(s) across {} day(s) starting {}",
        batch.len(),
        SEED_DAYS,
        first_day
    );

    diesel::insert_into(H::heating_intervals)
        .values(&batch)
        .execute(conn)
        .map_err(|e| format!("inserting sample intervals failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_keeps_one_decimal() {
        assert_eq!(round1(21.449), 21.4);
        assert_eq!(round1(-9.96), -10.0);
    }
}
