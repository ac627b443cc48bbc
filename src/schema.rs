//! Handwritten Diesel schema declarations used by model structs.
//!
//! Migrations define the actual tables and constraints. This module only
//! provides `diesel::table!` declarations so we can derive
//! Insertable/Queryable in a type-safe way without running
//! `diesel print-schema`.

// Append-only heating run records; never updated or deleted after insert.
diesel::table! {
    heating_intervals (id) {
        id -> BigInt,
        start_time -> Timestamp,
        end_time -> Timestamp,
        minutes_heating -> Integer,
        average_indoor_temp -> Double,
        average_outdoor_temp -> Double,
    }
}

// Latest value per entity; one row per entity_id (UNIQUE in migrations).
diesel::table! {
    sensor_values (id) {
        id -> BigInt,
        entity_id -> Text,
        state -> Text,
        timestamp -> Timestamptz,
    }
}

// Single row per forecast source; forecast_data holds the serialized array.
diesel::table! {
    forecast_snapshots (id) {
        id -> BigInt,
        entity_id -> Text,
        forecast_data -> Text,
        timestamp -> Timestamptz,
    }
}

// One row per calendar day (UNIQUE on date in migrations).
diesel::table! {
    daily_power_usage (id) {
        id -> BigInt,
        date -> Date,
        import_start_value -> Double,
        import_end_value -> Double,
        daily_import -> Double,
        export_start_value -> Double,
        export_end_value -> Double,
        daily_export -> Double,
        inverter_daily_yield -> Double,
        daily_usage -> Double,
        timestamp -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    heating_intervals,
    sensor_values,
    forecast_snapshots,
    daily_power_usage,
);
