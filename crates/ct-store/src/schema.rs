//! Arrow schema definitions for the stage tables.
//!
//! Each stage schema extends the previous one, mirroring the row structs in
//! [`crate::records`]. Column names come from `ct_common::schema::col` so
//! the required-column checks and the physical tables can never drift apart.

use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use ct_common::schema::col;

fn f64_field(name: &str) -> Field {
    Field::new(name, DataType::Float64, false)
}

fn opt_f64_field(name: &str) -> Field {
    Field::new(name, DataType::Float64, true)
}

fn bool_field(name: &str) -> Field {
    Field::new(name, DataType::Boolean, false)
}

fn trajectory_fields() -> Vec<Field> {
    vec![
        Field::new(col::FLIGHT_ID, DataType::Utf8, false),
        Field::new(col::ICAO24, DataType::Utf8, true),
        Field::new(col::CALLSIGN, DataType::Utf8, true),
        Field::new(
            col::TIME,
            DataType::Timestamp(TimeUnit::Microsecond, None),
            false,
        ),
        f64_field(col::LATITUDE),
        f64_field(col::LONGITUDE),
        f64_field(col::ALTITUDE),
        f64_field(col::GROUNDSPEED),
        f64_field(col::HEADING),
        opt_f64_field(col::VERTICAL_RATE),
        Field::new(col::AIRCRAFT_TYPE, DataType::Utf8, true),
        opt_f64_field(col::WINGSPAN),
        bool_field(col::GAP_FLAG),
    ]
}

fn airspeed_fields() -> Vec<Field> {
    let mut fields = trajectory_fields();
    fields.extend([
        f64_field(col::PRESSURE_HPA),
        f64_field(col::U_WIND),
        f64_field(col::V_WIND),
        f64_field(col::HEADING_RAD),
        f64_field(col::GS_X),
        f64_field(col::GS_Y),
        f64_field(col::TRUE_AIRSPEED),
    ]);
    fields
}

fn performance_fields() -> Vec<Field> {
    let mut fields = airspeed_fields();
    fields.extend([
        f64_field(col::AIR_TEMPERATURE),
        f64_field(col::AIR_PRESSURE),
        f64_field(col::MACH_NUMBER),
        f64_field(col::ENGINE_EFFICIENCY),
        f64_field(col::FUEL_FLOW),
        f64_field(col::AIRCRAFT_MASS),
        f64_field(col::THRUST),
    ]);
    fields
}

fn simulation_fields() -> Vec<Field> {
    let mut fields = performance_fields();
    fields.extend([
        bool_field(col::SAC),
        f64_field(col::T_CRITICAL),
        f64_field(col::RH_CRITICAL),
        f64_field(col::G_FACTOR),
        f64_field(col::RHI),
        bool_field(col::PERSISTENT),
        f64_field(col::EF_PER_M),
        bool_field(col::CONTRAIL_FLAG),
    ]);
    fields
}

/// Schema of the raw trajectory table.
pub fn trajectory_schema() -> SchemaRef {
    Arc::new(Schema::new(trajectory_fields()))
}

/// Schema of the airspeed-augmented table.
pub fn airspeed_schema() -> SchemaRef {
    Arc::new(Schema::new(airspeed_fields()))
}

/// Schema of the performance table.
pub fn performance_schema() -> SchemaRef {
    Arc::new(Schema::new(performance_fields()))
}

/// Schema of the contrail-simulation table. Identical for both fuel
/// variants, so their outputs are diffable column-for-column.
pub fn simulation_schema() -> SchemaRef {
    Arc::new(Schema::new(simulation_fields()))
}

/// Schema of the per-flight summary table.
pub fn summary_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(col::FLIGHT_ID, DataType::Utf8, false),
        Field::new("waypoints", DataType::Int64, false),
        Field::new("contrail_waypoints", DataType::Int64, false),
        Field::new("persistent_waypoints", DataType::Int64, false),
        Field::new("total_ef", DataType::Float64, false),
        Field::new("mean_rhi", DataType::Float64, false),
        Field::new("status", DataType::Utf8, false),
    ]))
}
