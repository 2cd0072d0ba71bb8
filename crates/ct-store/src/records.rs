//! Typed row structs for the stage tables.
//!
//! Each stage's output embeds the previous stage's row, so columns survive
//! one-to-one through the pipeline and the simulation tables for the two
//! fuel variants are structurally identical by construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One raw trajectory point, as ingested from ADS-B telemetry.
///
/// `altitude_ft` is barometric altitude in feet, `groundspeed` in knots,
/// `heading` in degrees from true north, matching the source telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub flight_id: String,
    pub icao24: Option<String>,
    pub callsign: Option<String>,
    pub time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_ft: f64,
    pub groundspeed: f64,
    pub heading: f64,
    pub vertical_rate: Option<f64>,
    pub aircraft_type: Option<String>,
    pub wingspan: Option<f64>,
    /// Set when the time gap to the previous point of the same flight
    /// exceeds the configured threshold. Flagged, never interpolated.
    pub gap_flag: bool,
}

/// Trajectory point augmented with interpolated winds and true air speed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirspeedPoint {
    #[serde(flatten)]
    pub base: TrajectoryPoint,
    /// Pressure altitude [hPa] from the barometric formula.
    pub pressure_hpa: f64,
    /// Eastward wind at the point [m/s].
    pub u_wind: f64,
    /// Northward wind at the point [m/s].
    pub v_wind: f64,
    pub heading_rad: f64,
    /// Eastward ground-speed component [m/s].
    pub gs_x: f64,
    /// Northward ground-speed component [m/s].
    pub gs_y: f64,
    /// Wind-corrected true air speed [m/s].
    pub true_airspeed: f64,
}

/// Airspeed point augmented with estimated aircraft performance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformancePoint {
    #[serde(flatten)]
    pub base: AirspeedPoint,
    /// Ambient temperature [K].
    pub air_temperature: f64,
    /// Ambient pressure [Pa].
    pub air_pressure: f64,
    pub mach_number: f64,
    /// Overall propulsion efficiency [-].
    pub engine_efficiency: f64,
    /// Fuel mass flow [kg/s].
    pub fuel_flow: f64,
    /// Estimated instantaneous aircraft mass [kg].
    pub aircraft_mass: f64,
    /// Estimated thrust [N].
    pub thrust: f64,
}

/// Performance point augmented with contrail-model outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationPoint {
    #[serde(flatten)]
    pub base: PerformancePoint,
    /// Schmidt-Appleman criterion satisfied at this point.
    pub sac: bool,
    /// Critical (threshold) ambient temperature for formation [K].
    pub t_critical: f64,
    /// Critical relative humidity over liquid water [-].
    pub rh_critical: f64,
    /// Mixing-line slope G [Pa/K].
    pub g_factor: f64,
    /// Relative humidity over ice after scaling [-].
    pub rhi: f64,
    /// Ice-supersaturated: the formed contrail can persist.
    pub persistent: bool,
    /// Energy-forcing proxy per metre of flight path [J/m].
    pub ef_per_m: f64,
    /// Contrail formed at this waypoint (SAC and cold enough).
    pub contrail_flag: bool,
}

/// Per-flight summary produced by the simulation stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightSummaryRow {
    pub flight_id: String,
    pub waypoints: i64,
    pub contrail_waypoints: i64,
    pub persistent_waypoints: i64,
    /// Sum of `ef_per_m * segment_length` over the flight [J].
    pub total_ef: f64,
    pub mean_rhi: f64,
    /// "ok" for simulated flights; failed flights never reach this table
    /// and are listed in the run summary instead.
    pub status: String,
}
