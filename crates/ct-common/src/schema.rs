//! Schema versioning and column-name constants for pipeline tables.

/// Current schema version for all pipeline artifacts (tables, manifests,
/// run state, run summaries).
///
/// Follows semver: MAJOR.MINOR.PATCH
/// - MAJOR: breaking changes (column removals, type changes)
/// - MINOR: additive changes (new columns)
/// - PATCH: bug fixes, documentation
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Check whether an artifact's schema version can be consumed by this build.
pub fn is_compatible(version: &str) -> bool {
    let major = |v: &str| {
        v.split('.')
            .next()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(0)
    };
    major(SCHEMA_VERSION) == major(version)
}

/// Column names shared across stage tables.
///
/// Names follow the conventions of the ingested ADS-B sources so that raw
/// CSV columns map 1:1 onto the trajectory table.
pub mod col {
    pub const FLIGHT_ID: &str = "flight_id";
    pub const ICAO24: &str = "icao24";
    pub const CALLSIGN: &str = "callsign";
    pub const TIME: &str = "time";
    pub const LATITUDE: &str = "latitude";
    pub const LONGITUDE: &str = "longitude";
    pub const ALTITUDE: &str = "altitude";
    pub const GROUNDSPEED: &str = "groundspeed";
    pub const HEADING: &str = "heading";
    pub const VERTICAL_RATE: &str = "vertical_rate";
    pub const AIRCRAFT_TYPE: &str = "aircraft_type";
    pub const WINGSPAN: &str = "wingspan";
    pub const GAP_FLAG: &str = "gap_flag";

    // Airspeed stage
    pub const PRESSURE_HPA: &str = "pressure_hpa";
    pub const U_WIND: &str = "u_wind";
    pub const V_WIND: &str = "v_wind";
    pub const HEADING_RAD: &str = "heading_rad";
    pub const GS_X: &str = "gs_x";
    pub const GS_Y: &str = "gs_y";
    pub const TRUE_AIRSPEED: &str = "true_airspeed";

    // Performance stage
    pub const AIR_TEMPERATURE: &str = "air_temperature";
    pub const AIR_PRESSURE: &str = "air_pressure";
    pub const MACH_NUMBER: &str = "mach_number";
    pub const ENGINE_EFFICIENCY: &str = "engine_efficiency";
    pub const FUEL_FLOW: &str = "fuel_flow";
    pub const AIRCRAFT_MASS: &str = "aircraft_mass";
    pub const THRUST: &str = "thrust";

    // Simulation stage
    pub const SAC: &str = "sac";
    pub const T_CRITICAL: &str = "t_critical";
    pub const RH_CRITICAL: &str = "rh_critical";
    pub const G_FACTOR: &str = "g_factor";
    pub const RHI: &str = "rhi";
    pub const PERSISTENT: &str = "persistent";
    pub const EF_PER_M: &str = "ef_per_m";
    pub const CONTRAIL_FLAG: &str = "contrail_flag";
}

/// Required input columns, checked before each stage runs.
pub mod required {
    use super::col;

    /// Raw trajectory columns every ingested CSV must provide.
    pub const TRAJECTORY: &[&str] = &[
        col::FLIGHT_ID,
        col::TIME,
        col::LATITUDE,
        col::LONGITUDE,
        col::ALTITUDE,
        col::GROUNDSPEED,
        col::HEADING,
    ];

    /// Columns the performance stage needs from the airspeed stage.
    pub const PERFORMANCE_INPUT: &[&str] = &[
        col::FLIGHT_ID,
        col::TIME,
        col::ALTITUDE,
        col::TRUE_AIRSPEED,
        col::PRESSURE_HPA,
        col::AIRCRAFT_TYPE,
    ];

    /// Columns the simulation stage needs from the performance stage.
    pub const SIMULATION_INPUT: &[&str] = &[
        col::FLIGHT_ID,
        col::TIME,
        col::LATITUDE,
        col::LONGITUDE,
        col::ALTITUDE,
        col::TRUE_AIRSPEED,
        col::AIR_TEMPERATURE,
        col::AIR_PRESSURE,
        col::ENGINE_EFFICIENCY,
        col::FUEL_FLOW,
        col::AIRCRAFT_MASS,
    ];
}
