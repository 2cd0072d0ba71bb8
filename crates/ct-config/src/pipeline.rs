//! Typed pipeline configuration.
//!
//! One `PipelineConfig` describes a whole run: the meteorology request
//! window, the fuel scenario, model tuning, and the data root under which
//! every stage reads and writes its artifacts. The struct is deserialized
//! from a TOML file and then adjusted by CLI/env overrides; no stage reads
//! process-global state.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fuel::FuelScenario;

/// ERA5 pressure levels [hPa] covering typical cruise altitudes.
pub const DEFAULT_PRESSURE_LEVELS: &[u16] = &[
    900, 875, 850, 825, 800, 775, 750, 700, 650, 600, 550, 500, 450, 400, 350, 300, 250, 225, 200,
    175, 150, 125, 100,
];

/// Pressure-level meteorological variables the contrail model requires.
pub const DEFAULT_MET_VARIABLES: &[&str] = &[
    "air_temperature",
    "specific_humidity",
    "eastward_wind",
    "northward_wind",
    "lagrangian_tendency_of_air_pressure",
    "fraction_of_cloud_cover",
    "specific_cloud_ice_water_content",
    "geopotential",
];

/// Single-level radiation variables for radiative-forcing terms.
pub const DEFAULT_RAD_VARIABLES: &[&str] = &[
    "top_net_solar_radiation",
    "top_net_thermal_radiation",
];

/// Inclusive time window for meteorology and trajectory selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    /// End of the window. Callers are expected to include a buffer past the
    /// last trajectory point so contrail evolution can be integrated beyond
    /// the flight itself.
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t <= self.end
    }

    pub fn duration_hours(&self) -> i64 {
        (self.end - self.start).num_hours()
    }
}

/// Geographic bounding box, degrees, longitude in [-180, 180].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.lat_min && lat <= self.lat_max && lon >= self.lon_min && lon <= self.lon_max
    }
}

/// Meteorology-request section of the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetConfig {
    pub window: TimeWindow,
    pub bbox: BoundingBox,
    /// Pressure levels [hPa], descending.
    #[serde(default = "default_levels")]
    pub pressure_levels: Vec<u16>,
    /// Pressure-level variables.
    #[serde(default = "default_met_variables")]
    pub variables: Vec<String>,
    /// Single-level radiation variables.
    #[serde(default = "default_rad_variables")]
    pub rad_variables: Vec<String>,
    /// Grid spacing [deg] of the cached fields.
    #[serde(default = "default_grid_step")]
    pub grid_step: f64,
}

fn default_levels() -> Vec<u16> {
    DEFAULT_PRESSURE_LEVELS.to_vec()
}

fn default_met_variables() -> Vec<String> {
    DEFAULT_MET_VARIABLES.iter().map(|s| s.to_string()).collect()
}

fn default_rad_variables() -> Vec<String> {
    DEFAULT_RAD_VARIABLES.iter().map(|s| s.to_string()).collect()
}

fn default_grid_step() -> f64 {
    0.25
}

/// Simulation-stage tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Fuel scenario for this run.
    #[serde(default)]
    pub fuel: FuelScenario,
    /// Constant RHi scaling applied before persistence evaluation.
    #[serde(default = "default_rhi_adj")]
    pub rhi_adj: f64,
    /// Assumed overall propulsion efficiency when the performance table
    /// carries no per-point estimate.
    #[serde(default = "default_engine_efficiency")]
    pub default_engine_efficiency: f64,
}

fn default_rhi_adj() -> f64 {
    0.99
}

fn default_engine_efficiency() -> f64 {
    0.35
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            fuel: FuelScenario::default(),
            rhi_adj: default_rhi_adj(),
            default_engine_efficiency: default_engine_efficiency(),
        }
    }
}

/// Full configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Root directory for all artifacts (met cache, stage outputs, run
    /// state). Stages never write outside this root.
    pub data_root: PathBuf,
    /// Directory of raw trajectory CSVs; defaults to `<data_root>/traffic`.
    #[serde(default)]
    pub traffic_dir: Option<PathBuf>,
    pub met: MetConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Trajectory-point gaps longer than this [s] are flagged, never
    /// interpolated across.
    #[serde(default = "default_gap_seconds")]
    pub max_gap_seconds: i64,
    /// Bounded retry budget for upstream met requests.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Initial backoff [s]; doubles per attempt.
    #[serde(default = "default_backoff_secs")]
    pub initial_backoff_secs: u64,
    /// CDS credentials resolved from the environment, never serialized.
    #[serde(skip)]
    pub credentials: Option<Credentials>,
}

fn default_gap_seconds() -> i64 {
    300
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_secs() -> u64 {
    30
}

/// API credentials for the upstream climate-data service.
///
/// Deliberately excluded from serde so they can never leak into manifests,
/// run state, or summaries.
#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub api_url: String,
    pub api_key: String,
}

impl PipelineConfig {
    /// Directory for one run's state and manifests.
    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.data_root.join("runs").join(run_id)
    }

    /// Directory of the local met cache.
    pub fn met_cache_dir(&self) -> PathBuf {
        self.data_root.join("met_cache")
    }

    /// Directory of raw trajectory CSVs.
    pub fn traffic_dir(&self) -> PathBuf {
        self.traffic_dir
            .clone()
            .unwrap_or_else(|| self.data_root.join("traffic"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window() -> TimeWindow {
        TimeWindow {
            start: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2025, 1, 9, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_window_contains() {
        let w = window();
        assert!(w.contains(Utc.with_ymd_and_hms(2025, 1, 4, 12, 0, 0).unwrap()));
        assert!(!w.contains(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap()));
        assert_eq!(w.duration_hours(), 8 * 24);
    }

    #[test]
    fn test_bbox_contains() {
        let b = BoundingBox {
            lat_min: 30.0,
            lat_max: 40.0,
            lon_min: -125.0,
            lon_max: -115.0,
        };
        assert!(b.contains(34.0, -118.0));
        assert!(!b.contains(34.0, -110.0));
    }

    #[test]
    fn test_toml_roundtrip_with_defaults() {
        let toml_src = r#"
            data_root = "/tmp/ct"

            [met.window]
            start = "2025-01-01T00:00:00Z"
            end = "2025-01-09T00:00:00Z"

            [met.bbox]
            lat_min = 30.0
            lat_max = 40.0
            lon_min = -125.0
            lon_max = -115.0

            [simulation.fuel]
            kind = "saf_blend"
            pct_blend = 25.0
        "#;
        let cfg: PipelineConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(cfg.met.pressure_levels, DEFAULT_PRESSURE_LEVELS);
        assert_eq!(cfg.met.grid_step, 0.25);
        assert_eq!(cfg.simulation.rhi_adj, 0.99);
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(
            cfg.simulation.fuel,
            crate::FuelScenario::SafBlend { pct_blend: 25.0 }
        );
        assert!(cfg.credentials.is_none());
    }

    #[test]
    fn test_credentials_never_serialized() {
        let mut cfg: PipelineConfig = toml::from_str(
            r#"
            data_root = "/tmp/ct"
            [met.window]
            start = "2025-01-01T00:00:00Z"
            end = "2025-01-02T00:00:00Z"
            [met.bbox]
            lat_min = 0.0
            lat_max = 1.0
            lon_min = 0.0
            lon_max = 1.0
        "#,
        )
        .unwrap();
        cfg.credentials = Some(Credentials {
            api_url: "https://cds.example".into(),
            api_key: "secret".into(),
        });
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(!json.contains("secret"));
    }
}
