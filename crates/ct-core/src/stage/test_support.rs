//! Shared fixtures for stage tests: a synthetic met provider that fills
//! the whole requested extent, and a small pipeline config rooted in a
//! temp directory.

use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{TimeZone, Utc};

use ct_common::Result;
use ct_config::{BoundingBox, MetConfig, PipelineConfig, SimulationConfig, TimeWindow};
use ct_met::{MetProvider, MetRequest, MetSample};

/// Cold, ice-supersaturated everywhere: every in-coverage waypoint forms a
/// persistent contrail, which makes assertions easy to write.
pub const SYNTH_TEMPERATURE_K: f64 = 215.0;
pub const SYNTH_SPECIFIC_HUMIDITY: f64 = 4.0e-5;
pub const SYNTH_U_WIND: f64 = 20.0;
pub const SYNTH_V_WIND: f64 = -5.0;

/// Provider producing a dense synthetic grid over the exact request.
pub struct SyntheticProvider {
    calls: AtomicU32,
}

pub fn synthetic_provider() -> SyntheticProvider {
    SyntheticProvider {
        calls: AtomicU32::new(0),
    }
}

impl SyntheticProvider {
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn value_for(variable: &str) -> f64 {
        match variable {
            "air_temperature" => SYNTH_TEMPERATURE_K,
            "specific_humidity" => SYNTH_SPECIFIC_HUMIDITY,
            "eastward_wind" => SYNTH_U_WIND,
            "northward_wind" => SYNTH_V_WIND,
            _ => 0.0,
        }
    }
}

impl MetProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(&self, request: &MetRequest) -> Result<Vec<MetSample>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let levels: Vec<f64> = if request.pressure_levels.is_empty() {
            vec![0.0]
        } else {
            request.pressure_levels.iter().map(|l| *l as f64).collect()
        };
        let axis = |min: f64, max: f64, step: f64| {
            let mut out = Vec::new();
            let mut x = min;
            while x <= max + 1e-9 {
                out.push(x);
                x += step;
            }
            out
        };
        let lats = axis(request.bbox.lat_min, request.bbox.lat_max, request.grid_step);
        let lons = axis(request.bbox.lon_min, request.bbox.lon_max, request.grid_step);

        let mut samples = Vec::new();
        for variable in &request.variables {
            let value = Self::value_for(variable);
            for time in request.time_steps() {
                for level in &levels {
                    for lat in &lats {
                        for lon in &lons {
                            samples.push(MetSample {
                                variable: variable.clone(),
                                time,
                                level_hpa: *level,
                                latitude: *lat,
                                longitude: *lon,
                                value,
                            });
                        }
                    }
                }
            }
        }
        Ok(samples)
    }
}

/// A small config rooted at `root`: two-hour window over a 2x2 degree box.
pub fn test_config(root: &std::path::Path) -> PipelineConfig {
    PipelineConfig {
        data_root: root.to_path_buf(),
        traffic_dir: None,
        met: MetConfig {
            window: TimeWindow {
                start: Utc.with_ymd_and_hms(2025, 1, 2, 11, 0, 0).unwrap(),
                end: Utc.with_ymd_and_hms(2025, 1, 2, 13, 0, 0).unwrap(),
            },
            bbox: BoundingBox {
                lat_min: 33.0,
                lat_max: 35.0,
                lon_min: -119.0,
                lon_max: -117.0,
            },
            pressure_levels: vec![300, 250, 200],
            variables: vec![
                "air_temperature".into(),
                "specific_humidity".into(),
                "eastward_wind".into(),
                "northward_wind".into(),
            ],
            rad_variables: vec![
                "top_net_solar_radiation".into(),
                "top_net_thermal_radiation".into(),
            ],
            grid_step: 0.5,
        },
        simulation: SimulationConfig::default(),
        max_gap_seconds: 300,
        max_retries: 2,
        initial_backoff_secs: 0,
        credentials: None,
    }
}
