//! Canonical met requests and their cache keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use ct_config::{BoundingBox, MetConfig, TimeWindow};

/// A fully specified meteorology request.
///
/// Two requests with the same content hash to the same cache key, so the
/// key is computed over a canonical JSON encoding with sorted variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetRequest {
    pub window: TimeWindow,
    pub bbox: BoundingBox,
    /// Pressure levels [hPa]; empty for single-level (surface/radiation)
    /// requests.
    pub pressure_levels: Vec<u16>,
    pub variables: Vec<String>,
    /// Grid spacing [deg].
    pub grid_step: f64,
    /// Temporal resolution [h].
    pub time_step_hours: u32,
}

impl MetRequest {
    /// Pressure-level request covering the contrail model's variables.
    pub fn pressure_levels(met: &MetConfig) -> Self {
        let mut variables = met.variables.clone();
        variables.sort();
        Self {
            window: met.window,
            bbox: met.bbox,
            pressure_levels: met.pressure_levels.clone(),
            variables,
            grid_step: met.grid_step,
            time_step_hours: 1,
        }
    }

    /// Single-level request for the radiation variables.
    pub fn single_level(met: &MetConfig) -> Self {
        let mut variables = met.rad_variables.clone();
        variables.sort();
        Self {
            window: met.window,
            bbox: met.bbox,
            pressure_levels: Vec::new(),
            variables,
            grid_step: met.grid_step,
            time_step_hours: 1,
        }
    }

    pub fn is_single_level(&self) -> bool {
        self.pressure_levels.is_empty()
    }

    /// Content-addressed cache key: SHA-256 over the canonical encoding.
    pub fn cache_key(&self) -> String {
        let mut canonical = self.clone();
        canonical.variables.sort();
        let json = serde_json::to_string(&canonical).expect("request serializes");
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Time steps of the request, inclusive of both window ends.
    pub fn time_steps(&self) -> Vec<DateTime<Utc>> {
        let step = chrono::Duration::hours(self.time_step_hours as i64);
        let mut out = Vec::new();
        let mut t = self.window.start;
        while t <= self.window.end {
            out.push(t);
            t += step;
        }
        out
    }
}
