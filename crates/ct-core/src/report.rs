//! Run summary report.
//!
//! The simulation stage ends every run by writing a per-fuel-variant
//! `run_summary_<label>.json`: one
//! entry per flight, successes and failures side by side, so a batch with
//! isolated per-flight failures is still auditable without grepping logs.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ct_common::schema::SCHEMA_VERSION;
use ct_common::{Error, FlightId, Result, RunId};

/// Outcome of one flight within the simulation stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FlightStatus {
    /// Simulated in this invocation.
    Ok,
    /// Shard already existed from an earlier invocation; skipped.
    Resumed,
    /// Simulation failed; the flight is excluded from the merged table.
    Failed { code: u32, error: String },
}

impl FlightStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, FlightStatus::Failed { .. })
    }
}

/// Per-flight entry in the run summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightOutcome {
    pub flight_id: String,
    /// ICAO airline designator extracted from the flight ID, when the
    /// callsign follows the `XXX1234` convention. Lets operators slice a
    /// batch report by carrier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub airline: Option<String>,
    #[serde(flatten)]
    pub status: FlightStatus,
    /// Waypoints simulated; zero for failed flights.
    pub waypoints: u64,
}

impl FlightOutcome {
    pub fn new(flight_id: impl Into<String>, status: FlightStatus, waypoints: u64) -> Self {
        let flight_id = flight_id.into();
        let airline = FlightId::new(flight_id.as_str())
            .airline_code()
            .map(str::to_owned);
        Self {
            flight_id,
            airline,
            status,
            waypoints,
        }
    }
}

/// Whole-run summary, written at the end of the simulation stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub schema_version: String,
    pub run_id: RunId,
    pub generated_at: DateTime<Utc>,
    /// Fuel variant label this summary covers.
    pub fuel_label: String,
    pub total_flights: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub flights: Vec<FlightOutcome>,
}

impl RunSummary {
    pub fn new(run_id: RunId, fuel_label: &str, mut flights: Vec<FlightOutcome>) -> Self {
        flights.sort_by(|a, b| a.flight_id.cmp(&b.flight_id));
        let failed = flights.iter().filter(|f| f.status.is_failure()).count() as u64;
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            run_id,
            generated_at: Utc::now(),
            fuel_label: fuel_label.to_string(),
            total_flights: flights.len() as u64,
            succeeded: flights.len() as u64 - failed,
            failed,
            flights,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Persist the summary atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(self)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::MissingArtifact {
                path: path.to_path_buf(),
            });
        }
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }
}
