//! Artifact path layout under the data root.
//!
//! All physical paths are produced here; stages pass artifact locations to
//! each other through manifests, so nothing outside this module hardcodes a
//! directory name.

use std::path::{Path, PathBuf};

use ct_common::StageName;

/// Path layout for one data root.
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Shared met cache, independent of any single run.
    pub fn met_cache_dir(&self) -> PathBuf {
        self.root.join("met_cache")
    }

    /// Directory holding one run's state, manifests, and outputs.
    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root.join("runs").join(run_id)
    }

    /// Persisted run state (the checkpoint file).
    pub fn run_state_path(&self, run_id: &str) -> PathBuf {
        self.run_dir(run_id).join("run_state.json")
    }

    /// Final run summary report for one fuel variant. Variants get their
    /// own file so simulating conventional then SAF in the same run keeps
    /// both reports.
    pub fn run_summary_path(&self, run_id: &str, fuel_label: &str) -> PathBuf {
        self.run_dir(run_id)
            .join(format!("run_summary_{fuel_label}.json"))
    }

    /// Output directory of one stage within a run.
    pub fn stage_dir(&self, run_id: &str, stage: StageName) -> PathBuf {
        self.run_dir(run_id).join(stage.as_str())
    }

    /// Manifest path for one stage within a run.
    pub fn manifest_path(&self, run_id: &str, stage: StageName) -> PathBuf {
        self.stage_dir(run_id, stage)
            .join(format!("{}.manifest.json", stage.as_str()))
    }

    /// Airspeed-augmented trajectory table.
    pub fn airspeed_table(&self, run_id: &str) -> PathBuf {
        self.stage_dir(run_id, StageName::Airspeed)
            .join("airspeed.parquet")
    }

    /// Performance table.
    pub fn performance_table(&self, run_id: &str) -> PathBuf {
        self.stage_dir(run_id, StageName::Performance)
            .join("performance.parquet")
    }

    /// Simulation output directory for one fuel variant.
    pub fn simulation_dir(&self, run_id: &str, fuel_label: &str) -> PathBuf {
        self.stage_dir(run_id, StageName::Simulate).join(fuel_label)
    }

    /// Per-flight output shard, written before the merge.
    pub fn simulation_shard(&self, run_id: &str, fuel_label: &str, flight_id: &str) -> PathBuf {
        self.simulation_dir(run_id, fuel_label)
            .join("shards")
            .join(format!("{}.parquet", sanitize(flight_id)))
    }

    /// Merged waypoint-level simulation table.
    pub fn simulation_table(&self, run_id: &str, fuel_label: &str) -> PathBuf {
        self.simulation_dir(run_id, fuel_label).join("cocip.parquet")
    }

    /// Per-flight summary table.
    pub fn summary_table(&self, run_id: &str, fuel_label: &str) -> PathBuf {
        self.simulation_dir(run_id, fuel_label)
            .join("cocip_summary.parquet")
    }
}

/// Flight IDs become file names; keep them shell- and filesystem-safe.
fn sanitize(flight_id: &str) -> String {
    flight_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}
