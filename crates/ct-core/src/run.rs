//! Run state machine with on-disk checkpoints.
//!
//! One `RunRecord` tracks a run through
//! `Pending -> FetchingMet -> ComputingAirSpeed -> ComputingPerformance ->
//! Simulating -> Done`, or into `Failed` with the stage and error recorded.
//! The record is persisted after every transition, so `ctp run` on an
//! existing run ID picks up at the first incomplete stage.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use ct_common::schema::{is_compatible, SCHEMA_VERSION};
use ct_common::{Error, Result, RunId, StageName};
use ct_store::DataLayout;

/// Where a run currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    Pending,
    FetchingMet,
    ComputingAirSpeed,
    ComputingPerformance,
    Simulating,
    Done,
    Failed { stage: StageName, error: String },
}

impl RunState {
    /// The in-progress state for a stage.
    pub fn running(stage: StageName) -> Self {
        match stage {
            StageName::FetchMet => RunState::FetchingMet,
            StageName::Airspeed => RunState::ComputingAirSpeed,
            StageName::Performance => RunState::ComputingPerformance,
            StageName::Simulate => RunState::Simulating,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Failed { .. })
    }
}

/// Persisted checkpoint for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub schema_version: String,
    pub run_id: RunId,
    pub state: RunState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Stages that have finished and written their manifest, in order.
    pub completed_stages: Vec<StageName>,
}

impl RunRecord {
    /// Start a fresh run in `Pending`.
    pub fn new(run_id: RunId) -> Self {
        let now = Utc::now();
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            run_id,
            state: RunState::Pending,
            created_at: now,
            updated_at: now,
            completed_stages: Vec::new(),
        }
    }

    /// Load an existing run's checkpoint.
    pub fn load(layout: &DataLayout, run_id: &RunId) -> Result<Self> {
        let path = layout.run_state_path(run_id.as_str());
        if !path.exists() {
            return Err(Error::RunNotFound {
                run_id: run_id.as_str().to_string(),
            });
        }
        let content = fs::read_to_string(&path)?;
        let record: RunRecord = serde_json::from_str(&content)
            .map_err(|e| Error::RunCorrupted(format!("{}: {e}", path.display())))?;
        if !is_compatible(&record.schema_version) {
            return Err(Error::SchemaMismatch {
                table: "run_state".into(),
                expected: SCHEMA_VERSION.into(),
                actual: record.schema_version,
            });
        }
        Ok(record)
    }

    /// Load an existing run, or start a fresh one if none exists.
    pub fn load_or_new(layout: &DataLayout, run_id: &RunId) -> Result<Self> {
        match Self::load(layout, run_id) {
            Ok(record) => Ok(record),
            Err(Error::RunNotFound { .. }) => Ok(Self::new(run_id.clone())),
            Err(e) => Err(e),
        }
    }

    /// Persist the checkpoint atomically.
    pub fn save(&self, layout: &DataLayout) -> Result<()> {
        let path = layout.run_state_path(self.run_id.as_str());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(self)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    pub fn is_completed(&self, stage: StageName) -> bool {
        self.completed_stages.contains(&stage)
    }

    /// Check that a stage may start: its upstream stage must have completed
    /// (within this run) and left its manifest behind.
    pub fn check_stage_runnable(&self, layout: &DataLayout, stage: StageName) -> Result<()> {
        if let Some(upstream) = stage.upstream() {
            let manifest = layout.manifest_path(self.run_id.as_str(), upstream);
            if !self.is_completed(upstream) || !manifest.exists() {
                return Err(Error::StageBlocked {
                    stage: stage.to_string(),
                    reason: format!("upstream stage '{upstream}' has not completed"),
                });
            }
        }
        Ok(())
    }

    fn transition(&mut self, layout: &DataLayout, state: RunState) -> Result<()> {
        info!(run_id = %self.run_id, from = ?self.state, to = ?state, "run transition");
        self.state = state;
        self.updated_at = Utc::now();
        self.save(layout)
    }

    /// Record a stage starting; checkpoints the in-progress state.
    pub fn mark_stage_started(&mut self, layout: &DataLayout, stage: StageName) -> Result<()> {
        self.check_stage_runnable(layout, stage)?;
        self.transition(layout, RunState::running(stage))
    }

    /// Record a stage finishing. The persisted state then points at the
    /// first incomplete stage, or `Done` once none remain; a checkpoint
    /// never claims a finished stage is still in progress.
    pub fn mark_stage_completed(&mut self, layout: &DataLayout, stage: StageName) -> Result<()> {
        if !self.completed_stages.contains(&stage) {
            self.completed_stages.push(stage);
        }
        let next = match self.next_stage() {
            None => RunState::Done,
            Some(pending) => RunState::running(pending),
        };
        self.transition(layout, next)
    }

    /// Record a stage-level failure. Per-flight simulation failures do not
    /// land here; they go to the run summary and the run still completes.
    pub fn mark_failed(&mut self, layout: &DataLayout, stage: StageName, error: &Error) -> Result<()> {
        self.transition(
            layout,
            RunState::Failed {
                stage,
                error: error.to_string(),
            },
        )
    }

    /// The first stage that has not yet completed, if any.
    pub fn next_stage(&self) -> Option<StageName> {
        StageName::ALL
            .into_iter()
            .find(|stage| !self.is_completed(*stage))
    }
}
