//! Contrail pipeline core: the four stages, the run state machine, and the
//! built-in performance and contrail models.
//!
//! A run moves through `fetch_met -> airspeed -> performance -> simulate`;
//! each stage reads its input through the upstream stage's manifest and
//! finishes by writing its own. Run state is checkpointed to disk after
//! every transition, so an interrupted run resumes from the last completed
//! stage.

pub mod exit_codes;
pub mod model;
pub mod report;
pub mod run;
pub mod stage;

pub use exit_codes::ExitCode;
pub use report::{FlightOutcome, FlightStatus, RunSummary};
pub use run::{RunRecord, RunState};
pub use stage::StageContext;
