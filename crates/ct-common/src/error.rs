//! Error types for the contrail pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the contrail pipeline.
///
/// The taxonomy determines retry and propagation behavior:
/// - `ExternalService` is retried with backoff, then surfaced.
/// - `Validation` and `CoverageGap` are never retried; the offending
///   record is identified in the message.
/// - `MissingInput` fails fast before any expensive computation.
/// - `Simulation` is isolated to a single flight and aggregated into the
///   run summary instead of aborting the batch.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid config file {path}: {reason}")]
    InvalidConfigFile { path: PathBuf, reason: String },

    #[error("missing credential: {0} is not set")]
    MissingCredential(&'static str),

    // Missing-input errors (20-29)
    #[error("missing input artifact: {path}")]
    MissingArtifact { path: PathBuf },

    #[error("missing manifest for stage '{stage}' at {path}")]
    MissingManifest { stage: String, path: PathBuf },

    #[error("table '{table}' is missing required columns: {columns:?}")]
    MissingColumns { table: String, columns: Vec<String> },

    // Validation errors (30-39)
    #[error("validation failed for flight {flight_id} row {row}: {reason}")]
    Validation {
        flight_id: String,
        row: usize,
        reason: String,
    },

    #[error("met coverage gap on {axis}: requested {requested}, cached extent {available}")]
    CoverageGap {
        axis: &'static str,
        requested: String,
        available: String,
    },

    #[error("schema mismatch for {table}: expected version {expected}, got {actual}")]
    SchemaMismatch {
        table: String,
        expected: String,
        actual: String,
    },

    // External-service errors (40-49)
    #[error("external service error: {0}")]
    ExternalService(String),

    #[error("external service unauthorized: {0}")]
    Unauthorized(String),

    #[error("external service returned incomplete data: {0}")]
    IncompleteData(String),

    #[error("retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    // Per-flight simulation errors (50-59)
    #[error("simulation failed for flight {flight_id}: {reason}")]
    Simulation { flight_id: String, reason: String },

    // Run/state errors (60-69)
    #[error("run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("run state corrupted: {0}")]
    RunCorrupted(String),

    #[error("stage '{stage}' cannot start: {reason}")]
    StageBlocked { stage: String, reason: String },

    // I/O and serialization errors (70-79)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Returns the stable numeric code for this error.
    /// Used for detailed error reporting in run summaries.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidConfigFile { .. } => 11,
            Error::MissingCredential(_) => 12,
            Error::MissingArtifact { .. } => 20,
            Error::MissingManifest { .. } => 21,
            Error::MissingColumns { .. } => 22,
            Error::Validation { .. } => 30,
            Error::CoverageGap { .. } => 31,
            Error::SchemaMismatch { .. } => 32,
            Error::ExternalService(_) => 40,
            Error::Unauthorized(_) => 41,
            Error::IncompleteData(_) => 42,
            Error::RetriesExhausted { .. } => 43,
            Error::Simulation { .. } => 50,
            Error::RunNotFound { .. } => 60,
            Error::RunCorrupted(_) => 61,
            Error::StageBlocked { .. } => 62,
            Error::Io(_) => 70,
            Error::Json(_) => 71,
            Error::Storage(_) => 72,
        }
    }

    /// Whether the error class is retryable with backoff.
    ///
    /// Only upstream service failures qualify; validation and missing-input
    /// errors are deterministic and retrying them cannot help.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::ExternalService(_) | Error::IncompleteData(_)
        )
    }

    /// Whether the error is isolated to a single flight.
    pub fn is_per_flight(&self) -> bool {
        matches!(self, Error::Simulation { .. })
    }
}
