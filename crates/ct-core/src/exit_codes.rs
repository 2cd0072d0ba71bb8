//! Exit codes for the ctp CLI.
//!
//! Exit codes communicate run outcome without requiring output parsing.
//! These are stable; scripts may depend on them.

use ct_common::Error;

/// Exit codes for ctp operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Run or stage completed cleanly
    Success = 0,

    /// Run completed but one or more flights failed simulation
    PartialFlights = 1,

    /// Configuration error
    ConfigError = 10,

    /// Required input artifact missing (upstream stage not run)
    MissingInput = 11,

    /// Input data failed validation
    ValidationError = 12,

    /// Upstream meteorology service failure
    ExternalServiceError = 13,

    /// I/O or storage error
    IoError = 14,

    /// Internal/unknown error
    InternalError = 99,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Check if this exit code indicates success.
    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Success | ExitCode::PartialFlights)
    }

    /// The exit code for a pipeline error, following the error taxonomy.
    pub fn for_error(error: &Error) -> Self {
        match error {
            Error::Config(_) | Error::InvalidConfigFile { .. } | Error::MissingCredential(_) => {
                ExitCode::ConfigError
            }
            Error::MissingArtifact { .. }
            | Error::MissingManifest { .. }
            | Error::MissingColumns { .. }
            | Error::StageBlocked { .. }
            | Error::RunNotFound { .. } => ExitCode::MissingInput,
            Error::Validation { .. } | Error::CoverageGap { .. } | Error::SchemaMismatch { .. } => {
                ExitCode::ValidationError
            }
            Error::ExternalService(_)
            | Error::Unauthorized(_)
            | Error::IncompleteData(_)
            | Error::RetriesExhausted { .. } => ExitCode::ExternalServiceError,
            Error::Io(_) | Error::Storage(_) => ExitCode::IoError,
            _ => ExitCode::InternalError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}
