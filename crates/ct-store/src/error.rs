//! Error types for storage operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur reading or writing pipeline artifacts.
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O error
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Arrow conversion error
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet encode/decode error
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// CSV parse error
    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// JSON manifest error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Table is missing an expected column
    #[error("table missing column '{0}'")]
    MissingColumn(String),

    /// CSV header is missing mandatory columns
    #[error("{path}: missing required columns: {}", columns.join(", "))]
    MissingHeaders {
        path: PathBuf,
        columns: Vec<String>,
    },

    /// Column exists but holds the wrong Arrow type
    #[error("column '{column}' has unexpected type (expected {expected})")]
    ColumnType {
        column: String,
        expected: &'static str,
    },

    /// A row field failed to decode
    #[error("bad value in column '{column}' at row {row}: {reason}")]
    BadValue {
        column: String,
        row: usize,
        reason: String,
    },

    /// Artifact checksum did not match its manifest entry
    #[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// Manifest names an artifact that is not on disk
    #[error("artifact listed in manifest not found: {0}")]
    ArtifactMissing(PathBuf),
}

impl From<StoreError> for ct_common::Error {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::MissingColumn(c) => ct_common::Error::MissingColumns {
                table: "<unknown>".into(),
                columns: vec![c],
            },
            StoreError::MissingHeaders { path, columns } => ct_common::Error::MissingColumns {
                table: path.display().to_string(),
                columns,
            },
            StoreError::ArtifactMissing(path) => ct_common::Error::MissingArtifact { path },
            other => ct_common::Error::Storage(other.to_string()),
        }
    }
}

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;
