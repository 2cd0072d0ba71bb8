//! Contrail pipeline artifact storage.
//!
//! This crate provides:
//! - Typed row structs and Arrow schemas for every stage table
//! - Parquet reader/writer with zstd compression
//! - CSV ingest for raw trajectory telemetry
//! - Artifact path layout under the data root
//! - Stage manifests with SHA-256 checksums
//!
//! Downstream stages treat upstream artifacts as immutable inputs; writes
//! go through a temp-file-and-rename so a crashed stage never leaves a
//! half-written table behind.

pub mod error;
pub mod ingest;
pub mod layout;
pub mod manifest;
pub mod records;
pub mod schema;
pub mod table;

pub use error::StoreError;
pub use ingest::{read_trajectory_csv, read_trajectory_dir};
pub use layout::DataLayout;
pub use manifest::{ArtifactEntry, StageManifest};
pub use records::{
    AirspeedPoint, FlightSummaryRow, PerformancePoint, SimulationPoint, TrajectoryPoint,
};
pub use table::{read_parquet, read_schema, write_parquet, TableRecord};
