//! Contrail pipeline configuration loading and validation.
//!
//! This crate provides:
//! - Typed structs for the pipeline TOML config
//! - Config resolution (CLI -> env -> config file -> defaults)
//! - Fuel scenario properties (conventional Jet-A, SAF blends)
//! - Semantic validation of a resolved config

pub mod fuel;
pub mod pipeline;
pub mod resolve;
pub mod validate;

pub use fuel::{Fuel, FuelScenario};
pub use pipeline::{BoundingBox, Credentials, MetConfig, PipelineConfig, SimulationConfig, TimeWindow};
pub use resolve::{resolve_config, ConfigOverrides, ENV_CDS_API_KEY, ENV_CDS_API_URL};
pub use validate::validate;

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
