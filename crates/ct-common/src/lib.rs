//! Contrail pipeline common types, IDs, and errors.
//!
//! This crate provides foundational types shared across the pipeline crates:
//! - Flight and run identity types
//! - Stage names and ordering
//! - Column-name and schema-version constants
//! - The unified error taxonomy

pub mod error;
pub mod id;
pub mod schema;
pub mod stage;

pub use error::{Error, Result};
pub use id::{FlightId, RunId};
pub use schema::SCHEMA_VERSION;
pub use stage::StageName;
