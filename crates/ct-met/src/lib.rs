//! Meteorology access for the contrail pipeline.
//!
//! This crate covers the upstream half of the pipeline's data needs:
//! - Canonical met requests with content-addressed cache keys
//! - A CDS/ERA5 HTTP client with bounded retry and backoff
//! - An idempotent on-disk cache (a satisfied request never touches the
//!   network again)
//! - An in-memory grid with nearest-neighbour lookup and explicit
//!   coverage checking

pub mod cache;
pub mod client;
pub mod grid;
pub mod provider;
pub mod request;
pub mod retry;
pub mod sample;

pub use cache::{CacheOutcome, MetCache};
pub use client::CdsClient;
pub use grid::MetGrid;
pub use provider::MetProvider;
pub use request::MetRequest;
pub use retry::BackoffPolicy;
pub use sample::MetSample;
