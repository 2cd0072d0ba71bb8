//! Built-in reference models for performance and contrail formation.
//!
//! Both models sit behind traits so a higher-fidelity implementation can be
//! swapped in without touching the stages. The built-ins are deliberately
//! reduced: a point-mass performance estimate against the ISA atmosphere,
//! and the Schmidt-Appleman criterion with an ice-supersaturation
//! persistence check for the contrail side.

pub mod aircraft;
pub mod atmosphere;
pub mod humidity;
pub mod performance;
pub mod sac;

use ct_common::Result;
use ct_config::{Fuel, SimulationConfig};
use ct_met::MetGrid;
use ct_store::{AirspeedPoint, PerformancePoint, SimulationPoint};

pub use aircraft::AircraftParams;
pub use performance::PointMassPerformance;
pub use sac::SacContrailModel;

/// Per-point aircraft performance estimation.
pub trait PerformanceModel {
    /// Estimate performance quantities for one flight's points, in flight
    /// order. Returns exactly one output row per input row.
    fn estimate(&self, points: &[AirspeedPoint]) -> Result<Vec<PerformancePoint>>;
}

/// Per-point contrail formation and persistence evaluation.
pub trait ContrailModel {
    /// Evaluate one flight's points against cached meteorology. Returns
    /// exactly one output row per input row.
    fn simulate(
        &self,
        points: &[PerformancePoint],
        met: &MetGrid,
        fuel: &Fuel,
        config: &SimulationConfig,
    ) -> Result<Vec<SimulationPoint>>;
}

/// Great-circle distance between two waypoints [m].
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}
