//! Point-mass performance estimation.
//!
//! A reduced cruise model: lift balances weight, thrust balances drag plus
//! the climb component, and fuel flow follows from thrust power over the
//! fuel's heating value. Mass is integrated forward from a per-type
//! reference mass as fuel burns off. The estimate is fuel-neutral (Jet-A
//! heating value); fuel-scenario effects enter in the simulation stage.

use ct_common::Result;
use ct_config::Fuel;
use ct_store::{AirspeedPoint, PerformancePoint};

use super::aircraft::AircraftParams;
use super::atmosphere;
use super::PerformanceModel;

/// Feet-per-minute to metres-per-second.
const FPM_TO_MPS: f64 = 0.00508;

/// Built-in point-mass performance model.
#[derive(Debug, Clone, Copy)]
pub struct PointMassPerformance {
    /// Overall propulsion efficiency applied to every point [-].
    pub engine_efficiency: f64,
}

impl PointMassPerformance {
    pub fn new(engine_efficiency: f64) -> Self {
        Self { engine_efficiency }
    }

    fn estimate_point(
        &self,
        p: &AirspeedPoint,
        params: &AircraftParams,
        mass: f64,
        q_fuel: f64,
    ) -> PerformancePoint {
        let altitude_m = atmosphere::ft_to_m(p.base.altitude_ft);
        let air_temperature = atmosphere::temperature(altitude_m);
        let air_pressure = p.pressure_hpa * 100.0;
        let rho = atmosphere::density(air_pressure, air_temperature);

        // Ground taxi points carry near-zero airspeed; clamping keeps the
        // dynamics finite without rejecting the row.
        let v = p.true_airspeed.max(1.0);
        let mach_number = v / atmosphere::speed_of_sound(air_temperature);

        let q = 0.5 * rho * v * v * params.wing_area;
        let cl = mass * atmosphere::G / q;
        let cd = params.cd0 + params.induced_factor * cl * cl;
        let drag = q * cd;

        let climb_rate = p.base.vertical_rate.unwrap_or(0.0) * FPM_TO_MPS;
        let sin_gamma = (climb_rate / v).clamp(-1.0, 1.0);
        // Thrust cannot go negative; idle descent floors at zero.
        let thrust = (drag + mass * atmosphere::G * sin_gamma).max(0.0);

        let fuel_flow = thrust * v / (self.engine_efficiency * q_fuel);

        PerformancePoint {
            base: p.clone(),
            air_temperature,
            air_pressure,
            mach_number,
            engine_efficiency: self.engine_efficiency,
            fuel_flow,
            aircraft_mass: mass,
            thrust,
        }
    }
}

impl PerformanceModel for PointMassPerformance {
    fn estimate(&self, points: &[AirspeedPoint]) -> Result<Vec<PerformancePoint>> {
        let q_fuel = Fuel::jet_a().q_fuel;
        let params = AircraftParams::for_type(
            points
                .first()
                .and_then(|p| p.base.aircraft_type.as_deref()),
        );

        let mut out = Vec::with_capacity(points.len());
        let mut mass = params.reference_mass;
        for (i, p) in points.iter().enumerate() {
            let row = self.estimate_point(p, &params, mass, q_fuel);
            if i + 1 < points.len() {
                let dt = (points[i + 1].base.time - p.base.time)
                    .num_milliseconds() as f64
                    / 1000.0;
                // Burn-off cannot drop below half the reference mass.
                mass = (mass - row.fuel_flow * dt.max(0.0)).max(params.reference_mass / 2.0);
            }
            out.push(row);
        }
        Ok(out)
    }
}
