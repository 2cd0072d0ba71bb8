//! Schmidt-Appleman contrail formation and persistence.
//!
//! For each waypoint: compute the mixing-line slope G from the fuel's water
//! emissions and heating value, the threshold temperature from Schumann's
//! fit, and the critical relative humidity at ambient temperature. A
//! contrail forms when the ambient state sits below the threshold and above
//! the critical humidity; it persists when the (corrected) RHi exceeds ice
//! saturation. Energy forcing per metre is a fuel-burn-weighted
//! supersaturation proxy, not a full lifecycle integration.

use ct_common::Result;
use ct_config::{Fuel, SimulationConfig};
use ct_met::MetGrid;
use ct_store::{PerformancePoint, SimulationPoint};

use super::humidity;
use super::ContrailModel;

/// Specific heat of air at constant pressure [J/(kg K)].
const CP_AIR: f64 = 1004.0;
/// Energy-forcing proxy coefficient [J per kg fuel per unit supersaturation].
const EF_COEFF: f64 = 1.0e11;

/// Met variable names consumed by the model.
const VAR_TEMPERATURE: &str = "air_temperature";
const VAR_SPECIFIC_HUMIDITY: &str = "specific_humidity";

/// Built-in Schmidt-Appleman contrail model.
#[derive(Debug, Clone, Copy, Default)]
pub struct SacContrailModel;

/// Mixing-line slope G [Pa/K].
pub fn g_factor(fuel: &Fuel, pressure_pa: f64, engine_efficiency: f64) -> f64 {
    fuel.ei_h2o * CP_AIR * pressure_pa
        / (humidity::EPSILON * fuel.q_fuel * (1.0 - engine_efficiency))
}

/// Threshold (maximum) ambient temperature for contrail formation [K],
/// from Schumann's 1996 fit to the Schmidt-Appleman construction.
pub fn threshold_temperature(g: f64) -> f64 {
    // The fit is only defined for G > 0.053 Pa/K; kerosene exhaust at
    // cruise sits well above that.
    let x = (g - 0.053).max(1e-3).ln();
    let t_lm_c = -46.46 + 9.43 * x + 0.72 * x * x;
    t_lm_c + 273.15
}

/// Critical relative humidity over liquid at ambient temperature [-].
pub fn critical_rh(g: f64, t_ambient_k: f64, t_threshold_k: f64) -> f64 {
    let rh = (g * (t_ambient_k - t_threshold_k) + humidity::e_sat_liquid(t_threshold_k))
        / humidity::e_sat_liquid(t_ambient_k);
    rh.max(0.0)
}

impl ContrailModel for SacContrailModel {
    fn simulate(
        &self,
        points: &[PerformancePoint],
        met: &MetGrid,
        fuel: &Fuel,
        config: &SimulationConfig,
    ) -> Result<Vec<SimulationPoint>> {
        let mut out = Vec::with_capacity(points.len());
        for p in points {
            let t_ambient = met.value_at(
                VAR_TEMPERATURE,
                p.base.base.time,
                p.base.base.latitude,
                p.base.base.longitude,
                p.base.pressure_hpa,
            )?;
            let q = met.value_at(
                VAR_SPECIFIC_HUMIDITY,
                p.base.base.time,
                p.base.base.latitude,
                p.base.base.longitude,
                p.base.pressure_hpa,
            )?;
            let pressure_pa = p.base.pressure_hpa * 100.0;

            let eta = if p.engine_efficiency > 0.0 && p.engine_efficiency < 1.0 {
                p.engine_efficiency
            } else {
                config.default_engine_efficiency
            };

            let g = g_factor(fuel, pressure_pa, eta);
            let t_critical = threshold_temperature(g);
            let rh_critical = critical_rh(g, t_ambient, t_critical);
            let rh = humidity::rh_liquid(q, pressure_pa, t_ambient);
            let sac = t_ambient <= t_critical && rh >= rh_critical;

            let rhi = humidity::rhi_scaled(q, pressure_pa, t_ambient, config.rhi_adj);
            let persistent = rhi >= 1.0;

            let v = p.base.true_airspeed.max(1.0);
            let ef_per_m = if sac && persistent {
                EF_COEFF * (p.fuel_flow / v) * (rhi - 1.0)
            } else {
                0.0
            };

            out.push(SimulationPoint {
                base: p.clone(),
                sac,
                t_critical,
                rh_critical,
                g_factor: g,
                rhi,
                persistent,
                ef_per_m,
                contrail_flag: sac,
            });
        }
        Ok(out)
    }
}
