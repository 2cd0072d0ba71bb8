//! Humidity conversions and the constant RHi scaling.
//!
//! ERA5 specific humidity is known to bias low in the upper troposphere; a
//! constant multiplicative correction on RHi before the persistence check
//! is the standard first-order fix.

/// Ratio of molar masses, water vapour to dry air [-].
pub const EPSILON: f64 = 0.622;

/// Saturation vapour pressure over liquid water [Pa] (Magnus, WMO form).
pub fn e_sat_liquid(temperature_k: f64) -> f64 {
    let t_c = temperature_k - 273.15;
    611.2 * (17.62 * t_c / (243.12 + t_c)).exp()
}

/// Saturation vapour pressure over ice [Pa] (Magnus, WMO form).
pub fn e_sat_ice(temperature_k: f64) -> f64 {
    let t_c = temperature_k - 273.15;
    611.2 * (22.46 * t_c / (272.62 + t_c)).exp()
}

/// Water vapour partial pressure [Pa] from specific humidity [kg/kg] and
/// ambient pressure [Pa].
pub fn vapour_pressure(specific_humidity: f64, pressure_pa: f64) -> f64 {
    specific_humidity * pressure_pa / (EPSILON + (1.0 - EPSILON) * specific_humidity)
}

/// Relative humidity over liquid water [-].
pub fn rh_liquid(specific_humidity: f64, pressure_pa: f64, temperature_k: f64) -> f64 {
    vapour_pressure(specific_humidity, pressure_pa) / e_sat_liquid(temperature_k)
}

/// Relative humidity over ice [-], with the constant correction applied.
pub fn rhi_scaled(
    specific_humidity: f64,
    pressure_pa: f64,
    temperature_k: f64,
    rhi_adj: f64,
) -> f64 {
    rhi_adj * vapour_pressure(specific_humidity, pressure_pa) / e_sat_ice(temperature_k)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saturation_at_freezing() {
        // Both curves meet near 611 Pa at 0 C.
        assert!((e_sat_liquid(273.15) - 611.2).abs() < 1.0);
        assert!((e_sat_ice(273.15) - 611.2).abs() < 1.0);
    }

    #[test]
    fn test_ice_below_liquid_when_cold() {
        // Below freezing, saturation over ice sits under saturation over
        // liquid, which is what makes ice supersaturation possible.
        let t = 220.0;
        assert!(e_sat_ice(t) < e_sat_liquid(t));
    }

    #[test]
    fn test_vapour_pressure_small_q_limit() {
        // For small q, e ~ q p / eps.
        let e = vapour_pressure(1e-4, 25_000.0);
        assert!((e - 1e-4 * 25_000.0 / EPSILON).abs() / e < 0.01);
    }

    #[test]
    fn test_rhi_scaling_is_linear() {
        let base = rhi_scaled(1e-4, 25_000.0, 220.0, 1.0);
        let scaled = rhi_scaled(1e-4, 25_000.0, 220.0, 0.99);
        assert!((scaled / base - 0.99).abs() < 1e-12);
    }
}
