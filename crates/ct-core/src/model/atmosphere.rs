//! International Standard Atmosphere, troposphere and lower stratosphere.

/// Sea-level standard temperature [K].
pub const T0: f64 = 288.15;
/// Sea-level standard pressure [Pa].
pub const P0: f64 = 101_325.0;
/// Tropospheric lapse rate [K/m].
pub const LAPSE_RATE: f64 = 0.0065;
/// Tropopause altitude [m].
pub const TROPOPAUSE_M: f64 = 11_000.0;
/// Isothermal-layer temperature above the tropopause [K].
pub const T_TROPOPAUSE: f64 = 216.65;
/// Specific gas constant for dry air [J/(kg K)].
pub const R_AIR: f64 = 287.05;
/// Gravitational acceleration [m/s^2].
pub const G: f64 = 9.80665;
/// Ratio of specific heats for air [-].
pub const GAMMA: f64 = 1.4;

/// Pressure at the tropopause [Pa].
const P_TROPOPAUSE: f64 = 22_632.06;

/// ISA temperature at geopotential altitude [K].
pub fn temperature(altitude_m: f64) -> f64 {
    if altitude_m < TROPOPAUSE_M {
        T0 - LAPSE_RATE * altitude_m
    } else {
        T_TROPOPAUSE
    }
}

/// ISA pressure at geopotential altitude [Pa].
pub fn pressure(altitude_m: f64) -> f64 {
    if altitude_m < TROPOPAUSE_M {
        P0 * (1.0 - LAPSE_RATE * altitude_m / T0).powf(G / (R_AIR * LAPSE_RATE))
    } else {
        P_TROPOPAUSE * (-G * (altitude_m - TROPOPAUSE_M) / (R_AIR * T_TROPOPAUSE)).exp()
    }
}

/// Air density from the ideal gas law [kg/m^3].
pub fn density(pressure_pa: f64, temperature_k: f64) -> f64 {
    pressure_pa / (R_AIR * temperature_k)
}

/// Speed of sound at `temperature_k` [m/s].
pub fn speed_of_sound(temperature_k: f64) -> f64 {
    (GAMMA * R_AIR * temperature_k).sqrt()
}

/// Feet to metres.
pub fn ft_to_m(ft: f64) -> f64 {
    ft * 0.3048
}

/// Knots to metres per second.
pub fn kt_to_mps(kt: f64) -> f64 {
    kt * 0.514444
}

/// Pressure altitude [hPa] from barometric altitude [m], using the
/// standard-atmosphere barometric formula.
pub fn pressure_hpa_from_altitude(altitude_m: f64) -> f64 {
    1013.25 * (1.0 - altitude_m / 44_330.0).powf(5.255)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sea_level() {
        assert_eq!(temperature(0.0), T0);
        assert!((pressure(0.0) - P0).abs() < 1.0);
        assert!((pressure_hpa_from_altitude(0.0) - 1013.25).abs() < 0.01);
    }

    #[test]
    fn test_cruise_altitude() {
        // FL350 is about 10.7 km: T near 218.8 K, p near 238 hPa.
        let alt = ft_to_m(35_000.0);
        let t = temperature(alt);
        assert!((t - 218.8).abs() < 0.5, "got {t}");
        let p_hpa = pressure(alt) / 100.0;
        assert!((p_hpa - 238.4).abs() < 2.0, "got {p_hpa}");
        // Barometric shortcut agrees with the full formula within a percent.
        let shortcut = pressure_hpa_from_altitude(alt);
        assert!((shortcut - p_hpa).abs() / p_hpa < 0.01, "got {shortcut}");
    }

    #[test]
    fn test_stratosphere_is_isothermal() {
        assert_eq!(temperature(12_000.0), T_TROPOPAUSE);
        assert!(pressure(12_000.0) < pressure(11_000.0));
    }

    #[test]
    fn test_speed_of_sound_at_cruise() {
        let a = speed_of_sound(218.8);
        assert!((a - 296.5).abs() < 1.0, "got {a}");
    }
}
