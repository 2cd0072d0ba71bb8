//! Fuel scenario properties.
//!
//! Two scenarios are supported: conventional Jet-A and a SAF blend at a
//! given percentage. Blend properties vary linearly between the Jet-A and
//! neat-SAF endpoints, which is how the upstream fuel model treats HEFA-type
//! blends over the 0-100% range.

use serde::{Deserialize, Serialize};

/// Conventional Jet-A reference properties.
mod jet_a {
    /// Lower heating value [J/kg].
    pub const Q_FUEL: f64 = 43.13e6;
    /// Hydrogen mass content [%].
    pub const HYDROGEN_CONTENT: f64 = 13.8;
    /// Water vapour emissions index [kg/kg].
    pub const EI_H2O: f64 = 1.23;
    /// Sulphur dioxide emissions index [kg/kg].
    pub const EI_SO2: f64 = 0.0012;
    /// CO2 emissions index [kg/kg].
    pub const EI_CO2: f64 = 3.16;
}

/// Neat (100%) SAF endpoint properties.
mod neat_saf {
    /// LHV rises ~1.13 MJ/kg from Jet-A at 100% blend.
    pub const Q_FUEL: f64 = 44.26e6;
    /// Hydrogen mass content [%].
    pub const HYDROGEN_CONTENT: f64 = 15.3;
    /// CO2 combustion emissions index [kg/kg].
    pub const EI_CO2: f64 = 3.01;
}

/// Fuel scenario selector, as configured for a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FuelScenario {
    /// Conventional Jet-A.
    Conventional,
    /// SAF blended with Jet-A at `pct_blend` percent (0-100).
    SafBlend { pct_blend: f64 },
}

impl FuelScenario {
    /// Resolve the scenario into concrete fuel properties.
    pub fn properties(self) -> Fuel {
        match self {
            FuelScenario::Conventional => Fuel::jet_a(),
            FuelScenario::SafBlend { pct_blend } => Fuel::saf_blend(pct_blend),
        }
    }

    /// Stable name used in artifact paths, so the two variants land in
    /// separate, diffable output directories.
    pub fn label(self) -> String {
        match self {
            FuelScenario::Conventional => "conventional".to_string(),
            FuelScenario::SafBlend { pct_blend } => format!("saf_{:02.0}", pct_blend),
        }
    }
}

impl Default for FuelScenario {
    fn default() -> Self {
        FuelScenario::Conventional
    }
}

/// Concrete fuel properties consumed by the performance and contrail models.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fuel {
    /// Lower heating value [J/kg].
    pub q_fuel: f64,
    /// Hydrogen mass content [%].
    pub hydrogen_content: f64,
    /// Water vapour emissions index [kg/kg].
    pub ei_h2o: f64,
    /// Sulphur dioxide emissions index [kg/kg].
    pub ei_so2: f64,
    /// CO2 emissions index [kg/kg].
    pub ei_co2: f64,
}

impl Fuel {
    /// Conventional Jet-A.
    pub fn jet_a() -> Self {
        Self {
            q_fuel: jet_a::Q_FUEL,
            hydrogen_content: jet_a::HYDROGEN_CONTENT,
            ei_h2o: jet_a::EI_H2O,
            ei_so2: jet_a::EI_SO2,
            ei_co2: jet_a::EI_CO2,
        }
    }

    /// SAF blend at `pct_blend` percent.
    ///
    /// Hydrogen content interpolates linearly with blend fraction; EI H2O
    /// follows from hydrogen content (9 kg of water per kg of hydrogen
    /// burned); sulphur scales with the remaining fossil fraction.
    pub fn saf_blend(pct_blend: f64) -> Self {
        let f = pct_blend / 100.0;
        let hydrogen_content =
            jet_a::HYDROGEN_CONTENT + f * (neat_saf::HYDROGEN_CONTENT - jet_a::HYDROGEN_CONTENT);
        Self {
            q_fuel: jet_a::Q_FUEL + f * (neat_saf::Q_FUEL - jet_a::Q_FUEL),
            hydrogen_content,
            ei_h2o: 9.0 * hydrogen_content / 100.0,
            ei_so2: jet_a::EI_SO2 * (1.0 - f),
            ei_co2: jet_a::EI_CO2 + f * (neat_saf::EI_CO2 - jet_a::EI_CO2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_blend_matches_jet_a_except_h2o_model() {
        let blend = Fuel::saf_blend(0.0);
        let jet = Fuel::jet_a();
        assert_eq!(blend.q_fuel, jet.q_fuel);
        assert_eq!(blend.hydrogen_content, jet.hydrogen_content);
        assert_eq!(blend.ei_so2, jet.ei_so2);
        // EI H2O from hydrogen content: 9 * 13.8 / 100 = 1.242, within a
        // percent of the tabulated Jet-A value.
        assert!((blend.ei_h2o - jet.ei_h2o).abs() < 0.02);
    }

    #[test]
    fn test_blend_monotonicity() {
        let lo = Fuel::saf_blend(10.0);
        let hi = Fuel::saf_blend(90.0);
        assert!(hi.q_fuel > lo.q_fuel);
        assert!(hi.ei_h2o > lo.ei_h2o);
        assert!(hi.ei_so2 < lo.ei_so2);
        assert!(hi.ei_co2 < lo.ei_co2);
    }

    #[test]
    fn test_full_blend_is_sulphur_free() {
        assert_eq!(Fuel::saf_blend(100.0).ei_so2, 0.0);
    }

    #[test]
    fn test_scenario_labels() {
        assert_eq!(FuelScenario::Conventional.label(), "conventional");
        assert_eq!(FuelScenario::SafBlend { pct_blend: 25.0 }.label(), "saf_25");
        assert_eq!(FuelScenario::SafBlend { pct_blend: 5.0 }.label(), "saf_05");
    }
}
