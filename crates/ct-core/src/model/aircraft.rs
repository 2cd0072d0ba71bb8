//! Coarse aircraft parameters for the point-mass performance model.
//!
//! Keyed by ICAO type designator; unknown types fall back to the A320
//! entry, which is also what trajectory sources default to when the type
//! column is absent.

/// Parameters of one aircraft type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AircraftParams {
    /// Representative cruise mass at top of descent [kg].
    pub reference_mass: f64,
    /// Wing reference area [m^2].
    pub wing_area: f64,
    /// Zero-lift drag coefficient [-].
    pub cd0: f64,
    /// Induced-drag factor k in CD = CD0 + k CL^2 [-].
    pub induced_factor: f64,
    /// Wingspan [m], used when the trajectory carries none.
    pub wingspan: f64,
}

const A320: AircraftParams = AircraftParams {
    reference_mass: 62_000.0,
    wing_area: 122.6,
    cd0: 0.024,
    induced_factor: 0.045,
    wingspan: 34.1,
};

const B738: AircraftParams = AircraftParams {
    reference_mass: 65_000.0,
    wing_area: 124.6,
    cd0: 0.023,
    induced_factor: 0.044,
    wingspan: 35.8,
};

const B772: AircraftParams = AircraftParams {
    reference_mass: 230_000.0,
    wing_area: 427.8,
    cd0: 0.022,
    induced_factor: 0.042,
    wingspan: 60.9,
};

const A333: AircraftParams = AircraftParams {
    reference_mass: 190_000.0,
    wing_area: 361.6,
    cd0: 0.023,
    induced_factor: 0.043,
    wingspan: 60.3,
};

const E190: AircraftParams = AircraftParams {
    reference_mass: 45_000.0,
    wing_area: 92.5,
    cd0: 0.025,
    induced_factor: 0.047,
    wingspan: 28.7,
};

impl AircraftParams {
    /// Look up parameters by ICAO type designator.
    pub fn for_type(aircraft_type: Option<&str>) -> Self {
        match aircraft_type {
            Some("A319") | Some("A320") | Some("A321") => A320,
            Some("B737") | Some("B738") | Some("B739") => B738,
            Some("B772") | Some("B773") | Some("B77W") => B772,
            Some("A332") | Some("A333") => A333,
            Some("E190") | Some("E195") => E190,
            _ => A320,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_types() {
        assert_eq!(AircraftParams::for_type(Some("B77W")), B772);
        assert_eq!(AircraftParams::for_type(Some("A321")), A320);
    }

    #[test]
    fn test_unknown_type_falls_back() {
        assert_eq!(AircraftParams::for_type(Some("ZZZZ")), A320);
        assert_eq!(AircraftParams::for_type(None), A320);
    }

    #[test]
    fn test_widebody_heavier_than_narrowbody() {
        assert!(B772.reference_mass > A320.reference_mass);
        assert!(B772.wing_area > A320.wing_area);
    }
}
