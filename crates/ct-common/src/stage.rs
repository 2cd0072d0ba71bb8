//! Stage names and their fixed pipeline order.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The four pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    /// Fetch and cache gridded meteorology.
    FetchMet,
    /// Join trajectories with winds, derive true air speed.
    Airspeed,
    /// Estimate per-point aircraft performance quantities.
    Performance,
    /// Run the contrail model per flight.
    Simulate,
}

impl StageName {
    /// All stages in pipeline order.
    pub const ALL: [StageName; 4] = [
        StageName::FetchMet,
        StageName::Airspeed,
        StageName::Performance,
        StageName::Simulate,
    ];

    /// The stage whose output this stage consumes, if any.
    pub fn upstream(self) -> Option<StageName> {
        match self {
            StageName::FetchMet => None,
            StageName::Airspeed => Some(StageName::FetchMet),
            StageName::Performance => Some(StageName::Airspeed),
            StageName::Simulate => Some(StageName::Performance),
        }
    }

    /// Stable directory / manifest name for this stage.
    pub fn as_str(self) -> &'static str {
        match self {
            StageName::FetchMet => "fetch_met",
            StageName::Airspeed => "airspeed",
            StageName::Performance => "performance",
            StageName::Simulate => "simulate",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_is_linear() {
        let mut prev = None;
        for stage in StageName::ALL {
            assert_eq!(stage.upstream(), prev);
            prev = Some(stage);
        }
    }

    #[test]
    fn test_serde_names_match_dirs() {
        let json = serde_json::to_string(&StageName::FetchMet).unwrap();
        assert_eq!(json, "\"fetch_met\"");
    }
}
