//! Identity types for flights and pipeline runs.

use std::fmt;
use std::sync::OnceLock;

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Identifier of a single flight within a traffic dataset.
///
/// Trajectory sources key flights as `<callsign>_<leg>` (for example
/// `AFR1342_3891`), where the callsign begins with a three-letter ICAO
/// airline designator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlightId(String);

fn airline_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Z]{3})\d").expect("static regex"))
}

impl FlightId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The callsign portion of the identifier (everything before the
    /// trailing `_<leg>` suffix, if present).
    pub fn callsign(&self) -> &str {
        match self.0.rsplit_once('_') {
            Some((head, tail)) if tail.chars().all(|c| c.is_ascii_digit()) => head,
            _ => &self.0,
        }
    }

    /// The three-letter ICAO airline designator, when the callsign
    /// follows the `XXX1234` convention.
    pub fn airline_code(&self) -> Option<&str> {
        airline_re()
            .captures(self.callsign())
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }
}

impl fmt::Display for FlightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FlightId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for FlightId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier of one pipeline run.
///
/// Encodes the creation time for human-scannable run directories, plus a
/// short random suffix to disambiguate runs started within the same second.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Generate a fresh run ID.
    pub fn generate() -> Self {
        let now = Utc::now();
        let suffix = &uuid::Uuid::new_v4().to_string()[..8];
        Self(format!("run-{}-{}", now.format("%Y%m%d%H%M%S"), suffix))
    }

    /// Wrap an existing run ID string (for resuming a run).
    pub fn from_existing(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callsign_strips_leg_suffix() {
        let id = FlightId::new("AFR1342_3891");
        assert_eq!(id.callsign(), "AFR1342");
        assert_eq!(id.airline_code(), Some("AFR"));
    }

    #[test]
    fn test_callsign_without_leg() {
        let id = FlightId::new("BAW12");
        assert_eq!(id.callsign(), "BAW12");
        assert_eq!(id.airline_code(), Some("BAW"));
    }

    #[test]
    fn test_airline_code_absent_for_registrations() {
        // Some sources key by tail number instead of callsign.
        let id = FlightId::new("N123AB");
        assert_eq!(id.airline_code(), None);
    }

    #[test]
    fn test_run_id_shape() {
        let id = RunId::generate();
        assert!(id.as_str().starts_with("run-"));
        assert!(id.as_str().len() > 20);
    }

    #[test]
    fn test_run_ids_unique() {
        assert_ne!(RunId::generate(), RunId::generate());
    }
}
