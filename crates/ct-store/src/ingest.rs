//! CSV ingest for raw trajectory telemetry.
//!
//! ADS-B exports vary between sources: timestamps come as RFC 3339, as
//! naive `YYYY-MM-DD HH:MM:SS` strings, or as unix epoch seconds, and
//! optional columns may be absent entirely. Ingest normalizes all of that
//! into [`TrajectoryPoint`] rows; rows with an unparseable timestamp or
//! missing mandatory fields are rejected with the file and line identified.

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use ct_common::schema::required;

use crate::error::{Result, StoreError};
use crate::records::TrajectoryPoint;

/// Raw CSV row, matched by header name.
#[derive(Debug, Deserialize)]
struct RawRow {
    flight_id: String,
    #[serde(default)]
    icao24: Option<String>,
    #[serde(default)]
    callsign: Option<String>,
    time: String,
    latitude: f64,
    longitude: f64,
    altitude: f64,
    groundspeed: f64,
    heading: f64,
    #[serde(default)]
    vertical_rate: Option<f64>,
    #[serde(default)]
    aircraft_type: Option<String>,
    #[serde(default)]
    wingspan: Option<f64>,
}

/// Parse a telemetry timestamp in any of the supported source formats.
fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(t.and_utc());
        }
    }
    if let Ok(epoch) = raw.parse::<f64>() {
        return DateTime::from_timestamp_micros((epoch * 1e6) as i64);
    }
    None
}

/// Read one trajectory CSV file into rows, sorted by (flight_id, time).
///
/// Sorting makes per-flight grouping downstream a contiguous-slice
/// operation; the strictly-increasing-timestamp invariant is checked by the
/// airspeed stage, which can name the offending flight in its error.
pub fn read_trajectory_csv(path: &Path) -> Result<Vec<TrajectoryPoint>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| StoreError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;

    // Gate on the mandatory headers up front, naming every absent column,
    // rather than letting the row decoder fail on the first one it needs.
    let headers = reader
        .headers()
        .map_err(|e| StoreError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?
        .clone();
    let missing: Vec<String> = required::TRAJECTORY
        .iter()
        .filter(|&&c| !headers.iter().any(|h| h == c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(StoreError::MissingHeaders {
            path: path.to_path_buf(),
            columns: missing,
        });
    }

    let mut rows = Vec::new();
    for (i, record) in reader.deserialize::<RawRow>().enumerate() {
        let raw = record.map_err(|e| StoreError::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;
        let time = parse_time(&raw.time).ok_or_else(|| StoreError::BadValue {
            column: "time".into(),
            row: i,
            reason: format!("unparseable timestamp '{}' in {}", raw.time, path.display()),
        })?;
        rows.push(TrajectoryPoint {
            flight_id: raw.flight_id,
            icao24: raw.icao24.filter(|s| !s.is_empty()),
            callsign: raw.callsign.filter(|s| !s.is_empty()),
            time,
            latitude: raw.latitude,
            longitude: raw.longitude,
            altitude_ft: raw.altitude,
            groundspeed: raw.groundspeed,
            heading: raw.heading,
            vertical_rate: raw.vertical_rate,
            aircraft_type: raw.aircraft_type.filter(|s| !s.is_empty()),
            wingspan: raw.wingspan,
            gap_flag: false,
        });
    }

    rows.sort_by(|a, b| a.flight_id.cmp(&b.flight_id).then(a.time.cmp(&b.time)));
    debug!(path = %path.display(), rows = rows.len(), "ingested trajectory CSV");
    Ok(rows)
}

/// Read every `.csv` file under `dir`, concatenated and sorted.
pub fn read_trajectory_dir(dir: &Path) -> Result<Vec<TrajectoryPoint>> {
    let entries = std::fs::read_dir(dir).map_err(|e| StoreError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut rows = Vec::new();
    let mut files: Vec<_> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "csv"))
        .collect();
    files.sort();
    for file in files {
        rows.extend(read_trajectory_csv(&file)?);
    }
    rows.sort_by(|a, b| a.flight_id.cmp(&b.flight_id).then(a.time.cmp(&b.time)));
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const CSV: &str = "\
flight_id,icao24,callsign,time,latitude,longitude,altitude,groundspeed,heading,vertical_rate,aircraft_type,wingspan
AFR1342_1,a1b2c3,AFR1342,2025-01-02 12:01:00,34.01,-118.0,35000,450,90,,A320,34.1
AFR1342_1,a1b2c3,AFR1342,2025-01-02 12:00:00,34.00,-118.0,35000,450,90,0,A320,34.1
BAW12_7,400abc,BAW12,2025-01-02T12:00:00Z,35.0,-119.0,37000,470,270,-64,B772,60.9
";

    fn write_csv(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_ingest_sorts_by_flight_and_time() {
        let tmp = TempDir::new().unwrap();
        let path = write_csv(&tmp, "traffic.csv", CSV);
        let rows = read_trajectory_csv(&path).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].flight_id, "AFR1342_1");
        assert!(rows[0].time < rows[1].time);
        assert_eq!(rows[2].flight_id, "BAW12_7");
        assert_eq!(rows[2].vertical_rate, Some(-64.0));
    }

    #[test]
    fn test_mixed_time_formats() {
        assert!(parse_time("2025-01-02T12:00:00Z").is_some());
        assert!(parse_time("2025-01-02 12:00:00").is_some());
        assert!(parse_time("2025-01-02 12:00:00.500").is_some());
        assert!(parse_time("1735819200").is_some());
        assert!(parse_time("not-a-time").is_none());
    }

    #[test]
    fn test_bad_timestamp_identifies_row() {
        let tmp = TempDir::new().unwrap();
        let bad = "\
flight_id,time,latitude,longitude,altitude,groundspeed,heading
X_1,garbage,0,0,0,0,0
";
        let path = write_csv(&tmp, "bad.csv", bad);
        let err = read_trajectory_csv(&path).unwrap_err();
        assert!(matches!(err, StoreError::BadValue { row: 0, .. }));
    }

    #[test]
    fn test_missing_headers_all_named() {
        let tmp = TempDir::new().unwrap();
        let bad = "\
flight_id,time,latitude,longitude,altitude
X_1,2025-01-02 12:00:00,34.0,-118.0,35000
";
        let path = write_csv(&tmp, "headless.csv", bad);
        let err = read_trajectory_csv(&path).unwrap_err();
        match err {
            StoreError::MissingHeaders { columns, .. } => {
                assert_eq!(columns, vec!["groundspeed", "heading"]);
            }
            other => panic!("expected missing headers, got {other}"),
        }
    }

    #[test]
    fn test_read_dir_concatenates() {
        let tmp = TempDir::new().unwrap();
        write_csv(&tmp, "a.csv", CSV);
        write_csv(&tmp, "b.csv", CSV);
        let rows = read_trajectory_dir(tmp.path()).unwrap();
        assert_eq!(rows.len(), 6);
    }
}
