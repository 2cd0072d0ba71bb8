//! Stage 2: join trajectories with winds, derive true air speed.
//!
//! Ingests the raw trajectory CSVs, validates per-flight time ordering,
//! flags (never interpolates) long gaps, and joins each point with the
//! cached wind field at its pressure altitude. Output is exactly one row
//! per input row. Points outside the cached coverage are a validation
//! error naming the flight and row, not a silent NaN.

use tracing::info;

use ct_common::{Error, Result, StageName};
use ct_met::{MetGrid, MetSample};
use ct_store::{read_parquet, write_parquet, AirspeedPoint, StageManifest, TrajectoryPoint};

use crate::model::atmosphere;

use super::{flight_ranges, StageContext};

/// Run the airspeed stage, returning its manifest.
pub fn run(ctx: &StageContext) -> Result<StageManifest> {
    let upstream = ctx.upstream_manifest(StageName::Airspeed)?;
    let met_artifact = upstream
        .artifact("met_pressure_levels")
        .ok_or_else(|| Error::MissingArtifact {
            path: ctx
                .layout
                .manifest_path(ctx.run_id.as_str(), StageName::FetchMet),
        })?;
    let samples: Vec<MetSample> = read_parquet(&met_artifact.path).map_err(Error::from)?;
    let grid = MetGrid::from_samples(&samples)?;

    let traffic_dir = ctx.config.traffic_dir();
    let rows = ct_store::read_trajectory_dir(&traffic_dir).map_err(Error::from)?;
    if rows.is_empty() {
        return Err(Error::MissingArtifact { path: traffic_dir });
    }

    let mut out = Vec::with_capacity(rows.len());
    let mut gap_points = 0usize;
    let ranges = flight_ranges(&rows, |r| r.flight_id.as_str());
    for (flight_id, range) in &ranges {
        let flight = &rows[range.clone()];
        validate_flight(flight_id, flight)?;
        for (i, point) in flight.iter().enumerate() {
            let gap_flag = i > 0
                && (point.time - flight[i - 1].time).num_seconds() > ctx.config.max_gap_seconds;
            if gap_flag {
                gap_points += 1;
            }
            out.push(derive_point(flight_id, i, point, gap_flag, &grid)?);
        }
    }
    debug_assert_eq!(out.len(), rows.len());

    let table_path = ctx.layout.airspeed_table(ctx.run_id.as_str());
    write_parquet(&table_path, &out).map_err(Error::from)?;

    let mut manifest = StageManifest::new(ctx.run_id.as_str(), StageName::Airspeed).with_input(
        &ctx.layout
            .manifest_path(ctx.run_id.as_str(), StageName::FetchMet),
    );
    manifest.add_artifact("airspeed", &table_path, out.len() as u64)?;
    manifest.note("flights", ranges.len().to_string());
    manifest.note("gap_points", gap_points.to_string());
    ctx.save_manifest(&manifest)?;

    info!(
        flights = ranges.len(),
        points = out.len(),
        gap_points,
        "airspeed stage complete"
    );
    Ok(manifest)
}

/// Per-flight input validation: timestamps strictly increasing, coordinates
/// and kinematics finite.
fn validate_flight(flight_id: &str, flight: &[TrajectoryPoint]) -> Result<()> {
    for (i, point) in flight.iter().enumerate() {
        if i > 0 && point.time <= flight[i - 1].time {
            return Err(Error::Validation {
                flight_id: flight_id.to_string(),
                row: i,
                reason: format!(
                    "timestamp {} does not increase past {}",
                    point.time,
                    flight[i - 1].time
                ),
            });
        }
        for (name, value) in [
            ("latitude", point.latitude),
            ("longitude", point.longitude),
            ("altitude", point.altitude_ft),
            ("groundspeed", point.groundspeed),
            ("heading", point.heading),
        ] {
            if !value.is_finite() {
                return Err(Error::Validation {
                    flight_id: flight_id.to_string(),
                    row: i,
                    reason: format!("non-finite {name}"),
                });
            }
        }
    }
    Ok(())
}

fn derive_point(
    flight_id: &str,
    row: usize,
    point: &TrajectoryPoint,
    gap_flag: bool,
    grid: &MetGrid,
) -> Result<AirspeedPoint> {
    let altitude_m = atmosphere::ft_to_m(point.altitude_ft);
    let pressure_hpa = atmosphere::pressure_hpa_from_altitude(altitude_m);

    let (u_wind, v_wind) = grid
        .wind_at(point.time, point.latitude, point.longitude, pressure_hpa)
        .map_err(|e| Error::Validation {
            flight_id: flight_id.to_string(),
            row,
            reason: e.to_string(),
        })?;

    let heading_rad = point.heading.to_radians();
    let gs = atmosphere::kt_to_mps(point.groundspeed);
    // Heading is degrees from true north: east component is sin, north cos.
    let gs_x = gs * heading_rad.sin();
    let gs_y = gs * heading_rad.cos();
    let true_airspeed = ((gs_x - u_wind).powi(2) + (gs_y - v_wind).powi(2)).sqrt();

    let mut base = point.clone();
    base.gap_flag = gap_flag;
    Ok(AirspeedPoint {
        base,
        pressure_hpa,
        u_wind,
        v_wind,
        heading_rad,
        gs_x,
        gs_y,
        true_airspeed,
    })
}
