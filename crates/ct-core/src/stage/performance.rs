//! Stage 3: per-point aircraft performance.
//!
//! Fails fast: the airspeed table's schema is checked for every required
//! column before a single row is decoded, and the error names all missing
//! columns at once. Estimation runs per flight so mass integration never
//! crosses a flight boundary.

use tracing::info;

use ct_common::schema::required;
use ct_common::{Error, Result, StageName};
use ct_store::{read_parquet, read_schema, write_parquet, AirspeedPoint, StageManifest};

use crate::model::PerformanceModel;

use super::{check_columns, flight_ranges, StageContext};

/// Run the performance stage, returning its manifest.
pub fn run(ctx: &StageContext, model: &dyn PerformanceModel) -> Result<StageManifest> {
    let upstream = ctx.upstream_manifest(StageName::Performance)?;
    let input = upstream
        .artifact("airspeed")
        .ok_or_else(|| Error::MissingArtifact {
            path: ctx
                .layout
                .manifest_path(ctx.run_id.as_str(), StageName::Airspeed),
        })?;

    let schema = read_schema(&input.path).map_err(Error::from)?;
    check_columns(&schema, required::PERFORMANCE_INPUT, "airspeed")?;

    let rows: Vec<AirspeedPoint> = read_parquet(&input.path).map_err(Error::from)?;
    let ranges = flight_ranges(&rows, |r| r.base.flight_id.as_str());

    let mut out = Vec::with_capacity(rows.len());
    for (flight_id, range) in &ranges {
        let flight = &rows[range.clone()];
        let estimated = model.estimate(flight)?;
        if estimated.len() != flight.len() {
            return Err(Error::Storage(format!(
                "performance model returned {} rows for {} input points of {flight_id}",
                estimated.len(),
                flight.len()
            )));
        }
        out.extend(estimated);
    }

    let table_path = ctx.layout.performance_table(ctx.run_id.as_str());
    write_parquet(&table_path, &out).map_err(Error::from)?;

    let mut manifest = StageManifest::new(ctx.run_id.as_str(), StageName::Performance).with_input(
        &ctx.layout
            .manifest_path(ctx.run_id.as_str(), StageName::Airspeed),
    );
    manifest.add_artifact("performance", &table_path, out.len() as u64)?;
    manifest.note("flights", ranges.len().to_string());
    ctx.save_manifest(&manifest)?;

    info!(flights = ranges.len(), points = out.len(), "performance stage complete");
    Ok(manifest)
}
