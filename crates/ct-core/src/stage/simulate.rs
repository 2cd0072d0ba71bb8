//! Stage 4: per-flight contrail simulation.
//!
//! Flights are simulated independently; one flight failing is recorded in
//! the run summary and excluded from the merged table, and the other
//! flights are unaffected. Each flight's output lands in its own shard
//! first, so a re-run skips flights that already have one and only
//! simulates the remainder. The two fuel variants write to separate
//! directories with structurally identical tables.

use tracing::{info, warn};

use ct_common::schema::required;
use ct_common::{Error, Result, StageName};
use ct_met::{MetGrid, MetSample};
use ct_store::{
    read_parquet, read_schema, write_parquet, FlightSummaryRow, PerformancePoint, SimulationPoint,
    StageManifest,
};

use crate::model::{haversine_m, ContrailModel};
use crate::report::{FlightOutcome, FlightStatus, RunSummary};

use super::{check_columns, flight_ranges, StageContext};

/// What the simulation stage produced.
pub struct SimulateOutcome {
    pub manifest: StageManifest,
    pub summary: RunSummary,
}

/// Run the simulation stage for the configured fuel scenario.
pub fn run(ctx: &StageContext, model: &dyn ContrailModel) -> Result<SimulateOutcome> {
    let upstream = ctx.upstream_manifest(StageName::Simulate)?;
    let input = upstream
        .artifact("performance")
        .ok_or_else(|| Error::MissingArtifact {
            path: ctx
                .layout
                .manifest_path(ctx.run_id.as_str(), StageName::Performance),
        })?;

    let schema = read_schema(&input.path).map_err(Error::from)?;
    check_columns(&schema, required::SIMULATION_INPUT, "performance")?;
    let rows: Vec<PerformancePoint> = read_parquet(&input.path).map_err(Error::from)?;

    let met = load_met_grid(ctx)?;
    let scenario = ctx.config.simulation.fuel;
    let fuel = scenario.properties();
    let label = scenario.label();

    let mut merged: Vec<SimulationPoint> = Vec::with_capacity(rows.len());
    let mut summaries: Vec<FlightSummaryRow> = Vec::new();
    let mut outcomes: Vec<FlightOutcome> = Vec::new();

    let ranges = flight_ranges(&rows, |r| r.base.base.flight_id.as_str());
    for (flight_id, range) in &ranges {
        let shard = ctx
            .layout
            .simulation_shard(ctx.run_id.as_str(), &label, flight_id);
        if shard.exists() {
            let points: Vec<SimulationPoint> = read_parquet(&shard).map_err(Error::from)?;
            outcomes.push(FlightOutcome::new(
                flight_id.clone(),
                FlightStatus::Resumed,
                points.len() as u64,
            ));
            summaries.push(summarize_flight(flight_id, &points));
            merged.extend(points);
            continue;
        }

        match model.simulate(&rows[range.clone()], &met, &fuel, &ctx.config.simulation) {
            Ok(points) => {
                write_parquet(&shard, &points).map_err(Error::from)?;
                outcomes.push(FlightOutcome::new(
                    flight_id.clone(),
                    FlightStatus::Ok,
                    points.len() as u64,
                ));
                summaries.push(summarize_flight(flight_id, &points));
                merged.extend(points);
            }
            Err(e) => {
                let isolated = Error::Simulation {
                    flight_id: flight_id.clone(),
                    reason: e.to_string(),
                };
                warn!(flight_id, error = %isolated, "flight failed, continuing batch");
                outcomes.push(FlightOutcome::new(
                    flight_id.clone(),
                    FlightStatus::Failed {
                        code: e.code(),
                        error: e.to_string(),
                    },
                    0,
                ));
            }
        }
    }

    let table_path = ctx.layout.simulation_table(ctx.run_id.as_str(), &label);
    write_parquet(&table_path, &merged).map_err(Error::from)?;
    let summary_path = ctx.layout.summary_table(ctx.run_id.as_str(), &label);
    write_parquet(&summary_path, &summaries).map_err(Error::from)?;

    let summary = RunSummary::new(ctx.run_id.clone(), &label, outcomes);
    summary.save(&ctx.layout.run_summary_path(ctx.run_id.as_str(), &label))?;

    let mut manifest = StageManifest::new(ctx.run_id.as_str(), StageName::Simulate).with_input(
        &ctx.layout
            .manifest_path(ctx.run_id.as_str(), StageName::Performance),
    );
    manifest.add_artifact("cocip", &table_path, merged.len() as u64)?;
    manifest.add_artifact("cocip_summary", &summary_path, summaries.len() as u64)?;
    manifest.note("fuel", label.clone());
    manifest.note("flights_failed", summary.failed.to_string());
    ctx.save_manifest(&manifest)?;

    info!(
        fuel = %label,
        flights = ranges.len(),
        failed = summary.failed,
        points = merged.len(),
        "simulation stage complete"
    );
    Ok(SimulateOutcome { manifest, summary })
}

/// Load the cached pressure-level grid through the fetch stage's manifest.
fn load_met_grid(ctx: &StageContext) -> Result<MetGrid> {
    let fetch_manifest_path = ctx
        .layout
        .manifest_path(ctx.run_id.as_str(), StageName::FetchMet);
    if !fetch_manifest_path.exists() {
        return Err(Error::MissingManifest {
            stage: StageName::FetchMet.to_string(),
            path: fetch_manifest_path,
        });
    }
    let fetch_manifest = StageManifest::load(&fetch_manifest_path).map_err(Error::from)?;
    let artifact =
        fetch_manifest
            .artifact("met_pressure_levels")
            .ok_or(Error::MissingArtifact {
                path: fetch_manifest_path,
            })?;
    let samples: Vec<MetSample> = read_parquet(&artifact.path).map_err(Error::from)?;
    MetGrid::from_samples(&samples)
}

fn summarize_flight(flight_id: &str, points: &[SimulationPoint]) -> FlightSummaryRow {
    let mut total_ef = 0.0;
    for pair in points.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        let length = haversine_m(
            a.base.base.base.latitude,
            a.base.base.base.longitude,
            b.base.base.base.latitude,
            b.base.base.base.longitude,
        );
        total_ef += a.ef_per_m * length;
    }
    let mean_rhi = if points.is_empty() {
        0.0
    } else {
        points.iter().map(|p| p.rhi).sum::<f64>() / points.len() as f64
    };
    FlightSummaryRow {
        flight_id: flight_id.to_string(),
        waypoints: points.len() as i64,
        contrail_waypoints: points.iter().filter(|p| p.contrail_flag).count() as i64,
        persistent_waypoints: points
            .iter()
            .filter(|p| p.contrail_flag && p.persistent)
            .count() as i64,
        total_ef,
        mean_rhi,
        status: "ok".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PointMassPerformance, SacContrailModel};
    use crate::stage::test_support::{synthetic_provider, test_config};
    use crate::stage::{airspeed, met_fetch, performance};
    use ct_common::RunId;
    use ct_config::{Fuel, FuelScenario, SimulationConfig};
    use std::cell::Cell;
    use std::io::Write;
    use tempfile::TempDir;

    /// Delegates to the real model, but fails one flight and counts calls.
    struct FaultInjectingModel {
        fail_flight: Option<String>,
        calls: Cell<u32>,
    }

    impl FaultInjectingModel {
        fn new(fail_flight: Option<&str>) -> Self {
            Self {
                fail_flight: fail_flight.map(|s| s.to_string()),
                calls: Cell::new(0),
            }
        }
    }

    impl ContrailModel for FaultInjectingModel {
        fn simulate(
            &self,
            points: &[PerformancePoint],
            met: &MetGrid,
            fuel: &Fuel,
            config: &SimulationConfig,
        ) -> Result<Vec<SimulationPoint>> {
            self.calls.set(self.calls.get() + 1);
            let flight_id = &points[0].base.base.flight_id;
            if self.fail_flight.as_deref() == Some(flight_id.as_str()) {
                return Err(Error::IncompleteData("injected fault".into()));
            }
            SacContrailModel.simulate(points, met, fuel, config)
        }
    }

    fn prepare(tmp: &TempDir, flights: &[&str]) -> (ct_config::PipelineConfig, RunId) {
        let config = test_config(tmp.path());
        let run_id = RunId::from_existing("run-t");

        let dir = config.traffic_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let mut f = std::fs::File::create(dir.join("traffic.csv")).unwrap();
        writeln!(
            f,
            "flight_id,icao24,callsign,time,latitude,longitude,altitude,groundspeed,heading,vertical_rate,aircraft_type,wingspan"
        )
        .unwrap();
        for (n, flight) in flights.iter().enumerate() {
            for minute in 0..3 {
                // Eastbound track: consecutive waypoints must be distinct
                // positions so segment lengths (and the EF totals built
                // from them) are nonzero.
                writeln!(
                    f,
                    "{flight},,,2025-01-02 12:0{minute}:00,{lat},{lon},35000,450,90,,A320,34.1",
                    lat = 33.5 + n as f64 * 0.2,
                    lon = -118.2 + minute as f64 * 0.1,
                )
                .unwrap();
            }
        }

        let ctx = StageContext::new(&config, run_id.clone());
        met_fetch::run(&ctx, &synthetic_provider()).unwrap();
        airspeed::run(&ctx).unwrap();
        performance::run(
            &ctx,
            &PointMassPerformance::new(config.simulation.default_engine_efficiency),
        )
        .unwrap();
        (config, run_id)
    }

    #[test]
    fn test_all_flights_simulated() {
        let tmp = TempDir::new().unwrap();
        let (config, run_id) = prepare(&tmp, &["AFR1342_1", "BAW12_7"]);
        let ctx = StageContext::new(&config, run_id);

        let out = run(&ctx, &SacContrailModel).unwrap();
        assert_eq!(out.summary.total_flights, 2);
        assert_eq!(out.summary.failed, 0);
        assert_eq!(out.manifest.artifact("cocip").unwrap().rows, 6);

        // Synthetic air is cold and ice-supersaturated everywhere.
        let summaries: Vec<FlightSummaryRow> =
            read_parquet(&ctx.layout.summary_table(ctx.run_id.as_str(), "conventional")).unwrap();
        assert!(summaries.iter().all(|s| s.persistent_waypoints == 3));
        assert!(summaries.iter().all(|s| s.total_ef > 0.0));
    }

    #[test]
    fn test_one_failure_does_not_abort_batch() {
        let tmp = TempDir::new().unwrap();
        let (config, run_id) = prepare(&tmp, &["AFR1342_1", "BAW12_7", "DLH400_2"]);
        let ctx = StageContext::new(&config, run_id);

        let model = FaultInjectingModel::new(Some("BAW12_7"));
        let out = run(&ctx, &model).unwrap();
        assert_eq!(out.summary.total_flights, 3);
        assert_eq!(out.summary.failed, 1);
        assert_eq!(out.summary.succeeded, 2);
        // Failed flight excluded from the merged table, others intact.
        assert_eq!(out.manifest.artifact("cocip").unwrap().rows, 6);

        let failed: Vec<_> = out
            .summary
            .flights
            .iter()
            .filter(|f| f.status.is_failure())
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].flight_id, "BAW12_7");
    }

    #[test]
    fn test_rerun_resumes_from_shards() {
        let tmp = TempDir::new().unwrap();
        let (config, run_id) = prepare(&tmp, &["AFR1342_1", "BAW12_7"]);
        let ctx = StageContext::new(&config, run_id);

        run(&ctx, &SacContrailModel).unwrap();

        let model = FaultInjectingModel::new(None);
        let out = run(&ctx, &model).unwrap();
        assert_eq!(model.calls.get(), 0, "existing shards must not re-simulate");
        assert!(out
            .summary
            .flights
            .iter()
            .all(|f| f.status == FlightStatus::Resumed));
        assert_eq!(out.manifest.artifact("cocip").unwrap().rows, 6);
    }

    #[test]
    fn test_fuel_variants_have_identical_schema() {
        let tmp = TempDir::new().unwrap();
        let (mut config, run_id) = prepare(&tmp, &["AFR1342_1"]);

        {
            let ctx = StageContext::new(&config, run_id.clone());
            run(&ctx, &SacContrailModel).unwrap();
        }
        config.simulation.fuel = FuelScenario::SafBlend { pct_blend: 25.0 };
        let ctx = StageContext::new(&config, run_id);
        run(&ctx, &SacContrailModel).unwrap();

        let conventional =
            read_schema(&ctx.layout.simulation_table(ctx.run_id.as_str(), "conventional")).unwrap();
        let saf = read_schema(&ctx.layout.simulation_table(ctx.run_id.as_str(), "saf_25")).unwrap();
        assert_eq!(conventional, saf);

        // The SAF run must not clobber the conventional summary.
        assert!(ctx
            .layout
            .run_summary_path(ctx.run_id.as_str(), "conventional")
            .exists());
        assert!(ctx
            .layout
            .run_summary_path(ctx.run_id.as_str(), "saf_25")
            .exists());
    }
}
