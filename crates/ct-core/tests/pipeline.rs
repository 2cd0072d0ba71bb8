//! End-to-end pipeline tests against a synthetic meteorology provider.

use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use ct_common::{Error, Result, RunId, StageName};
use ct_config::{
    BoundingBox, Fuel, MetConfig, PipelineConfig, SimulationConfig, TimeWindow,
};
use ct_core::model::{ContrailModel, PointMassPerformance, SacContrailModel};
use ct_core::run::{RunRecord, RunState};
use ct_core::stage::{airspeed, met_fetch, performance, simulate, StageContext};
use ct_met::{MetGrid, MetProvider, MetRequest, MetSample};
use ct_store::{read_parquet, DataLayout, PerformancePoint, SimulationPoint};

// --- fixtures ---

/// Dense synthetic grid over the exact request: cold and
/// ice-supersaturated, with a steady westerly.
struct SyntheticProvider {
    calls: AtomicU32,
}

impl SyntheticProvider {
    fn new() -> Self {
        Self {
            calls: AtomicU32::new(0),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl MetProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(&self, request: &MetRequest) -> Result<Vec<MetSample>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let levels: Vec<f64> = if request.pressure_levels.is_empty() {
            vec![0.0]
        } else {
            request.pressure_levels.iter().map(|l| *l as f64).collect()
        };
        let axis = |min: f64, max: f64| {
            let mut out = Vec::new();
            let mut x = min;
            while x <= max + 1e-9 {
                out.push(x);
                x += request.grid_step;
            }
            out
        };
        let mut samples = Vec::new();
        for variable in &request.variables {
            let value = match variable.as_str() {
                "air_temperature" => 215.0,
                "specific_humidity" => 4.0e-5,
                "eastward_wind" => 20.0,
                "northward_wind" => -5.0,
                _ => 0.0,
            };
            for time in request.time_steps() {
                for level in &levels {
                    for lat in axis(request.bbox.lat_min, request.bbox.lat_max) {
                        for lon in axis(request.bbox.lon_min, request.bbox.lon_max) {
                            samples.push(MetSample {
                                variable: variable.clone(),
                                time,
                                level_hpa: *level,
                                latitude: lat,
                                longitude: lon,
                                value,
                            });
                        }
                    }
                }
            }
        }
        Ok(samples)
    }
}

fn config(root: &Path) -> PipelineConfig {
    PipelineConfig {
        data_root: root.to_path_buf(),
        traffic_dir: None,
        met: MetConfig {
            window: TimeWindow {
                start: Utc.with_ymd_and_hms(2025, 1, 2, 11, 0, 0).unwrap(),
                end: Utc.with_ymd_and_hms(2025, 1, 2, 13, 0, 0).unwrap(),
            },
            bbox: BoundingBox {
                lat_min: 33.0,
                lat_max: 35.0,
                lon_min: -119.0,
                lon_max: -117.0,
            },
            pressure_levels: vec![300, 250, 200],
            variables: vec![
                "air_temperature".into(),
                "specific_humidity".into(),
                "eastward_wind".into(),
                "northward_wind".into(),
            ],
            rad_variables: vec!["top_net_solar_radiation".into()],
            grid_step: 0.5,
        },
        simulation: SimulationConfig::default(),
        max_gap_seconds: 300,
        max_retries: 2,
        initial_backoff_secs: 0,
        credentials: None,
    }
}

/// Write a traffic CSV with `flights` flights of 4 waypoints each.
fn write_traffic(config: &PipelineConfig, flights: &[&str]) {
    let dir = config.traffic_dir();
    std::fs::create_dir_all(&dir).unwrap();
    let mut f = std::fs::File::create(dir.join("traffic.csv")).unwrap();
    writeln!(
        f,
        "flight_id,icao24,callsign,time,latitude,longitude,altitude,groundspeed,heading,vertical_rate,aircraft_type,wingspan"
    )
    .unwrap();
    for (n, flight) in flights.iter().enumerate() {
        let lat = 33.2 + (n as f64 * 0.01) % 1.6;
        for minute in 0..4 {
            writeln!(
                f,
                "{flight},,,2025-01-02 12:0{minute}:00,{lat},{lon},35000,450,90,,A320,34.1",
                lon = -118.5 + minute as f64 * 0.05,
            )
            .unwrap();
        }
    }
}

/// Run all four stages under run-state tracking, as the CLI does.
fn run_pipeline(config: &PipelineConfig, run_id: &RunId, provider: &dyn MetProvider) -> RunRecord {
    let layout = DataLayout::new(&config.data_root);
    let mut record = RunRecord::load_or_new(&layout, run_id).unwrap();
    let ctx = StageContext::new(config, run_id.clone());
    for stage in StageName::ALL {
        if record.is_completed(stage) {
            continue;
        }
        record.mark_stage_started(&layout, stage).unwrap();
        match stage {
            StageName::FetchMet => {
                met_fetch::run(&ctx, provider).unwrap();
            }
            StageName::Airspeed => {
                airspeed::run(&ctx).unwrap();
            }
            StageName::Performance => {
                let model =
                    PointMassPerformance::new(config.simulation.default_engine_efficiency);
                performance::run(&ctx, &model).unwrap();
            }
            StageName::Simulate => {
                simulate::run(&ctx, &SacContrailModel).unwrap();
            }
        }
        record.mark_stage_completed(&layout, stage).unwrap();
    }
    record
}

// --- tests ---

#[test]
fn test_full_pipeline_end_to_end() {
    let tmp = TempDir::new().unwrap();
    let config = config(tmp.path());
    write_traffic(&config, &["AFR1342_1", "BAW12_7", "DLH400_2"]);

    let provider = SyntheticProvider::new();
    let run_id = RunId::from_existing("run-e2e");
    let record = run_pipeline(&config, &run_id, &provider);
    assert_eq!(record.state, RunState::Done);

    let layout = DataLayout::new(&config.data_root);
    let merged: Vec<SimulationPoint> =
        read_parquet(&layout.simulation_table(run_id.as_str(), "conventional")).unwrap();
    // One output row per trajectory row, every column preserved.
    assert_eq!(merged.len(), 12);
    assert!(merged.iter().all(|p| p.base.base.base.altitude_ft == 35_000.0));
    assert!(merged.iter().all(|p| p.base.fuel_flow > 0.0));
    assert!(merged.iter().all(|p| p.sac && p.persistent));

    let summary =
        ct_core::report::RunSummary::load(&layout.run_summary_path(run_id.as_str(), "conventional"))
            .unwrap();
    assert_eq!(summary.total_flights, 3);
    assert_eq!(summary.failed, 0);
    assert!(summary
        .flights
        .iter()
        .any(|f| f.airline.as_deref() == Some("AFR")));
}

#[test]
fn test_rerun_hits_cache_and_shards() {
    let tmp = TempDir::new().unwrap();
    let config = config(tmp.path());
    write_traffic(&config, &["AFR1342_1"]);

    let provider = SyntheticProvider::new();
    let run_id = RunId::from_existing("run-idem");
    run_pipeline(&config, &run_id, &provider);
    let calls_after_first = provider.calls();

    let layout = DataLayout::new(&config.data_root);
    let first: Vec<SimulationPoint> =
        read_parquet(&layout.simulation_table(run_id.as_str(), "conventional")).unwrap();

    // Second run of the same ID: everything already completed, nothing
    // re-executes; a fresh run ID reuses the met cache.
    let record = run_pipeline(&config, &run_id, &provider);
    assert_eq!(record.state, RunState::Done);
    assert_eq!(provider.calls(), calls_after_first);

    let run2 = RunId::from_existing("run-idem-2");
    run_pipeline(&config, &run2, &provider);
    assert_eq!(provider.calls(), calls_after_first, "met cache must satisfy run 2");

    let second: Vec<SimulationPoint> =
        read_parquet(&layout.simulation_table(run2.as_str(), "conventional")).unwrap();
    assert_eq!(first, second, "same inputs must produce identical outputs");
}

#[test]
fn test_one_failing_flight_in_a_large_batch() {
    let tmp = TempDir::new().unwrap();
    let config = config(tmp.path());
    let flights: Vec<String> = (0..100).map(|i| format!("TST{i:03}_1")).collect();
    let names: Vec<&str> = flights.iter().map(|s| s.as_str()).collect();
    write_traffic(&config, &names);

    struct FailOne;
    impl ContrailModel for FailOne {
        fn simulate(
            &self,
            points: &[PerformancePoint],
            met: &MetGrid,
            fuel: &Fuel,
            config: &SimulationConfig,
        ) -> Result<Vec<SimulationPoint>> {
            if points[0].base.base.flight_id == "TST042_1" {
                return Err(Error::IncompleteData("injected fault".into()));
            }
            SacContrailModel.simulate(points, met, fuel, config)
        }
    }

    let provider = SyntheticProvider::new();
    let run_id = RunId::from_existing("run-batch");
    let ctx = StageContext::new(&config, run_id.clone());
    met_fetch::run(&ctx, &provider).unwrap();
    airspeed::run(&ctx).unwrap();
    performance::run(&ctx, &PointMassPerformance::new(0.35)).unwrap();
    let outcome = simulate::run(&ctx, &FailOne).unwrap();

    assert_eq!(outcome.summary.total_flights, 100);
    assert_eq!(outcome.summary.failed, 1);
    assert_eq!(outcome.summary.succeeded, 99);
    let failed: Vec<_> = outcome
        .summary
        .flights
        .iter()
        .filter(|f| f.status.is_failure())
        .map(|f| f.flight_id.as_str())
        .collect();
    assert_eq!(failed, vec!["TST042_1"]);

    let layout = DataLayout::new(&config.data_root);
    let merged: Vec<SimulationPoint> =
        read_parquet(&layout.simulation_table(run_id.as_str(), "conventional")).unwrap();
    assert_eq!(merged.len(), 99 * 4);
    assert!(merged
        .iter()
        .all(|p| p.base.base.base.flight_id != "TST042_1"));
}

#[test]
fn test_saf_variant_diverges_only_in_values() {
    let tmp = TempDir::new().unwrap();
    let mut config = config(tmp.path());
    write_traffic(&config, &["AFR1342_1", "BAW12_7"]);

    let provider = SyntheticProvider::new();
    let run_id = RunId::from_existing("run-saf");
    run_pipeline(&config, &run_id, &provider);

    // Re-simulate the same run under a 25% blend; shards and outputs go to
    // the saf_25 directory.
    config.simulation.fuel = ct_config::FuelScenario::SafBlend { pct_blend: 25.0 };
    let ctx = StageContext::new(&config, run_id.clone());
    simulate::run(&ctx, &SacContrailModel).unwrap();

    let layout = DataLayout::new(&config.data_root);
    let conventional: Vec<SimulationPoint> =
        read_parquet(&layout.simulation_table(run_id.as_str(), "conventional")).unwrap();
    let saf: Vec<SimulationPoint> =
        read_parquet(&layout.simulation_table(run_id.as_str(), "saf_25")).unwrap();

    assert_eq!(conventional.len(), saf.len());
    for (c, s) in conventional.iter().zip(&saf) {
        // Identical rows up to the contrail columns.
        assert_eq!(c.base, s.base);
        // The blend changes the mixing line, never the schema or row set.
        assert!(s.g_factor > c.g_factor);
        assert!(s.t_critical > c.t_critical);
    }
}

#[test]
fn test_interrupted_run_resumes_at_next_stage() {
    let tmp = TempDir::new().unwrap();
    let config = config(tmp.path());
    write_traffic(&config, &["AFR1342_1"]);

    let provider = SyntheticProvider::new();
    let run_id = RunId::from_existing("run-resume");
    let layout = DataLayout::new(&config.data_root);

    // Run only the first two stages, as if the process died afterwards.
    let ctx = StageContext::new(&config, run_id.clone());
    let mut record = RunRecord::new(run_id.clone());
    record.mark_stage_started(&layout, StageName::FetchMet).unwrap();
    met_fetch::run(&ctx, &provider).unwrap();
    record.mark_stage_completed(&layout, StageName::FetchMet).unwrap();
    record.mark_stage_started(&layout, StageName::Airspeed).unwrap();
    airspeed::run(&ctx).unwrap();
    record.mark_stage_completed(&layout, StageName::Airspeed).unwrap();
    drop(record);

    let reloaded = RunRecord::load(&layout, &run_id).unwrap();
    assert_eq!(reloaded.next_stage(), Some(StageName::Performance));

    let finished = run_pipeline(&config, &run_id, &provider);
    assert_eq!(finished.state, RunState::Done);
}
