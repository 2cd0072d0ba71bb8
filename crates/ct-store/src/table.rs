//! Conversion between typed rows and Arrow record batches, plus Parquet
//! read/write for whole tables.
//!
//! Tables are small enough (one run's traffic) to convert in a single
//! batch; the writer still goes through a temp file and rename so readers
//! never observe a partially written artifact.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BooleanArray, BooleanBuilder, Float64Array, Float64Builder, Int64Array,
    Int64Builder, RecordBatch, StringArray, StringBuilder, TimestampMicrosecondArray,
    TimestampMicrosecondBuilder,
};
use arrow::datatypes::SchemaRef;
use chrono::{DateTime, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use tracing::debug;

use ct_common::schema::col;

use crate::error::{Result, StoreError};
use crate::records::{
    AirspeedPoint, FlightSummaryRow, PerformancePoint, SimulationPoint, TrajectoryPoint,
};
use crate::schema;

/// A row type that maps onto one Arrow table.
pub trait TableRecord: Sized {
    /// Arrow schema of the table.
    fn schema() -> SchemaRef;

    /// Convert rows into a single record batch.
    fn to_batch(rows: &[Self]) -> Result<RecordBatch>;

    /// Decode all rows of a record batch.
    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>>;
}

/// Write a table to `path` as zstd-compressed Parquet.
pub fn write_parquet<T: TableRecord>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let tmp = path.with_extension("parquet.tmp");
    let file = File::create(&tmp).map_err(|e| StoreError::Io {
        path: tmp.clone(),
        source: e,
    })?;

    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(ZstdLevel::default()))
        .build();
    let batch = T::to_batch(rows)?;
    let mut writer = ArrowWriter::try_new(file, T::schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    std::fs::rename(&tmp, path).map_err(|e| StoreError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    debug!(path = %path.display(), rows = rows.len(), "wrote parquet table");
    Ok(())
}

/// Read only the Arrow schema of a Parquet table.
///
/// Stages use this to reject inputs with missing columns before decoding
/// a single row.
pub fn read_schema(path: &Path) -> Result<SchemaRef> {
    if !path.exists() {
        return Err(StoreError::ArtifactMissing(path.to_path_buf()));
    }
    let file = File::open(path).map_err(|e| StoreError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    Ok(builder.schema().clone())
}

/// Read a whole Parquet table from `path`.
pub fn read_parquet<T: TableRecord>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Err(StoreError::ArtifactMissing(path.to_path_buf()));
    }
    let file = File::open(path).map_err(|e| StoreError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch?;
        rows.extend(T::from_batch(&batch)?);
    }
    Ok(rows)
}

// --- column access helpers ---

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| StoreError::MissingColumn(name.to_string()))
}

fn f64_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Float64Array> {
    column(batch, name)?
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| StoreError::ColumnType {
            column: name.to_string(),
            expected: "Float64",
        })
}

fn str_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    column(batch, name)?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| StoreError::ColumnType {
            column: name.to_string(),
            expected: "Utf8",
        })
}

fn bool_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a BooleanArray> {
    column(batch, name)?
        .as_any()
        .downcast_ref::<BooleanArray>()
        .ok_or_else(|| StoreError::ColumnType {
            column: name.to_string(),
            expected: "Boolean",
        })
}

fn i64_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Int64Array> {
    column(batch, name)?
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| StoreError::ColumnType {
            column: name.to_string(),
            expected: "Int64",
        })
}

fn time_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a TimestampMicrosecondArray> {
    column(batch, name)?
        .as_any()
        .downcast_ref::<TimestampMicrosecondArray>()
        .ok_or_else(|| StoreError::ColumnType {
            column: name.to_string(),
            expected: "Timestamp(Microsecond)",
        })
}

fn decode_time(name: &str, row: usize, micros: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros).ok_or_else(|| StoreError::BadValue {
        column: name.to_string(),
        row,
        reason: format!("timestamp out of range: {micros}"),
    })
}

fn opt_f64(arr: &Float64Array, i: usize) -> Option<f64> {
    if arr.is_null(i) {
        None
    } else {
        Some(arr.value(i))
    }
}

fn opt_str(arr: &StringArray, i: usize) -> Option<String> {
    if arr.is_null(i) {
        None
    } else {
        Some(arr.value(i).to_string())
    }
}

// --- builder bundles, one per stage prefix ---

struct TrajBuilders {
    flight_id: StringBuilder,
    icao24: StringBuilder,
    callsign: StringBuilder,
    time: TimestampMicrosecondBuilder,
    latitude: Float64Builder,
    longitude: Float64Builder,
    altitude: Float64Builder,
    groundspeed: Float64Builder,
    heading: Float64Builder,
    vertical_rate: Float64Builder,
    aircraft_type: StringBuilder,
    wingspan: Float64Builder,
    gap_flag: BooleanBuilder,
}

impl TrajBuilders {
    fn new() -> Self {
        Self {
            flight_id: StringBuilder::new(),
            icao24: StringBuilder::new(),
            callsign: StringBuilder::new(),
            time: TimestampMicrosecondBuilder::new(),
            latitude: Float64Builder::new(),
            longitude: Float64Builder::new(),
            altitude: Float64Builder::new(),
            groundspeed: Float64Builder::new(),
            heading: Float64Builder::new(),
            vertical_rate: Float64Builder::new(),
            aircraft_type: StringBuilder::new(),
            wingspan: Float64Builder::new(),
            gap_flag: BooleanBuilder::new(),
        }
    }

    fn append(&mut self, p: &TrajectoryPoint) {
        self.flight_id.append_value(&p.flight_id);
        self.icao24.append_option(p.icao24.as_deref());
        self.callsign.append_option(p.callsign.as_deref());
        self.time.append_value(p.time.timestamp_micros());
        self.latitude.append_value(p.latitude);
        self.longitude.append_value(p.longitude);
        self.altitude.append_value(p.altitude_ft);
        self.groundspeed.append_value(p.groundspeed);
        self.heading.append_value(p.heading);
        self.vertical_rate.append_option(p.vertical_rate);
        self.aircraft_type.append_option(p.aircraft_type.as_deref());
        self.wingspan.append_option(p.wingspan);
        self.gap_flag.append_value(p.gap_flag);
    }

    fn finish(mut self) -> Vec<ArrayRef> {
        vec![
            Arc::new(self.flight_id.finish()) as ArrayRef,
            Arc::new(self.icao24.finish()),
            Arc::new(self.callsign.finish()),
            Arc::new(self.time.finish()),
            Arc::new(self.latitude.finish()),
            Arc::new(self.longitude.finish()),
            Arc::new(self.altitude.finish()),
            Arc::new(self.groundspeed.finish()),
            Arc::new(self.heading.finish()),
            Arc::new(self.vertical_rate.finish()),
            Arc::new(self.aircraft_type.finish()),
            Arc::new(self.wingspan.finish()),
            Arc::new(self.gap_flag.finish()),
        ]
    }
}

struct AirspeedBuilders {
    traj: TrajBuilders,
    pressure_hpa: Float64Builder,
    u_wind: Float64Builder,
    v_wind: Float64Builder,
    heading_rad: Float64Builder,
    gs_x: Float64Builder,
    gs_y: Float64Builder,
    true_airspeed: Float64Builder,
}

impl AirspeedBuilders {
    fn new() -> Self {
        Self {
            traj: TrajBuilders::new(),
            pressure_hpa: Float64Builder::new(),
            u_wind: Float64Builder::new(),
            v_wind: Float64Builder::new(),
            heading_rad: Float64Builder::new(),
            gs_x: Float64Builder::new(),
            gs_y: Float64Builder::new(),
            true_airspeed: Float64Builder::new(),
        }
    }

    fn append(&mut self, p: &AirspeedPoint) {
        self.traj.append(&p.base);
        self.pressure_hpa.append_value(p.pressure_hpa);
        self.u_wind.append_value(p.u_wind);
        self.v_wind.append_value(p.v_wind);
        self.heading_rad.append_value(p.heading_rad);
        self.gs_x.append_value(p.gs_x);
        self.gs_y.append_value(p.gs_y);
        self.true_airspeed.append_value(p.true_airspeed);
    }

    fn finish(mut self) -> Vec<ArrayRef> {
        let mut cols = self.traj.finish();
        cols.extend([
            Arc::new(self.pressure_hpa.finish()) as ArrayRef,
            Arc::new(self.u_wind.finish()),
            Arc::new(self.v_wind.finish()),
            Arc::new(self.heading_rad.finish()),
            Arc::new(self.gs_x.finish()),
            Arc::new(self.gs_y.finish()),
            Arc::new(self.true_airspeed.finish()),
        ]);
        cols
    }
}

struct PerformanceBuilders {
    air: AirspeedBuilders,
    air_temperature: Float64Builder,
    air_pressure: Float64Builder,
    mach_number: Float64Builder,
    engine_efficiency: Float64Builder,
    fuel_flow: Float64Builder,
    aircraft_mass: Float64Builder,
    thrust: Float64Builder,
}

impl PerformanceBuilders {
    fn new() -> Self {
        Self {
            air: AirspeedBuilders::new(),
            air_temperature: Float64Builder::new(),
            air_pressure: Float64Builder::new(),
            mach_number: Float64Builder::new(),
            engine_efficiency: Float64Builder::new(),
            fuel_flow: Float64Builder::new(),
            aircraft_mass: Float64Builder::new(),
            thrust: Float64Builder::new(),
        }
    }

    fn append(&mut self, p: &PerformancePoint) {
        self.air.append(&p.base);
        self.air_temperature.append_value(p.air_temperature);
        self.air_pressure.append_value(p.air_pressure);
        self.mach_number.append_value(p.mach_number);
        self.engine_efficiency.append_value(p.engine_efficiency);
        self.fuel_flow.append_value(p.fuel_flow);
        self.aircraft_mass.append_value(p.aircraft_mass);
        self.thrust.append_value(p.thrust);
    }

    fn finish(mut self) -> Vec<ArrayRef> {
        let mut cols = self.air.finish();
        cols.extend([
            Arc::new(self.air_temperature.finish()) as ArrayRef,
            Arc::new(self.air_pressure.finish()),
            Arc::new(self.mach_number.finish()),
            Arc::new(self.engine_efficiency.finish()),
            Arc::new(self.fuel_flow.finish()),
            Arc::new(self.aircraft_mass.finish()),
            Arc::new(self.thrust.finish()),
        ]);
        cols
    }
}

// --- per-stage decode helpers ---

fn traj_from_batch(batch: &RecordBatch) -> Result<Vec<TrajectoryPoint>> {
    let flight_id = str_col(batch, col::FLIGHT_ID)?;
    let icao24 = str_col(batch, col::ICAO24)?;
    let callsign = str_col(batch, col::CALLSIGN)?;
    let time = time_col(batch, col::TIME)?;
    let latitude = f64_col(batch, col::LATITUDE)?;
    let longitude = f64_col(batch, col::LONGITUDE)?;
    let altitude = f64_col(batch, col::ALTITUDE)?;
    let groundspeed = f64_col(batch, col::GROUNDSPEED)?;
    let heading = f64_col(batch, col::HEADING)?;
    let vertical_rate = f64_col(batch, col::VERTICAL_RATE)?;
    let aircraft_type = str_col(batch, col::AIRCRAFT_TYPE)?;
    let wingspan = f64_col(batch, col::WINGSPAN)?;
    let gap_flag = bool_col(batch, col::GAP_FLAG)?;

    let mut rows = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        rows.push(TrajectoryPoint {
            flight_id: flight_id.value(i).to_string(),
            icao24: opt_str(icao24, i),
            callsign: opt_str(callsign, i),
            time: decode_time(col::TIME, i, time.value(i))?,
            latitude: latitude.value(i),
            longitude: longitude.value(i),
            altitude_ft: altitude.value(i),
            groundspeed: groundspeed.value(i),
            heading: heading.value(i),
            vertical_rate: opt_f64(vertical_rate, i),
            aircraft_type: opt_str(aircraft_type, i),
            wingspan: opt_f64(wingspan, i),
            gap_flag: gap_flag.value(i),
        });
    }
    Ok(rows)
}

fn airspeed_from_batch(batch: &RecordBatch) -> Result<Vec<AirspeedPoint>> {
    let base = traj_from_batch(batch)?;
    let pressure_hpa = f64_col(batch, col::PRESSURE_HPA)?;
    let u_wind = f64_col(batch, col::U_WIND)?;
    let v_wind = f64_col(batch, col::V_WIND)?;
    let heading_rad = f64_col(batch, col::HEADING_RAD)?;
    let gs_x = f64_col(batch, col::GS_X)?;
    let gs_y = f64_col(batch, col::GS_Y)?;
    let true_airspeed = f64_col(batch, col::TRUE_AIRSPEED)?;

    Ok(base
        .into_iter()
        .enumerate()
        .map(|(i, base)| AirspeedPoint {
            base,
            pressure_hpa: pressure_hpa.value(i),
            u_wind: u_wind.value(i),
            v_wind: v_wind.value(i),
            heading_rad: heading_rad.value(i),
            gs_x: gs_x.value(i),
            gs_y: gs_y.value(i),
            true_airspeed: true_airspeed.value(i),
        })
        .collect())
}

fn performance_from_batch(batch: &RecordBatch) -> Result<Vec<PerformancePoint>> {
    let base = airspeed_from_batch(batch)?;
    let air_temperature = f64_col(batch, col::AIR_TEMPERATURE)?;
    let air_pressure = f64_col(batch, col::AIR_PRESSURE)?;
    let mach_number = f64_col(batch, col::MACH_NUMBER)?;
    let engine_efficiency = f64_col(batch, col::ENGINE_EFFICIENCY)?;
    let fuel_flow = f64_col(batch, col::FUEL_FLOW)?;
    let aircraft_mass = f64_col(batch, col::AIRCRAFT_MASS)?;
    let thrust = f64_col(batch, col::THRUST)?;

    Ok(base
        .into_iter()
        .enumerate()
        .map(|(i, base)| PerformancePoint {
            base,
            air_temperature: air_temperature.value(i),
            air_pressure: air_pressure.value(i),
            mach_number: mach_number.value(i),
            engine_efficiency: engine_efficiency.value(i),
            fuel_flow: fuel_flow.value(i),
            aircraft_mass: aircraft_mass.value(i),
            thrust: thrust.value(i),
        })
        .collect())
}

// --- trait impls ---

impl TableRecord for TrajectoryPoint {
    fn schema() -> SchemaRef {
        schema::trajectory_schema()
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let mut b = TrajBuilders::new();
        for row in rows {
            b.append(row);
        }
        Ok(RecordBatch::try_new(Self::schema(), b.finish())?)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        traj_from_batch(batch)
    }
}

impl TableRecord for AirspeedPoint {
    fn schema() -> SchemaRef {
        schema::airspeed_schema()
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let mut b = AirspeedBuilders::new();
        for row in rows {
            b.append(row);
        }
        Ok(RecordBatch::try_new(Self::schema(), b.finish())?)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        airspeed_from_batch(batch)
    }
}

impl TableRecord for PerformancePoint {
    fn schema() -> SchemaRef {
        schema::performance_schema()
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let mut b = PerformanceBuilders::new();
        for row in rows {
            b.append(row);
        }
        Ok(RecordBatch::try_new(Self::schema(), b.finish())?)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        performance_from_batch(batch)
    }
}

impl TableRecord for SimulationPoint {
    fn schema() -> SchemaRef {
        schema::simulation_schema()
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let mut perf = PerformanceBuilders::new();
        let mut sac = BooleanBuilder::new();
        let mut t_critical = Float64Builder::new();
        let mut rh_critical = Float64Builder::new();
        let mut g_factor = Float64Builder::new();
        let mut rhi = Float64Builder::new();
        let mut persistent = BooleanBuilder::new();
        let mut ef_per_m = Float64Builder::new();
        let mut contrail_flag = BooleanBuilder::new();

        for row in rows {
            perf.append(&row.base);
            sac.append_value(row.sac);
            t_critical.append_value(row.t_critical);
            rh_critical.append_value(row.rh_critical);
            g_factor.append_value(row.g_factor);
            rhi.append_value(row.rhi);
            persistent.append_value(row.persistent);
            ef_per_m.append_value(row.ef_per_m);
            contrail_flag.append_value(row.contrail_flag);
        }

        let mut cols = perf.finish();
        cols.extend([
            Arc::new(sac.finish()) as ArrayRef,
            Arc::new(t_critical.finish()),
            Arc::new(rh_critical.finish()),
            Arc::new(g_factor.finish()),
            Arc::new(rhi.finish()),
            Arc::new(persistent.finish()),
            Arc::new(ef_per_m.finish()),
            Arc::new(contrail_flag.finish()),
        ]);
        Ok(RecordBatch::try_new(Self::schema(), cols)?)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let base = performance_from_batch(batch)?;
        let sac = bool_col(batch, col::SAC)?;
        let t_critical = f64_col(batch, col::T_CRITICAL)?;
        let rh_critical = f64_col(batch, col::RH_CRITICAL)?;
        let g_factor = f64_col(batch, col::G_FACTOR)?;
        let rhi = f64_col(batch, col::RHI)?;
        let persistent = bool_col(batch, col::PERSISTENT)?;
        let ef_per_m = f64_col(batch, col::EF_PER_M)?;
        let contrail_flag = bool_col(batch, col::CONTRAIL_FLAG)?;

        Ok(base
            .into_iter()
            .enumerate()
            .map(|(i, base)| SimulationPoint {
                base,
                sac: sac.value(i),
                t_critical: t_critical.value(i),
                rh_critical: rh_critical.value(i),
                g_factor: g_factor.value(i),
                rhi: rhi.value(i),
                persistent: persistent.value(i),
                ef_per_m: ef_per_m.value(i),
                contrail_flag: contrail_flag.value(i),
            })
            .collect())
    }
}

impl TableRecord for FlightSummaryRow {
    fn schema() -> SchemaRef {
        schema::summary_schema()
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let mut flight_id = StringBuilder::new();
        let mut waypoints = Int64Builder::new();
        let mut contrail_waypoints = Int64Builder::new();
        let mut persistent_waypoints = Int64Builder::new();
        let mut total_ef = Float64Builder::new();
        let mut mean_rhi = Float64Builder::new();
        let mut status = StringBuilder::new();

        for row in rows {
            flight_id.append_value(&row.flight_id);
            waypoints.append_value(row.waypoints);
            contrail_waypoints.append_value(row.contrail_waypoints);
            persistent_waypoints.append_value(row.persistent_waypoints);
            total_ef.append_value(row.total_ef);
            mean_rhi.append_value(row.mean_rhi);
            status.append_value(&row.status);
        }

        Ok(RecordBatch::try_new(
            Self::schema(),
            vec![
                Arc::new(flight_id.finish()) as ArrayRef,
                Arc::new(waypoints.finish()),
                Arc::new(contrail_waypoints.finish()),
                Arc::new(persistent_waypoints.finish()),
                Arc::new(total_ef.finish()),
                Arc::new(mean_rhi.finish()),
                Arc::new(status.finish()),
            ],
        )?)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let flight_id = str_col(batch, col::FLIGHT_ID)?;
        let waypoints = i64_col(batch, "waypoints")?;
        let contrail_waypoints = i64_col(batch, "contrail_waypoints")?;
        let persistent_waypoints = i64_col(batch, "persistent_waypoints")?;
        let total_ef = f64_col(batch, "total_ef")?;
        let mean_rhi = f64_col(batch, "mean_rhi")?;
        let status = str_col(batch, "status")?;

        let mut rows = Vec::with_capacity(batch.num_rows());
        for i in 0..batch.num_rows() {
            rows.push(FlightSummaryRow {
                flight_id: flight_id.value(i).to_string(),
                waypoints: waypoints.value(i),
                contrail_waypoints: contrail_waypoints.value(i),
                persistent_waypoints: persistent_waypoints.value(i),
                total_ef: total_ef.value(i),
                mean_rhi: mean_rhi.value(i),
                status: status.value(i).to_string(),
            });
        }
        Ok(rows)
    }
}
