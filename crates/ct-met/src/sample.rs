//! The long-format met sample table stored in the cache.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, Float64Array, Float64Builder, RecordBatch, StringArray, StringBuilder,
    TimestampMicrosecondArray, TimestampMicrosecondBuilder,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ct_store::{StoreError, TableRecord};

/// One gridded value: (variable, time, level, lat, lon) -> value.
///
/// Missing upstream values are carried as NaN so they can be counted and
/// reported; lookups that land on a NaN fail loudly instead of passing the
/// value through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetSample {
    pub variable: String,
    pub time: DateTime<Utc>,
    /// Pressure level [hPa]; 0.0 for single-level fields.
    pub level_hpa: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub value: f64,
}

impl TableRecord for MetSample {
    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("variable", DataType::Utf8, false),
            Field::new(
                "time",
                DataType::Timestamp(TimeUnit::Microsecond, None),
                false,
            ),
            Field::new("level_hpa", DataType::Float64, false),
            Field::new("latitude", DataType::Float64, false),
            Field::new("longitude", DataType::Float64, false),
            Field::new("value", DataType::Float64, false),
        ]))
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch, StoreError> {
        let mut variable = StringBuilder::new();
        let mut time = TimestampMicrosecondBuilder::new();
        let mut level = Float64Builder::new();
        let mut latitude = Float64Builder::new();
        let mut longitude = Float64Builder::new();
        let mut value = Float64Builder::new();

        for row in rows {
            variable.append_value(&row.variable);
            time.append_value(row.time.timestamp_micros());
            level.append_value(row.level_hpa);
            latitude.append_value(row.latitude);
            longitude.append_value(row.longitude);
            value.append_value(row.value);
        }

        Ok(RecordBatch::try_new(
            Self::schema(),
            vec![
                Arc::new(variable.finish()) as ArrayRef,
                Arc::new(time.finish()),
                Arc::new(level.finish()),
                Arc::new(latitude.finish()),
                Arc::new(longitude.finish()),
                Arc::new(value.finish()),
            ],
        )?)
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>, StoreError> {
        let get = |name: &str| {
            batch
                .column_by_name(name)
                .ok_or_else(|| StoreError::MissingColumn(name.to_string()))
        };
        let variable = get("variable")?
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or(StoreError::ColumnType {
                column: "variable".into(),
                expected: "Utf8",
            })?;
        let time = get("time")?
            .as_any()
            .downcast_ref::<TimestampMicrosecondArray>()
            .ok_or(StoreError::ColumnType {
                column: "time".into(),
                expected: "Timestamp(Microsecond)",
            })?;
        let f64_col = |name: &'static str| -> Result<&Float64Array, StoreError> {
            get(name)?
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or(StoreError::ColumnType {
                    column: name.into(),
                    expected: "Float64",
                })
        };
        let level = f64_col("level_hpa")?;
        let latitude = f64_col("latitude")?;
        let longitude = f64_col("longitude")?;
        let value = f64_col("value")?;

        let mut rows = Vec::with_capacity(batch.num_rows());
        for i in 0..batch.num_rows() {
            let micros = time.value(i);
            let t = DateTime::from_timestamp_micros(micros).ok_or(StoreError::BadValue {
                column: "time".into(),
                row: i,
                reason: format!("timestamp out of range: {micros}"),
            })?;
            rows.push(MetSample {
                variable: variable.value(i).to_string(),
                time: t,
                level_hpa: level.value(i),
                latitude: latitude.value(i),
                longitude: longitude.value(i),
                value: value.value(i),
            });
        }
        Ok(rows)
    }
}
