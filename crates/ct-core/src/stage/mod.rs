//! Stage implementations and the context they share.
//!
//! Every stage follows the same contract: locate inputs through the
//! upstream stage's manifest, validate before computing, write outputs
//! atomically, and finish by writing its own manifest.

pub mod airspeed;
pub mod met_fetch;
pub mod performance;
pub mod simulate;

#[cfg(test)]
pub(crate) mod test_support;

use std::ops::Range;
use std::time::Duration;

use arrow::datatypes::SchemaRef;

use ct_common::{Error, Result, RunId, StageName};
use ct_config::PipelineConfig;
use ct_met::BackoffPolicy;
use ct_store::{DataLayout, StageManifest};

/// Everything a stage needs to run.
pub struct StageContext<'a> {
    pub config: &'a PipelineConfig,
    pub layout: DataLayout,
    pub run_id: RunId,
}

impl<'a> StageContext<'a> {
    pub fn new(config: &'a PipelineConfig, run_id: RunId) -> Self {
        let layout = DataLayout::new(&config.data_root);
        Self {
            config,
            layout,
            run_id,
        }
    }

    /// Retry policy for upstream requests, from the config.
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            self.config.max_retries,
            Duration::from_secs(self.config.initial_backoff_secs),
        )
    }

    /// Load the manifest of the stage upstream of `stage`.
    pub fn upstream_manifest(&self, stage: StageName) -> Result<StageManifest> {
        let upstream = stage.upstream().ok_or_else(|| Error::StageBlocked {
            stage: stage.to_string(),
            reason: "stage has no upstream".into(),
        })?;
        let path = self.layout.manifest_path(self.run_id.as_str(), upstream);
        if !path.exists() {
            return Err(Error::MissingManifest {
                stage: upstream.to_string(),
                path,
            });
        }
        StageManifest::load(&path).map_err(Error::from)
    }

    /// Write `manifest` at the stage's canonical manifest path.
    pub fn save_manifest(&self, manifest: &StageManifest) -> Result<()> {
        let path = self.layout.manifest_path(self.run_id.as_str(), manifest.stage);
        manifest.save(&path).map_err(Error::from)
    }
}

/// Reject a table whose schema lacks any of the required columns, naming
/// all of them at once.
pub fn check_columns(schema: &SchemaRef, required: &[&str], table: &str) -> Result<()> {
    let missing: Vec<String> = required
        .iter()
        .filter(|name| schema.field_with_name(name).is_err())
        .map(|name| name.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::MissingColumns {
            table: table.to_string(),
            columns: missing,
        })
    }
}

/// Contiguous per-flight ranges of a table sorted by flight ID.
pub fn flight_ranges<T>(rows: &[T], flight_id: impl Fn(&T) -> &str) -> Vec<(String, Range<usize>)> {
    let mut ranges = Vec::new();
    let mut start = 0;
    for i in 1..=rows.len() {
        if i == rows.len() || flight_id(&rows[i]) != flight_id(&rows[start]) {
            ranges.push((flight_id(&rows[start]).to_string(), start..i));
            start = i;
        }
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    #[test]
    fn test_check_columns_names_all_missing() {
        let schema: SchemaRef = Arc::new(Schema::new(vec![Field::new(
            "flight_id",
            DataType::Utf8,
            false,
        )]));
        let err = check_columns(&schema, &["flight_id", "time", "altitude"], "airspeed")
            .unwrap_err();
        match err {
            Error::MissingColumns { table, columns } => {
                assert_eq!(table, "airspeed");
                assert_eq!(columns, vec!["time", "altitude"]);
            }
            other => panic!("expected missing columns, got {other}"),
        }
    }

    #[test]
    fn test_flight_ranges_contiguous() {
        let rows = ["A", "A", "B", "C", "C", "C"];
        let ranges = flight_ranges(&rows, |r| r);
        assert_eq!(
            ranges,
            vec![
                ("A".to_string(), 0..2),
                ("B".to_string(), 2..3),
                ("C".to_string(), 3..6),
            ]
        );
    }

    #[test]
    fn test_flight_ranges_empty() {
        let rows: [&str; 0] = [];
        assert!(flight_ranges(&rows, |r| *r).is_empty());
    }
}
