//! In-memory gridded fields with nearest-neighbour lookup.
//!
//! Lookup policy: nearest grid node on each axis, but only for query points
//! inside the cached extent. Points outside the extent raise a coverage
//! error naming the offending axis; a NaN at the selected node raises an
//! incomplete-data error. Neither case ever yields a silent garbage value.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use ct_common::{Error, Result};

use crate::sample::MetSample;

/// Eastward/northward wind variable names, as stored in the cache.
pub const EASTWARD_WIND: &str = "eastward_wind";
pub const NORTHWARD_WIND: &str = "northward_wind";

/// A dense grid over (time, level, latitude, longitude) per variable.
#[derive(Debug, Clone)]
pub struct MetGrid {
    /// Time axis in microseconds since epoch, ascending.
    times_us: Vec<f64>,
    levels: Vec<f64>,
    lats: Vec<f64>,
    lons: Vec<f64>,
    fields: HashMap<String, Vec<f64>>,
}

fn sorted_unique_f64(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut out: Vec<f64> = values.collect();
    out.sort_by(|a, b| a.partial_cmp(b).expect("finite axis values"));
    out.dedup();
    out
}

fn axis_index(axis: &[f64], x: f64) -> Option<usize> {
    axis.iter().position(|v| *v == x)
}

/// Nearest index on a sorted axis; `None` when the axis is empty.
fn nearest_index(axis: &[f64], x: f64) -> Option<usize> {
    if axis.is_empty() {
        return None;
    }
    let mut best = 0usize;
    let mut best_dist = f64::MAX;
    for (i, v) in axis.iter().enumerate() {
        let d = (v - x).abs();
        if d < best_dist {
            best = i;
            best_dist = d;
        }
    }
    Some(best)
}

fn check_extent(axis: &[f64], x: f64, name: &'static str) -> Result<()> {
    let (min, max) = (axis[0], axis[axis.len() - 1]);
    if x < min || x > max {
        return Err(Error::CoverageGap {
            axis: name,
            requested: format!("{x}"),
            available: format!("[{min}, {max}]"),
        });
    }
    Ok(())
}

impl MetGrid {
    /// Assemble a grid from long-format samples.
    ///
    /// Axis values are taken as exact grid coordinates; samples for the
    /// same node overwrite earlier ones. Nodes never mentioned by any
    /// sample hold NaN and are reported by [`MetGrid::missing_counts`].
    pub fn from_samples(samples: &[MetSample]) -> Result<Self> {
        if samples.is_empty() {
            return Err(Error::IncompleteData(
                "cannot build a grid from zero samples".into(),
            ));
        }
        // Values may be NaN (counted as missing nodes); coordinates may not.
        for (i, s) in samples.iter().enumerate() {
            if !s.level_hpa.is_finite() || !s.latitude.is_finite() || !s.longitude.is_finite() {
                return Err(Error::IncompleteData(format!(
                    "sample {i} for '{}' has a non-finite coordinate \
                     (level={}, lat={}, lon={})",
                    s.variable, s.level_hpa, s.latitude, s.longitude
                )));
            }
        }

        let times_us = sorted_unique_f64(
            samples.iter().map(|s| s.time.timestamp_micros() as f64),
        );
        let levels = sorted_unique_f64(samples.iter().map(|s| s.level_hpa));
        let lats = sorted_unique_f64(samples.iter().map(|s| s.latitude));
        let lons = sorted_unique_f64(samples.iter().map(|s| s.longitude));

        let cell_count = times_us.len() * levels.len() * lats.len() * lons.len();
        let mut fields: HashMap<String, Vec<f64>> = HashMap::new();

        for s in samples {
            let ti = axis_index(&times_us, s.time.timestamp_micros() as f64)
                .expect("time from axis construction");
            let li = axis_index(&levels, s.level_hpa).expect("level from axis construction");
            let yi = axis_index(&lats, s.latitude).expect("lat from axis construction");
            let xi = axis_index(&lons, s.longitude).expect("lon from axis construction");
            let field = fields
                .entry(s.variable.clone())
                .or_insert_with(|| vec![f64::NAN; cell_count]);
            let idx = ((ti * levels.len() + li) * lats.len() + yi) * lons.len() + xi;
            field[idx] = s.value;
        }

        Ok(Self {
            times_us,
            levels,
            lats,
            lons,
            fields,
        })
    }

    pub fn variables(&self) -> Vec<&str> {
        let mut v: Vec<&str> = self.fields.keys().map(|s| s.as_str()).collect();
        v.sort();
        v
    }

    /// NaN count per variable, for the fetch stage's quality report.
    pub fn missing_counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = self
            .fields
            .iter()
            .map(|(var, field)| (var.clone(), field.iter().filter(|v| v.is_nan()).count()))
            .collect();
        counts.sort();
        counts
    }

    /// Value of `variable` at the grid node nearest to the query point.
    pub fn value_at(
        &self,
        variable: &str,
        time: DateTime<Utc>,
        latitude: f64,
        longitude: f64,
        level_hpa: f64,
    ) -> Result<f64> {
        let field = self
            .fields
            .get(variable)
            .ok_or_else(|| Error::IncompleteData(format!("variable '{variable}' not cached")))?;

        let t = time.timestamp_micros() as f64;
        check_extent(&self.times_us, t, "time")?;
        check_extent(&self.lats, latitude, "latitude")?;
        check_extent(&self.lons, longitude, "longitude")?;
        check_extent(&self.levels, level_hpa, "level")?;

        let ti = nearest_index(&self.times_us, t).expect("non-empty axis");
        let li = nearest_index(&self.levels, level_hpa).expect("non-empty axis");
        let yi = nearest_index(&self.lats, latitude).expect("non-empty axis");
        let xi = nearest_index(&self.lons, longitude).expect("non-empty axis");

        let idx = ((ti * self.levels.len() + li) * self.lats.len() + yi) * self.lons.len() + xi;
        let value = field[idx];
        if value.is_nan() {
            return Err(Error::IncompleteData(format!(
                "'{variable}' missing at nearest node (t={time}, lat={latitude}, \
                 lon={longitude}, level={level_hpa} hPa)"
            )));
        }
        Ok(value)
    }

    /// Wind vector (u, v) [m/s] at the query point.
    pub fn wind_at(
        &self,
        time: DateTime<Utc>,
        latitude: f64,
        longitude: f64,
        level_hpa: f64,
    ) -> Result<(f64, f64)> {
        let u = self.value_at(EASTWARD_WIND, time, latitude, longitude, level_hpa)?;
        let v = self.value_at(NORTHWARD_WIND, time, latitude, longitude, level_hpa)?;
        Ok((u, v))
    }
}
