//! HTTP client for the CDS climate-data service.
//!
//! Retrieval is asynchronous on the server side: a request is submitted,
//! polled until the task completes, and the result is then downloaded as a
//! long-format CSV. Authentication failures, throttling, and truncated
//! results map onto the pipeline error taxonomy so the retry layer can tell
//! what is worth retrying.

use std::io::Read;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use ct_common::{Error, Result};
use ct_config::Credentials;

use crate::provider::MetProvider;
use crate::request::MetRequest;
use crate::sample::MetSample;

const DATASET_PRESSURE_LEVELS: &str = "reanalysis-era5-pressure-levels";
const DATASET_SINGLE_LEVELS: &str = "reanalysis-era5-single-levels";

/// CDS retrieval client.
pub struct CdsClient {
    agent: ureq::Agent,
    api_url: String,
    api_key: String,
    poll_interval: Duration,
    max_polls: u32,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    request_id: String,
    state: String,
}

#[derive(Debug, Deserialize)]
struct TaskResponse {
    state: String,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    variable: String,
    time: String,
    #[serde(default)]
    level_hpa: f64,
    latitude: f64,
    longitude: f64,
    value: Option<f64>,
}

impl CdsClient {
    pub fn new(credentials: &Credentials) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(120))
            .build();
        Self {
            agent,
            api_url: credentials.api_url.trim_end_matches('/').to_string(),
            api_key: credentials.api_key.clone(),
            poll_interval: Duration::from_secs(5),
            max_polls: 360,
        }
    }

    fn dataset(request: &MetRequest) -> &'static str {
        if request.is_single_level() {
            DATASET_SINGLE_LEVELS
        } else {
            DATASET_PRESSURE_LEVELS
        }
    }

    fn auth(&self) -> String {
        format!("Bearer {}", self.api_key)
    }

    fn submit(&self, request: &MetRequest) -> Result<SubmitResponse> {
        let url = format!("{}/resources/{}", self.api_url, Self::dataset(request));
        let body = serde_json::json!({
            "variable": request.variables,
            "pressure_level": request.pressure_levels,
            "date": format!(
                "{}/{}",
                request.window.start.format("%Y-%m-%dT%H:%M:%SZ"),
                request.window.end.format("%Y-%m-%dT%H:%M:%SZ"),
            ),
            // north, west, south, east
            "area": [
                request.bbox.lat_max,
                request.bbox.lon_min,
                request.bbox.lat_min,
                request.bbox.lon_max,
            ],
            "grid": [request.grid_step, request.grid_step],
            "format": "csv",
        });

        let resp = self
            .agent
            .post(&url)
            .set("Authorization", &self.auth())
            .send_json(body)
            .map_err(map_ureq_error)?;
        let submitted: SubmitResponse = resp
            .into_json()
            .map_err(|e| Error::ExternalService(format!("bad submit response: {e}")))?;
        debug!(request_id = %submitted.request_id, state = %submitted.state, "submitted CDS request");
        Ok(submitted)
    }

    fn poll(&self, request_id: &str) -> Result<String> {
        let url = format!("{}/tasks/{}", self.api_url, request_id);
        for _ in 0..self.max_polls {
            let resp = self
                .agent
                .get(&url)
                .set("Authorization", &self.auth())
                .call()
                .map_err(map_ureq_error)?;
            let task: TaskResponse = resp
                .into_json()
                .map_err(|e| Error::ExternalService(format!("bad task response: {e}")))?;
            match task.state.as_str() {
                "completed" => {
                    return task.location.ok_or_else(|| {
                        Error::ExternalService("completed task has no result location".into())
                    });
                }
                "failed" => {
                    return Err(Error::ExternalService(format!(
                        "upstream task failed: {}",
                        task.error.unwrap_or_else(|| "no detail".into())
                    )));
                }
                _ => std::thread::sleep(self.poll_interval),
            }
        }
        Err(Error::ExternalService(format!(
            "task {request_id} did not complete within the polling budget"
        )))
    }

    fn download(&self, location: &str) -> Result<Vec<u8>> {
        let resp = self
            .agent
            .get(location)
            .set("Authorization", &self.auth())
            .call()
            .map_err(map_ureq_error)?;
        let mut bytes = Vec::new();
        resp.into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| Error::ExternalService(format!("download failed: {e}")))?;
        Ok(bytes)
    }

    fn decode(bytes: &[u8]) -> Result<Vec<MetSample>> {
        let mut reader = csv::Reader::from_reader(bytes);
        let mut samples = Vec::new();
        for row in reader.deserialize::<CsvRow>() {
            let row = row.map_err(|e| Error::IncompleteData(format!("bad result row: {e}")))?;
            let time: DateTime<Utc> = row
                .time
                .parse()
                .map_err(|e| Error::IncompleteData(format!("bad result timestamp: {e}")))?;
            samples.push(MetSample {
                variable: row.variable,
                time,
                level_hpa: row.level_hpa,
                latitude: row.latitude,
                longitude: row.longitude,
                // Missing upstream values arrive as empty cells; keep them
                // as NaN so the fetch stage can count and report them.
                value: row.value.unwrap_or(f64::NAN),
            });
        }
        Ok(samples)
    }
}

/// Reject results that do not span the requested extent.
///
/// Partial coverage must surface as an error here, not as degraded joins
/// three stages later.
pub fn check_completeness(request: &MetRequest, samples: &[MetSample]) -> Result<()> {
    if samples.is_empty() {
        return Err(Error::IncompleteData("provider returned no samples".into()));
    }
    for variable in &request.variables {
        if !samples.iter().any(|s| &s.variable == variable) {
            return Err(Error::IncompleteData(format!(
                "variable '{variable}' absent from result"
            )));
        }
    }

    let t_min = samples.iter().map(|s| s.time).min().expect("non-empty");
    let t_max = samples.iter().map(|s| s.time).max().expect("non-empty");
    if t_min > request.window.start || t_max < request.window.end {
        return Err(Error::IncompleteData(format!(
            "result spans {t_min}..{t_max}, requested {}..{}",
            request.window.start, request.window.end
        )));
    }

    let lat_min = samples.iter().map(|s| s.latitude).fold(f64::MAX, f64::min);
    let lat_max = samples.iter().map(|s| s.latitude).fold(f64::MIN, f64::max);
    let lon_min = samples.iter().map(|s| s.longitude).fold(f64::MAX, f64::min);
    let lon_max = samples.iter().map(|s| s.longitude).fold(f64::MIN, f64::max);
    let b = &request.bbox;
    // The grid only needs to reach within one step of the box edges.
    let tol = request.grid_step;
    if lat_min > b.lat_min + tol
        || lat_max < b.lat_max - tol
        || lon_min > b.lon_min + tol
        || lon_max < b.lon_max - tol
    {
        return Err(Error::IncompleteData(format!(
            "result covers lat [{lat_min}, {lat_max}] lon [{lon_min}, {lon_max}], \
             requested lat [{}, {}] lon [{}, {}]",
            b.lat_min, b.lat_max, b.lon_min, b.lon_max
        )));
    }
    Ok(())
}

impl MetProvider for CdsClient {
    fn name(&self) -> &str {
        "cds"
    }

    fn fetch(&self, request: &MetRequest) -> Result<Vec<MetSample>> {
        info!(
            dataset = Self::dataset(request),
            variables = request.variables.len(),
            levels = request.pressure_levels.len(),
            "fetching meteorology from CDS"
        );
        let submitted = self.submit(request)?;
        let location = self.poll(&submitted.request_id)?;
        let bytes = self.download(&location)?;
        let samples = Self::decode(&bytes)?;
        check_completeness(request, &samples)?;
        info!(samples = samples.len(), "CDS retrieval complete");
        Ok(samples)
    }
}

fn map_ureq_error(e: ureq::Error) -> Error {
    match e {
        ureq::Error::Status(401, _) | ureq::Error::Status(403, _) => {
            Error::Unauthorized("CDS rejected the API key".into())
        }
        ureq::Error::Status(code, resp) => Error::ExternalService(format!(
            "CDS returned {code} for {}",
            resp.get_url()
        )),
        ureq::Error::Transport(t) => Error::ExternalService(format!("transport error: {t}")),
    }
}
