//! Idempotent on-disk met cache.
//!
//! Layout: `<cache_dir>/<cache_key>/` holding `request.json` (the exact
//! request the entry satisfies) and `samples.parquet`. A satisfied request
//! is served from disk without touching the provider; that property is what
//! makes the fetch stage safely re-runnable.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use ct_common::{Error, Result};

use crate::provider::MetProvider;
use crate::request::MetRequest;
use crate::retry::{with_backoff, BackoffPolicy};
use crate::sample::MetSample;

const REQUEST_FILE: &str = "request.json";
const SAMPLES_FILE: &str = "samples.parquet";

/// On-disk cache of met retrievals.
#[derive(Debug, Clone)]
pub struct MetCache {
    dir: PathBuf,
}

/// Outcome of a cache access, for logging and manifest notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Fetched,
}

impl MetCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entry_dir(&self, request: &MetRequest) -> PathBuf {
        self.dir.join(request.cache_key())
    }

    /// Path of the samples table for a request, if the entry exists.
    pub fn samples_path(&self, request: &MetRequest) -> PathBuf {
        self.entry_dir(request).join(SAMPLES_FILE)
    }

    /// Whether the cache already satisfies `request`.
    pub fn contains(&self, request: &MetRequest) -> bool {
        self.samples_path(request).exists()
    }

    /// Return cached samples, fetching (with bounded retry) only on a miss.
    pub fn open_or_fetch(
        &self,
        request: &MetRequest,
        provider: &dyn MetProvider,
        backoff: BackoffPolicy,
    ) -> Result<(Vec<MetSample>, CacheOutcome)> {
        let entry = self.entry_dir(request);
        let samples_path = entry.join(SAMPLES_FILE);

        if samples_path.exists() {
            debug!(key = %request.cache_key(), "met cache hit");
            let samples = ct_store::read_parquet::<MetSample>(&samples_path)
                .map_err(ct_common::Error::from)?;
            return Ok((samples, CacheOutcome::Hit));
        }

        info!(
            key = %request.cache_key(),
            provider = provider.name(),
            "met cache miss, fetching"
        );
        let samples = with_backoff(backoff, "met fetch", || provider.fetch(request))?;

        std::fs::create_dir_all(&entry)?;
        ct_store::write_parquet(&samples_path, &samples).map_err(ct_common::Error::from)?;
        let request_json = serde_json::to_string_pretty(request)?;
        std::fs::write(entry.join(REQUEST_FILE), request_json)?;
        Ok((samples, CacheOutcome::Fetched))
    }

    /// Load the cached samples for a request without any fetch fallback.
    ///
    /// Used by downstream stages, which must fail with a missing-input
    /// error if the fetch stage has not run.
    pub fn open(&self, request: &MetRequest) -> Result<Vec<MetSample>> {
        let path = self.samples_path(request);
        if !path.exists() {
            return Err(Error::MissingArtifact { path });
        }
        ct_store::read_parquet::<MetSample>(&path).map_err(ct_common::Error::from)
    }

    /// List the cache keys currently on disk.
    pub fn keys(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.path().join(SAMPLES_FILE).exists() {
                keys.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        keys.sort();
        Ok(keys)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
