//! Stage manifests.
//!
//! Every stage finishes by writing a manifest: a structured record of the
//! artifacts it produced (path, SHA-256, row count) plus a pointer to the
//! manifest of the stage it consumed. Downstream stages locate their inputs
//! through the manifest only, never by guessing file names.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use ct_common::schema::SCHEMA_VERSION;
use ct_common::StageName;

use crate::error::{Result, StoreError};

/// One produced artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    /// Logical name, e.g. "airspeed" or "cocip_summary".
    pub name: String,
    pub path: PathBuf,
    pub sha256: String,
    pub rows: u64,
}

/// Manifest written by one stage of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageManifest {
    pub schema_version: String,
    pub run_id: String,
    pub stage: StageName,
    pub created_at: DateTime<Utc>,
    /// Manifest of the upstream stage this one consumed, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_manifest: Option<PathBuf>,
    pub artifacts: Vec<ArtifactEntry>,
    /// Free-form stage notes, e.g. per-variable missing-value counts from
    /// the met fetch.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub notes: BTreeMap<String, String>,
}

impl StageManifest {
    pub fn new(run_id: &str, stage: StageName) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            run_id: run_id.to_string(),
            stage,
            created_at: Utc::now(),
            input_manifest: None,
            artifacts: Vec::new(),
            notes: BTreeMap::new(),
        }
    }

    pub fn with_input(mut self, input_manifest: &Path) -> Self {
        self.input_manifest = Some(input_manifest.to_path_buf());
        self
    }

    /// Record an artifact, checksumming the file on disk.
    pub fn add_artifact(&mut self, name: &str, path: &Path, rows: u64) -> Result<()> {
        let sha256 = file_sha256(path)?;
        self.artifacts.push(ArtifactEntry {
            name: name.to_string(),
            path: path.to_path_buf(),
            sha256,
            rows,
        });
        Ok(())
    }

    pub fn note(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.notes.insert(key.into(), value.into());
    }

    /// Look up an artifact by logical name.
    pub fn artifact(&self, name: &str) -> Option<&ArtifactEntry> {
        self.artifacts.iter().find(|a| a.name == name)
    }

    /// Persist the manifest (atomically) at `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&tmp, json).map_err(|e| StoreError::Io {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, path).map_err(|e| StoreError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }

    /// Load a manifest from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(StoreError::ArtifactMissing(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(|e| StoreError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Verify every listed artifact exists and matches its checksum.
    pub fn verify(&self) -> Result<()> {
        for artifact in &self.artifacts {
            if !artifact.path.exists() {
                return Err(StoreError::ArtifactMissing(artifact.path.clone()));
            }
            let actual = file_sha256(&artifact.path)?;
            if actual != artifact.sha256 {
                return Err(StoreError::ChecksumMismatch {
                    path: artifact.path.clone(),
                    expected: artifact.sha256.clone(),
                    actual,
                });
            }
        }
        Ok(())
    }
}

/// SHA-256 of a file's contents, hex-encoded.
pub fn file_sha256(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| StoreError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}
