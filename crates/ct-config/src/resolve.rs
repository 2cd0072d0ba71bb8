//! Config resolution: CLI overrides -> environment -> TOML file -> defaults.
//!
//! Credentials for the upstream climate-data service come from the
//! environment only; they are never read from, nor written to, the config
//! file.

use std::path::{Path, PathBuf};

use ct_common::{Error, Result};

use crate::fuel::FuelScenario;
use crate::pipeline::{Credentials, PipelineConfig};

/// Environment variable holding the CDS endpoint URL.
pub const ENV_CDS_API_URL: &str = "CDS_API_URL";
/// Environment variable holding the CDS API key.
pub const ENV_CDS_API_KEY: &str = "CDS_API_KEY";
/// Optional override for the data root.
pub const ENV_DATA_ROOT: &str = "CONTRAIL_PIPELINE_DATA";

/// CLI-level overrides applied on top of the loaded file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub data_root: Option<PathBuf>,
    pub fuel: Option<FuelScenario>,
}

/// Load and resolve a pipeline config.
///
/// Order of precedence, highest first:
/// 1. explicit CLI overrides
/// 2. environment (`CONTRAIL_PIPELINE_DATA`, credentials)
/// 3. the TOML config file
/// 4. built-in defaults (already baked into serde defaults)
pub fn resolve_config(config_path: &Path, overrides: &ConfigOverrides) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(config_path).map_err(|e| Error::InvalidConfigFile {
        path: config_path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut config: PipelineConfig =
        toml::from_str(&content).map_err(|e| Error::InvalidConfigFile {
            path: config_path.to_path_buf(),
            reason: e.to_string(),
        })?;

    if let Ok(root) = std::env::var(ENV_DATA_ROOT) {
        config.data_root = PathBuf::from(root);
    }
    if let Some(root) = &overrides.data_root {
        config.data_root = root.clone();
    }
    if let Some(fuel) = overrides.fuel {
        config.simulation.fuel = fuel;
    }

    config.credentials = credentials_from_env();

    crate::validate::validate(&config)?;
    Ok(config)
}

/// Read CDS credentials from the environment, if both halves are present.
pub fn credentials_from_env() -> Option<Credentials> {
    let api_url = std::env::var(ENV_CDS_API_URL).ok()?;
    let api_key = std::env::var(ENV_CDS_API_KEY).ok()?;
    if api_url.is_empty() || api_key.is_empty() {
        return None;
    }
    Some(Credentials { api_url, api_key })
}

/// Credentials are mandatory for stages that talk to the upstream service.
pub fn require_credentials(config: &PipelineConfig) -> Result<&Credentials> {
    config
        .credentials
        .as_ref()
        .ok_or(Error::MissingCredential(ENV_CDS_API_KEY))
}

/// Default config file location (`$XDG_CONFIG_HOME/contrail-pipeline/
/// pipeline.toml` or the platform equivalent).
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("contrail-pipeline")
        .join("pipeline.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const MINIMAL: &str = r#"
        data_root = "/tmp/ct-data"

        [met.window]
        start = "2025-01-01T00:00:00Z"
        end = "2025-01-09T00:00:00Z"

        [met.bbox]
        lat_min = 30.0
        lat_max = 40.0
        lon_min = -125.0
        lon_max = -115.0
    "#;

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("pipeline.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_resolve_minimal() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, MINIMAL);
        let cfg = resolve_config(&path, &ConfigOverrides::default()).unwrap();
        assert_eq!(cfg.data_root, PathBuf::from("/tmp/ct-data"));
    }

    #[test]
    fn test_cli_override_wins() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, MINIMAL);
        let overrides = ConfigOverrides {
            data_root: Some(tmp.path().join("other")),
            fuel: Some(FuelScenario::SafBlend { pct_blend: 45.0 }),
        };
        let cfg = resolve_config(&path, &overrides).unwrap();
        assert_eq!(cfg.data_root, tmp.path().join("other"));
        assert_eq!(
            cfg.simulation.fuel,
            FuelScenario::SafBlend { pct_blend: 45.0 }
        );
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = resolve_config(Path::new("/nonexistent/x.toml"), &ConfigOverrides::default())
            .unwrap_err();
        assert_eq!(err.code(), 11);
    }

    #[test]
    fn test_require_credentials_absent() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, MINIMAL);
        let mut cfg = resolve_config(&path, &ConfigOverrides::default()).unwrap();
        cfg.credentials = None;
        assert!(require_credentials(&cfg).is_err());
    }
}
