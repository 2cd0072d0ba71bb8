//! Semantic validation of a resolved pipeline config.
//!
//! Validation runs once at resolution time so every stage can trust the
//! config it receives.

use ct_common::{Error, Result};

use crate::fuel::FuelScenario;
use crate::pipeline::PipelineConfig;

/// Validate a resolved config, returning the first violation found.
pub fn validate(config: &PipelineConfig) -> Result<()> {
    let w = &config.met.window;
    if w.end <= w.start {
        return Err(Error::Config(format!(
            "met window end ({}) must be after start ({})",
            w.end, w.start
        )));
    }

    let b = &config.met.bbox;
    if b.lat_min >= b.lat_max || !(-90.0..=90.0).contains(&b.lat_min) || !(-90.0..=90.0).contains(&b.lat_max)
    {
        return Err(Error::Config(format!(
            "invalid latitude range [{}, {}]",
            b.lat_min, b.lat_max
        )));
    }
    if b.lon_min >= b.lon_max
        || !(-180.0..=180.0).contains(&b.lon_min)
        || !(-180.0..=180.0).contains(&b.lon_max)
    {
        return Err(Error::Config(format!(
            "invalid longitude range [{}, {}]",
            b.lon_min, b.lon_max
        )));
    }

    if config.met.pressure_levels.is_empty() {
        return Err(Error::Config("pressure_levels must not be empty".into()));
    }
    if !config
        .met
        .pressure_levels
        .windows(2)
        .all(|w| w[0] > w[1])
    {
        return Err(Error::Config(
            "pressure_levels must be strictly descending [hPa]".into(),
        ));
    }
    if config.met.variables.is_empty() {
        return Err(Error::Config("met variable list must not be empty".into()));
    }
    if config.met.grid_step <= 0.0 {
        return Err(Error::Config(format!(
            "grid_step must be positive, got {}",
            config.met.grid_step
        )));
    }

    if let FuelScenario::SafBlend { pct_blend } = config.simulation.fuel {
        if !(0.0..=100.0).contains(&pct_blend) {
            return Err(Error::Config(format!(
                "SAF blend percentage must be within [0, 100], got {pct_blend}"
            )));
        }
    }
    if !(0.0..=1.5).contains(&config.simulation.rhi_adj) {
        return Err(Error::Config(format!(
            "rhi_adj out of plausible range: {}",
            config.simulation.rhi_adj
        )));
    }

    if config.max_retries == 0 {
        return Err(Error::Config("max_retries must be at least 1".into()));
    }

    Ok(())
}
