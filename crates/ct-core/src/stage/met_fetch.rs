//! Stage 1: fetch and cache meteorology.
//!
//! Two retrievals per run: pressure-level fields for the contrail model and
//! single-level radiation fields. Both go through the content-addressed
//! cache, so re-running a satisfied request touches the provider zero
//! times. The manifest records, per request, whether it was a hit or a
//! fetch, plus per-variable missing-value counts for the quality report.

use tracing::info;

use ct_common::{Result, StageName};
use ct_met::{CacheOutcome, MetCache, MetGrid, MetProvider, MetRequest};
use ct_store::StageManifest;

use super::StageContext;

/// Run the met fetch stage, returning its manifest.
pub fn run(ctx: &StageContext, provider: &dyn MetProvider) -> Result<StageManifest> {
    let cache = MetCache::new(ctx.layout.met_cache_dir());
    let mut manifest = StageManifest::new(ctx.run_id.as_str(), StageName::FetchMet);

    let pressure = MetRequest::pressure_levels(&ctx.config.met);
    fetch_one(ctx, &cache, provider, &pressure, "met_pressure_levels", &mut manifest)?;

    if !ctx.config.met.rad_variables.is_empty() {
        let rad = MetRequest::single_level(&ctx.config.met);
        fetch_one(ctx, &cache, provider, &rad, "met_single_levels", &mut manifest)?;
    }

    ctx.save_manifest(&manifest)?;
    Ok(manifest)
}

fn fetch_one(
    ctx: &StageContext,
    cache: &MetCache,
    provider: &dyn MetProvider,
    request: &MetRequest,
    name: &str,
    manifest: &mut StageManifest,
) -> Result<()> {
    let (samples, outcome) = cache.open_or_fetch(request, provider, ctx.backoff())?;
    let samples_path = cache.samples_path(request);
    manifest.add_artifact(name, &samples_path, samples.len() as u64)?;
    manifest.note(
        format!("{name}.cache"),
        match outcome {
            CacheOutcome::Hit => "hit",
            CacheOutcome::Fetched => "fetched",
        },
    );
    manifest.note(format!("{name}.key"), request.cache_key());

    // Per-variable missing-value counts. Missing nodes are tolerated here;
    // a lookup that lands on one fails loudly downstream.
    let grid = MetGrid::from_samples(&samples)?;
    for (variable, missing) in grid.missing_counts() {
        if missing > 0 {
            manifest.note(format!("{name}.missing.{variable}"), missing.to_string());
        }
    }

    info!(
        name,
        samples = samples.len(),
        outcome = ?outcome,
        "met request satisfied"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::test_support::{synthetic_provider, test_config};
    use ct_common::RunId;
    use tempfile::TempDir;

    #[test]
    fn test_fetch_writes_manifest_with_both_requests() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());
        let ctx = StageContext::new(&config, RunId::from_existing("run-t"));
        let provider = synthetic_provider();

        let manifest = run(&ctx, &provider).unwrap();
        assert!(manifest.artifact("met_pressure_levels").is_some());
        assert!(manifest.artifact("met_single_levels").is_some());
        assert_eq!(manifest.notes["met_pressure_levels.cache"], "fetched");
    }

    #[test]
    fn test_second_run_is_all_hits() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(tmp.path());
        let ctx = StageContext::new(&config, RunId::from_existing("run-t"));
        let provider = synthetic_provider();

        run(&ctx, &provider).unwrap();
        let first_calls = provider.calls();
        let manifest = run(&ctx, &provider).unwrap();
        assert_eq!(provider.calls(), first_calls, "hit must not call provider");
        assert_eq!(manifest.notes["met_pressure_levels.cache"], "hit");
    }
}
