//! Batch manifests: many grids averaged against one division map.
//!
//! ```yaml
//! map: maps/conus_0p125.txt
//! runs:
//!   - grid: fields/tmax_20240101.bin
//!     output: out/tmax_20240101.txt
//!     convert: k,m
//!   - grid: fields/prcp_20240101.bin
//!     output: out/prcp_20240101.txt
//!     convert: "0.0393701"
//! ```
//!
//! Relative paths resolve against the manifest's directory.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use division_aggregator::{Conversion, Pipeline, RunRequest, RunSummary};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchManifest {
    /// Shared division map; `--map` overrides it.
    #[serde(default)]
    pub map: Option<PathBuf>,
    pub runs: Vec<BatchRun>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchRun {
    pub grid: PathBuf,
    pub output: PathBuf,
    #[serde(default)]
    pub convert: Option<String>,
}

impl BatchManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read batch manifest {}", path.display()))?;
        let mut manifest = Self::from_yaml_str(&text)
            .with_context(|| format!("Invalid batch manifest {}", path.display()))?;

        if let Some(base) = path.parent() {
            manifest.resolve_relative_to(base);
        }
        Ok(manifest)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let manifest: Self = serde_yaml::from_str(text)?;
        if manifest.runs.is_empty() {
            bail!("batch manifest has no runs");
        }
        Ok(manifest)
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        if let Some(map) = self.map.as_mut() {
            resolve(map);
        }
        for run in &mut self.runs {
            resolve(&mut run.grid);
            resolve(&mut run.output);
        }
    }

    /// Build run requests against `map`. Every conversion is parsed up front so
    /// a typo in the last entry fails before any report is written.
    pub fn requests(&self, map: &Path) -> Result<Vec<RunRequest>> {
        self.runs
            .iter()
            .enumerate()
            .map(|(i, run)| {
                let conversion = run
                    .convert
                    .as_deref()
                    .map(Conversion::parse)
                    .transpose()
                    .with_context(|| format!("Batch run {} has an invalid conversion", i + 1))?;
                Ok(RunRequest {
                    grid_path: run.grid.clone(),
                    map_path: map.to_path_buf(),
                    output_path: run.output.clone(),
                    conversion,
                })
            })
            .collect()
    }
}

/// Run every request in order, stopping at the first failure.
pub fn run_batch(pipeline: &Pipeline, requests: &[RunRequest]) -> Result<Vec<RunSummary>> {
    let mut summaries = Vec::with_capacity(requests.len());
    for (i, request) in requests.iter().enumerate() {
        let summary = pipeline.run(request).with_context(|| {
            format!(
                "Batch run {}/{} failed for {}",
                i + 1,
                requests.len(),
                request.grid_path.display()
            )
        })?;
        summaries.push(summary);
    }

    let stats = pipeline.cache_stats();
    info!(
        runs = summaries.len(),
        map_cache_hits = stats.hits,
        map_cache_misses = stats.misses,
        "Batch complete"
    );
    Ok(summaries)
}
