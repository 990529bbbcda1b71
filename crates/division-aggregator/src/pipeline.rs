//! Single-run aggregation pipeline.
//!
//! decode grid -> load division map (cached) -> aggregate -> convert -> report.
//! Every stage validates its own inputs; the report is written only after all
//! stages succeed.

use crate::aggregate::{AggregationStats, Aggregator, DivisionAverages};
use crate::cache::{DivisionMapCache, MapCacheStats};
use crate::config::AggregatorConfig;
use crate::decoder::decode_grid;
use crate::division_map::DivisionMap;
use crate::error::{AggregatorError, Result};
use crate::output::{build_records, write_report, DivisionRecord};
use crate::units::Conversion;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Inputs and destination of one run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub grid_path: PathBuf,
    pub map_path: PathBuf,
    pub output_path: PathBuf,
    pub conversion: Option<Conversion>,
}

/// In-memory result of the aggregation stages.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub averages: DivisionAverages,
    pub records: Vec<DivisionRecord>,
    pub stats: AggregationStats,
}

/// What a completed run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub output: PathBuf,
    pub divisions_reported: usize,
    pub divisions_in_map: usize,
    pub divisions_with_data: usize,
    /// Reported divisions carrying the missing-data sentinel.
    pub divisions_missing: usize,
    pub samples: AggregationStats,
    pub conversion: Option<Conversion>,
}

/// Aggregation pipeline bound to one configuration.
pub struct Pipeline {
    config: AggregatorConfig,
    aggregator: Aggregator,
    maps: DivisionMapCache,
}

impl Pipeline {
    pub fn new(config: AggregatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            aggregator: Aggregator::new(config.missing_value),
            maps: DivisionMapCache::new(config.map_cache_capacity),
            config,
        })
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> MapCacheStats {
        self.maps.stats()
    }

    /// Load a division map through the cache.
    pub fn load_map(&self, path: &Path) -> Result<Arc<DivisionMap>> {
        self.maps
            .get_or_load(path, &self.config.grid, self.config.verify_geometry)
    }

    /// Run the in-memory stages on a raw grid buffer.
    pub fn aggregate_bytes(
        &self,
        bytes: &[u8],
        map: &DivisionMap,
        conversion: Option<&Conversion>,
    ) -> Result<RunOutcome> {
        if let Some(geometry) = map.geometry() {
            if *geometry != self.config.grid {
                return Err(AggregatorError::config(format!(
                    "division map was validated for grid {} but the run uses {}",
                    geometry.cache_key(),
                    self.config.grid.cache_key()
                )));
            }
        }

        let grid = decode_grid(bytes)?;
        let aggregation = self.aggregator.aggregate(&grid, map)?;

        let mut averages = aggregation.averages();
        if let Some(conversion) = conversion {
            averages = conversion.convert(&averages);
        }

        Ok(RunOutcome {
            records: build_records(&averages),
            stats: *aggregation.stats(),
            averages,
        })
    }

    /// Execute one run end to end and write its report.
    #[tracing::instrument(skip(self), fields(grid = %request.grid_path.display(), output = %request.output_path.display()))]
    pub fn run(&self, request: &RunRequest) -> Result<RunSummary> {
        let bytes = std::fs::read(&request.grid_path)
            .map_err(|e| AggregatorError::io(&request.grid_path, e))?;
        let map = self.load_map(&request.map_path)?;

        let outcome = self.aggregate_bytes(&bytes, &map, request.conversion.as_ref())?;
        write_report(&request.output_path, &outcome.records, self.config.precision)?;

        let summary = RunSummary {
            output: request.output_path.clone(),
            divisions_reported: outcome.records.len(),
            divisions_in_map: outcome.averages.len(),
            divisions_with_data: outcome.averages.with_data(),
            divisions_missing: outcome.records.len() - outcome.averages.with_data(),
            samples: outcome.stats,
            conversion: request.conversion,
        };

        info!(
            divisions_with_data = summary.divisions_with_data,
            divisions_in_map = summary.divisions_in_map,
            valid_samples = summary.samples.valid_samples,
            "Run complete"
        );
        Ok(summary)
    }
}
