//! Per-division area averaging.
//!
//! One pass over the grid accumulates `(sum, count)` per division for every
//! valid sample, then averages are derived. A sample is valid when it is a
//! finite number strictly greater than the missing-value sentinel; anything
//! else leaves both sum and count untouched.

use crate::division_map::DivisionMap;
use crate::error::{AggregatorError, Result};
use climdiv_common::DivisionId;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Running totals for one division.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DivisionAccumulator {
    pub sum: f64,
    pub count: u64,
}

impl DivisionAccumulator {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    /// Arithmetic mean, or `missing_value` when nothing was accumulated.
    pub fn mean_or(&self, missing_value: f64) -> f64 {
        if self.count == 0 {
            missing_value
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Counters describing one aggregation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregationStats {
    /// Grid positions visited.
    pub positions: usize,
    /// Positions mapped to no division.
    pub unmapped: usize,
    /// Samples that contributed to a division.
    pub valid_samples: usize,
    /// Samples at mapped positions rejected as missing or non-finite.
    pub invalid_samples: usize,
}

/// Whether a sample may contribute to a division average.
pub fn is_valid_sample(value: f32, missing_value: f64) -> bool {
    value.is_finite() && f64::from(value) > missing_value
}

/// Computes division averages under a fixed missing-value policy.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    missing_value: f64,
}

impl Aggregator {
    pub fn new(missing_value: f64) -> Self {
        Self { missing_value }
    }

    pub fn missing_value(&self) -> f64 {
        self.missing_value
    }

    /// Accumulate `grid` into the divisions named by `map`.
    ///
    /// Both sequences must have the same length; nothing is accumulated otherwise.
    #[tracing::instrument(skip(self, grid, map), fields(samples = grid.len(), rows = map.len()))]
    pub fn aggregate(&self, grid: &[f32], map: &DivisionMap) -> Result<Aggregation> {
        if grid.len() != map.len() {
            return Err(AggregatorError::size_mismatch(grid.len(), map.len()));
        }

        let mut accumulators: BTreeMap<DivisionId, DivisionAccumulator> = map
            .divisions()
            .into_iter()
            .map(|id| (id, DivisionAccumulator::default()))
            .collect();
        let mut stats = AggregationStats {
            positions: grid.len(),
            ..Default::default()
        };

        for (&value, division) in grid.iter().zip(map.entries()) {
            let Some(division) = division else {
                stats.unmapped += 1;
                continue;
            };

            if is_valid_sample(value, self.missing_value) {
                accumulators.entry(*division).or_default().add(f64::from(value));
                stats.valid_samples += 1;
            } else {
                stats.invalid_samples += 1;
            }
        }

        let empty: Vec<u16> = accumulators
            .iter()
            .filter(|(_, acc)| acc.count == 0)
            .map(|(id, _)| id.get())
            .collect();
        if !empty.is_empty() {
            warn!(
                divisions = ?empty,
                "Mapped divisions received no valid samples"
            );
        }

        debug!(
            divisions = accumulators.len(),
            valid = stats.valid_samples,
            invalid = stats.invalid_samples,
            unmapped = stats.unmapped,
            "Aggregation pass complete"
        );

        Ok(Aggregation {
            accumulators,
            missing_value: self.missing_value,
            stats,
        })
    }
}

/// Result of one aggregation pass.
#[derive(Debug, Clone)]
pub struct Aggregation {
    accumulators: BTreeMap<DivisionId, DivisionAccumulator>,
    missing_value: f64,
    stats: AggregationStats,
}

impl Aggregation {
    /// Totals for a division present in the map.
    pub fn accumulator(&self, id: DivisionId) -> Option<&DivisionAccumulator> {
        self.accumulators.get(&id)
    }

    /// Average for a division present in the map; the sentinel when it had no
    /// valid samples, `None` when the map never names it.
    pub fn average(&self, id: DivisionId) -> Option<f64> {
        self.accumulators
            .get(&id)
            .map(|acc| acc.mean_or(self.missing_value))
    }

    pub fn stats(&self) -> &AggregationStats {
        &self.stats
    }

    /// Derive the per-division averages.
    pub fn averages(&self) -> DivisionAverages {
        DivisionAverages {
            values: self
                .accumulators
                .iter()
                .map(|(id, acc)| (*id, acc.mean_or(self.missing_value)))
                .collect(),
            missing_value: self.missing_value,
        }
    }
}

/// Per-division averages for the divisions present in the map.
#[derive(Debug, Clone, PartialEq)]
pub struct DivisionAverages {
    values: BTreeMap<DivisionId, f64>,
    missing_value: f64,
}

impl DivisionAverages {
    pub fn new(values: BTreeMap<DivisionId, f64>, missing_value: f64) -> Self {
        Self {
            values,
            missing_value,
        }
    }

    pub fn get(&self, id: DivisionId) -> Option<f64> {
        self.values.get(&id).copied()
    }

    pub fn missing_value(&self) -> f64 {
        self.missing_value
    }

    /// Whether `value` is the sentinel for this run.
    pub fn is_missing(&self, value: f64) -> bool {
        value == self.missing_value
    }

    pub fn iter(&self) -> impl Iterator<Item = (DivisionId, f64)> + '_ {
        self.values.iter().map(|(id, value)| (*id, *value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of divisions holding a real (non-sentinel) average.
    pub fn with_data(&self) -> usize {
        self.values.values().filter(|v| !self.is_missing(**v)).count()
    }

    /// Apply `f` to every non-missing average; sentinels pass through.
    pub fn map_present(&self, f: impl Fn(f64) -> f64) -> Self {
        let values = self
            .values
            .iter()
            .map(|(id, value)| {
                let converted = if self.is_missing(*value) { *value } else { f(*value) };
                (*id, converted)
            })
            .collect();
        Self {
            values,
            missing_value: self.missing_value,
        }
    }
}
