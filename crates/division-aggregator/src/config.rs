//! Configuration for division aggregation runs.

use crate::error::{AggregatorError, Result};
use crate::output::DEFAULT_PRECISION;
use climdiv_common::{grids, GridSpec, DEFAULT_MISSING_VALUE};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Upper bound on report decimals.
pub const MAX_PRECISION: usize = 10;

/// Upper bound on grid points (a 0.01 degree global grid is ~6.5e8).
pub const MAX_GRID_POINTS: usize = 1_000_000_000;

/// Settings shared by every run of a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Missing-data sentinel; samples at or below it are ignored.
    pub missing_value: f64,

    /// Decimals printed for every report value.
    pub precision: usize,

    /// Reference grid geometry both inputs must share.
    pub grid: GridSpec,

    /// Check every division map row against `grid` on load.
    pub verify_geometry: bool,

    /// Number of loaded division maps kept for reuse.
    pub map_cache_capacity: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            missing_value: DEFAULT_MISSING_VALUE,
            precision: DEFAULT_PRECISION,
            grid: grids::conus_0p125(),
            verify_geometry: true,
            map_cache_capacity: 4,
        }
    }
}

impl AggregatorConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset variables keep their defaults; set but malformed values are errors.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from `CLIMDIV_*` values returned by `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(val) = lookup("CLIMDIV_MISSING_VALUE") {
            config.missing_value = parse_env("CLIMDIV_MISSING_VALUE", &val)?;
        }

        if let Some(val) = lookup("CLIMDIV_PRECISION") {
            config.precision = parse_env("CLIMDIV_PRECISION", &val)?;
        }

        if let Some(val) = lookup("CLIMDIV_VERIFY_GEOMETRY") {
            config.verify_geometry = match val.trim().to_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => {
                    return Err(AggregatorError::config(format!(
                        "CLIMDIV_VERIFY_GEOMETRY must be true, false, 1 or 0, got '{}'",
                        val
                    )))
                }
            };
        }

        if let Some(val) = lookup("CLIMDIV_MAP_CACHE_CAPACITY") {
            config.map_cache_capacity = parse_env("CLIMDIV_MAP_CACHE_CAPACITY", &val)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file. Missing keys take defaults.
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| AggregatorError::io(path, e))?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.missing_value.is_finite() {
            return Err(AggregatorError::config("missing_value must be finite"));
        }

        if self.precision > MAX_PRECISION {
            return Err(AggregatorError::config(format!(
                "precision must be <= {}",
                MAX_PRECISION
            )));
        }

        if self.grid.is_empty() {
            return Err(AggregatorError::config("grid must have nx > 0 and ny > 0"));
        }

        match self.grid.checked_len() {
            Some(len) if len <= MAX_GRID_POINTS => {}
            _ => {
                return Err(AggregatorError::config(format!(
                    "grid {}x{} exceeds {} points",
                    self.grid.nx, self.grid.ny, MAX_GRID_POINTS
                )))
            }
        }

        if !(self.grid.dx > 0.0 && self.grid.dy > 0.0) {
            return Err(AggregatorError::config("grid spacing must be > 0"));
        }

        if self.map_cache_capacity == 0 {
            return Err(AggregatorError::config("map_cache_capacity must be > 0"));
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, val: &str) -> Result<T> {
    val.trim()
        .parse()
        .map_err(|_| AggregatorError::config(format!("{} has invalid value '{}'", name, val)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = AggregatorConfig::default();
        assert_eq!(config.missing_value, -9999.0);
        assert_eq!(config.precision, 2);
        assert_eq!(config.grid, grids::conus_0p125());
        assert!(config.verify_geometry);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AggregatorConfig::default();
        config.precision = 11;
        assert!(config.validate().is_err());

        config = AggregatorConfig::default();
        config.missing_value = f64::NAN;
        assert!(config.validate().is_err());

        config = AggregatorConfig::default();
        config.grid.nx = 0;
        assert!(config.validate().is_err());

        config = AggregatorConfig::default();
        config.grid.dy = -0.125;
        assert!(config.validate().is_err());

        config = AggregatorConfig::default();
        config.map_cache_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_partial_override() {
        let config =
            AggregatorConfig::from_yaml_str("precision: 3\nverify_geometry: false\n").unwrap();
        assert_eq!(config.precision, 3);
        assert!(!config.verify_geometry);
        assert_eq!(config.missing_value, -9999.0);
    }

    #[test]
    fn test_yaml_invalid_is_config_error() {
        let err = AggregatorConfig::from_yaml_str("precision: [1, 2]\n").unwrap_err();
        assert!(matches!(err, AggregatorError::Config(_)));

        let err = AggregatorConfig::from_yaml_str("precision: 42\n").unwrap_err();
        assert!(matches!(err, AggregatorError::Config(_)));
    }

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_from_lookup_reads_variables() {
        let config = AggregatorConfig::from_lookup(lookup_from(&[
            ("CLIMDIV_MISSING_VALUE", "-999"),
            ("CLIMDIV_PRECISION", "3"),
            ("CLIMDIV_VERIFY_GEOMETRY", "0"),
            ("CLIMDIV_MAP_CACHE_CAPACITY", "8"),
        ]))
        .unwrap();
        assert_eq!(config.missing_value, -999.0);
        assert_eq!(config.precision, 3);
        assert!(!config.verify_geometry);
        assert_eq!(config.map_cache_capacity, 8);

        let config = AggregatorConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, AggregatorConfig::default());
    }

    #[test]
    fn test_from_lookup_rejects_malformed_values() {
        for (name, value) in [
            ("CLIMDIV_VERIFY_GEOMETRY", "yes"),
            ("CLIMDIV_PRECISION", "two"),
            ("CLIMDIV_MISSING_VALUE", "missing"),
            ("CLIMDIV_MAP_CACHE_CAPACITY", "-1"),
            ("CLIMDIV_PRECISION", "50"),
        ] {
            let err = AggregatorConfig::from_lookup(lookup_from(&[(name, value)])).unwrap_err();
            assert!(matches!(err, AggregatorError::Config(_)), "{}={}", name, value);
        }

        let err = AggregatorConfig::from_lookup(lookup_from(&[("CLIMDIV_VERIFY_GEOMETRY", "yes")]))
            .unwrap_err();
        assert!(err.to_string().contains("CLIMDIV_VERIFY_GEOMETRY"));
    }

    #[test]
    fn test_overflowing_grid_rejected() {
        let yaml = "grid:\n  nx: 4294967296\n  ny: 4294967297\n  dx: 0.125\n  dy: 0.125\n  min_x: 0.0\n  min_y: 0.0\n  scan_mode: {i_negative: false, j_positive: true, j_consecutive: false}\n";
        let err = AggregatorConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, AggregatorError::Config(_)));

        let mut config = AggregatorConfig::default();
        config.grid.nx = 100_000;
        config.grid.ny = 100_000;
        assert!(config.validate().is_err());
    }
}
