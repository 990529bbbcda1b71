//! Error types for division aggregation.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that abort an aggregation run.
///
/// Missing per-division data is never an error; it surfaces as the
/// sentinel value in the report.
#[derive(Error, Debug)]
pub enum AggregatorError {
    /// Malformed binary grid input.
    #[error("format error: {0}")]
    Format(String),

    /// Missing, corrupt or malformed division map or configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Grid and division map disagree on the number of positions.
    #[error("size mismatch: grid has {grid} samples but division map has {map} entries")]
    SizeMismatch { grid: usize, map: usize },

    /// Malformed conversion specification.
    #[error("validation error: {0}")]
    Validation(String),

    /// File could not be read or written.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AggregatorError {
    /// Create a Format error.
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a SizeMismatch error.
    pub fn size_mismatch(grid: usize, map: usize) -> Self {
        Self::SizeMismatch { grid, map }
    }

    /// Create a Validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an Io error for `path`.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Stable short name used in structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Format(_) => "FormatError",
            Self::Config(_) => "ConfigError",
            Self::SizeMismatch { .. } => "SizeMismatchError",
            Self::Validation(_) => "ValidationError",
            Self::Io { .. } => "IoError",
        }
    }
}

impl From<serde_yaml::Error> for AggregatorError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Config(format!("YAML error: {}", err))
    }
}

/// Result type for aggregation operations.
pub type Result<T> = std::result::Result<T, AggregatorError>;
