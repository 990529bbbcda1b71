//! Climate Division Aggregation Engine
//!
//! Turns a regridded field on the fixed reference grid into one area-averaged
//! value per climate division:
//!
//! - **Decode**: raw little-endian f32 buffer to samples
//! - **Map**: per-position division ids from a `lon|lat|division_code` table
//! - **Aggregate**: one pass of sum/count per division, sentinel-aware
//! - **Convert**: optional linear or Kelvin-to-Fahrenheit rescaling
//! - **Report**: 344 ascending `"<id> <value>"` lines
//!
//! # Architecture
//!
//! ```text
//! grid bytes ──► decode_grid ──┐
//!                              ├──► Aggregator::aggregate ──► Conversion ──► build_records
//! map file ──► DivisionMap ────┘          │                                      │
//!    (DivisionMapCache)              sum / count                           write_report
//! ```
//!
//! # Example
//!
//! ```ignore
//! use division_aggregator::{AggregatorConfig, Conversion, Pipeline, RunRequest};
//!
//! let pipeline = Pipeline::new(AggregatorConfig::default())?;
//! let summary = pipeline.run(&RunRequest {
//!     grid_path: "tmax.bin".into(),
//!     map_path: "gridpoint_map.txt".into(),
//!     output_path: "tmax_cd.txt".into(),
//!     conversion: Some(Conversion::parse("k,m")?),
//! })?;
//! ```

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod decoder;
pub mod division_map;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod units;

// Re-export commonly used types at crate root
pub use aggregate::{
    is_valid_sample, Aggregation, AggregationStats, Aggregator, DivisionAccumulator,
    DivisionAverages,
};
pub use cache::{DivisionMapCache, MapCacheStats};
pub use config::AggregatorConfig;
pub use decoder::decode_grid;
pub use division_map::DivisionMap;
pub use error::{AggregatorError, Result};
pub use output::{build_records, format_records, write_report, DivisionRecord, DEFAULT_PRECISION};
pub use pipeline::{Pipeline, RunOutcome, RunRequest, RunSummary};
pub use units::Conversion;

pub use climdiv_common::{DivisionId, GridSpec, DEFAULT_MISSING_VALUE, NUM_DIVISIONS};
