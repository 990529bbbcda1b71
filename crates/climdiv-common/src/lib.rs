//! Common types shared across the climdiv workspace.
//!
//! - [`GridSpec`]: geometry descriptor of a regular lat/lon grid and its sample ordering
//! - [`BoundingBox`]: geographic extent of a grid
//! - [`DivisionId`]: validated climate division id in the fixed universe `1..=344`

pub mod bbox;
pub mod division;
pub mod grid;

pub use bbox::BoundingBox;
pub use division::{DivisionId, DivisionIdError, DEFAULT_MISSING_VALUE, NUM_DIVISIONS};
pub use grid::{grids, GridPoint, GridSpec, ScanMode};
