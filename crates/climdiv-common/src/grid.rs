//! Grid specifications for the regridded reference data.
//!
//! A [`GridSpec`] is the geometry descriptor both inputs of a run must agree
//! on: the raw grid buffer is produced at this resolution and ordering, and the
//! division map lists one row per grid position in the same order.

use crate::BoundingBox;
use serde::{Deserialize, Serialize};

/// Specification of a regular lat/lon grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Number of points in X (longitude) direction
    pub nx: usize,
    /// Number of points in Y (latitude) direction
    pub ny: usize,
    /// Grid spacing in X, degrees (positive)
    pub dx: f64,
    /// Grid spacing in Y, degrees (positive)
    pub dy: f64,
    /// Westernmost grid point longitude
    pub min_x: f64,
    /// Southernmost grid point latitude
    pub min_y: f64,
    /// Scan mode flags (determines how data is ordered)
    pub scan_mode: ScanMode,
}

impl GridSpec {
    /// Create a new grid specification.
    pub fn new(
        nx: usize,
        ny: usize,
        dx: f64,
        dy: f64,
        min_x: f64,
        min_y: f64,
        scan_mode: ScanMode,
    ) -> Self {
        Self {
            nx,
            ny,
            dx,
            dy,
            min_x,
            min_y,
            scan_mode,
        }
    }

    /// Bounding box spanned by the grid point centers.
    pub fn bbox(&self) -> BoundingBox {
        let span_x = self.nx.saturating_sub(1) as f64 * self.dx;
        let span_y = self.ny.saturating_sub(1) as f64 * self.dy;
        BoundingBox::new(self.min_x, self.min_y, self.min_x + span_x, self.min_y + span_y)
    }

    /// Coordinate of the sample stored at flat position `index`.
    pub fn coord_at(&self, index: usize) -> Option<GridPoint> {
        if index >= self.len() {
            return None;
        }

        let (i, j) = self.scan_mode.scan_indices(index, self.nx, self.ny);
        let col = if self.scan_mode.i_negative { self.nx - 1 - i } else { i };
        let row = if self.scan_mode.j_positive { j } else { self.ny - 1 - j };

        Some(GridPoint {
            x: self.min_x + col as f64 * self.dx,
            y: self.min_y + row as f64 * self.dy,
            index,
        })
    }

    /// Whether `(x, y)` lies within half a cell of the point at `index`.
    ///
    /// Longitudes are compared modulo 360, so `235.0625` matches `-124.9375`.
    pub fn matches_point(&self, index: usize, x: f64, y: f64) -> bool {
        match self.coord_at(index) {
            Some(point) => {
                longitude_delta(point.x, x) <= self.dx / 2.0
                    && (point.y - y).abs() <= self.dy / 2.0
            }
            None => false,
        }
    }

    /// Total number of grid points, saturating at `usize::MAX`.
    pub fn len(&self) -> usize {
        self.nx.saturating_mul(self.ny)
    }

    /// Total number of grid points, `None` if `nx * ny` overflows.
    pub fn checked_len(&self) -> Option<usize> {
        self.nx.checked_mul(self.ny)
    }

    /// Check if grid is empty.
    pub fn is_empty(&self) -> bool {
        self.nx == 0 || self.ny == 0
    }

    /// Regridding target descriptor: `lon0:nx:dx lat0:ny:dy`.
    pub fn descriptor(&self) -> String {
        format!(
            "{}:{}:{} {}:{}:{}",
            self.min_x, self.nx, self.dx, self.min_y, self.ny, self.dy
        )
    }

    /// Stable key identifying this geometry (resolution, extent and ordering).
    pub fn cache_key(&self) -> String {
        format!(
            "{}x{}@{:.6}x{:.6}/{}/{:02x}",
            self.nx,
            self.ny,
            self.dx,
            self.dy,
            self.bbox().cache_key(),
            self.scan_mode.to_flag()
        )
    }
}

/// A grid point with its flat position and coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPoint {
    pub x: f64,
    pub y: f64,
    pub index: usize,
}

/// Scan mode flags for grid data ordering.
///
/// Based on GRIB2 scanning mode (Flag Table 3.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanMode {
    /// +i direction: false = +x (east), true = -x (west)
    pub i_negative: bool,
    /// +j direction: false = -y (south), true = +y (north)
    pub j_positive: bool,
    /// Adjacent points: false = i direction, true = j direction
    pub j_consecutive: bool,
}

impl ScanMode {
    /// Row-major from the south-west corner: rows run west to east,
    /// successive rows step north.
    pub fn south_to_north() -> Self {
        Self {
            i_negative: false,
            j_positive: true,
            j_consecutive: false,
        }
    }

    /// Row-major from the north-west corner.
    pub fn north_to_south() -> Self {
        Self {
            i_negative: false,
            j_positive: false,
            j_consecutive: false,
        }
    }

    /// GRIB2 flag byte for this ordering.
    pub fn to_flag(&self) -> u8 {
        let mut flag = 0;
        if self.i_negative {
            flag |= 0x80;
        }
        if self.j_positive {
            flag |= 0x40;
        }
        if self.j_consecutive {
            flag |= 0x20;
        }
        flag
    }

    /// Scan-order (i, j) indices of a flat array position.
    pub fn scan_indices(&self, index: usize, nx: usize, ny: usize) -> (usize, usize) {
        if self.j_consecutive {
            // Column-major order
            (index / ny, index % ny)
        } else {
            // Row-major order
            (index % nx, index / nx)
        }
    }
}

impl Default for ScanMode {
    fn default() -> Self {
        Self::south_to_north()
    }
}

/// Absolute east-west distance in degrees between two longitudes, wrapping at 360.
fn longitude_delta(a: f64, b: f64) -> f64 {
    ((a - b + 180.0).rem_euclid(360.0) - 180.0).abs()
}

/// Reference grid definitions.
pub mod grids {
    use super::*;

    /// 0.125° CONUS grid the division map is built against.
    pub fn conus_0p125() -> GridSpec {
        GridSpec::new(
            464,
            224,
            0.125,
            0.125,
            -124.9375,
            25.0625,
            ScanMode::south_to_north(),
        )
    }
}
