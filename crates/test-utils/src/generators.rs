//! Test data generators for grids and division maps.
//!
//! These generators create predictable, verifiable inputs that can be used
//! across the test suite without any external data.

use climdiv_common::GridSpec;
use std::fmt::Write as _;

/// Encodes samples as the raw little-endian f32 buffer the decoder reads.
///
/// # Example
///
/// ```
/// use test_utils::encode_grid_le;
///
/// let bytes = encode_grid_le(&[1.0, 2.0]);
/// assert_eq!(bytes.len(), 8);
/// assert_eq!(&bytes[..4], &1.0_f32.to_le_bytes());
/// ```
pub fn encode_grid_le(samples: &[f32]) -> Vec<u8> {
    samples.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Creates a grid where every sample equals `value`.
pub fn create_uniform_grid(len: usize, value: f32) -> Vec<f32> {
    vec![value; len]
}

/// Creates a grid with temperature-like values in Kelvin.
///
/// The values range from approximately 250K (-23C) to 310K (37C),
/// a gradient from the first to the last row.
pub fn create_temperature_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let x_factor = col as f32 / width.max(1) as f32;
            let y_factor = row as f32 / height.max(1) as f32;
            data.push(250.0 + (x_factor * 30.0) + (y_factor * 30.0));
        }
    }
    data
}

/// Assigns division codes in vertical stripes.
///
/// Column `col` of a `width`-wide row-major grid gets division
/// `first + col / stripe_width`. A code of `0` is never produced.
///
/// # Example
///
/// ```
/// use test_utils::striped_division_codes;
///
/// let codes = striped_division_codes(4, 2, 2, 10);
/// assert_eq!(codes, vec![10, 10, 11, 11, 10, 10, 11, 11]);
/// ```
pub fn striped_division_codes(
    width: usize,
    height: usize,
    stripe_width: usize,
    first: u16,
) -> Vec<u16> {
    let stripe_width = stripe_width.max(1);
    let mut codes = Vec::with_capacity(width * height);
    for _row in 0..height {
        for col in 0..width {
            codes.push(first + (col / stripe_width) as u16);
        }
    }
    codes
}

/// Renders a division map file body for `grid`.
///
/// Row `i` carries the coordinates of flat position `i` and `codes[i]`;
/// a code of `0` is written as `NA`.
///
/// # Panics
///
/// Panics if `codes.len() != grid.len()`.
pub fn create_division_map_text(grid: &GridSpec, codes: &[u16]) -> String {
    assert_eq!(codes.len(), grid.len(), "one code per grid position");

    let mut text = String::from("lon|lat|division_code\n");
    for (idx, code) in codes.iter().enumerate() {
        let point = grid.coord_at(idx).expect("index within grid");
        let code = if *code == 0 {
            "NA".to_string()
        } else {
            code.to_string()
        };
        let _ = writeln!(text, "{:.4}|{:.4}|{}", point.x, point.y, code);
    }
    text
}

/// Renders a positional division map body with dummy coordinates.
pub fn create_positional_map_text(codes: &[u16]) -> String {
    let mut text = String::from("lon|lat|division_code\n");
    for (idx, code) in codes.iter().enumerate() {
        let code = if *code == 0 {
            "NA".to_string()
        } else {
            code.to_string()
        };
        let _ = writeln!(text, "{}|0|{}", idx, code);
    }
    text
}
