//! Raw grid buffer decoding.
//!
//! The regridded grid arrives as a flat sequence of little-endian IEEE-754
//! binary32 samples in the reference grid's scan order. No header, no padding.

use crate::error::{AggregatorError, Result};

/// Width of one encoded sample in bytes.
pub const SAMPLE_BYTES: usize = 4;

/// Decode a raw little-endian f32 buffer into samples.
///
/// Fails if the buffer is empty or its length is not a multiple of 4.
pub fn decode_grid(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.is_empty() {
        return Err(AggregatorError::format("grid buffer is empty"));
    }

    if bytes.len() % SAMPLE_BYTES != 0 {
        return Err(AggregatorError::format(format!(
            "grid buffer length {} is not a multiple of {} bytes ({} trailing)",
            bytes.len(),
            SAMPLE_BYTES,
            bytes.len() % SAMPLE_BYTES
        )));
    }

    let samples: Vec<f32> = bytes
        .chunks_exact(SAMPLE_BYTES)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    tracing::debug!(samples = samples.len(), "Decoded grid buffer");
    Ok(samples)
}
