//! Division report rendering and writing.
//!
//! A report is exactly one `"<id> <value>"` line per division in `1..=344`,
//! ascending. Divisions without an average carry the sentinel. Every value,
//! the sentinel included, is printed with the same fixed number of decimals.

use crate::aggregate::DivisionAverages;
use crate::error::{AggregatorError, Result};
use climdiv_common::DivisionId;
use serde::Serialize;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;
use tracing::info;

/// Default number of decimals in report values.
pub const DEFAULT_PRECISION: usize = 2;

/// One report line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DivisionRecord {
    pub id: DivisionId,
    pub value: f64,
}

/// Expand averages over the full division universe.
pub fn build_records(averages: &DivisionAverages) -> Vec<DivisionRecord> {
    DivisionId::all()
        .map(|id| DivisionRecord {
            id,
            value: averages.get(id).unwrap_or(averages.missing_value()),
        })
        .collect()
}

/// Render records as newline-terminated report text.
pub fn format_records(records: &[DivisionRecord], precision: usize) -> String {
    let mut out = String::with_capacity(records.len() * 16);
    for record in records {
        // Writing into a String cannot fail
        let _ = writeln!(out, "{} {:.*}", record.id, precision, record.value);
    }
    out
}

/// Write the report to `path`.
///
/// Content is staged in a temporary file beside `path` and renamed into place
/// once complete, so `path` never holds a partial report.
pub fn write_report(
    path: impl AsRef<Path>,
    records: &[DivisionRecord],
    precision: usize,
) -> Result<()> {
    let path = path.as_ref();
    let text = format_records(records, precision);

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged =
        tempfile::NamedTempFile::new_in(dir).map_err(|e| AggregatorError::io(dir, e))?;
    staged
        .write_all(text.as_bytes())
        .map_err(|e| AggregatorError::io(staged.path(), e))?;
    staged
        .persist(path)
        .map_err(|e| AggregatorError::io(path, e.error))?;

    info!(path = %path.display(), lines = records.len(), "Wrote division report");
    Ok(())
}
