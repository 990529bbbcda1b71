//! Run date validation.
//!
//! Source fields for a date are only final some days after it, so runs for
//! dates newer than `today - min_lag_days` are refused.

use anyhow::{bail, Result};
use chrono::{Duration, NaiveDate};

const DATE_FORMATS: [&str; 2] = ["%Y%m%d", "%Y-%m-%d"];

/// Parse `YYYYMMDD` or `YYYY-MM-DD`.
pub fn parse_run_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Ok(date);
        }
    }
    bail!("invalid run date '{}', expected YYYYMMDD or YYYY-MM-DD", s)
}

/// Parse `s` and reject it if it is later than `today - min_lag_days`.
pub fn validate_run_date(s: &str, today: NaiveDate, min_lag_days: i64) -> Result<NaiveDate> {
    if min_lag_days < 0 {
        bail!("min lag days must be >= 0, got {}", min_lag_days);
    }

    let date = parse_run_date(s)?;
    let latest = today - Duration::days(min_lag_days);
    if date > latest {
        bail!(
            "run date {} is too recent: latest allowed date is {} ({} day lag)",
            date,
            latest,
            min_lag_days
        );
    }
    Ok(date)
}
