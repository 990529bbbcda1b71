//! Climate division identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of climate divisions in the reporting universe.
pub const NUM_DIVISIONS: u16 = 344;

/// Default missing-data sentinel.
pub const DEFAULT_MISSING_VALUE: f64 = -9999.0;

/// A climate division id, guaranteed to lie in `1..=NUM_DIVISIONS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct DivisionId(u16);

impl DivisionId {
    /// Create a division id, rejecting values outside the fixed universe.
    pub fn new(id: u16) -> Result<Self, DivisionIdError> {
        if (1..=NUM_DIVISIONS).contains(&id) {
            Ok(Self(id))
        } else {
            Err(DivisionIdError::OutOfRange(i64::from(id)))
        }
    }

    pub fn get(self) -> u16 {
        self.0
    }

    /// Every division id in ascending order.
    pub fn all() -> impl Iterator<Item = DivisionId> {
        (1..=NUM_DIVISIONS).map(DivisionId)
    }
}

impl TryFrom<u16> for DivisionId {
    type Error = DivisionIdError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<i64> for DivisionId {
    type Error = DivisionIdError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u16::try_from(value)
            .map_err(|_| DivisionIdError::OutOfRange(value))
            .and_then(Self::new)
    }
}

impl From<DivisionId> for u16 {
    fn from(id: DivisionId) -> Self {
        id.0
    }
}

impl fmt::Display for DivisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DivisionIdError {
    #[error("division id {0} outside 1..={max}", max = NUM_DIVISIONS)]
    OutOfRange(i64),
}
