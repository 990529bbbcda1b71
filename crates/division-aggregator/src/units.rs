//! Optional linear unit conversion of division averages.
//!
//! Accepted specifications:
//!
//! | Spec    | Conversion                         |
//! |---------|------------------------------------|
//! | `k,m`   | Kelvin to Fahrenheit               |
//! | `M`     | `new = M * old`                    |
//! | `M,N`   | `new = M * old + N`                |

use crate::aggregate::DivisionAverages;
use crate::error::{AggregatorError, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

const KELVIN_OFFSET: f64 = 273.15;

/// A parsed conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Conversion {
    KelvinToFahrenheit,
    Linear { scale: f64, offset: f64 },
}

impl Conversion {
    /// Parse a conversion specification.
    pub fn parse(spec: &str) -> Result<Self> {
        let tokens: Vec<&str> = spec.split(',').map(str::trim).collect();

        match tokens.as_slice() {
            [k, m] if k.eq_ignore_ascii_case("k") && m.eq_ignore_ascii_case("m") => {
                Ok(Self::KelvinToFahrenheit)
            }
            [scale] => Ok(Self::Linear {
                scale: parse_param(scale, spec)?,
                offset: 0.0,
            }),
            [scale, offset] => Ok(Self::Linear {
                scale: parse_param(scale, spec)?,
                offset: parse_param(offset, spec)?,
            }),
            _ => Err(AggregatorError::validation(format!(
                "conversion '{}' must be 'k,m', 'M' or 'M,N'",
                spec
            ))),
        }
    }

    /// Convert one value.
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            Self::KelvinToFahrenheit => (value - KELVIN_OFFSET) * 9.0 / 5.0 + 32.0,
            Self::Linear { scale, offset } => scale * value + offset,
        }
    }

    /// Convert every non-missing average; sentinels are left untouched.
    pub fn convert(&self, averages: &DivisionAverages) -> DivisionAverages {
        averages.map_present(|v| self.apply(v))
    }
}

fn parse_param(token: &str, spec: &str) -> Result<f64> {
    match token.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(AggregatorError::validation(format!(
            "non-numeric parameter '{}' in conversion '{}'",
            token, spec
        ))),
    }
}

impl FromStr for Conversion {
    type Err = AggregatorError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KelvinToFahrenheit => write!(f, "k,m"),
            Self::Linear { scale, offset } => write!(f, "{},{}", scale, offset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use climdiv_common::DivisionId;

    #[test]
    fn test_parse_grammars() {
        assert_eq!(Conversion::parse("k,m").unwrap(), Conversion::KelvinToFahrenheit);
        assert_eq!(Conversion::parse(" K , M ").unwrap(), Conversion::KelvinToFahrenheit);
        assert_eq!(
            Conversion::parse("25.4").unwrap(),
            Conversion::Linear { scale: 25.4, offset: 0.0 }
        );
        assert_eq!(
            Conversion::parse("1.8,-459.67").unwrap(),
            Conversion::Linear { scale: 1.8, offset: -459.67 }
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for spec in ["", "k", "m,k", "a,b", "1,2,3", "1,", "x", "NaN", "inf,0"] {
            let err = Conversion::parse(spec).unwrap_err();
            assert!(matches!(err, AggregatorError::Validation(_)), "spec {:?}", spec);
        }
    }

    #[test]
    fn test_kelvin_freezing_point() {
        let f = Conversion::KelvinToFahrenheit.apply(273.15);
        assert!((f - 32.0).abs() < 1e-9);
        let boiling = Conversion::KelvinToFahrenheit.apply(373.15);
        assert!((boiling - 212.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_identity() {
        let identity = Conversion::Linear { scale: 1.0, offset: 0.0 };
        for v in [-40.0, 0.0, 15.25, 1e6] {
            assert_eq!(identity.apply(v), v);
        }
    }

    #[test]
    fn test_convert_leaves_sentinel() {
        let one = DivisionId::new(1).unwrap();
        let two = DivisionId::new(2).unwrap();
        let averages = DivisionAverages::new(
            [(one, 273.15), (two, -9999.0)].into_iter().collect(),
            -9999.0,
        );
        let converted = Conversion::KelvinToFahrenheit.convert(&averages);
        assert!((converted.get(one).unwrap() - 32.0).abs() < 1e-9);
        assert_eq!(converted.get(two), Some(-9999.0));
    }

    #[test]
    fn test_serialized_form() {
        let json = serde_json::to_value(Conversion::parse("0.0393701").unwrap()).unwrap();
        assert_eq!(json["kind"], "linear");
        assert_eq!(json["scale"], 0.0393701);

        let json = serde_json::to_value(Conversion::KelvinToFahrenheit).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "kelvin_to_fahrenheit" }));
    }
}
