//! Gridpoint-to-division lookup table.
//!
//! The map file is pipe-delimited text: a header naming the columns, then one
//! `lon|lat|division_code` row per grid position in the grid's scan order.
//!
//! ```text
//! lon|lat|division_code
//! -124.9375|25.0625|NA
//! -124.8125|25.0625|17
//! ```

use crate::error::{AggregatorError, Result};
use climdiv_common::{DivisionId, GridSpec};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Field separator in map files.
pub const FIELD_SEPARATOR: char = '|';

/// Division codes meaning "this grid position belongs to no division".
const NO_DIVISION_CODES: &[&str] = &["", "NA", "N/A", "NAN", "NONE", "NULL", "-", "0"];

/// Immutable per-position division assignment for one grid geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct DivisionMap {
    entries: Vec<Option<DivisionId>>,
    geometry: Option<GridSpec>,
    source: Option<PathBuf>,
}

impl DivisionMap {
    /// Build a map directly from per-position entries.
    pub fn from_entries(entries: Vec<Option<DivisionId>>) -> Self {
        Self {
            entries,
            geometry: None,
            source: None,
        }
    }

    /// Load a map file, trusting positional correspondence with the grid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_inner(path.as_ref(), None)
    }

    /// Load a map file and verify that every row sits on `geometry` in scan order.
    pub fn load_with_geometry(path: impl AsRef<Path>, geometry: &GridSpec) -> Result<Self> {
        Self::load_inner(path.as_ref(), Some(geometry))
    }

    fn load_inner(path: &Path, geometry: Option<&GridSpec>) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                AggregatorError::config(format!("division map {} not found", path.display()))
            }
            _ => AggregatorError::io(path, e),
        })?;

        let mut map = Self::parse(&text, geometry).map_err(|e| match e {
            AggregatorError::Config(msg) => {
                AggregatorError::config(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;
        map.source = Some(path.to_path_buf());

        info!(
            path = %path.display(),
            rows = map.len(),
            mapped = map.mapped_count(),
            divisions = map.divisions().len(),
            geometry_checked = geometry.is_some(),
            "Loaded division map"
        );
        Ok(map)
    }

    /// Parse map text. With `geometry`, each row's coordinates must match the
    /// grid point at the same flat position and the row count must equal the
    /// grid size.
    pub fn parse(text: &str, geometry: Option<&GridSpec>) -> Result<Self> {
        let mut lines = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());

        let (_, header) = lines
            .next()
            .ok_or_else(|| AggregatorError::config("division map is empty"))?;
        check_header(header)?;

        let mut entries = Vec::new();
        for (line_idx, line) in lines {
            let line_no = line_idx + 1;
            let row = parse_row(line).map_err(|msg| {
                AggregatorError::config(format!("line {}: {}", line_no, msg))
            })?;

            if let Some(grid) = geometry {
                let position = entries.len();
                if position >= grid.len() {
                    return Err(AggregatorError::config(format!(
                        "line {}: more rows than the {} positions of the grid",
                        line_no,
                        grid.len()
                    )));
                }
                if !grid.matches_point(position, row.lon, row.lat) {
                    let expected = grid.coord_at(position);
                    return Err(AggregatorError::config(format!(
                        "line {}: point ({}, {}) does not match grid position {} at {:?}",
                        line_no,
                        row.lon,
                        row.lat,
                        position,
                        expected.map(|p| (p.x, p.y))
                    )));
                }
            }

            entries.push(row.division);
        }

        if entries.is_empty() {
            return Err(AggregatorError::config("division map has no data rows"));
        }

        if let Some(grid) = geometry {
            if entries.len() != grid.len() {
                return Err(AggregatorError::config(format!(
                    "division map has {} rows but the grid has {} positions",
                    entries.len(),
                    grid.len()
                )));
            }
        }

        debug!(rows = entries.len(), "Parsed division map");
        Ok(Self {
            entries,
            geometry: geometry.copied(),
            source: None,
        })
    }

    /// Number of grid positions covered; the expected grid length.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Division assigned to a position, `None` for "no division".
    pub fn get(&self, index: usize) -> Option<DivisionId> {
        self.entries.get(index).copied().flatten()
    }

    pub fn entries(&self) -> &[Option<DivisionId>] {
        &self.entries
    }

    /// Number of positions assigned to some division.
    pub fn mapped_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    /// Distinct divisions appearing in the map.
    pub fn divisions(&self) -> BTreeSet<DivisionId> {
        self.entries.iter().flatten().copied().collect()
    }

    /// Geometry the rows were validated against, if any.
    pub fn geometry(&self) -> Option<&GridSpec> {
        self.geometry.as_ref()
    }

    /// File the map was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

struct MapRow {
    lon: f64,
    lat: f64,
    division: Option<DivisionId>,
}

fn check_header(header: &str) -> Result<()> {
    let fields: Vec<String> = header
        .split(FIELD_SEPARATOR)
        .map(|f| f.trim().to_ascii_lowercase())
        .collect();

    let lon_ok = matches!(fields.first().map(String::as_str), Some("lon" | "longitude"));
    let lat_ok = matches!(fields.get(1).map(String::as_str), Some("lat" | "latitude"));

    if fields.len() != 3 || !lon_ok || !lat_ok {
        return Err(AggregatorError::config(format!(
            "unexpected header '{}', expected 'lon|lat|division_code'",
            header.trim()
        )));
    }
    Ok(())
}

fn parse_row(line: &str) -> std::result::Result<MapRow, String> {
    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).map(str::trim).collect();
    if fields.len() != 3 {
        return Err(format!("expected 3 fields, found {}", fields.len()));
    }

    let lon: f64 = fields[0]
        .parse()
        .map_err(|_| format!("invalid longitude '{}'", fields[0]))?;
    let lat: f64 = fields[1]
        .parse()
        .map_err(|_| format!("invalid latitude '{}'", fields[1]))?;
    let division = parse_division_code(fields[2])?;

    Ok(MapRow { lon, lat, division })
}

/// Parse a division code column value.
///
/// Recognized placeholders map to `None`; integers must lie in `1..=344`;
/// anything else is malformed.
pub fn parse_division_code(raw: &str) -> std::result::Result<Option<DivisionId>, String> {
    let code = raw.trim();
    if NO_DIVISION_CODES
        .iter()
        .any(|placeholder| code.eq_ignore_ascii_case(placeholder))
    {
        return Ok(None);
    }

    let number = match code.parse::<i64>() {
        Ok(n) => n,
        // Whole-valued decimals such as "17.0" are accepted
        Err(_) => match code.parse::<f64>() {
            Ok(f) if f.is_finite() && f.fract() == 0.0 => f as i64,
            _ => return Err(format!("malformed division code '{}'", code)),
        },
    };

    if number == 0 {
        return Ok(None);
    }

    DivisionId::try_from(number)
        .map(Some)
        .map_err(|e| format!("{} in division code '{}'", e, code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use climdiv_common::ScanMode;

    fn id(n: u16) -> DivisionId {
        DivisionId::new(n).unwrap()
    }

    #[test]
    fn test_parse_positional() {
        let text = "lon|lat|division_code\n0|0|5\n1|0|NA\n2|0|7\n";
        let map = DivisionMap::parse(text, None).unwrap();
        assert_eq!(map.entries(), &[Some(id(5)), None, Some(id(7))]);
        assert_eq!(map.mapped_count(), 2);
        assert!(map.geometry().is_none());
    }

    #[test]
    fn test_parse_empty_is_config_error() {
        assert!(matches!(
            DivisionMap::parse("", None),
            Err(AggregatorError::Config(_))
        ));
        assert!(matches!(
            DivisionMap::parse("lon|lat|division_code\n", None),
            Err(AggregatorError::Config(_))
        ));
    }

    #[test]
    fn test_parse_wrong_field_count() {
        let err = DivisionMap::parse("lon|lat|cd\n0|0\n", None).unwrap_err();
        assert!(err.to_string().contains("line 2"));

        let err = DivisionMap::parse("lon|lat|cd\n0|0|1|2\n", None).unwrap_err();
        assert!(matches!(err, AggregatorError::Config(_)));
    }

    #[test]
    fn test_bad_header() {
        let err = DivisionMap::parse("x,y,z\n0|0|1\n", None).unwrap_err();
        assert!(err.to_string().contains("header"));
    }

    #[test]
    fn test_division_code_placeholders() {
        for raw in ["", " ", "NA", "na", "N/A", "NaN", "none", "NULL", "-", "0"] {
            assert_eq!(parse_division_code(raw), Ok(None), "code {:?}", raw);
        }
    }

    #[test]
    fn test_division_code_numbers() {
        assert_eq!(parse_division_code("1"), Ok(Some(id(1))));
        assert_eq!(parse_division_code(" 344 "), Ok(Some(id(344))));
        assert_eq!(parse_division_code("17.0"), Ok(Some(id(17))));
        assert!(parse_division_code("345").is_err());
        assert!(parse_division_code("-4").is_err());
        assert!(parse_division_code("17.5").is_err());
        assert!(parse_division_code("abc").is_err());
    }

    #[test]
    fn test_geometry_check_accepts_matching_rows() {
        let grid = GridSpec::new(2, 2, 1.0, 1.0, 10.0, 20.0, ScanMode::south_to_north());
        let text = "lon|lat|cd\n10|20|1\n11|20|1\n10|21|2\n11|21|NA\n";
        let map = DivisionMap::parse(text, Some(&grid)).unwrap();
        assert_eq!(map.len(), 4);
        assert_eq!(map.geometry(), Some(&grid));
    }

    #[test]
    fn test_geometry_check_rejects_reordered_rows() {
        let grid = GridSpec::new(2, 2, 1.0, 1.0, 10.0, 20.0, ScanMode::south_to_north());
        // Column-major rows against a row-major grid
        let text = "lon|lat|cd\n10|20|1\n10|21|1\n11|20|2\n11|21|NA\n";
        let err = DivisionMap::parse(text, Some(&grid)).unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_geometry_check_rejects_short_map() {
        let grid = GridSpec::new(2, 2, 1.0, 1.0, 10.0, 20.0, ScanMode::south_to_north());
        let text = "lon|lat|cd\n10|20|1\n11|20|1\n";
        let err = DivisionMap::parse(text, Some(&grid)).unwrap_err();
        assert!(err.to_string().contains("2 rows"));
    }

    #[test]
    fn test_divisions_set() {
        let map = DivisionMap::from_entries(vec![Some(id(9)), Some(id(3)), None, Some(id(9))]);
        let divisions: Vec<u16> = map.divisions().into_iter().map(DivisionId::get).collect();
        assert_eq!(divisions, vec![3, 9]);
        assert_eq!(map.get(0), Some(id(9)));
        assert_eq!(map.get(2), None);
        assert_eq!(map.get(99), None);
    }
}
