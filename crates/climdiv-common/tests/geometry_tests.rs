//! Tests for grid geometry and division id handling.

use climdiv_common::{grids, DivisionId, GridSpec, ScanMode};

// ============================================================================
// GridSpec ordering
// ============================================================================

#[test]
fn test_every_flat_index_has_distinct_coordinate() {
    let grid = GridSpec::new(5, 4, 0.125, 0.125, -90.0, 35.0, ScanMode::south_to_north());
    let mut seen: Vec<(i64, i64)> = (0..grid.len())
        .map(|idx| {
            let p = grid.coord_at(idx).unwrap();
            ((p.x * 1000.0).round() as i64, (p.y * 1000.0).round() as i64)
        })
        .collect();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), grid.len());
}

#[test]
fn test_column_major_ordering() {
    let mode = ScanMode {
        i_negative: false,
        j_positive: true,
        j_consecutive: true,
    };
    let grid = GridSpec::new(3, 2, 1.0, 1.0, 0.0, 0.0, mode);

    // Second sample steps north, not east
    let p = grid.coord_at(1).unwrap();
    assert_eq!((p.x, p.y), (0.0, 1.0));
}

#[test]
fn test_all_points_inside_bbox() {
    let grid = grids::conus_0p125();
    let bbox = grid.bbox();
    for idx in [0, 1, grid.nx, grid.len() / 2, grid.len() - 1] {
        let p = grid.coord_at(idx).unwrap();
        assert!(
            p.x >= bbox.min_x && p.x <= bbox.max_x && p.y >= bbox.min_y && p.y <= bbox.max_y,
            "index {} outside bbox",
            idx
        );
    }
}

#[test]
fn test_grid_spec_serde_roundtrip() {
    let grid = grids::conus_0p125();
    let json = serde_json::to_string(&grid).unwrap();
    let back: GridSpec = serde_json::from_str(&json).unwrap();
    assert_eq!(grid, back);
}

// ============================================================================
// DivisionId deserialization
// ============================================================================

#[test]
fn test_division_id_deserialize_rejects_out_of_range() {
    let ok: DivisionId = serde_json::from_str("17").unwrap();
    assert_eq!(ok.get(), 17);

    assert!(serde_json::from_str::<DivisionId>("0").is_err());
    assert!(serde_json::from_str::<DivisionId>("345").is_err());
}
