//! Common test fixtures for division aggregation tests.

/// Four-point worked example: two divisions, one sentinel sample.
pub mod worked_example {
    /// Grid samples in scan order.
    pub const GRID: [f32; 4] = [10.0, 20.0, -9999.0, 30.0];

    /// Division code per grid position.
    pub const CODES: [u16; 4] = [5, 5, 5, 7];

    /// Expected (division, sum, count, average) for the mapped divisions.
    pub const EXPECTED: [(u16, f64, u64, f64); 2] = [(5, 30.0, 2, 15.0), (7, 30.0, 1, 30.0)];
}

/// Conversion specification strings.
pub mod conversions {
    pub const KELVIN_TO_FAHRENHEIT: &str = "k,m";
    pub const IDENTITY: &str = "1,0";
    pub const MM_TO_INCHES: &str = "0.0393701";

    /// Strings that must be rejected.
    pub const MALFORMED: [&str; 5] = ["", "k", "1,2,3", "one", "2,x"];
}

/// Missing-data sentinel used throughout the fixtures.
pub const MISSING: f64 = -9999.0;
