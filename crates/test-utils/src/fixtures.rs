//! Common test fixtures: bounding boxes, grid specs, and GRIB2-style
//! parameter/level names used across the storage adapter test suites.

/// Common bounding box definitions for testing, as `(min_lon, min_lat,
/// max_lon, max_lat)`.
pub mod bbox {
    /// Global bounding box.
    pub const GLOBAL: (f64, f64, f64, f64) = (-180.0, -90.0, 180.0, 90.0);

    /// A small regional tile.
    pub const SMALL_TILE: (f64, f64, f64, f64) = (-100.0, 40.0, -99.0, 41.0);

    /// Single point (degenerate bbox).
    pub const POINT: (f64, f64, f64, f64) = (0.0, 0.0, 0.0, 0.0);

    /// Crosses the antimeridian (Pacific-centric).
    pub const PACIFIC: (f64, f64, f64, f64) = (160.0, -50.0, -140.0, 50.0);

    /// Invalid bbox (min > max).
    pub const INVALID: (f64, f64, f64, f64) = (10.0, 10.0, 5.0, 5.0);
}

/// Common grid specifications for synthetic mesh fixtures.
pub mod grid {
    /// A global 0.25 degree grid, matching a typical forecast model's
    /// native resolution.
    pub const GLOBAL_QUARTER_DEGREE: GridSpec = GridSpec {
        width: 1440,
        height: 721,
        min_lon: -180.0,
        max_lon: 179.75,
        min_lat: -90.0,
        max_lat: 90.0,
    };

    /// A small 10x10 test grid.
    pub const SIMPLE_10X10: GridSpec = GridSpec {
        width: 10,
        height: 10,
        min_lon: -10.0,
        max_lon: 10.0,
        min_lat: -10.0,
        max_lat: 10.0,
    };

    /// Grid specification for testing.
    #[derive(Debug, Clone, Copy)]
    pub struct GridSpec {
        pub width: usize,
        pub height: usize,
        pub min_lon: f64,
        pub max_lon: f64,
        pub min_lat: f64,
        pub max_lat: f64,
    }

    impl GridSpec {
        /// Returns the total number of grid cells.
        pub fn size(&self) -> usize {
            self.width * self.height
        }

        /// Returns the resolution in degrees.
        pub fn resolution(&self) -> (f64, f64) {
            let dx = (self.max_lon - self.min_lon) / self.width as f64;
            let dy = (self.max_lat - self.min_lat) / self.height as f64;
            (dx, dy)
        }

        /// Returns the bounding box as (min_lon, min_lat, max_lon, max_lat).
        pub fn bbox(&self) -> (f64, f64, f64, f64) {
            (self.min_lon, self.min_lat, self.max_lon, self.max_lat)
        }
    }
}

/// Common isobaric levels and GRIB2 shortName-style parameter labels, used
/// to build synthetic multi-level variable fixtures.
pub mod params {
    /// Standard isobaric levels for upper-air analysis (hPa).
    pub const STANDARD_ISOBARIC: [f64; 7] = [1000.0, 925.0, 850.0, 700.0, 500.0, 300.0, 250.0];

    /// Temperature shortName.
    pub const TMP: &str = "t";

    /// U-component of wind.
    pub const UGRD: &str = "u";

    /// V-component of wind.
    pub const VGRD: &str = "v";

    /// Mean sea level pressure.
    pub const PRMSL: &str = "prmsl";

    /// Total precipitation.
    pub const APCP: &str = "tp";

    /// Relative humidity.
    pub const RH: &str = "r";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_spec_size() {
        assert_eq!(grid::GLOBAL_QUARTER_DEGREE.size(), 1440 * 721);
        assert_eq!(grid::SIMPLE_10X10.size(), 100);
    }

    #[test]
    fn grid_spec_resolution() {
        let (dx, dy) = grid::GLOBAL_QUARTER_DEGREE.resolution();
        assert!((dx - 0.25).abs() < 0.01);
        assert!((dy - 0.25).abs() < 0.01);
    }

    #[test]
    fn standard_isobaric_levels_are_descending() {
        let levels = params::STANDARD_ISOBARIC;
        for w in levels.windows(2) {
            assert!(w[0] > w[1]);
        }
    }
}
