//! Synthetic mesh and field generators for tests that need predictable,
//! verifiable data without a real NetCDF/Zarr/GRIB2 file on disk.

use mesh::{mesh_create, CoordType, Element, Mesh};
use sphere_core::ViewerResult;

/// Builds a structured lon/lat grid: `nx` columns by `ny` rows, evenly
/// spaced across `(min_lon, max_lon)` x `(min_lat, max_lat)`, node order
/// `row * nx + col`.
pub fn structured_lonlat(nx: usize, ny: usize, min_lon: f64, max_lon: f64, min_lat: f64, max_lat: f64) -> (Vec<f64>, Vec<f64>) {
    let mut lon = Vec::with_capacity(nx * ny);
    let mut lat = Vec::with_capacity(nx * ny);
    for row in 0..ny {
        let y = min_lat + (max_lat - min_lat) * row as f64 / (ny.max(2) - 1) as f64;
        for col in 0..nx {
            let x = min_lon + (max_lon - min_lon) * col as f64 / (nx.max(2) - 1) as f64;
            lon.push(x);
            lat.push(y);
        }
    }
    (lon, lat)
}

/// A structured mesh over the given lon/lat extent, with a quad element
/// table connecting every 2x2 block of adjacent nodes.
pub fn structured_mesh_with_quads(nx: usize, ny: usize, min_lon: f64, max_lon: f64, min_lat: f64, max_lat: f64) -> ViewerResult<Mesh> {
    let (lon, lat) = structured_lonlat(nx, ny, min_lon, max_lon, min_lat, max_lat);
    let mut mesh = mesh_create(lon, lat, CoordType::Structured1D, nx, ny)?;
    mesh.elements = quad_elements(nx, ny);
    Ok(mesh)
}

/// Quad connectivity for a structured `nx * ny` grid: one quad per 2x2
/// block of nodes, wound `(row,col) -> (row,col+1) -> (row+1,col+1) ->
/// (row+1,col)`.
pub fn quad_elements(nx: usize, ny: usize) -> Vec<Element> {
    let mut elements = Vec::new();
    if nx < 2 || ny < 2 {
        return elements;
    }
    for row in 0..ny - 1 {
        for col in 0..nx - 1 {
            let a = row * nx + col;
            let b = row * nx + col + 1;
            let c = (row + 1) * nx + col + 1;
            let d = (row + 1) * nx + col;
            elements.push(Element::Quad([a, b, c, d]));
        }
    }
    elements
}

/// A temperature-like field in Kelvin: a gradient from ~250K at the south
/// pole to ~310K at the equator, independent of longitude.
pub fn temperature_field(lat: &[f64]) -> Vec<f64> {
    lat.iter().map(|&l| 280.0 + 30.0 * (1.0 - (l.abs() / 90.0))).collect()
}

/// A wind-speed-like field in m/s: calm near the equator, stronger toward
/// the poles.
pub fn wind_speed_field(lat: &[f64]) -> Vec<f64> {
    lat.iter().map(|&l| (l.abs() / 90.0) * 50.0).collect()
}

/// A deterministic pseudo-random field in `[0, scale)`, mostly zero, akin
/// to a sparse precipitation field. Reproducible for a given `seed`.
pub fn hashed_sparse_field(n: usize, seed: u32, scale: f64) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let hash = simple_hash(i as u32, seed);
            if hash % 4 == 0 {
                (hash % 10_000) as f64 / 10_000.0 * scale
            } else {
                0.0
            }
        })
        .collect()
}

fn simple_hash(x: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_mul(31).wrapping_add(x);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}

/// A field filled with `fill_value` at the given node indices, `value`
/// elsewhere.
pub fn field_with_missing(n: usize, value: f64, fill_value: f64, missing_at: &[usize]) -> Vec<f64> {
    let mut data = vec![value; n];
    for &i in missing_at {
        if i < n {
            data[i] = fill_value;
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_lonlat_spans_requested_extent() {
        let (lon, lat) = structured_lonlat(4, 3, -10.0, 10.0, -5.0, 5.0);
        assert_eq!(lon.len(), 12);
        assert_eq!(lat.len(), 12);
        assert_eq!(lon[0], -10.0);
        assert_eq!(lon[3], 10.0);
        assert_eq!(lat[0], -5.0);
        assert_eq!(lat[9], 5.0);
    }

    #[test]
    fn quad_elements_cover_every_2x2_block() {
        let elements = quad_elements(3, 3);
        assert_eq!(elements.len(), 4);
        assert!(matches!(elements[0], Element::Quad([0, 1, 4, 3])));
    }

    #[test]
    fn quad_elements_empty_below_2x2() {
        assert!(quad_elements(1, 5).is_empty());
        assert!(quad_elements(5, 1).is_empty());
    }

    #[test]
    fn temperature_field_is_warmest_at_equator() {
        let lat = vec![0.0, 45.0, 90.0];
        let field = temperature_field(&lat);
        assert!(field[0] > field[1]);
        assert!(field[1] > field[2]);
    }

    #[test]
    fn hashed_field_is_deterministic() {
        let a = hashed_sparse_field(100, 7, 50.0);
        let b = hashed_sparse_field(100, 7, 50.0);
        assert_eq!(a, b);
        let c = hashed_sparse_field(100, 8, 50.0);
        assert_ne!(a, c);
    }

    #[test]
    fn field_with_missing_marks_requested_nodes() {
        let fill = 1.0e20;
        let field = field_with_missing(5, 1.0, fill, &[0, 4]);
        assert_eq!(field[0], fill);
        assert_eq!(field[4], fill);
        assert_eq!(field[1], 1.0);
    }
}
