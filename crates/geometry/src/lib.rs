//! Spherical geometry primitives shared by mesh construction and the regridder.
//!
//! Implements the lon/lat <-> unit-sphere Cartesian mapping and the
//! meters-to-chord conversion used to express influence radii as chord
//! distances, from scratch without external dependencies.

use std::f64::consts::PI;

/// Mean Earth radius, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A point on the unit sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cartesian {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Wrap a longitude in degrees to `(-180, 180]`.
pub fn wrap_longitude(lon_deg: f64) -> f64 {
    let mut lon = lon_deg % 360.0;
    if lon <= -180.0 {
        lon += 360.0;
    } else if lon > 180.0 {
        lon -= 360.0;
    }
    lon
}

/// Convert a single lon/lat pair (degrees) to unit-sphere Cartesian coordinates.
pub fn to_cartesian(lon_deg: f64, lat_deg: f64) -> Cartesian {
    let lambda = lon_deg * PI / 180.0;
    let phi = lat_deg * PI / 180.0;
    let cos_phi = phi.cos();
    Cartesian {
        x: cos_phi * lambda.cos(),
        y: cos_phi * lambda.sin(),
        z: phi.sin(),
    }
}

/// Convert parallel `lon`/`lat` arrays into a flat `xyz` array (length `3*n`).
///
/// Produces bit-identical results to calling [`to_cartesian`] per point; this
/// exists purely so mesh construction has a single call site to batch over.
pub fn to_cartesian_batch(lon_deg: &[f64], lat_deg: &[f64]) -> Vec<f64> {
    assert_eq!(lon_deg.len(), lat_deg.len());
    let mut xyz = Vec::with_capacity(lon_deg.len() * 3);
    for (&lon, &lat) in lon_deg.iter().zip(lat_deg) {
        let p = to_cartesian(lon, lat);
        xyz.push(p.x);
        xyz.push(p.y);
        xyz.push(p.z);
    }
    xyz
}

/// Convert a great-circle-adjacent distance in meters to the equivalent
/// straight-line (chord) distance on the unit sphere.
pub fn meters_to_chord(meters: f64) -> f64 {
    2.0 * ((meters / EARTH_RADIUS_METERS) / 2.0).sin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_cartesian_lies_on_unit_sphere() {
        for lon in (-180..=180).step_by(17) {
            for lat in (-90..=90).step_by(13) {
                let p = to_cartesian(lon as f64, lat as f64);
                let norm = p.x * p.x + p.y * p.y + p.z * p.z;
                assert!((norm - 1.0).abs() < 1e-10, "lon={lon} lat={lat} norm={norm}");
            }
        }
    }

    #[test]
    fn known_points() {
        let equator_prime = to_cartesian(0.0, 0.0);
        assert!((equator_prime.x - 1.0).abs() < 1e-12);
        assert!(equator_prime.y.abs() < 1e-12);
        assert!(equator_prime.z.abs() < 1e-12);

        let north_pole = to_cartesian(0.0, 90.0);
        assert!(north_pole.x.abs() < 1e-12);
        assert!(north_pole.y.abs() < 1e-12);
        assert!((north_pole.z - 1.0).abs() < 1e-12);
    }

    #[test]
    fn batch_matches_scalar() {
        let lons: Vec<f64> = (-180..180).map(|v| v as f64 * 0.5).collect();
        let lats: Vec<f64> = lons.iter().map(|&l| (l / 4.0).clamp(-90.0, 90.0)).collect();
        let batch = to_cartesian_batch(&lons, &lats);
        for (i, (&lon, &lat)) in lons.iter().zip(&lats).enumerate() {
            let p = to_cartesian(lon, lat);
            assert_eq!(batch[i * 3], p.x);
            assert_eq!(batch[i * 3 + 1], p.y);
            assert_eq!(batch[i * 3 + 2], p.z);
        }
    }

    #[test]
    fn wrap_longitude_keeps_range() {
        assert_eq!(wrap_longitude(180.0), 180.0);
        assert!((wrap_longitude(181.0) - (-179.0)).abs() < 1e-12);
        assert!((wrap_longitude(-181.0) - 179.0).abs() < 1e-12);
        assert!((wrap_longitude(360.0) - 0.0).abs() < 1e-12);
        assert!((wrap_longitude(-180.0) - 180.0).abs() < 1e-12);
    }

    #[test]
    fn meters_to_chord_zero_and_half_circumference() {
        assert!((meters_to_chord(0.0)).abs() < 1e-15);
        let half_circ = PI * EARTH_RADIUS_METERS;
        // Antipodal points: chord length should approach the sphere's diameter (2.0).
        assert!((meters_to_chord(half_circ) - 2.0).abs() < 1e-9);
    }
}
