//! Nearest-neighbor regridding of a mesh's sample points onto a fixed
//! equirectangular raster.
//!
//! A [`Regridder`] is built once per `(mesh, resolution, influence_radius)`
//! triple and then applied to every time/depth slice drawn from that mesh,
//! so the expensive k-d tree query work happens only at build time.

use geometry::{meters_to_chord, to_cartesian};
use mesh::Mesh;
use spatial_index::KdTree;
use tracing::debug;

/// Magnitude above which a source value is treated as missing during
/// [`Regridder::apply`], independent of any fill-value convention the
/// source array itself uses.
const APPLY_MISSING_THRESHOLD: f64 = 1.0e10;

/// A precomputed nearest-neighbor mapping from equirectangular raster cells
/// back to mesh node indices.
#[derive(Debug, Clone)]
pub struct Regridder {
    nx: usize,
    ny: usize,
    dlon: f64,
    dlat: f64,
    nn_idx: Vec<usize>,
    nn_dist: Vec<f64>,
    valid_mask: Vec<bool>,
}

impl Regridder {
    /// Build a regridder targeting a `resolution_deg`-wide/tall
    /// equirectangular raster. A target cell is only filled from a mesh
    /// node whose chord distance to the cell center is within
    /// `influence_radius_meters`; cells with no node in range stay invalid
    /// and are filled with the fill value on every [`apply`](Self::apply).
    pub fn build(mesh: &Mesh, resolution_deg: f64, influence_radius_meters: f64) -> Self {
        let nx = (360.0 / resolution_deg).floor() as usize;
        let ny = (180.0 / resolution_deg).floor() as usize;
        let dlon = 360.0 / nx as f64;
        let dlat = 180.0 / ny as f64;

        let points: Vec<[f64; 3]> = (0..mesh.n).map(|i| mesh.node_xyz(i)).collect();
        let tree = KdTree::build(points);
        let influence_chord = meters_to_chord(influence_radius_meters);

        let mut nn_idx = vec![0usize; nx * ny];
        let mut nn_dist = vec![f64::MAX; nx * ny];
        let mut valid_mask = vec![false; nx * ny];

        for j in 0..ny {
            let lat = -90.0 + (j as f64 + 0.5) * dlat;
            for i in 0..nx {
                let lon = -180.0 + (i as f64 + 0.5) * dlon;
                let p = to_cartesian(lon, lat);
                let (idx, dist) = tree.nearest([p.x, p.y, p.z]);
                let cell = j * nx + i;
                nn_idx[cell] = idx;
                nn_dist[cell] = dist;
                valid_mask[cell] = dist <= influence_chord;
            }
        }

        debug!(nx, ny, n_nodes = mesh.n, influence_radius_meters, "built regridder");
        Regridder {
            nx,
            ny,
            dlon,
            dlat,
            nn_idx,
            nn_dist,
            valid_mask,
        }
    }

    /// Target raster width.
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Target raster height.
    pub fn ny(&self) -> usize {
        self.ny
    }

    /// Cell width in degrees.
    pub fn dlon(&self) -> f64 {
        self.dlon
    }

    /// Cell height in degrees.
    pub fn dlat(&self) -> f64 {
        self.dlat
    }

    /// The output raster's flat length, `nx * ny`.
    pub fn len(&self) -> usize {
        self.nx * self.ny
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The lon/lat center of target cell `(i, j)`.
    pub fn cell_center(&self, i: usize, j: usize) -> (f64, f64) {
        (
            -180.0 + (i as f64 + 0.5) * self.dlon,
            -90.0 + (j as f64 + 0.5) * self.dlat,
        )
    }

    /// Chord distance from cell `cell`'s center to its nearest mesh node.
    pub fn nearest_distance(&self, cell: usize) -> f64 {
        self.nn_dist[cell]
    }

    /// Regrid `source` (one value per mesh node) into `out`, which must be
    /// at least [`len`](Self::len) long. A cell is filled with
    /// `fill_value` when it has no node within the influence radius, or
    /// when its nearest node's value exceeds the missing-data magnitude
    /// threshold.
    pub fn apply(&self, source: &[f64], fill_value: f64, out: &mut [f64]) {
        for cell in 0..self.len() {
            let idx = self.nn_idx[cell];
            let value = source[idx];
            out[cell] = if !self.valid_mask[cell] || value.abs() >= APPLY_MISSING_THRESHOLD {
                fill_value
            } else {
                value
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh::{mesh_create, CoordType};

    #[test]
    fn target_dims_match_floor_formula() {
        let mesh = mesh_create(vec![0.0], vec![0.0], CoordType::Unstructured1D, 1, 1).unwrap();
        let r = Regridder::build(&mesh, 10.0, 1.0);
        assert_eq!(r.nx(), 36);
        assert_eq!(r.ny(), 18);
        assert_eq!(r.len(), 36 * 18);
    }

    #[test]
    fn cell_centers_follow_half_cell_offset() {
        let mesh = mesh_create(vec![0.0], vec![0.0], CoordType::Unstructured1D, 1, 1).unwrap();
        let r = Regridder::build(&mesh, 10.0, 1.0);
        let (lon, lat) = r.cell_center(0, 0);
        assert!((lon - (-175.0)).abs() < 1e-9);
        assert!((lat - (-85.0)).abs() < 1e-9);
        let (lon, lat) = r.cell_center(35, 17);
        assert!((lon - 175.0).abs() < 1e-9);
        assert!((lat - 85.0).abs() < 1e-9);
    }

    #[test]
    fn identity_regrid_reproduces_source_when_nodes_sit_on_cell_centers() {
        // The single node sits exactly on cell (0,0)'s center (chord 0), so a
        // tight influence radius picks it up while every other cell, at
        // least one grid spacing (~10 degrees) away, stays outside it.
        let mesh = mesh_create(vec![-175.0], vec![-85.0], CoordType::Unstructured1D, 1, 1).unwrap();
        let r = Regridder::build(&mesh, 10.0, 1_000.0);
        let source = vec![42.0];
        let mut out = vec![0.0; r.len()];
        r.apply(&source, -999.0, &mut out);
        assert_eq!(out[0], 42.0);
        assert!(out[1..].iter().all(|&v| v == -999.0));
    }

    #[test]
    fn identity_regrid_reproduces_source_for_every_cell_when_points_cover_the_grid() {
        // One source node at every cell center of a small 4x2 raster: with
        // an influence radius that comfortably covers a quarter cell, every
        // cell's nearest neighbor is its own node and reproduces its value.
        let resolution = 90.0;
        let probe = Regridder::build(
            &mesh_create(vec![0.0], vec![0.0], CoordType::Unstructured1D, 1, 1).unwrap(),
            resolution,
            1.0,
        );
        let (nx, ny) = (probe.nx(), probe.ny());

        let mut lon = Vec::with_capacity(nx * ny);
        let mut lat = Vec::with_capacity(nx * ny);
        for j in 0..ny {
            for i in 0..nx {
                let (clon, clat) = probe.cell_center(i, j);
                lon.push(clon);
                lat.push(clat);
            }
        }
        let mesh = mesh_create(lon, lat, CoordType::Unstructured1D, nx, ny).unwrap();
        let r = Regridder::build(&mesh, resolution, 50_000.0);

        let source: Vec<f64> = (0..mesh.n).map(|i| i as f64).collect();
        let mut out = vec![f64::NAN; r.len()];
        r.apply(&source, -999.0, &mut out);
        for cell in 0..r.len() {
            assert_eq!(out[cell], source[cell]);
        }
    }

    #[test]
    fn cells_outside_influence_radius_get_fill_value() {
        let mesh = mesh_create(vec![0.0], vec![0.0], CoordType::Unstructured1D, 1, 1).unwrap();
        let r = Regridder::build(&mesh, 10.0, 1.0);
        let source = vec![7.0];
        let mut out = vec![1.0; r.len()];
        r.apply(&source, -1.0, &mut out);
        assert!(out.iter().all(|&v| v == -1.0));
    }

    #[test]
    fn large_source_magnitude_is_treated_as_missing() {
        let mesh = mesh_create(vec![-175.0], vec![-85.0], CoordType::Unstructured1D, 1, 1).unwrap();
        let r = Regridder::build(&mesh, 10.0, 1.0e9);
        let source = vec![1.0e11];
        let mut out = vec![0.0; r.len()];
        r.apply(&source, -999.0, &mut out);
        assert_eq!(out[0], -999.0);
    }
}
