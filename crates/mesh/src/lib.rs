//! Mesh coordinate storage and the Cartesian embedding used by the spatial
//! index and the regridder.

mod from_netcdf;

pub use from_netcdf::mesh_create_from_netcdf;

use geometry::{to_cartesian_batch, wrap_longitude};
use sphere_core::{ViewerError, ViewerResult};

/// How a mesh's node coordinates relate to the underlying storage grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordType {
    /// `lon`/`lat` are 1-D with distinct sizes; node `row*nx+col`.
    Structured1D,
    /// `lon`/`lat` are 2-D with shape `(ny, nx)`.
    Curvilinear2D,
    /// `lon`/`lat` are 1-D, same length, indexed directly by node.
    Unstructured1D,
}

/// A mesh element: the node indices of one triangle or quad face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element {
    Triangle([usize; 3]),
    Quad([usize; 4]),
}

/// A set of mesh nodes plus their unit-sphere embedding, and (optionally) an
/// element connectivity table used for polygon rendering.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub n: usize,
    pub lon: Vec<f64>,
    pub lat: Vec<f64>,
    /// Flat `[x0,y0,z0, x1,y1,z1, ...]`, length `3*n`.
    pub xyz: Vec<f64>,
    pub coord_type: CoordType,
    pub orig_nx: usize,
    pub orig_ny: usize,
    pub elements: Vec<Element>,
}

impl Mesh {
    /// The Cartesian embedding of node `i`.
    pub fn node_xyz(&self, i: usize) -> [f64; 3] {
        [self.xyz[i * 3], self.xyz[i * 3 + 1], self.xyz[i * 3 + 2]]
    }

    /// Whether polygon rendering is possible: the mesh carries element
    /// connectivity.
    pub fn polygon_available(&self) -> bool {
        !self.elements.is_empty()
    }

    /// Structured-mesh row/col decomposition of a node index, using
    /// `orig_nx`. Used by time-series reads against structured 2-D meshes.
    pub fn row_col(&self, node_index: usize) -> (usize, usize) {
        (node_index / self.orig_nx, node_index % self.orig_nx)
    }
}

/// Build a mesh from owned coordinate arrays. `orig_nx`/`orig_ny` describe
/// the originating grid shape for structured/curvilinear meshes; pass
/// `(n, 1)` for unstructured data.
pub fn mesh_create(
    lon: Vec<f64>,
    lat: Vec<f64>,
    coord_type: CoordType,
    orig_nx: usize,
    orig_ny: usize,
) -> ViewerResult<Mesh> {
    if lon.len() != lat.len() {
        return Err(ViewerError::InvalidMesh(format!(
            "lon/lat length mismatch: {} vs {}",
            lon.len(),
            lat.len()
        )));
    }
    if lon.is_empty() {
        return Err(ViewerError::InvalidMesh("empty coordinate arrays".into()));
    }
    let lon: Vec<f64> = lon.into_iter().map(wrap_longitude).collect();
    let xyz = to_cartesian_batch(&lon, &lat);
    let n = lon.len();
    Ok(Mesh {
        n,
        lon,
        lat,
        xyz,
        coord_type,
        orig_nx,
        orig_ny,
        elements: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_create_wraps_longitude_and_embeds() {
        let lon = vec![200.0, -200.0, 0.0];
        let lat = vec![0.0, 0.0, 90.0];
        let mesh = mesh_create(lon, lat, CoordType::Unstructured1D, 3, 1).unwrap();
        assert_eq!(mesh.n, 3);
        assert!((mesh.lon[0] - (-160.0)).abs() < 1e-12);
        assert!((mesh.lon[1] - 160.0).abs() < 1e-12);
        for i in 0..mesh.n {
            let p = mesh.node_xyz(i);
            let norm = p[0] * p[0] + p[1] * p[1] + p[2] * p[2];
            assert!((norm - 1.0).abs() < 1e-10);
        }
        assert!(!mesh.polygon_available());
    }

    #[test]
    fn mismatched_lengths_fail() {
        let err = mesh_create(vec![0.0, 1.0], vec![0.0], CoordType::Unstructured1D, 2, 1)
            .unwrap_err();
        assert!(matches!(err, ViewerError::InvalidMesh(_)));
    }

    #[test]
    fn row_col_decomposition() {
        let lon = vec![0.0; 12];
        let lat = vec![0.0; 12];
        let mesh = mesh_create(lon, lat, CoordType::Structured1D, 4, 3).unwrap();
        assert_eq!(mesh.row_col(0), (0, 0));
        assert_eq!(mesh.row_col(5), (1, 1));
        assert_eq!(mesh.row_col(11), (2, 3));
    }
}
