//! `mesh_create_from_netcdf`: classify a NetCDF file's coordinate layout and
//! build a [`Mesh`] from it.

use std::path::Path;

use sphere_core::{ViewerError, ViewerResult};
use tracing::debug;

use crate::{mesh_create, CoordType, Mesh};

const LAT_NAMES: &[&str] = &["lat", "latitude", "y"];
const LON_NAMES: &[&str] = &["lon", "longitude", "x"];

/// Inspect `file`'s dimensions and coordinate variables and build a [`Mesh`]
/// from whichever of structured-1D, curvilinear-2D, or unstructured-1D
/// layout its `lat`/`lon` variables match. `sep_mesh`, when given, is a
/// second file supplying node coordinates for an unstructured mesh whose
/// data file carries no coordinate variables of its own.
pub fn mesh_create_from_netcdf(file: &Path, sep_mesh: Option<&Path>) -> ViewerResult<Mesh> {
    let nc = open(file)?;
    let coord_source = match sep_mesh {
        Some(p) => open(p)?,
        None => nc,
    };

    let lat_var = find_variable(&coord_source, LAT_NAMES).ok_or_else(|| {
        ViewerError::InvalidMesh(format!("no latitude coordinate variable in {:?}", file))
    })?;
    let lon_var = find_variable(&coord_source, LON_NAMES).ok_or_else(|| {
        ViewerError::InvalidMesh(format!("no longitude coordinate variable in {:?}", file))
    })?;

    let lat_dims = dim_lens(&lat_var);
    let lon_dims = dim_lens(&lon_var);

    if lat_dims.len() == 1 && lon_dims.len() == 1 && lat_dims[0].1 != lon_dims[0].1 {
        let ny = lat_dims[0].1;
        let nx = lon_dims[0].1;
        debug!(nx, ny, "classified mesh as structured-1D");
        let lat1d: Vec<f64> = lat_var
            .get_values(..)
            .map_err(|e| ViewerError::StorageDecode(e.to_string()))?;
        let lon1d: Vec<f64> = lon_var
            .get_values(..)
            .map_err(|e| ViewerError::StorageDecode(e.to_string()))?;
        let mut lon = Vec::with_capacity(nx * ny);
        let mut lat = Vec::with_capacity(nx * ny);
        for row in 0..ny {
            for col in 0..nx {
                lon.push(lon1d[col]);
                lat.push(lat1d[row]);
            }
        }
        return mesh_create(lon, lat, CoordType::Structured1D, nx, ny);
    }

    if lat_dims.len() == 2 && lon_dims.len() == 2 {
        let (ny, nx) = (lat_dims[0].1, lat_dims[1].1);
        if (ny, nx) != (lon_dims[0].1, lon_dims[1].1) {
            return Err(ViewerError::InvalidMesh(
                "curvilinear lat/lon shapes disagree".into(),
            ));
        }
        debug!(nx, ny, "classified mesh as curvilinear-2D");
        let lat2d: Vec<f64> = lat_var
            .get_values(..)
            .map_err(|e| ViewerError::StorageDecode(e.to_string()))?;
        let lon2d: Vec<f64> = lon_var
            .get_values(..)
            .map_err(|e| ViewerError::StorageDecode(e.to_string()))?;
        return mesh_create(lon2d, lat2d, CoordType::Curvilinear2D, nx, ny);
    }

    if lat_dims.len() == 1 && lon_dims.len() == 1 && lat_dims[0].1 == lon_dims[0].1 {
        let n = lat_dims[0].1;
        debug!(n, dim = %lat_dims[0].0, "classified mesh as unstructured-1D");
        let lat: Vec<f64> = lat_var
            .get_values(..)
            .map_err(|e| ViewerError::StorageDecode(e.to_string()))?;
        let lon: Vec<f64> = lon_var
            .get_values(..)
            .map_err(|e| ViewerError::StorageDecode(e.to_string()))?;
        return mesh_create(lon, lat, CoordType::Unstructured1D, n, 1);
    }

    Err(ViewerError::InvalidMesh(format!(
        "could not classify lat/lon layout (lat dims {:?}, lon dims {:?})",
        lat_dims, lon_dims
    )))
}

fn open(path: &Path) -> ViewerResult<netcdf::File> {
    netcdf::open(path).map_err(|e| ViewerError::StorageOpen {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn find_variable<'f>(file: &'f netcdf::File, candidates: &[&str]) -> Option<netcdf::Variable<'f>> {
    for name in candidates {
        if let Some(v) = file.variable(name) {
            return Some(v);
        }
    }
    None
}

fn dim_lens(var: &netcdf::Variable) -> Vec<(String, usize)> {
    var.dimensions()
        .iter()
        .map(|d| (d.name(), d.len()))
        .collect()
}
