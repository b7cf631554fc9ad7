//! The NetCDF [`StorageAdapter`] implementation.

use std::path::{Path, PathBuf};

use mesh::Mesh;
use sphere_core::{is_missing, TimeUnits, ViewerError, ViewerResult, DEFAULT_FILL_VALUE};
use storage::{estimate_range_via_sampling, AxisInfo, DimInfo, StorageAdapter, VariableDescriptor};
use tracing::debug;

use crate::dims::{classify_var_dims, get_f64_attr, get_string_attr, is_coordinate_name, is_nod_dimension, VarDimRoles};
use crate::hdf5_quiet::silence_hdf5_errors;

/// A single open NetCDF store.
///
/// The mesh is built eagerly at open time (the file's lat/lon coordinate
/// arrays are small relative to its data variables) so every later
/// operation can borrow it without re-reading the file's coordinates.
pub struct NetCdfStore {
    path: PathBuf,
    file: netcdf::File,
    mesh: Mesh,
}

impl NetCdfStore {
    /// Open `path`, classifying its coordinate layout into a mesh.
    pub fn open(path: &Path) -> ViewerResult<Self> {
        Self::open_with_mesh(path, None)
    }

    /// Open `path`, sourcing node coordinates from `sep_mesh` instead of
    /// `path` itself (the unstructured-mesh case).
    pub fn open_with_mesh(path: &Path, sep_mesh: Option<&Path>) -> ViewerResult<Self> {
        silence_hdf5_errors();
        let mesh = mesh::mesh_create_from_netcdf(path, sep_mesh)?;
        let file = netcdf::open(path).map_err(|e| ViewerError::StorageOpen {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        debug!(path = %path.display(), n = mesh.n, "opened netcdf store");
        Ok(NetCdfStore {
            path: path.to_path_buf(),
            file,
            mesh,
        })
    }

    fn variable(&self, name: &str) -> ViewerResult<netcdf::Variable<'_>> {
        self.file.variable(name).ok_or_else(|| {
            ViewerError::StorageDecode(format!("variable '{name}' not found in {:?}", self.path))
        })
    }

    fn descriptor_attrs(&self, var: &netcdf::Variable) -> (f64, f64, f64) {
        let fill_value = get_f64_attr(var, "_FillValue")
            .or_else(|| get_f64_attr(var, "missing_value"))
            .unwrap_or(DEFAULT_FILL_VALUE);
        let scale_factor = get_f64_attr(var, "scale_factor").unwrap_or(1.0);
        let add_offset = get_f64_attr(var, "add_offset").unwrap_or(0.0);
        (fill_value, scale_factor, add_offset)
    }

    fn has_spatial_dimension(&self, var: &netcdf::Variable) -> bool {
        let dims = var.dimensions();
        for d in &dims {
            if is_nod_dimension(&d.name()) || d.len() == self.mesh.n {
                return true;
            }
        }
        for i in 0..dims.len() {
            for j in 0..dims.len() {
                if i != j && dims[i].len() * dims[j].len() == self.mesh.n {
                    return true;
                }
            }
        }
        false
    }

    fn axis_info(&self, roles: &VarDimRoles, idx: Option<usize>, dim_name: &str) -> Option<AxisInfo> {
        let idx = idx?;
        let size = roles.shapes[idx];
        let coord_var = self.file.variable(dim_name);
        let coord_values = coord_var
            .as_ref()
            .and_then(|v| v.get_values::<f64, _>(..).ok())
            .unwrap_or_else(|| (0..size).map(|i| i as f64).collect());
        let units = coord_var.as_ref().and_then(|v| get_string_attr(v, "units"));
        Some(AxisInfo {
            size,
            coord_values,
            units,
        })
    }
}

impl StorageAdapter for NetCdfStore {
    fn create_mesh(&self) -> ViewerResult<Mesh> {
        Ok(self.mesh.clone())
    }

    fn scan_variables(&self, _mesh: &Mesh) -> ViewerResult<Vec<VariableDescriptor>> {
        let mut out = Vec::new();
        for var in self.file.variables() {
            let name = var.name();
            if is_coordinate_name(&name) {
                continue;
            }
            if var.dimensions().is_empty() {
                continue;
            }
            if !self.has_spatial_dimension(&var) {
                continue;
            }
            let (fill_value, scale_factor, add_offset) = self.descriptor_attrs(&var);
            out.push(VariableDescriptor {
                name,
                long_name: get_string_attr(&var, "long_name"),
                units: get_string_attr(&var, "units"),
                fill_value,
                scale_factor,
                add_offset,
            });
        }
        Ok(out)
    }

    fn read_slice(&self, var_name: &str, t: usize, d: usize, out: &mut [f64]) -> ViewerResult<()> {
        let var = self.variable(var_name)?;
        let roles = classify_var_dims(&self.file, &var);
        let (fill_value, scale_factor, add_offset) = self.descriptor_attrs(&var);

        let flat: Vec<f64> = var
            .get_values(..)
            .map_err(|e| ViewerError::StorageDecode(e.to_string()))?;

        let strides = roles.strides();
        let mut offset = 0usize;
        if let Some(ti) = roles.time_idx {
            offset += t * strides[ti];
        }
        if let Some(di) = roles.depth_idx {
            offset += d * strides[di];
        }
        // Assumes CF-conventional dim ordering (time, [depth], spatial...)
        // so the spatial block is a contiguous run starting at `offset`.
        let spatial_len = roles.spatial_len();
        if out.len() != spatial_len {
            return Err(ViewerError::AllocFailure(format!(
                "output buffer has {} cells, variable slice has {}",
                out.len(),
                spatial_len
            )));
        }
        let slice = flat
            .get(offset..offset + spatial_len)
            .ok_or_else(|| ViewerError::OutOfRange { index: offset, extent: flat.len() })?;

        for (o, &v) in out.iter_mut().zip(slice) {
            *o = if is_missing(v, fill_value) {
                fill_value
            } else {
                v * scale_factor + add_offset
            };
        }
        Ok(())
    }

    fn estimate_range(&self, var_name: &str) -> ViewerResult<(f64, f64)> {
        let var = self.variable(var_name)?;
        let (fill_value, _, _) = self.descriptor_attrs(&var);
        let roles = classify_var_dims(&self.file, &var);
        let n_times = roles.time_size();
        let spatial_len = roles.spatial_len();
        estimate_range_via_sampling(n_times, spatial_len, fill_value, |t, buf| {
            self.read_slice(var_name, t, 0, buf)
        })
        .map_err(|e| match e {
            ViewerError::RangeEmpty { .. } => ViewerError::RangeEmpty {
                variable: var_name.to_string(),
            },
            other => other,
        })
    }

    fn dim_info(&self, var_name: &str) -> ViewerResult<DimInfo> {
        let var = self.variable(var_name)?;
        let roles = classify_var_dims(&self.file, &var);
        let dims = var.dimensions();
        let time_dim_name = roles.time_idx.map(|i| dims[i].name());
        let depth_dim_name = roles.depth_idx.map(|i| dims[i].name());
        Ok(DimInfo {
            time: time_dim_name.and_then(|n| self.axis_info(&roles, roles.time_idx, &n)),
            depth: depth_dim_name.and_then(|n| self.axis_info(&roles, roles.depth_idx, &n)),
        })
    }

    fn read_timeseries(
        &self,
        var_name: &str,
        node: usize,
        d: usize,
    ) -> ViewerResult<(Vec<f64>, Vec<f64>, Vec<bool>)> {
        let var = self.variable(var_name)?;
        let roles = classify_var_dims(&self.file, &var);
        let (fill_value, scale_factor, add_offset) = self.descriptor_attrs(&var);
        let flat: Vec<f64> = var
            .get_values(..)
            .map_err(|e| ViewerError::StorageDecode(e.to_string()))?;
        let strides = roles.strides();
        let n_times = roles.time_size();

        let dim_info = self.dim_info(var_name)?;
        let times = dim_info
            .time
            .map(|a| a.coord_values)
            .unwrap_or_else(|| vec![0.0]);

        let mut values = Vec::with_capacity(n_times);
        let mut valid = Vec::with_capacity(n_times);
        for t in 0..n_times {
            let mut offset = 0usize;
            if let Some(ti) = roles.time_idx {
                offset += t * strides[ti];
            }
            if let Some(di) = roles.depth_idx {
                offset += d * strides[di];
            }
            offset += node;
            match flat.get(offset) {
                Some(&raw) if !is_missing(raw, fill_value) => {
                    values.push(raw * scale_factor + add_offset);
                    valid.push(true);
                }
                _ => {
                    values.push(fill_value);
                    valid.push(false);
                }
            }
        }
        Ok((times, values, valid))
    }

    fn close(&mut self) -> ViewerResult<()> {
        Ok(())
    }
}

/// Convert a coordinate axis's raw CF units string into a [`TimeUnits`],
/// used by the fileset aggregator when normalizing across stores.
pub fn time_units_of(store: &NetCdfStore, var_name: &str) -> Option<TimeUnits> {
    let var = store.variable(var_name).ok()?;
    let units = get_string_attr(&var, "units")?;
    sphere_core::parse_time_units(&units)
}
