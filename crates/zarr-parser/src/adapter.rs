//! The Zarr v2 [`StorageAdapter`] implementation.

use std::path::{Path, PathBuf};

use mesh::{mesh_create, CoordType, Mesh};
use serde_json::{Map, Value};
use sphere_core::{is_missing, ViewerError, ViewerResult};
use storage::{estimate_range_via_sampling, AxisInfo, DimInfo, StorageAdapter, VariableDescriptor};
use tracing::debug;

use crate::chunks::{read_full, read_hyperslab};
use crate::consolidated::ConsolidatedMetadata;
use crate::dims::{classify_dim_role, dim_names, get_f64_attr, get_string_attr, is_coordinate_name, is_nod_dimension, DimRole};
use crate::header::ZArrayHeader;

const LAT_NAMES: &[&str] = &["lat", "latitude"];
const LON_NAMES: &[&str] = &["lon", "longitude"];

struct LoadedArray {
    header: ZArrayHeader,
    attrs: Map<String, Value>,
    array_dir: PathBuf,
}

/// A Zarr v2 directory store.
pub struct ZarrStore {
    root: PathBuf,
    consolidated: Option<ConsolidatedMetadata>,
    mesh: Mesh,
}

impl ZarrStore {
    pub fn open(root: &Path) -> ViewerResult<Self> {
        let consolidated = ConsolidatedMetadata::load(root);
        if consolidated.is_some() {
            debug!(root = %root.display(), "using consolidated zarr metadata");
        }
        let placeholder_root = root.to_path_buf();
        let mut store = ZarrStore {
            root: placeholder_root,
            consolidated,
            mesh: empty_mesh(),
        };
        store.mesh = store.build_mesh()?;
        Ok(store)
    }

    fn load_array(&self, name: &str) -> ViewerResult<LoadedArray> {
        let array_dir = self.root.join(name);
        if let Some(c) = &self.consolidated {
            let zarray = c.zarray(name).ok_or_else(|| {
                ViewerError::StorageDecode(format!("no .zarray entry for '{name}' in consolidated metadata"))
            })?;
            let header = ZArrayHeader::parse(&zarray.to_string())?;
            let attrs = c
                .zattrs(name)
                .and_then(|v| v.as_object().cloned())
                .unwrap_or_default();
            return Ok(LoadedArray { header, attrs, array_dir });
        }

        let zarray_text = std::fs::read_to_string(array_dir.join(".zarray")).map_err(|e| {
            ViewerError::StorageOpen {
                path: array_dir.display().to_string(),
                reason: e.to_string(),
            }
        })?;
        let header = ZArrayHeader::parse(&zarray_text)?;
        let attrs = std::fs::read_to_string(array_dir.join(".zattrs"))
            .ok()
            .and_then(|s| serde_json::from_str::<Value>(&s).ok())
            .and_then(|v| v.as_object().cloned())
            .unwrap_or_default();
        Ok(LoadedArray { header, attrs, array_dir })
    }

    fn array_names(&self) -> ViewerResult<Vec<String>> {
        if let Some(c) = &self.consolidated {
            return Ok(c.array_names());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root).map_err(|e| ViewerError::StorageOpen {
            path: self.root.display().to_string(),
            reason: e.to_string(),
        })? {
            let entry = entry.map_err(|e| ViewerError::StorageDecode(e.to_string()))?;
            if entry.path().join(".zarray").exists() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn find_coord(&self, names: &[&str]) -> ViewerResult<Option<(String, LoadedArray)>> {
        for candidate in names {
            if let Ok(arr) = self.load_array(candidate) {
                return Ok(Some((candidate.to_string(), arr)));
            }
        }
        Ok(None)
    }

    fn build_mesh(&self) -> ViewerResult<Mesh> {
        let (_, lat_arr) = self
            .find_coord(LAT_NAMES)?
            .ok_or_else(|| ViewerError::InvalidMesh("no latitude array in zarr store".to_string()))?;
        let (_, lon_arr) = self
            .find_coord(LON_NAMES)?
            .ok_or_else(|| ViewerError::InvalidMesh("no longitude array in zarr store".to_string()))?;

        let lat_shape = lat_arr.header.shape.clone();
        let lon_shape = lon_arr.header.shape.clone();
        let lat_values = read_full(&lat_arr.array_dir, &lat_arr.header)?;
        let lon_values = read_full(&lon_arr.array_dir, &lon_arr.header)?;

        if lat_shape.len() == 1 && lon_shape.len() == 1 && lat_shape[0] != lon_shape[0] {
            let ny = lat_shape[0];
            let nx = lon_shape[0];
            let mut lon = Vec::with_capacity(nx * ny);
            let mut lat = Vec::with_capacity(nx * ny);
            for row in 0..ny {
                for col in 0..nx {
                    lon.push(lon_values[col]);
                    lat.push(lat_values[row]);
                }
            }
            return mesh_create(lon, lat, CoordType::Structured1D, nx, ny);
        }

        if lat_shape.len() == 2 && lon_shape.len() == 2 && lat_shape == lon_shape {
            let ny = lat_shape[0];
            let nx = lat_shape[1];
            return mesh_create(lon_values, lat_values, CoordType::Curvilinear2D, nx, ny);
        }

        if lat_shape.len() == 1 && lon_shape.len() == 1 && lat_shape[0] == lon_shape[0] {
            let n = lat_shape[0];
            return mesh_create(lon_values, lat_values, CoordType::Unstructured1D, n, 1);
        }

        Err(ViewerError::InvalidMesh(format!(
            "could not classify zarr lat/lon layout (lat shape {:?}, lon shape {:?})",
            lat_shape, lon_shape
        )))
    }

    fn has_spatial_dimension(&self, arr: &LoadedArray) -> bool {
        let names = dim_names(&arr.attrs, arr.header.shape.len());
        for (i, name) in names.iter().enumerate() {
            if is_nod_dimension(name) || arr.header.shape[i] == self.mesh.n {
                return true;
            }
        }
        let shape = &arr.header.shape;
        for i in 0..shape.len() {
            for j in 0..shape.len() {
                if i != j && shape[i] * shape[j] == self.mesh.n {
                    return true;
                }
            }
        }
        false
    }

    fn dim_roles(&self, arr: &LoadedArray) -> (Option<usize>, Option<usize>) {
        let names = dim_names(&arr.attrs, arr.header.shape.len());
        let mut time_idx = None;
        let mut depth_idx = None;
        for (i, name) in names.iter().enumerate() {
            let role = classify_dim_role(name, |candidate| {
                self.load_array(candidate).ok().map(|a| a.attrs)
            });
            match role {
                Some(DimRole::Time) if time_idx.is_none() => time_idx = Some(i),
                Some(DimRole::Depth) if depth_idx.is_none() => depth_idx = Some(i),
                _ => {}
            }
        }
        (time_idx, depth_idx)
    }
}

fn empty_mesh() -> Mesh {
    Mesh {
        n: 0,
        lon: Vec::new(),
        lat: Vec::new(),
        xyz: Vec::new(),
        coord_type: CoordType::Unstructured1D,
        orig_nx: 0,
        orig_ny: 0,
        elements: Vec::new(),
    }
}

impl StorageAdapter for ZarrStore {
    fn create_mesh(&self) -> ViewerResult<Mesh> {
        Ok(self.mesh.clone())
    }

    fn scan_variables(&self, _mesh: &Mesh) -> ViewerResult<Vec<VariableDescriptor>> {
        let mut out = Vec::new();
        for name in self.array_names()? {
            if is_coordinate_name(&name) {
                continue;
            }
            let arr = match self.load_array(&name) {
                Ok(a) => a,
                Err(_) => continue,
            };
            if arr.header.shape.is_empty() || !self.has_spatial_dimension(&arr) {
                continue;
            }
            out.push(VariableDescriptor {
                name,
                long_name: get_string_attr(&arr.attrs, "long_name"),
                units: get_string_attr(&arr.attrs, "units"),
                fill_value: get_f64_attr(&arr.attrs, "_FillValue").unwrap_or(arr.header.fill_value),
                scale_factor: get_f64_attr(&arr.attrs, "scale_factor").unwrap_or(1.0),
                add_offset: get_f64_attr(&arr.attrs, "add_offset").unwrap_or(0.0),
            });
        }
        Ok(out)
    }

    fn read_slice(&self, var: &str, t: usize, d: usize, out: &mut [f64]) -> ViewerResult<()> {
        let arr = self.load_array(var)?;
        let (time_idx, depth_idx) = self.dim_roles(&arr);
        let fill_value = get_f64_attr(&arr.attrs, "_FillValue").unwrap_or(arr.header.fill_value);
        let scale_factor = get_f64_attr(&arr.attrs, "scale_factor").unwrap_or(1.0);
        let add_offset = get_f64_attr(&arr.attrs, "add_offset").unwrap_or(0.0);

        let ndim = arr.header.shape.len();
        let mut start = vec![0usize; ndim];
        let mut count = arr.header.shape.clone();
        if let Some(i) = time_idx {
            start[i] = t;
            count[i] = 1;
        }
        if let Some(i) = depth_idx {
            start[i] = d;
            count[i] = 1;
        }

        let slab = read_hyperslab(&arr.array_dir, &arr.header, &start, &count)?;
        if slab.len() != out.len() {
            return Err(ViewerError::AllocFailure(format!(
                "output buffer has {} cells, slice has {}",
                out.len(),
                slab.len()
            )));
        }
        for (o, &v) in out.iter_mut().zip(&slab) {
            *o = if is_missing(v, fill_value) {
                fill_value
            } else {
                v * scale_factor + add_offset
            };
        }
        Ok(())
    }

    fn estimate_range(&self, var: &str) -> ViewerResult<(f64, f64)> {
        let arr = self.load_array(var)?;
        let (time_idx, depth_idx) = self.dim_roles(&arr);
        let fill_value = get_f64_attr(&arr.attrs, "_FillValue").unwrap_or(arr.header.fill_value);
        let n_times = time_idx.map(|i| arr.header.shape[i]).unwrap_or(1);
        let spatial_len: usize = arr
            .header
            .shape
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != time_idx && Some(*i) != depth_idx)
            .map(|(_, s)| *s)
            .product();
        estimate_range_via_sampling(n_times, spatial_len, fill_value, |t, buf| {
            self.read_slice(var, t, 0, buf)
        })
        .map_err(|e| match e {
            ViewerError::RangeEmpty { .. } => ViewerError::RangeEmpty { variable: var.to_string() },
            other => other,
        })
    }

    fn dim_info(&self, var: &str) -> ViewerResult<DimInfo> {
        let arr = self.load_array(var)?;
        let (time_idx, depth_idx) = self.dim_roles(&arr);
        let names = dim_names(&arr.attrs, arr.header.shape.len());

        let time = time_idx.map(|i| self.axis_info(&names[i], arr.header.shape[i]));
        let depth = depth_idx.map(|i| self.axis_info(&names[i], arr.header.shape[i]));
        Ok(DimInfo { time, depth })
    }

    fn read_timeseries(&self, var: &str, node: usize, d: usize) -> ViewerResult<(Vec<f64>, Vec<f64>, Vec<bool>)> {
        let arr = self.load_array(var)?;
        let (time_idx, depth_idx) = self.dim_roles(&arr);
        let fill_value = get_f64_attr(&arr.attrs, "_FillValue").unwrap_or(arr.header.fill_value);
        let scale_factor = get_f64_attr(&arr.attrs, "scale_factor").unwrap_or(1.0);
        let add_offset = get_f64_attr(&arr.attrs, "add_offset").unwrap_or(0.0);
        let n_times = time_idx.map(|i| arr.header.shape[i]).unwrap_or(1);

        let dim_info = self.dim_info(var)?;
        let times = dim_info.time.map(|a| a.coord_values).unwrap_or_else(|| vec![0.0]);

        let mut values = Vec::with_capacity(n_times);
        let mut valid = Vec::with_capacity(n_times);
        let mut buf = vec![0.0f64; 1];
        for t in 0..n_times {
            let ndim = arr.header.shape.len();
            let mut start = vec![0usize; ndim];
            let count = vec![1usize; ndim];
            if let Some(i) = time_idx {
                start[i] = t;
            }
            if let Some(i) = depth_idx {
                start[i] = d;
            }
            // node indexes the remaining (spatial) axis directly; for
            // multi-axis spatial layouts this assumes a single flattened
            // spatial dimension, matching the unstructured-mesh case.
            for (i, s) in start.iter_mut().enumerate() {
                if Some(i) != time_idx && Some(i) != depth_idx {
                    *s = node;
                }
            }
            let slab = read_hyperslab(&arr.array_dir, &arr.header, &start, &count)?;
            buf[0] = slab[0];
            if is_missing(buf[0], fill_value) {
                values.push(fill_value);
                valid.push(false);
            } else {
                values.push(buf[0] * scale_factor + add_offset);
                valid.push(true);
            }
        }
        Ok((times, values, valid))
    }

    fn close(&mut self) -> ViewerResult<()> {
        Ok(())
    }
}

impl ZarrStore {
    fn axis_info(&self, dim_name: &str, size: usize) -> AxisInfo {
        match self.load_array(dim_name) {
            Ok(arr) => {
                let coord_values = read_full(&arr.array_dir, &arr.header).unwrap_or_else(|_| (0..size).map(|i| i as f64).collect());
                AxisInfo {
                    size,
                    coord_values,
                    units: get_string_attr(&arr.attrs, "units"),
                }
            }
            Err(_) => AxisInfo {
                size,
                coord_values: (0..size).map(|i| i as f64).collect(),
                units: None,
            },
        }
    }
}
