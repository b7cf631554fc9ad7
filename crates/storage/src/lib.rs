//! The common contract implemented by every storage backend: NetCDF, Zarr
//! v2, and GRIB2 all expose the same operations over their own file layout,
//! so the fileset aggregator and the view can treat them uniformly.

use std::path::Path;

use mesh::Mesh;
use sphere_core::{is_missing, ViewerResult};

/// A displayable variable as discovered by [`StorageAdapter::scan_variables`].
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDescriptor {
    pub name: String,
    pub long_name: Option<String>,
    pub units: Option<String>,
    pub fill_value: f64,
    pub scale_factor: f64,
    pub add_offset: f64,
}

/// One scannable axis (time or depth): its size and coordinate values.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisInfo {
    pub size: usize,
    pub coord_values: Vec<f64>,
    pub units: Option<String>,
}

/// Time/depth axis metadata for a variable, as returned by
/// [`StorageAdapter::dim_info`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DimInfo {
    pub time: Option<AxisInfo>,
    pub depth: Option<AxisInfo>,
}

impl DimInfo {
    pub fn time_size(&self) -> usize {
        self.time.as_ref().map(|a| a.size).unwrap_or(1)
    }

    pub fn depth_size(&self) -> usize {
        self.depth.as_ref().map(|a| a.size).unwrap_or(1)
    }
}

/// Operations every concrete storage backend implements over its own file
/// layout. `open`/`close` are backend-specific associated functions rather
/// than trait methods since each backend's `Self` differs.
pub trait StorageAdapter {
    /// Build a mesh from this store's coordinate variables.
    fn create_mesh(&self) -> ViewerResult<Mesh>;

    /// Enumerate this store's displayable variables.
    fn scan_variables(&self, mesh: &Mesh) -> ViewerResult<Vec<VariableDescriptor>>;

    /// Write one 2-D spatial slice at time index `t`, depth index `d`, into
    /// `out`. `out` must already be sized to the variable's spatial extent.
    fn read_slice(&self, var: &str, t: usize, d: usize, out: &mut [f64]) -> ViewerResult<()>;

    /// Sample 3 evenly-spaced times at depth 0 and return `(min, max)` over
    /// the non-missing values found.
    fn estimate_range(&self, var: &str) -> ViewerResult<(f64, f64)>;

    /// Time/depth axis metadata for `var`.
    fn dim_info(&self, var: &str) -> ViewerResult<DimInfo>;

    /// Read every time step at a single node and depth.
    fn read_timeseries(
        &self,
        var: &str,
        node: usize,
        d: usize,
    ) -> ViewerResult<(Vec<f64>, Vec<f64>, Vec<bool>)>;

    /// Release any resources (open file handles, mmaps) held by this store.
    fn close(&mut self) -> ViewerResult<()>;

    /// Sorted, deduplicated absolute times (days since 1970-01-01) of every
    /// message this store holds, independent of variable. Only GRIB2 stores
    /// override this; the fileset aggregator uses it to build the GRIB
    /// union time axis and falls back to offsets-based mapping when empty.
    fn message_times(&self) -> Vec<f64> {
        Vec::new()
    }
}

/// Which concrete backend a [`Store`] wraps. `fileset` uses this to decide
/// whether a union-of-message-times axis applies (GRIB2 only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    NetCdf,
    Zarr,
    Grib2,
}

/// Guess a store's kind from its path: a file extension for NetCDF/GRIB2, or
/// a directory (Zarr stores are directories of chunk files) otherwise.
pub fn detect_store_kind(path: &Path) -> Option<StoreKind> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("nc") | Some("nc4") | Some("netcdf") => Some(StoreKind::NetCdf),
        Some("grib2") | Some("grb2") | Some("grib") | Some("grb") => Some(StoreKind::Grib2),
        Some(_) => None,
        None if path.is_dir() => Some(StoreKind::Zarr),
        None => None,
    }
}

/// A type-erased open store plus the kind tag needed to special-case GRIB2's
/// union time axis in the fileset aggregator.
pub struct Store {
    pub kind: StoreKind,
    pub adapter: Box<dyn StorageAdapter>,
}

/// Shared `estimate_range` implementation: sample 3 evenly-spaced times at
/// depth 0 (or the single available time if there's only one) and return the
/// min/max over non-missing values. Every backend's `estimate_range` is a
/// thin wrapper around this, parameterized by its own slice reader.
pub fn estimate_range_via_sampling<F>(
    n_times: usize,
    spatial_len: usize,
    fill_value: f64,
    mut read_slice_at: F,
) -> ViewerResult<(f64, f64)>
where
    F: FnMut(usize, &mut [f64]) -> ViewerResult<()>,
{
    let sample_times: Vec<usize> = if n_times <= 1 {
        vec![0]
    } else if n_times == 2 {
        vec![0, 1]
    } else {
        vec![0, n_times / 2, n_times - 1]
    };

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut buf = vec![0.0_f64; spatial_len];
    for t in sample_times {
        read_slice_at(t, &mut buf)?;
        for &v in &buf {
            if is_missing(v, fill_value) {
                continue;
            }
            if v < min {
                min = v;
            }
            if v > max {
                max = v;
            }
        }
    }

    if !min.is_finite() || !max.is_finite() {
        return Err(sphere_core::ViewerError::RangeEmpty {
            variable: String::new(),
        });
    }
    Ok((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampling_picks_first_middle_last() {
        let slices = vec![vec![1.0, 2.0], vec![10.0, 20.0], vec![100.0, 200.0], vec![5.0, 5.0]];
        let (min, max) = estimate_range_via_sampling(4, 2, 1.0e20, |t, out| {
            out.copy_from_slice(&slices[t]);
            Ok(())
        })
        .unwrap();
        assert_eq!(min, 1.0);
        assert_eq!(max, 200.0);
    }

    #[test]
    fn detect_store_kind_by_extension() {
        assert_eq!(detect_store_kind(Path::new("a.nc")), Some(StoreKind::NetCdf));
        assert_eq!(detect_store_kind(Path::new("a.grib2")), Some(StoreKind::Grib2));
        assert_eq!(detect_store_kind(Path::new("a.grb")), Some(StoreKind::Grib2));
        assert_eq!(detect_store_kind(Path::new("a.txt")), None);
    }

    #[test]
    fn detect_store_kind_directory_is_zarr() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(detect_store_kind(dir.path()), Some(StoreKind::Zarr));
    }

    #[test]
    fn all_missing_returns_range_empty() {
        let fill = 1.0e20;
        let err = estimate_range_via_sampling(1, 3, fill, |_, out| {
            out.iter_mut().for_each(|v| *v = fill);
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, sphere_core::ViewerError::RangeEmpty { .. }));
    }
}
