//! Aggregates K stores of one storage kind into a single virtual timeline.
//!
//! A [`Fileset`] opens every store, concatenates their time axes behind one
//! prefix-sum offset table, and implements [`StorageAdapter`] itself so the
//! view can treat "one file" and "many files" identically. GRIB2 stores are
//! additionally unioned by absolute message time rather than offset, since
//! different GRIB2 files in a set rarely carry the same local time count.

use std::cell::RefCell;
use std::path::PathBuf;

use mesh::Mesh;
use sphere_core::{convert_time_units, ViewerError, ViewerResult, DEFAULT_FILL_VALUE};
use storage::{
    detect_store_kind, estimate_range_via_sampling, AxisInfo, DimInfo, StorageAdapter, StoreKind,
    VariableDescriptor,
};
use tracing::debug;

use grib2_parser::Grib2Store;
use netcdf_parser::NetCdfStore;
use zarr_parser::ZarrStore;

/// A composition of K homogeneous stores presented as one virtual timeline.
pub struct Fileset {
    kind: StoreKind,
    stores: Vec<Box<dyn StorageAdapter>>,
    offsets: Vec<usize>,
    store_time_axes: Vec<AxisInfo>,
    /// Non-empty only in GRIB2 mode: the sorted, deduplicated union of every
    /// store's message times, superseding `offsets` as the public axis.
    grib_times: Vec<f64>,
    mesh: Mesh,
    var_cache: RefCell<Vec<Option<Vec<VariableDescriptor>>>>,
}

impl Fileset {
    /// Open every path, sorted by filename ascending, as stores of the same
    /// detected kind.
    pub fn open(mut paths: Vec<PathBuf>) -> ViewerResult<Self> {
        if paths.is_empty() {
            return Err(ViewerError::StorageOpen {
                path: String::new(),
                reason: "fileset requires at least one store path".to_string(),
            });
        }
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        let kind = detect_store_kind(&paths[0]).ok_or_else(|| ViewerError::StorageOpen {
            path: paths[0].display().to_string(),
            reason: "could not detect store format from path".to_string(),
        })?;

        let mut stores: Vec<Box<dyn StorageAdapter>> = Vec::with_capacity(paths.len());
        for path in &paths {
            let adapter: Box<dyn StorageAdapter> = match kind {
                StoreKind::NetCdf => Box::new(NetCdfStore::open(path)?),
                StoreKind::Zarr => Box::new(ZarrStore::open(path)?),
                StoreKind::Grib2 => Box::new(Grib2Store::open(path)?),
            };
            stores.push(adapter);
        }

        let mesh = stores[0].create_mesh()?;

        let mut store_time_axes = Vec::with_capacity(stores.len());
        let mut counts = Vec::with_capacity(stores.len());
        for store in &stores {
            let axis = store
                .scan_variables(&mesh)
                .ok()
                .and_then(|vars| vars.first().cloned())
                .and_then(|v| store.dim_info(&v.name).ok())
                .and_then(|d| d.time)
                .unwrap_or(AxisInfo {
                    size: 1,
                    coord_values: vec![0.0],
                    units: None,
                });
            counts.push(axis.size);
            store_time_axes.push(axis);
        }
        let offsets = compute_offsets(&counts);

        let grib_times = if kind == StoreKind::Grib2 {
            union_times(&stores.iter().map(|s| s.message_times()).collect::<Vec<_>>())
        } else {
            Vec::new()
        };

        debug!(
            k = stores.len(),
            virtual_times = *offsets.last().unwrap_or(&0),
            grib_union = grib_times.len(),
            "opened fileset"
        );

        Ok(Fileset {
            kind,
            stores,
            offsets,
            store_time_axes,
            grib_times,
            mesh,
            var_cache: RefCell::new(vec![None; paths.len()]),
        })
    }

    /// The detected kind shared by every store in this fileset.
    pub fn kind(&self) -> StoreKind {
        self.kind
    }

    /// Total virtual time count: `offsets[K]`, or the GRIB union's length
    /// in GRIB mode.
    pub fn n_times(&self) -> usize {
        if !self.grib_times.is_empty() {
            self.grib_times.len()
        } else {
            *self.offsets.last().unwrap_or(&0)
        }
    }

    fn locate(&self, virtual_time: usize) -> ViewerResult<(usize, usize)> {
        locate_virtual_time(&self.offsets, virtual_time)
    }

    fn local_time_index(&self, store_idx: usize, var: &str, abs_time: f64) -> Option<usize> {
        let axis = self.stores[store_idx].dim_info(var).ok()?.time?;
        axis.coord_values
            .iter()
            .position(|&v| (v - abs_time).abs() < 1e-9)
    }

    /// Locate the store holding `var`'s message at absolute time `abs_time`,
    /// trying stores in order. Returns `(store_index, local_time)`.
    fn locate_grib_time(&self, var: &str, abs_time: f64) -> Option<(usize, usize)> {
        for k in 0..self.stores.len() {
            if self.descriptor(k, var).is_none() {
                continue;
            }
            if let Some(local_t) = self.local_time_index(k, var, abs_time) {
                return Some((k, local_t));
            }
        }
        None
    }

    fn descriptor(&self, store_idx: usize, var: &str) -> Option<VariableDescriptor> {
        {
            let cache = self.var_cache.borrow();
            if let Some(Some(vars)) = cache.get(store_idx) {
                return vars.iter().find(|d| d.name == var).cloned();
            }
        }
        let vars = self.stores[store_idx]
            .scan_variables(&self.mesh)
            .unwrap_or_default();
        let found = vars.iter().find(|d| d.name == var).cloned();
        self.var_cache.borrow_mut()[store_idx] = Some(vars);
        found
    }

    fn fill_value_for(&self, var: &str) -> f64 {
        for k in 0..self.stores.len() {
            if let Some(d) = self.descriptor(k, var) {
                return d.fill_value;
            }
        }
        DEFAULT_FILL_VALUE
    }

    fn base_time_units(&self) -> String {
        self.store_time_axes
            .first()
            .and_then(|a| a.units.clone())
            .unwrap_or_else(|| "seconds since 1970-01-01".to_string())
    }
}

impl StorageAdapter for Fileset {
    fn create_mesh(&self) -> ViewerResult<Mesh> {
        Ok(self.mesh.clone())
    }

    fn scan_variables(&self, mesh: &Mesh) -> ViewerResult<Vec<VariableDescriptor>> {
        self.stores[0].scan_variables(mesh)
    }

    fn read_slice(&self, var: &str, t: usize, d: usize, out: &mut [f64]) -> ViewerResult<()> {
        let fill_value = self.fill_value_for(var);

        if !self.grib_times.is_empty() {
            let abs = *self
                .grib_times
                .get(t)
                .ok_or(ViewerError::OutOfRange { index: t, extent: self.grib_times.len() })?;
            return match self.locate_grib_time(var, abs) {
                Some((k, local_t)) => self.stores[k].read_slice(var, local_t, d, out),
                None => {
                    out.fill(fill_value);
                    Ok(())
                }
            };
        }

        let (k, local_t) = self.locate(t)?;
        if self.descriptor(k, var).is_none() {
            out.fill(fill_value);
            return Ok(());
        }
        self.stores[k].read_slice(var, local_t, d, out)
    }

    fn estimate_range(&self, var: &str) -> ViewerResult<(f64, f64)> {
        let fill_value = self.fill_value_for(var);
        estimate_range_via_sampling(self.n_times(), self.mesh.n, fill_value, |t, buf| {
            self.read_slice(var, t, 0, buf)
        })
        .map_err(|_| ViewerError::RangeEmpty { variable: var.to_string() })
    }

    fn dim_info(&self, var: &str) -> ViewerResult<DimInfo> {
        if !self.grib_times.is_empty() {
            let time = Some(AxisInfo {
                size: self.grib_times.len(),
                coord_values: self.grib_times.clone(),
                units: Some("days since 1970-01-01".to_string()),
            });
            let depth = self.stores[0].dim_info(var).ok().and_then(|d| d.depth);
            return Ok(DimInfo { time, depth });
        }

        let base_units = self.base_time_units();
        let mut coord_values = Vec::with_capacity(*self.offsets.last().unwrap_or(&0));
        for axis in &self.store_time_axes {
            let units = axis.units.clone().unwrap_or_else(|| base_units.clone());
            for &v in &axis.coord_values {
                coord_values.push(convert_time_units(v, &units, &base_units));
            }
        }
        let time = Some(AxisInfo {
            size: coord_values.len(),
            coord_values,
            units: Some(base_units),
        });
        let depth = self.stores[0].dim_info(var)?.depth;
        Ok(DimInfo { time, depth })
    }

    fn read_timeseries(
        &self,
        var: &str,
        node: usize,
        d: usize,
    ) -> ViewerResult<(Vec<f64>, Vec<f64>, Vec<bool>)> {
        let fill_value = self.fill_value_for(var);

        if !self.grib_times.is_empty() {
            let mut times = Vec::with_capacity(self.grib_times.len());
            let mut values = Vec::with_capacity(self.grib_times.len());
            let mut valid = Vec::with_capacity(self.grib_times.len());
            for &abs in &self.grib_times {
                times.push(abs);
                match self.locate_grib_time(var, abs) {
                    Some((k, local_t)) => {
                        let (_, vs, vl) = self.stores[k].read_timeseries(var, node, d)?;
                        values.push(vs.get(local_t).copied().unwrap_or(fill_value));
                        valid.push(vl.get(local_t).copied().unwrap_or(false));
                    }
                    None => {
                        values.push(fill_value);
                        valid.push(false);
                    }
                }
            }
            return Ok((times, values, valid));
        }

        let base_units = self.base_time_units();
        let mut times = Vec::new();
        let mut values = Vec::new();
        let mut valid = Vec::new();
        for (k, store) in self.stores.iter().enumerate() {
            let axis = &self.store_time_axes[k];
            let units = axis.units.clone().unwrap_or_else(|| base_units.clone());
            if self.descriptor(k, var).is_none() {
                times.extend(axis.coord_values.iter().map(|&v| convert_time_units(v, &units, &base_units)));
                values.extend(std::iter::repeat(fill_value).take(axis.size));
                valid.extend(std::iter::repeat(false).take(axis.size));
                continue;
            }
            let (ts, vs, vl) = store.read_timeseries(var, node, d)?;
            times.extend(ts.iter().map(|&v| convert_time_units(v, &units, &base_units)));
            values.extend(vs);
            valid.extend(vl);
        }
        Ok((times, values, valid))
    }

    fn close(&mut self) -> ViewerResult<()> {
        for store in &mut self.stores {
            store.close()?;
        }
        Ok(())
    }

    fn message_times(&self) -> Vec<f64> {
        self.grib_times.clone()
    }
}

/// Prefix-sum offset table: `offsets[k+1] = offsets[k] + counts[k]`.
fn compute_offsets(counts: &[usize]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(counts.len() + 1);
    offsets.push(0);
    for &c in counts {
        offsets.push(offsets.last().unwrap() + c);
    }
    offsets
}

/// Map a virtual time index to `(store_index, local_time)` via binary
/// search on the prefix-sum `offsets` table.
fn locate_virtual_time(offsets: &[usize], virtual_time: usize) -> ViewerResult<(usize, usize)> {
    let total = *offsets.last().unwrap_or(&0);
    if virtual_time >= total {
        return Err(ViewerError::OutOfRange { index: virtual_time, extent: total });
    }
    let k = match offsets.binary_search(&virtual_time) {
        Ok(i) => i,
        Err(i) => i - 1,
    };
    Ok((k, virtual_time - offsets[k]))
}

/// Sorted, deduplicated union of several per-store absolute-time vectors.
fn union_times(per_store: &[Vec<f64>]) -> Vec<f64> {
    let mut all: Vec<f64> = per_store.iter().flatten().copied().collect();
    all.sort_by(|a, b| a.partial_cmp(b).unwrap());
    all.dedup();
    all
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_prefix_sums() {
        let offsets = compute_offsets(&[3, 1, 4]);
        assert_eq!(offsets, vec![0, 3, 4, 8]);
    }

    #[test]
    fn locate_maps_virtual_time_to_store_and_local_time() {
        let offsets = compute_offsets(&[3, 1, 4]);
        assert_eq!(locate_virtual_time(&offsets, 0).unwrap(), (0, 0));
        assert_eq!(locate_virtual_time(&offsets, 2).unwrap(), (0, 2));
        assert_eq!(locate_virtual_time(&offsets, 3).unwrap(), (1, 0));
        assert_eq!(locate_virtual_time(&offsets, 4).unwrap(), (2, 0));
        assert_eq!(locate_virtual_time(&offsets, 7).unwrap(), (2, 3));
    }

    #[test]
    fn locate_rejects_out_of_range() {
        let offsets = compute_offsets(&[3, 1, 4]);
        let err = locate_virtual_time(&offsets, 8).unwrap_err();
        assert!(matches!(err, ViewerError::OutOfRange { index: 8, extent: 8 }));
    }

    #[test]
    fn union_times_sorts_and_dedups_across_stores() {
        let union = union_times(&[vec![3.0, 1.0], vec![1.0, 2.0], vec![]]);
        assert_eq!(union, vec![1.0, 2.0, 3.0]);
    }
}
