//! GRIB2 storage adapter.
//!
//! A GRIB2 file is a flat sequence of self-describing messages. Opening a
//! store scans every message once, grouping by `(shortName, typeOfLevel)`:
//! a group with more than one distinct level becomes a multi-level variable
//! named after its `shortName`; a group with exactly one level becomes a
//! single-level variable named `"{shortName}@{typeOfLevel}={level}"`. Byte
//! offsets of the originating message are kept per `(level, time)` so a
//! slice read only has to re-parse the one message it needs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use mesh::{mesh_create, CoordType, Mesh};
use sphere_core::{is_missing, ViewerError, ViewerResult, DEFAULT_FILL_VALUE};
use storage::{estimate_range_via_sampling, AxisInfo, DimInfo, StorageAdapter, VariableDescriptor};
use tracing::debug;

use crate::sections::GridDefinition;
use crate::{Grib2Message, Grib2Reader};

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone)]
struct VariableGroup {
    levels: Vec<u32>,
    /// Days since 1970-01-01, sorted ascending.
    times: Vec<f64>,
    offsets: BTreeMap<(usize, usize), usize>,
    long_name: String,
}

pub struct Grib2Store {
    path: PathBuf,
    data: Bytes,
    mesh: Mesh,
    variables: BTreeMap<String, VariableGroup>,
    /// Days since 1970-01-01, sorted ascending, deduplicated across every
    /// message in the file regardless of variable. Used by the fileset
    /// aggregator's GRIB union time axis.
    all_times: Vec<f64>,
}

impl Grib2Store {
    pub fn open(path: &Path) -> ViewerResult<Self> {
        let raw = std::fs::read(path).map_err(|e| ViewerError::StorageOpen {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let data = Bytes::from(raw);

        let mut reader = Grib2Reader::new(data.clone());
        let mut grid: Option<GridDefinition> = None;
        let mut entries: Vec<(String, String, u32, i64, usize)> = Vec::new();

        for msg in reader.iter_messages() {
            let msg = msg.map_err(|e| ViewerError::StorageDecode(format!(
                "parsing GRIB2 message in {}: {e}",
                path.display()
            )))?;
            if grid.is_none() {
                grid = Some(msg.grid_definition.clone());
            }
            entries.push((
                msg.product_definition.parameter_short_name.clone(),
                msg.product_definition.type_of_level.clone(),
                msg.product_definition.level_value,
                msg.valid_time().timestamp(),
                msg.offset,
            ));
        }

        let grid = grid.ok_or_else(|| ViewerError::StorageOpen {
            path: path.display().to_string(),
            reason: "no GRIB2 messages found".to_string(),
        })?;

        debug!(n_messages = entries.len(), "scanned GRIB2 file");
        let mesh = build_mesh(&grid)?;
        let mut all_times: Vec<f64> = entries
            .iter()
            .map(|e| e.3 as f64 / SECONDS_PER_DAY)
            .collect();
        all_times.sort_by(|a, b| a.partial_cmp(b).unwrap());
        all_times.dedup();
        let variables = finalize_groups(entries);

        Ok(Grib2Store {
            path: path.to_path_buf(),
            data,
            mesh,
            variables,
            all_times,
        })
    }

    /// Sorted, deduplicated union of every message's absolute time (days
    /// since 1970-01-01) found in this file, across all variables.
    pub fn all_times(&self) -> &[f64] {
        &self.all_times
    }

    fn group(&self, var: &str) -> ViewerResult<&VariableGroup> {
        self.variables
            .get(var)
            .ok_or_else(|| ViewerError::StorageDecode(format!("unknown GRIB2 variable '{var}'")))
    }

    fn message_at(&self, offset: usize) -> ViewerResult<Grib2Message> {
        let reader = Grib2Reader::new(self.data.clone());
        reader.read_at(offset).map_err(|e| {
            ViewerError::StorageDecode(format!(
                "re-reading message at offset {offset} in {}: {e}",
                self.path.display()
            ))
        })
    }
}

impl StorageAdapter for Grib2Store {
    fn create_mesh(&self) -> ViewerResult<Mesh> {
        Ok(self.mesh.clone())
    }

    fn scan_variables(&self, _mesh: &Mesh) -> ViewerResult<Vec<VariableDescriptor>> {
        Ok(self
            .variables
            .iter()
            .map(|(name, g)| VariableDescriptor {
                name: name.clone(),
                long_name: Some(g.long_name.clone()),
                units: None,
                fill_value: DEFAULT_FILL_VALUE,
                scale_factor: 1.0,
                add_offset: 0.0,
            })
            .collect())
    }

    fn read_slice(&self, var: &str, t: usize, d: usize, out: &mut [f64]) -> ViewerResult<()> {
        let g = self.group(var)?;
        let offset = match g.offsets.get(&(d, t)) {
            Some(o) => *o,
            None => {
                out.fill(DEFAULT_FILL_VALUE);
                return Ok(());
            }
        };
        let msg = self.message_at(offset)?;
        let packed = msg
            .unpack_data()
            .map_err(|e| ViewerError::StorageDecode(format!("unpacking GRIB2 data: {e}")))?;

        let values: Vec<f64> = match &msg.bitmap {
            Some(bitmap) if bitmap.indicator == 0 && !bitmap.data.is_empty() => {
                expand_with_bitmap(&packed, &bitmap.data, out.len())
            }
            _ => packed.iter().map(|&v| v as f64).collect(),
        };

        if values.len() != out.len() {
            return Err(ViewerError::StorageDecode(format!(
                "message unpacked {} values, expected {}",
                values.len(),
                out.len()
            )));
        }
        out.copy_from_slice(&values);
        Ok(())
    }

    fn estimate_range(&self, var: &str) -> ViewerResult<(f64, f64)> {
        let g = self.group(var)?;
        let n_times = g.times.len().max(1);
        estimate_range_via_sampling(n_times, self.mesh.n, DEFAULT_FILL_VALUE, |t, out| {
            self.read_slice(var, t, 0, out)
        })
        .map_err(|_| ViewerError::RangeEmpty {
            variable: var.to_string(),
        })
    }

    fn dim_info(&self, var: &str) -> ViewerResult<DimInfo> {
        let g = self.group(var)?;
        let time = Some(AxisInfo {
            size: g.times.len().max(1),
            coord_values: g.times.clone(),
            units: Some("days since 1970-01-01".to_string()),
        });
        let depth = if g.levels.len() > 1 {
            Some(AxisInfo {
                size: g.levels.len(),
                coord_values: g.levels.iter().map(|&l| l as f64).collect(),
                units: None,
            })
        } else {
            None
        };
        Ok(DimInfo { time, depth })
    }

    fn read_timeseries(
        &self,
        var: &str,
        node: usize,
        d: usize,
    ) -> ViewerResult<(Vec<f64>, Vec<f64>, Vec<bool>)> {
        let g = self.group(var)?;
        let n_times = g.times.len().max(1);
        let mut times = Vec::with_capacity(n_times);
        let mut values = Vec::with_capacity(n_times);
        let mut valid = Vec::with_capacity(n_times);
        let mut buf = vec![0.0_f64; self.mesh.n];
        for t in 0..n_times {
            self.read_slice(var, t, d, &mut buf)?;
            let v = buf[node];
            times.push(g.times.get(t).copied().unwrap_or(0.0));
            valid.push(!is_missing(v, DEFAULT_FILL_VALUE));
            values.push(v);
        }
        Ok((times, values, valid))
    }

    fn close(&mut self) -> ViewerResult<()> {
        Ok(())
    }

    fn message_times(&self) -> Vec<f64> {
        self.all_times.clone()
    }
}

fn expand_with_bitmap(packed: &[f32], bitmap_bits: &[u8], n: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(n);
    let mut pi = 0usize;
    for i in 0..n {
        let byte = bitmap_bits.get(i / 8).copied().unwrap_or(0);
        let bit = (byte >> (7 - (i % 8))) & 1;
        if bit == 1 && pi < packed.len() {
            out.push(packed[pi] as f64);
            pi += 1;
        } else {
            out.push(DEFAULT_FILL_VALUE);
        }
    }
    out
}

/// Group raw `(shortName, typeOfLevel, level, time_secs, offset)` message
/// entries into display-named variables.
fn finalize_groups(entries: Vec<(String, String, u32, i64, usize)>) -> BTreeMap<String, VariableGroup> {
    let mut accum: BTreeMap<(String, String), Vec<(u32, i64, usize)>> = BTreeMap::new();
    for (short_name, type_of_level, level, time_secs, offset) in entries {
        accum
            .entry((short_name, type_of_level))
            .or_default()
            .push((level, time_secs, offset));
    }

    let mut variables = BTreeMap::new();
    for ((short_name, type_of_level), rows) in accum {
        let mut levels: Vec<u32> = rows.iter().map(|r| r.0).collect();
        levels.sort_unstable();
        levels.dedup();
        let mut times_secs: Vec<i64> = rows.iter().map(|r| r.1).collect();
        times_secs.sort_unstable();
        times_secs.dedup();

        let mut offsets = BTreeMap::new();
        for (level, time_secs, offset) in &rows {
            let level_idx = levels.binary_search(level).unwrap();
            let time_idx = times_secs.binary_search(time_secs).unwrap();
            offsets.insert((level_idx, time_idx), *offset);
        }

        let name = if levels.len() > 1 {
            short_name.clone()
        } else {
            format!("{short_name}@{type_of_level}={}", levels[0])
        };

        variables.insert(
            name.clone(),
            VariableGroup {
                levels,
                times: times_secs.iter().map(|&s| s as f64 / SECONDS_PER_DAY).collect(),
                offsets,
                long_name: name,
            },
        );
    }
    variables
}

fn build_mesh(grid: &GridDefinition) -> ViewerResult<Mesh> {
    let ni = grid.num_points_longitude as usize;
    let nj = grid.num_points_latitude as usize;
    if ni == 0 || nj == 0 {
        return Err(ViewerError::InvalidMesh(
            "GRIB2 grid definition has zero points along an axis".to_string(),
        ));
    }

    let first_lat = grid.first_latitude_millidegrees as f64 / 1000.0;
    let last_lat = grid.last_latitude_millidegrees as f64 / 1000.0;
    let first_lon = grid.first_longitude_millidegrees as f64 / 1000.0;
    let mut last_lon = grid.last_longitude_millidegrees as f64 / 1000.0;
    if last_lon < first_lon {
        last_lon += 360.0;
    }

    let lat_step = if nj > 1 {
        (last_lat - first_lat) / (nj - 1) as f64
    } else {
        0.0
    };
    let lon_step = if ni > 1 {
        (last_lon - first_lon) / (ni - 1) as f64
    } else {
        0.0
    };

    let mut lon = Vec::with_capacity(ni * nj);
    let mut lat = Vec::with_capacity(ni * nj);
    for row in 0..nj {
        let row_lat = first_lat + row as f64 * lat_step;
        for col in 0..ni {
            lon.push(first_lon + col as f64 * lon_step);
            lat.push(row_lat);
        }
    }
    mesh_create(lon, lat, CoordType::Structured1D, ni, nj)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(ni: u32, nj: u32) -> GridDefinition {
        GridDefinition {
            grid_shape: 6,
            num_points_latitude: nj,
            num_points_longitude: ni,
            first_latitude_millidegrees: -10_000,
            first_longitude_millidegrees: 0,
            last_latitude_millidegrees: 10_000,
            last_longitude_millidegrees: 30_000,
            latitude_increment_millidegrees: 10_000,
            longitude_increment_millidegrees: 10_000,
            scanning_mode: 0,
        }
    }

    #[test]
    fn build_mesh_expands_structured_grid() {
        let mesh = build_mesh(&grid(4, 3)).unwrap();
        assert_eq!(mesh.n, 12);
        assert_eq!(mesh.orig_nx, 4);
        assert_eq!(mesh.orig_ny, 3);
        assert!((mesh.lat[0] - (-10.0)).abs() < 1e-9);
        assert!((mesh.lat[mesh.n - 1] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn multi_level_group_becomes_one_variable_named_by_short_name() {
        let entries = vec![
            ("TMP".to_string(), "isobaricInhPa".to_string(), 500, 0, 10),
            ("TMP".to_string(), "isobaricInhPa".to_string(), 850, 0, 20),
            ("TMP".to_string(), "isobaricInhPa".to_string(), 500, 86_400, 30),
            ("TMP".to_string(), "isobaricInhPa".to_string(), 850, 86_400, 40),
        ];
        let groups = finalize_groups(entries);
        assert_eq!(groups.len(), 1);
        let g = &groups["TMP"];
        assert_eq!(g.levels, vec![500, 850]);
        assert_eq!(g.times, vec![0.0, 1.0]);
        assert_eq!(g.offsets[&(0, 0)], 10);
        assert_eq!(g.offsets[&(1, 1)], 40);
    }

    #[test]
    fn single_level_group_uses_compound_name() {
        let entries = vec![("TMP".to_string(), "surface".to_string(), 0, 0, 5)];
        let groups = finalize_groups(entries);
        assert!(groups.contains_key("TMP@surface=0"));
    }

    #[test]
    fn distinct_type_of_level_groups_stay_separate() {
        let entries = vec![
            ("TMP".to_string(), "surface".to_string(), 0, 0, 5),
            ("TMP".to_string(), "isobaricInhPa".to_string(), 500, 0, 6),
            ("TMP".to_string(), "isobaricInhPa".to_string(), 850, 0, 7),
        ];
        let groups = finalize_groups(entries);
        assert!(groups.contains_key("TMP@surface=0"));
        assert!(groups.contains_key("TMP"));
        assert_eq!(groups.len(), 2);
    }
}
