//! Zarr v2 directory-store storage adapter: `.zarray`/`.zattrs` JSON
//! headers, dot-separated chunk keys, `null`/zlib chunk compression, and
//! optional `.zmetadata` consolidated metadata.

mod adapter;
mod chunks;
mod consolidated;
mod dims;
mod header;

pub use adapter::ZarrStore;
pub use consolidated::ConsolidatedMetadata;
pub use header::{Compressor, ZArrayHeader};

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use storage::StorageAdapter;

    fn write_zarray(dir: &Path, name: &str, shape: &[usize], chunks: &[usize], dtype: &str) {
        std::fs::create_dir_all(dir.join(name)).unwrap();
        let body = serde_json::json!({
            "zarr_format": 2,
            "shape": shape,
            "chunks": chunks,
            "dtype": dtype,
            "fill_value": 1.0e20,
            "order": "C",
            "compressor": Option::<serde_json::Value>::None,
            "filters": Option::<serde_json::Value>::None,
        });
        std::fs::write(dir.join(name).join(".zarray"), body.to_string()).unwrap();
    }

    fn write_zattrs(dir: &Path, name: &str, attrs: serde_json::Value) {
        std::fs::write(dir.join(name).join(".zattrs"), attrs.to_string()).unwrap();
    }

    fn write_chunk_f32(dir: &Path, name: &str, key: &str, values: &[f32]) {
        let mut bytes = Vec::new();
        for v in values {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        std::fs::write(dir.join(name).join(key), bytes).unwrap();
    }

    #[test]
    fn open_structured_store_and_read_slice() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        write_zarray(root, "lat", &[3], &[3], "<f4");
        write_chunk_f32(root, "lat", "0", &[-10.0, 0.0, 10.0]);

        write_zarray(root, "lon", &[4], &[4], "<f4");
        write_chunk_f32(root, "lon", "0", &[-20.0, -10.0, 0.0, 10.0]);

        write_zarray(root, "temperature", &[2, 3, 4], &[2, 3, 4], "<f4");
        write_zattrs(
            root,
            "temperature",
            serde_json::json!({"_ARRAY_DIMENSIONS": ["time", "lat", "lon"], "units": "K"}),
        );
        let mut values = Vec::new();
        for t in 0..2 {
            for _lat in 0..3 {
                for _lon in 0..4 {
                    values.push(273.0f32 + t as f32);
                }
            }
        }
        write_chunk_f32(root, "temperature", "0.0.0", &values);

        let store = ZarrStore::open(root).unwrap();
        let mesh = store.create_mesh().unwrap();
        assert_eq!(mesh.n, 12);

        let vars = store.scan_variables(&mesh).unwrap();
        assert!(vars.iter().any(|v| v.name == "temperature"));

        let mut out = vec![0.0; 12];
        store.read_slice("temperature", 0, 0, &mut out).unwrap();
        assert!(out.iter().all(|&v| (272.0..274.0).contains(&v)));

        let mut out2 = vec![0.0; 12];
        store.read_slice("temperature", 1, 0, &mut out2).unwrap();
        assert_ne!(out, out2);
    }

    #[test]
    fn consolidated_metadata_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write_zarray(root, "lat", &[2], &[2], "<f4");
        write_chunk_f32(root, "lat", "0", &[0.0, 10.0]);
        write_zarray(root, "lon", &[2], &[2], "<f4");
        write_chunk_f32(root, "lon", "0", &[0.0, 10.0]);

        let zmetadata = serde_json::json!({
            "zarr_consolidated_format": 1,
            "metadata": {
                ".zgroup": {"zarr_format": 2},
                "lat/.zarray": {"shape": [2], "chunks": [2], "dtype": "<f4", "compressor": Option::<serde_json::Value>::None, "fill_value": 1.0e20},
                "lon/.zarray": {"shape": [2], "chunks": [2], "dtype": "<f4", "compressor": Option::<serde_json::Value>::None, "fill_value": 1.0e20},
            }
        });
        std::fs::write(root.join(".zmetadata"), zmetadata.to_string()).unwrap();

        let store = ZarrStore::open(root).unwrap();
        let mesh = store.create_mesh().unwrap();
        assert_eq!(mesh.n, 4);
    }
}
