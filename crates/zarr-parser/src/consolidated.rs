//! `.zmetadata` consolidated-metadata parsing.
//!
//! When present, this single file carries every array's `.zarray`/`.zattrs`
//! blob in one dictionary, keyed by `"<array path>/.zarray"` etc. Fileset
//! mode prefers this over a directory walk per store since it avoids one
//! filesystem round trip per array per store.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct ZMetadataJson {
    metadata: BTreeMap<String, Value>,
}

#[derive(Debug, Clone)]
pub struct ConsolidatedMetadata {
    entries: BTreeMap<String, Value>,
}

impl ConsolidatedMetadata {
    pub fn load(root: &Path) -> Option<Self> {
        let text = std::fs::read_to_string(root.join(".zmetadata")).ok()?;
        let parsed: ZMetadataJson = serde_json::from_str(&text).ok()?;
        Some(ConsolidatedMetadata {
            entries: parsed.metadata,
        })
    }

    pub fn zarray(&self, array_name: &str) -> Option<&Value> {
        self.entries.get(&format!("{array_name}/.zarray"))
    }

    pub fn zattrs(&self, array_name: &str) -> Option<&Value> {
        self.entries.get(&format!("{array_name}/.zattrs"))
    }

    pub fn array_names(&self) -> Vec<String> {
        self.entries
            .keys()
            .filter_map(|k| k.strip_suffix("/.zarray").map(String::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_and_indexes_entries() {
        let dir = tempfile::tempdir().unwrap();
        let body = r#"{
            "zarr_consolidated_format": 1,
            "metadata": {
                ".zgroup": {"zarr_format": 2},
                "temperature/.zarray": {"shape": [4], "chunks": [4], "dtype": "<f4", "compressor": null},
                "temperature/.zattrs": {"units": "K"}
            }
        }"#;
        std::fs::write(dir.path().join(".zmetadata"), body).unwrap();
        let meta = ConsolidatedMetadata::load(dir.path()).unwrap();
        assert!(meta.zarray("temperature").is_some());
        assert!(meta.zattrs("temperature").is_some());
        assert_eq!(meta.array_names(), vec!["temperature".to_string()]);
    }

    #[test]
    fn missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ConsolidatedMetadata::load(dir.path()).is_none());
    }
}
