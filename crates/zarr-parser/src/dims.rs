//! Dimension-name and role inference for Zarr arrays, which (unlike
//! NetCDF) have no native named dimensions: names come from the xarray
//! `_ARRAY_DIMENSIONS` attribute convention when present.

use serde_json::{Map, Value};

const COORDINATE_NAMES: &[&str] = &[
    "lat", "latitude", "lon", "longitude", "x", "y", "time", "depth", "lev", "level", "z", "plev",
];

pub fn is_coordinate_name(name: &str) -> bool {
    COORDINATE_NAMES.contains(&name.to_ascii_lowercase().as_str())
}

pub fn is_nod_dimension(name: &str) -> bool {
    name.to_ascii_lowercase().starts_with("nod")
}

pub fn dim_names(attrs: &Map<String, Value>, ndim: usize) -> Vec<String> {
    attrs
        .get("_ARRAY_DIMENSIONS")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|x| x.as_str().map(String::from))
                .collect::<Vec<_>>()
        })
        .filter(|v| v.len() == ndim)
        .unwrap_or_else(|| (0..ndim).map(|i| format!("dim{i}")).collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimRole {
    Time,
    Depth,
}

/// Classify a dimension's role by name, falling back to the attributes of
/// the coordinate array sharing its name (`attrs_lookup`), mirroring the
/// NetCDF adapter's fallback chain.
pub fn classify_dim_role(dim_name: &str, attrs_lookup: impl Fn(&str) -> Option<Map<String, Value>>) -> Option<DimRole> {
    let lower = dim_name.to_ascii_lowercase();
    if lower == "time" {
        return Some(DimRole::Time);
    }
    if matches!(lower.as_str(), "depth" | "lev" | "level" | "z" | "plev") {
        return Some(DimRole::Depth);
    }

    let attrs = attrs_lookup(dim_name)?;
    if let Some(axis) = attrs.get("axis").and_then(|v| v.as_str()) {
        let a = axis.to_ascii_uppercase();
        if a.starts_with('T') {
            return Some(DimRole::Time);
        }
        if a.starts_with('Z') {
            return Some(DimRole::Depth);
        }
    }
    if let Some(std_name) = attrs.get("standard_name").and_then(|v| v.as_str()) {
        let s = std_name.to_ascii_lowercase();
        if s.contains("time") {
            return Some(DimRole::Time);
        }
        if s.contains("depth") || s.contains("height") || s.contains("pressure") {
            return Some(DimRole::Depth);
        }
    }
    if let Some(units) = attrs.get("units").and_then(|v| v.as_str()) {
        if units.to_ascii_lowercase().contains("since") {
            return Some(DimRole::Time);
        }
    }
    if let Some(positive) = attrs.get("positive").and_then(|v| v.as_str()) {
        let p = positive.to_ascii_lowercase();
        if p == "up" || p == "down" {
            return Some(DimRole::Depth);
        }
    }
    None
}

pub fn get_f64_attr(attrs: &Map<String, Value>, name: &str) -> Option<f64> {
    attrs.get(name).and_then(|v| v.as_f64())
}

pub fn get_string_attr(attrs: &Map<String, Value>, name: &str) -> Option<String> {
    attrs.get(name).and_then(|v| v.as_str()).map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dim_names_from_array_dimensions_attr() {
        let attrs: Map<String, Value> = json!({"_ARRAY_DIMENSIONS": ["time", "lat", "lon"]})
            .as_object()
            .unwrap()
            .clone();
        assert_eq!(dim_names(&attrs, 3), vec!["time", "lat", "lon"]);
    }

    #[test]
    fn dim_names_falls_back_to_generic() {
        let attrs: Map<String, Value> = Map::new();
        assert_eq!(dim_names(&attrs, 2), vec!["dim0", "dim1"]);
    }

    #[test]
    fn classify_by_name_before_attrs() {
        assert_eq!(classify_dim_role("time", |_| None), Some(DimRole::Time));
        assert_eq!(classify_dim_role("lev", |_| None), Some(DimRole::Depth));
    }

    #[test]
    fn classify_by_axis_attribute_fallback() {
        let lookup = |name: &str| -> Option<Map<String, Value>> {
            if name == "valid_time" {
                Some(json!({"axis": "T"}).as_object().unwrap().clone())
            } else {
                None
            }
        };
        assert_eq!(classify_dim_role("valid_time", lookup), Some(DimRole::Time));
    }
}
