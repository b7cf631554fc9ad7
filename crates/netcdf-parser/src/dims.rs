//! Dimension-role classification and attribute helpers shared by the
//! adapter's variable scan, slice read, and dim-info operations.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimRole {
    Time,
    Depth,
}

/// Names treated as coordinate variables rather than displayable fields.
const COORDINATE_NAMES: &[&str] = &[
    "lat", "latitude", "lon", "longitude", "x", "y", "time", "depth", "lev", "level", "z", "plev",
];

pub fn is_coordinate_name(name: &str) -> bool {
    COORDINATE_NAMES.contains(&name.to_ascii_lowercase().as_str())
}

pub fn is_nod_dimension(name: &str) -> bool {
    name.to_ascii_lowercase().starts_with("nod")
}

/// Classify a dimension's role by name, falling back to inspecting
/// attributes of the coordinate variable sharing its name.
pub fn classify_dim_role(file: &netcdf::File, dim_name: &str) -> Option<DimRole> {
    let lower = dim_name.to_ascii_lowercase();
    if lower == "time" {
        return Some(DimRole::Time);
    }
    if matches!(lower.as_str(), "depth" | "lev" | "level" | "z" | "plev") {
        return Some(DimRole::Depth);
    }

    let var = file.variable(dim_name)?;
    if let Some(axis) = get_string_attr(&var, "axis") {
        let a = axis.to_ascii_uppercase();
        if a.starts_with('T') {
            return Some(DimRole::Time);
        }
        if a.starts_with('Z') {
            return Some(DimRole::Depth);
        }
    }
    if let Some(std_name) = get_string_attr(&var, "standard_name") {
        let s = std_name.to_ascii_lowercase();
        if s.contains("time") {
            return Some(DimRole::Time);
        }
        if s.contains("depth") || s.contains("height") || s.contains("pressure") {
            return Some(DimRole::Depth);
        }
    }
    if let Some(units) = get_string_attr(&var, "units") {
        if units.to_ascii_lowercase().contains("since") {
            return Some(DimRole::Time);
        }
    }
    if let Some(positive) = get_string_attr(&var, "positive") {
        let p = positive.to_ascii_lowercase();
        if p == "up" || p == "down" {
            return Some(DimRole::Depth);
        }
    }
    None
}

/// Per-variable dimension roles: at most one time axis, at most one depth
/// axis, everything else spatial.
#[derive(Debug, Clone, Default)]
pub struct VarDimRoles {
    pub shapes: Vec<usize>,
    pub time_idx: Option<usize>,
    pub depth_idx: Option<usize>,
}

impl VarDimRoles {
    pub fn strides(&self) -> Vec<usize> {
        let n = self.shapes.len();
        let mut strides = vec![1usize; n];
        for i in (0..n.saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * self.shapes[i + 1];
        }
        strides
    }

    pub fn spatial_len(&self) -> usize {
        self.shapes
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != self.time_idx && Some(*i) != self.depth_idx)
            .map(|(_, s)| *s)
            .product()
    }

    pub fn time_size(&self) -> usize {
        self.time_idx.map(|i| self.shapes[i]).unwrap_or(1)
    }

    pub fn depth_size(&self) -> usize {
        self.depth_idx.map(|i| self.shapes[i]).unwrap_or(1)
    }
}

pub fn classify_var_dims(file: &netcdf::File, var: &netcdf::Variable) -> VarDimRoles {
    let dims = var.dimensions();
    let shapes: Vec<usize> = dims.iter().map(|d| d.len()).collect();
    let mut time_idx = None;
    let mut depth_idx = None;
    for (i, d) in dims.iter().enumerate() {
        match classify_dim_role(file, &d.name()) {
            Some(DimRole::Time) if time_idx.is_none() => time_idx = Some(i),
            Some(DimRole::Depth) if depth_idx.is_none() => depth_idx = Some(i),
            _ => {}
        }
    }
    VarDimRoles {
        shapes,
        time_idx,
        depth_idx,
    }
}

pub fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

pub fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let value = var.attribute_value(name)?.ok()?;
    f64::try_from(value).ok()
}

pub fn get_string_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    let value = var.attribute_value(name)?.ok()?;
    String::try_from(value).ok()
}
