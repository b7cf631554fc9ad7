//! NetCDF storage adapter.
//!
//! Reads classical-model NetCDF files using CF conventions: `units`,
//! `long_name`, `_FillValue`/`missing_value`, `scale_factor`, `add_offset`,
//! `standard_name`, `axis`, `positive`.

mod adapter;
mod dims;
mod hdf5_quiet;

pub use adapter::{time_units_of, NetCdfStore};
pub use hdf5_quiet::silence_hdf5_errors;

#[cfg(test)]
mod tests {
    use crate::dims::{is_coordinate_name, is_nod_dimension};

    #[test]
    fn coordinate_names_are_excluded_from_display() {
        assert!(is_coordinate_name("lat"));
        assert!(is_coordinate_name("Longitude"));
        assert!(is_coordinate_name("time"));
        assert!(!is_coordinate_name("temperature"));
    }

    #[test]
    fn nod_dimension_names_match_prefix() {
        assert!(is_nod_dimension("nod"));
        assert!(is_nod_dimension("nodes"));
        assert!(is_nod_dimension("nod2"));
        assert!(!is_nod_dimension("lat"));
    }
}
