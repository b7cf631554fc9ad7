//! Silence HDF5's automatic error printing to stderr.
//!
//! The HDF5 C library prints verbose error messages to stderr even when
//! errors are handled gracefully by the Rust code (e.g. when checking for
//! optional attributes that don't exist). This creates confusing log spam
//! like:
//!
//! ```text
//! HDF5-DIAG: Error detected in HDF5 (1.14) thread 1:
//!   #003: ../../../src/H5Adense.c line 397 in H5A__dense_open(): can't locate attribute in name index
//! ```
//!
//! Call this before any HDF5/NetCDF operation. It's safe to call more than
//! once; only the first call takes effect.
use std::sync::Once;

pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is documented as safe to call with null
        // handlers to disable the library's default error printing.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}
