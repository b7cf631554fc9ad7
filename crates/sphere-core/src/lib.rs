//! Common types and utilities shared across the sphereview data pipeline core.

pub mod cf_time;
pub mod error;
pub mod fill;

pub use cf_time::{convert_time_units, parse_time_units, TimeUnit, TimeUnits};
pub use error::{ViewerError, ViewerResult};
pub use fill::{is_missing, DEFAULT_FILL_VALUE, INVALID_DATA_THRESHOLD};
