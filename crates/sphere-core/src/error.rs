//! Error types for the sphereview data pipeline core.

use thiserror::Error;

/// Result type alias using [`ViewerError`].
pub type ViewerResult<T> = Result<T, ViewerError>;

/// Primary error type for the data pipeline core.
#[derive(Debug, Error)]
pub enum ViewerError {
    /// A store's path is missing, unreadable, or not of the expected format.
    #[error("failed to open store '{path}': {reason}")]
    StorageOpen { path: String, reason: String },

    /// Header parse or chunk decode failure.
    #[error("failed to decode store data: {0}")]
    StorageDecode(String),

    /// Mesh coordinates are missing or inconsistent.
    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    /// Index past the virtual time/depth extent.
    #[error("index {index} out of range (extent {extent})")]
    OutOfRange { index: usize, extent: usize },

    /// Buffer allocation failed.
    #[error("allocation failed: {0}")]
    AllocFailure(String),

    /// Polygon mode was requested on a mesh without element connectivity.
    #[error("polygon rendering unavailable: mesh has no element connectivity")]
    PolygonUnavailable,

    /// `estimate_range` found no valid samples.
    #[error("no valid samples found while estimating range for '{variable}'")]
    RangeEmpty { variable: String },
}

impl From<std::io::Error> for ViewerError {
    fn from(err: std::io::Error) -> Self {
        ViewerError::StorageOpen {
            path: String::new(),
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_formats_both_fields() {
        let err = ViewerError::OutOfRange {
            index: 5,
            extent: 3,
        };
        assert!(err.to_string().contains('5'));
        assert!(err.to_string().contains('3'));
    }
}
