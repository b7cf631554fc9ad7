//! Binary PPM (P6) output.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use sphere_core::{ViewerError, ViewerResult};
use tracing::debug;

/// Write `pixels` (row-major RGB, `width*height*3` bytes) as a binary PPM.
pub fn write_ppm(path: &Path, width: usize, height: usize, pixels: &[u8]) -> ViewerResult<()> {
    if pixels.len() != width * height * 3 {
        return Err(ViewerError::AllocFailure(format!(
            "pixel buffer length {} does not match {}x{}x3",
            pixels.len(),
            width,
            height
        )));
    }
    let file = File::create(path).map_err(|e| ViewerError::StorageOpen {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let mut writer = BufWriter::new(file);
    write!(writer, "P6\n{} {}\n255\n", width, height).map_err(|e| ViewerError::StorageOpen {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    writer.write_all(pixels).map_err(|e| ViewerError::StorageOpen {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    debug!(path = %path.display(), width, height, "wrote ppm");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_header_and_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.ppm");
        let pixels = vec![10u8, 20, 30, 40, 50, 60];
        write_ppm(&path, 2, 1, &pixels).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        let header = b"P6\n2 1\n255\n";
        assert_eq!(&bytes[..header.len()], header);
        assert_eq!(&bytes[header.len()..], &pixels[..]);
    }

    #[test]
    fn mismatched_buffer_length_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.ppm");
        let err = write_ppm(&path, 2, 2, &[0u8; 3]).unwrap_err();
        assert!(matches!(err, ViewerError::AllocFailure(_)));
    }
}
