//! Hyperslab reads over a Zarr v2 array: iterate every chunk whose
//! rectangle intersects the requested rectangle, decode it, and copy the
//! intersection into the output buffer.

use std::path::Path;

use sphere_core::{ViewerError, ViewerResult};

use crate::header::ZArrayHeader;

fn row_major_strides(shape: &[usize]) -> Vec<usize> {
    let n = shape.len();
    let mut strides = vec![1usize; n];
    for i in (0..n.saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

/// Advance a multi-index odometer in `[lo, hi)` per axis. Returns `false`
/// once the index has wrapped past the most significant axis.
fn advance(idx: &mut [usize], lo: &[usize], hi: &[usize]) -> bool {
    let mut axis = idx.len();
    loop {
        if axis == 0 {
            return false;
        }
        axis -= 1;
        idx[axis] += 1;
        if idx[axis] < hi[axis] {
            return true;
        }
        idx[axis] = lo[axis];
        if axis == 0 {
            return false;
        }
    }
}

/// Read the rectangle `start..start+count` (both length `shape.len()`) out
/// of the chunked array rooted at `array_dir`. Chunks with no backing file
/// are treated as entirely `fill_value` (a standard Zarr v2 omission for
/// all-fill chunks).
pub fn read_hyperslab(
    array_dir: &Path,
    header: &ZArrayHeader,
    start: &[usize],
    count: &[usize],
) -> ViewerResult<Vec<f64>> {
    let ndim = header.shape.len();
    if start.len() != ndim || count.len() != ndim {
        return Err(ViewerError::StorageDecode(
            "hyperslab rank does not match array rank".to_string(),
        ));
    }

    let mut output = vec![header.fill_value; count.iter().product()];
    let grid_shape = header.grid_shape();
    let output_strides = row_major_strides(count);
    let chunk_strides = row_major_strides(&header.chunk_shape);

    let mut first_chunk = vec![0usize; ndim];
    let mut last_chunk = vec![0usize; ndim];
    for d in 0..ndim {
        first_chunk[d] = start[d] / header.chunk_shape[d];
        last_chunk[d] = ((start[d] + count[d] - 1) / header.chunk_shape[d]).min(grid_shape[d].saturating_sub(1));
    }
    // last_chunk is inclusive; make it the exclusive bound `advance` expects.
    let last_chunk_exclusive: Vec<usize> = last_chunk.iter().map(|&v| v + 1).collect();

    let mut ci = first_chunk.clone();
    loop {
        read_one_chunk(
            array_dir,
            header,
            &ci,
            start,
            count,
            &chunk_strides,
            &output_strides,
            &mut output,
        )?;
        if !advance(&mut ci, &first_chunk, &last_chunk_exclusive) {
            break;
        }
    }

    Ok(output)
}

/// Read every chunk of `array_dir` in full; used for coordinate arrays,
/// which must be read completely regardless of any requested sub-range.
pub fn read_full(array_dir: &Path, header: &ZArrayHeader) -> ViewerResult<Vec<f64>> {
    read_hyperslab(array_dir, header, &vec![0; header.shape.len()], &header.shape)
}

#[allow(clippy::too_many_arguments)]
fn read_one_chunk(
    array_dir: &Path,
    header: &ZArrayHeader,
    chunk_index: &[usize],
    start: &[usize],
    count: &[usize],
    chunk_strides: &[usize],
    output_strides: &[usize],
    output: &mut [f64],
) -> ViewerResult<()> {
    let ndim = chunk_index.len();
    let chunk_key = chunk_index
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(".");
    let chunk_path = array_dir.join(&chunk_key);
    if !chunk_path.exists() {
        return Ok(());
    }
    let raw = std::fs::read(&chunk_path)
        .map_err(|e| ViewerError::StorageDecode(format!("reading chunk {chunk_key}: {e}")))?;
    let decoded = header.decode_chunk(&raw)?;

    let mut lo = vec![0usize; ndim];
    let mut hi = vec![0usize; ndim];
    for d in 0..ndim {
        let chunk_global_start = chunk_index[d] * header.chunk_shape[d];
        let chunk_global_end = (chunk_global_start + header.chunk_shape[d]).min(header.shape[d]);
        lo[d] = chunk_global_start.max(start[d]);
        hi[d] = chunk_global_end.min(start[d] + count[d]);
        if lo[d] >= hi[d] {
            return Ok(());
        }
    }

    let mut gc = lo.clone();
    loop {
        let mut chunk_flat = 0usize;
        let mut out_flat = 0usize;
        for d in 0..ndim {
            let local = gc[d] - chunk_index[d] * header.chunk_shape[d];
            chunk_flat += local * chunk_strides[d];
            out_flat += (gc[d] - start[d]) * output_strides[d];
        }
        output[out_flat] = decoded[chunk_flat];
        if !advance(&mut gc, &lo, &hi) {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::Compressor;

    fn write_chunk(dir: &Path, key: &str, values: &[f32]) {
        let mut bytes = Vec::new();
        for v in values {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        std::fs::write(dir.join(key), bytes).unwrap();
    }

    #[test]
    fn reads_full_array_across_multiple_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let header = ZArrayHeader {
            shape: vec![4, 4],
            chunk_shape: vec![2, 2],
            dtype: "<f4".to_string(),
            fill_value: 1.0e20,
            compressor: Compressor::None,
        };
        // Full 4x4 grid, row-major value = row*4+col, split into four 2x2 chunks.
        write_chunk(dir.path(), "0.0", &[0.0, 1.0, 4.0, 5.0]);
        write_chunk(dir.path(), "0.1", &[2.0, 3.0, 6.0, 7.0]);
        write_chunk(dir.path(), "1.0", &[8.0, 9.0, 12.0, 13.0]);
        write_chunk(dir.path(), "1.1", &[10.0, 11.0, 14.0, 15.0]);

        let data = read_full(dir.path(), &header).unwrap();
        let expected: Vec<f64> = (0..16).map(|v| v as f64).collect();
        assert_eq!(data, expected);
    }

    #[test]
    fn missing_chunk_file_fills_with_fill_value() {
        let dir = tempfile::tempdir().unwrap();
        let header = ZArrayHeader {
            shape: vec![2, 2],
            chunk_shape: vec![2, 2],
            dtype: "<f4".to_string(),
            fill_value: -999.0,
            compressor: Compressor::None,
        };
        let data = read_full(dir.path(), &header).unwrap();
        assert_eq!(data, vec![-999.0; 4]);
    }

    #[test]
    fn sub_rectangle_read_intersects_only_needed_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let header = ZArrayHeader {
            shape: vec![4, 4],
            chunk_shape: vec![2, 2],
            dtype: "<f4".to_string(),
            fill_value: 1.0e20,
            compressor: Compressor::None,
        };
        write_chunk(dir.path(), "0.0", &[0.0, 1.0, 4.0, 5.0]);
        write_chunk(dir.path(), "0.1", &[2.0, 3.0, 6.0, 7.0]);
        write_chunk(dir.path(), "1.0", &[8.0, 9.0, 12.0, 13.0]);
        write_chunk(dir.path(), "1.1", &[10.0, 11.0, 14.0, 15.0]);

        let sub = read_hyperslab(dir.path(), &header, &[1, 1], &[2, 2]).unwrap();
        assert_eq!(sub, vec![5.0, 6.0, 9.0, 10.0]);
    }
}
