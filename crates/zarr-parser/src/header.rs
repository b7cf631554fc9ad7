//! `.zarray` header parsing and raw chunk decoding.

use std::io::Read;

use serde::Deserialize;
use sphere_core::{ViewerError, ViewerResult};

#[derive(Debug, Deserialize)]
struct CompressorJson {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ZArrayJson {
    shape: Vec<usize>,
    chunks: Vec<usize>,
    dtype: String,
    #[serde(default)]
    fill_value: Option<serde_json::Value>,
    #[serde(default)]
    compressor: Option<CompressorJson>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Compressor {
    None,
    Zlib,
}

#[derive(Debug, Clone)]
pub struct ZArrayHeader {
    pub shape: Vec<usize>,
    pub chunk_shape: Vec<usize>,
    pub dtype: String,
    pub fill_value: f64,
    pub compressor: Compressor,
}

impl ZArrayHeader {
    pub fn parse(json: &str) -> ViewerResult<Self> {
        let raw: ZArrayJson = serde_json::from_str(json)
            .map_err(|e| ViewerError::StorageDecode(format!(".zarray parse error: {e}")))?;

        let compressor = match &raw.compressor {
            None => Compressor::None,
            Some(c) if c.id == "zlib" => Compressor::Zlib,
            Some(c) => {
                return Err(ViewerError::StorageDecode(format!(
                    "unsupported zarr compressor '{}'",
                    c.id
                )))
            }
        };

        let fill_value = match &raw.fill_value {
            None => sphere_core::DEFAULT_FILL_VALUE,
            Some(serde_json::Value::Null) => sphere_core::DEFAULT_FILL_VALUE,
            Some(v) => v.as_f64().ok_or_else(|| {
                ViewerError::StorageDecode("non-numeric zarr fill_value".to_string())
            })?,
        };

        Ok(ZArrayHeader {
            shape: raw.shape,
            chunk_shape: raw.chunks,
            dtype: raw.dtype,
            fill_value,
            compressor,
        })
    }

    /// Number of chunks along each axis, rounding up.
    pub fn grid_shape(&self) -> Vec<usize> {
        self.shape
            .iter()
            .zip(&self.chunk_shape)
            .map(|(&s, &c)| s.div_ceil(c))
            .collect()
    }

    /// Element count of one full (possibly edge-padded) chunk.
    pub fn chunk_elements(&self) -> usize {
        self.chunk_shape.iter().product()
    }

    fn dtype_size(&self) -> ViewerResult<usize> {
        match self.dtype.as_str() {
            "<f4" | ">f4" | "<i4" | ">i4" | "<u4" | ">u4" => Ok(4),
            "<f8" | ">f8" | "<i8" | ">i8" | "<u8" | ">u8" => Ok(8),
            "<i2" | ">i2" | "<u2" | ">u2" => Ok(2),
            "|i1" | "|u1" => Ok(1),
            other => Err(ViewerError::StorageDecode(format!("unsupported zarr dtype '{other}'"))),
        }
    }

    /// Decompress (if needed) and decode one chunk's raw bytes into `f64`s,
    /// in the on-disk order (row-major over `chunk_shape`).
    pub fn decode_chunk(&self, raw: &[u8]) -> ViewerResult<Vec<f64>> {
        let decompressed = match self.compressor {
            Compressor::None => raw.to_vec(),
            Compressor::Zlib => {
                let mut decoder = flate2::read::ZlibDecoder::new(raw);
                let mut buf = Vec::new();
                decoder
                    .read_to_end(&mut buf)
                    .map_err(|e| ViewerError::StorageDecode(format!("zlib decompress failed: {e}")))?;
                buf
            }
        };
        decode_typed_bytes(&decompressed, &self.dtype, self.dtype_size()?)
    }
}

fn decode_typed_bytes(bytes: &[u8], dtype: &str, size: usize) -> ViewerResult<Vec<f64>> {
    let little_endian = !dtype.starts_with('>');
    let n = bytes.len() / size;
    let mut out = Vec::with_capacity(n);
    for chunk in bytes.chunks_exact(size) {
        let v = match (dtype.trim_start_matches(['<', '>', '|']), size) {
            ("f4", 4) => {
                let arr: [u8; 4] = chunk.try_into().unwrap();
                (if little_endian { f32::from_le_bytes(arr) } else { f32::from_be_bytes(arr) }) as f64
            }
            ("f8", 8) => {
                let arr: [u8; 8] = chunk.try_into().unwrap();
                if little_endian { f64::from_le_bytes(arr) } else { f64::from_be_bytes(arr) }
            }
            ("i2", 2) => {
                let arr: [u8; 2] = chunk.try_into().unwrap();
                (if little_endian { i16::from_le_bytes(arr) } else { i16::from_be_bytes(arr) }) as f64
            }
            ("u2", 2) => {
                let arr: [u8; 2] = chunk.try_into().unwrap();
                (if little_endian { u16::from_le_bytes(arr) } else { u16::from_be_bytes(arr) }) as f64
            }
            ("i4", 4) => {
                let arr: [u8; 4] = chunk.try_into().unwrap();
                (if little_endian { i32::from_le_bytes(arr) } else { i32::from_be_bytes(arr) }) as f64
            }
            ("u4", 4) => {
                let arr: [u8; 4] = chunk.try_into().unwrap();
                (if little_endian { u32::from_le_bytes(arr) } else { u32::from_be_bytes(arr) }) as f64
            }
            ("i8", 8) => {
                let arr: [u8; 8] = chunk.try_into().unwrap();
                (if little_endian { i64::from_le_bytes(arr) } else { i64::from_be_bytes(arr) }) as f64
            }
            ("u8", 8) => {
                let arr: [u8; 8] = chunk.try_into().unwrap();
                (if little_endian { u64::from_le_bytes(arr) } else { u64::from_be_bytes(arr) }) as f64
            }
            ("i1", 1) => chunk[0] as i8 as f64,
            ("u1", 1) => chunk[0] as f64,
            _ => return Err(ViewerError::StorageDecode(format!("unsupported zarr dtype '{dtype}'"))),
        };
        out.push(v);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_zarray() {
        let json = r#"{"zarr_format":2,"shape":[10,20],"chunks":[5,5],"dtype":"<f4","fill_value":null,"order":"C","compressor":null,"filters":null}"#;
        let h = ZArrayHeader::parse(json).unwrap();
        assert_eq!(h.shape, vec![10, 20]);
        assert_eq!(h.chunk_shape, vec![5, 5]);
        assert_eq!(h.compressor, Compressor::None);
        assert_eq!(h.grid_shape(), vec![2, 4]);
    }

    #[test]
    fn rejects_unsupported_compressor() {
        let json = r#"{"shape":[4],"chunks":[4],"dtype":"<f4","compressor":{"id":"blosc"}}"#;
        assert!(ZArrayHeader::parse(json).is_err());
    }

    #[test]
    fn decodes_little_endian_f8() {
        let h = ZArrayHeader::parse(r#"{"shape":[2],"chunks":[2],"dtype":"<f8","compressor":null}"#).unwrap();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1.5f64.to_le_bytes());
        bytes.extend_from_slice(&2.5f64.to_le_bytes());
        let decoded = h.decode_chunk(&bytes).unwrap();
        assert_eq!(decoded, vec![1.5, 2.5]);
    }

    #[test]
    fn decodes_zlib_compressed_chunk() {
        use std::io::Write;
        let h = ZArrayHeader {
            shape: vec![3],
            chunk_shape: vec![3],
            dtype: "<f4".to_string(),
            fill_value: 1.0e20,
            compressor: Compressor::Zlib,
        };
        let mut raw = Vec::new();
        for v in [1.0f32, 2.0, 3.0] {
            raw.extend_from_slice(&v.to_le_bytes());
        }
        let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&raw).unwrap();
        let compressed = encoder.finish().unwrap();
        let decoded = h.decode_chunk(&compressed).unwrap();
        assert_eq!(decoded, vec![1.0, 2.0, 3.0]);
    }
}
