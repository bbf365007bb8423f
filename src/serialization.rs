//! Persistence of models.
//!
//! Two families of formats live here:
//! * the raw little-endian `.mfab` / `.cpts` exchange formats in [`mfab`], and
//! * native snapshots of whole blocks, serde-encoded with bincode and
//!   optionally LZ4-compressed (this module).

pub mod mfab;

use serde::{de::DeserializeOwned, Serialize};

use crate::errors::MfaError;

/// Serialization format options for native block snapshots.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SerializationFormat {
    /// plain bincode
    Bincode,
    /// bincode inside an LZ4 frame
    #[default]
    BincodeLz4,
}

impl SerializationFormat {
    pub fn is_compressed(&self) -> bool {
        matches!(self, SerializationFormat::BincodeLz4)
    }
}

/// Encodes a snapshot value with bincode's standard config, LZ4-framed when
/// the format asks for it. The LZ4 frame carries the decoded length up front.
pub fn serialize<T: Serialize>(data: &T, format: SerializationFormat) -> Result<Vec<u8>, MfaError> {
    let bytes = bincode::serde::encode_to_vec(data, bincode::config::standard())
        .map_err(|_| MfaError::SerializationFailed)?;
    if format.is_compressed() {
        Ok(lz4_flex::compress_prepend_size(&bytes))
    } else {
        Ok(bytes)
    }
}

/// Inverse of [`serialize`]. Trailing bytes after the bincode value are ignored.
pub fn deserialize<T: DeserializeOwned>(data: &[u8], format: SerializationFormat) -> Result<T, MfaError> {
    let decode = |bytes: &[u8]| {
        bincode::serde::decode_from_slice::<T, _>(bytes, bincode::config::standard())
            .map(|(value, _)| value)
            .map_err(|_| MfaError::DeserializationFailed)
    };
    if format.is_compressed() {
        let decompressed = lz4_flex::decompress_size_prepended(data)
            .map_err(|_| MfaError::LZ4DecompressionFailed)?;
        decode(&decompressed)
    } else {
        decode(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq)]
    struct TestData {
        values: Vec<f64>,
        name: String,
    }

    #[test]
    fn test_bincode_roundtrip() {
        let data = TestData {
            values: vec![1.0, 2.0, 3.0],
            name: "test".to_string(),
        };

        let bytes = serialize(&data, SerializationFormat::Bincode).unwrap();
        let result: TestData = deserialize(&bytes, SerializationFormat::Bincode).unwrap();
        assert_eq!(data, result);
    }

    #[test]
    fn test_bincode_lz4_roundtrip() {
        let data = TestData {
            values: vec![0.5; 512],
            name: "compressed_test".to_string(),
        };

        let plain = serialize(&data, SerializationFormat::Bincode).unwrap();
        let bytes = serialize(&data, SerializationFormat::BincodeLz4).unwrap();
        assert!(bytes.len() < plain.len());
        let result: TestData = deserialize(&bytes, SerializationFormat::BincodeLz4).unwrap();
        assert_eq!(data, result);
    }

    #[test]
    fn test_corrupt_lz4_is_reported() {
        let result = deserialize::<TestData>(&[1, 2], SerializationFormat::BincodeLz4);
        assert!(matches!(result, Err(MfaError::LZ4DecompressionFailed)));
    }
}
