use serde::{Deserialize, Serialize};

use crate::core::errors::{IndexError, Result};

/// Element type of stored vectors. The closed set of variants is selected
/// from persisted configuration; FLOAT32 is the only shipped type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VectorDataType {
    Float32,
}

impl VectorDataType {
    /// Size in bytes of a single element.
    pub fn element_size(&self) -> usize {
        match self {
            VectorDataType::Float32 => std::mem::size_of::<f32>(),
        }
    }
}

/// Validate that a raw record has exactly `dimensions * element_size` bytes.
pub fn validate_record_shape(
    record: &[u8],
    dimensions: usize,
    data_type: VectorDataType,
) -> Result<()> {
    let expected = dimensions * data_type.element_size();
    if record.len() != expected || record.len() % data_type.element_size() != 0 {
        return Err(IndexError::InvalidShape {
            expected,
            got: record.len(),
        });
    }
    Ok(())
}

/// Parse a validated little-endian FLOAT32 record into floats.
pub fn parse_record(record: &[u8]) -> Vec<f32> {
    record
        .chunks_exact(std::mem::size_of::<f32>())
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Encode floats back into the little-endian record representation.
pub fn encode_record(data: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * std::mem::size_of::<f32>());
    for value in data {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_validation() {
        assert!(validate_record_shape(&[0u8; 16], 4, VectorDataType::Float32).is_ok());
        assert!(validate_record_shape(&[0u8; 15], 4, VectorDataType::Float32).is_err());
        assert!(validate_record_shape(&[0u8; 12], 4, VectorDataType::Float32).is_err());
        assert!(validate_record_shape(&[], 1, VectorDataType::Float32).is_err());
    }

    #[test]
    fn test_record_round_trip() {
        let data = vec![1.0f32, -2.5, 0.0, f32::MAX];
        let bytes = encode_record(&data);
        assert_eq!(bytes.len(), 16);
        assert_eq!(parse_record(&bytes), data);
    }
}
