//! Structural configuration exchanged with the owning catalog, plus the
//! process-wide string⇄enum lookup tables used for parsing and reporting.

use std::collections::HashMap;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::core::errors::{IndexError, Result};
use crate::vector::distance::DistanceMetric;
use crate::vector::types::VectorDataType;

/// Growth increment for the HNSW backend.
pub const HNSW_BLOCK_SIZE: u32 = 1024 * 10;
/// Default growth increment for the flat backend.
pub const DEFAULT_BLOCK_SIZE: u32 = 1024;

pub const DEFAULT_M: usize = 16;
pub const DEFAULT_EF_CONSTRUCTION: usize = 200;
pub const DEFAULT_EF_RUNTIME: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlgorithmKind {
    Flat,
    Hnsw,
}

/// Algorithm selection with its parameters. For HNSW, `ef_runtime` is the
/// search-time breadth: persisted here as configuration, never as part of
/// the graph structure, and re-applied after load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlgorithmConfig {
    Flat {
        block_size: u32,
    },
    Hnsw {
        m: usize,
        ef_construction: usize,
        ef_runtime: usize,
    },
}

impl AlgorithmConfig {
    pub fn kind(&self) -> AlgorithmKind {
        match self {
            AlgorithmConfig::Flat { .. } => AlgorithmKind::Flat,
            AlgorithmConfig::Hnsw { .. } => AlgorithmKind::Hnsw,
        }
    }
}

/// Structural parameters of one index. Round-trips through serde so the
/// owning catalog can persist and broadcast it with whatever codec it uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub dimensions: usize,
    pub data_type: VectorDataType,
    pub metric: DistanceMetric,
    pub initial_capacity: usize,
    pub algorithm: AlgorithmConfig,
}

impl IndexConfig {
    pub fn validate(&self) -> Result<()> {
        if self.dimensions == 0 {
            return Err(IndexError::InvalidConfiguration(
                "dimensions must be positive".to_string(),
            ));
        }
        if self.initial_capacity == 0 {
            return Err(IndexError::InvalidConfiguration(
                "initial capacity must be positive".to_string(),
            ));
        }
        match self.algorithm {
            AlgorithmConfig::Flat { block_size } => {
                if block_size == 0 {
                    return Err(IndexError::InvalidConfiguration(
                        "block size must be positive".to_string(),
                    ));
                }
            }
            AlgorithmConfig::Hnsw { m, ef_construction, ef_runtime } => {
                if m == 0 || ef_construction == 0 || ef_runtime == 0 {
                    return Err(IndexError::InvalidConfiguration(
                        "hnsw parameters must be positive".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Expected byte length of every record and query.
    pub fn record_size(&self) -> usize {
        self.dimensions * self.data_type.element_size()
    }
}

lazy_static! {
    pub static ref ALGORITHM_BY_NAME: HashMap<&'static str, AlgorithmKind> = {
        let mut map = HashMap::new();
        map.insert("FLAT", AlgorithmKind::Flat);
        map.insert("HNSW", AlgorithmKind::Hnsw);
        map
    };
    pub static ref METRIC_BY_NAME: HashMap<&'static str, DistanceMetric> = {
        let mut map = HashMap::new();
        map.insert("L2", DistanceMetric::L2);
        map.insert("IP", DistanceMetric::InnerProduct);
        map.insert("COSINE", DistanceMetric::Cosine);
        map
    };
    pub static ref DATA_TYPE_BY_NAME: HashMap<&'static str, VectorDataType> = {
        let mut map = HashMap::new();
        map.insert("FLOAT32", VectorDataType::Float32);
        map
    };
}

/// Reverse lookup in one of the constant name maps; empty string when the
/// value has no name.
pub fn name_by_value<V: PartialEq + Copy>(
    map: &HashMap<&'static str, V>,
    value: V,
) -> &'static str {
    map.iter()
        .find(|(_, candidate)| **candidate == value)
        .map(|(name, _)| *name)
        .unwrap_or("")
}

/// Operator-facing snapshot of an index's structure.
#[derive(Debug, Clone)]
pub struct IndexInfo {
    pub dimensions: usize,
    pub data_type: &'static str,
    pub metric: &'static str,
    pub capacity: usize,
    pub record_count: u64,
    pub deleted_count: u64,
    pub algorithm: AlgorithmConfig,
}

impl IndexInfo {
    pub fn algorithm_name(&self) -> &'static str {
        name_by_value(&ALGORITHM_BY_NAME, self.algorithm.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_maps_round_trip() {
        assert_eq!(ALGORITHM_BY_NAME["HNSW"], AlgorithmKind::Hnsw);
        assert_eq!(name_by_value(&ALGORITHM_BY_NAME, AlgorithmKind::Flat), "FLAT");
        assert_eq!(name_by_value(&METRIC_BY_NAME, DistanceMetric::Cosine), "COSINE");
        assert_eq!(
            name_by_value(&DATA_TYPE_BY_NAME, VectorDataType::Float32),
            "FLOAT32"
        );
    }

    #[test]
    fn test_validation_rejects_zero_dimensions() {
        let config = IndexConfig {
            dimensions: 0,
            data_type: VectorDataType::Float32,
            metric: DistanceMetric::L2,
            initial_capacity: 16,
            algorithm: AlgorithmConfig::Flat {
                block_size: DEFAULT_BLOCK_SIZE,
            },
        };
        assert!(matches!(
            config.validate(),
            Err(IndexError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_config_serde_round_trip() {
        let config = IndexConfig {
            dimensions: 128,
            data_type: VectorDataType::Float32,
            metric: DistanceMetric::Cosine,
            initial_capacity: 1024,
            algorithm: AlgorithmConfig::Hnsw {
                m: DEFAULT_M,
                ef_construction: DEFAULT_EF_CONSTRUCTION,
                ef_runtime: DEFAULT_EF_RUNTIME,
            },
        };
        let bytes = bincode::serialize(&config).unwrap();
        let decoded: IndexConfig = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, config);
    }
}
