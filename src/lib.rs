// ============================================================================
// CORE TYPES & UTILITIES
// ============================================================================
pub mod core;
pub mod interning;
pub mod vector;

// ============================================================================
// STORAGE & SEARCH ALGORITHMS
// ============================================================================
pub mod backend;
pub mod hnsw;

// ============================================================================
// PERSISTENCE
// ============================================================================
pub mod persist;

// ============================================================================
// IDENTITY LAYER & MAIN INDEX
// ============================================================================
pub mod index;

// Re-export commonly used types
pub use crate::core::{ErrorCode, IndexError, Result};
pub use backend::{FlatBackend, HnswBackend, SearchPredicate, VectorBackend};
pub use index::config::{
    AlgorithmConfig, AlgorithmKind, IndexConfig, IndexInfo, DEFAULT_BLOCK_SIZE,
    DEFAULT_EF_CONSTRUCTION, DEFAULT_EF_RUNTIME, DEFAULT_M, HNSW_BLOCK_SIZE,
};
pub use index::{Neighbor, RecordContents, VectorIndex, NO_MAGNITUDE};
pub use interning::{InternedKey, InternedVector};
pub use vector::{DistanceMetric, VectorDataType};
