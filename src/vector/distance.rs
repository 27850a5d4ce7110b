use serde::{Deserialize, Serialize};

/// Compute squared L2 (Euclidean) distance between two vectors.
///
/// The square root is intentionally not taken: ordering is preserved and
/// persisted distances stay comparable across save/load.
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have the same dimension");
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
}

/// Compute inner-product distance (1 - dot). Smaller means better aligned;
/// a self-query does not yield 0 unless the vector has unit norm.
pub fn inner_product_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have the same dimension");
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    1.0 - dot
}

/// Compute cosine distance (1 - cosine_similarity). Assumes both vectors
/// are already normalized to unit length.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    inner_product_distance(a, b)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistanceMetric {
    L2,
    InnerProduct,
    Cosine,
}

impl DistanceMetric {
    /// Compute distance using the specified metric. Lower is closer for
    /// every metric under these conventions.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::L2 => l2_distance(a, b),
            DistanceMetric::InnerProduct => inner_product_distance(a, b),
            DistanceMetric::Cosine => cosine_distance(a, b),
        }
    }

    /// Whether records and queries are normalized to unit length before
    /// storage and search.
    pub fn normalizes(&self) -> bool {
        matches!(self, DistanceMetric::Cosine)
    }
}
