pub mod flat;
pub mod hnsw;

use std::io::Write;

use crate::core::errors::Result;
use crate::index::config::AlgorithmConfig;
use crate::interning::InternedVector;

pub use flat::FlatBackend;
pub use hnsw::HnswBackend;

/// Inclusion predicate applied during search. Built and owned by the query
/// layer; the index treats it as opaque.
pub trait SearchPredicate: Send + Sync {
    fn matches(&self, internal_id: u64) -> bool;
}

impl<F> SearchPredicate for F
where
    F: Fn(u64) -> bool + Send + Sync,
{
    fn matches(&self, internal_id: u64) -> bool {
        self(internal_id)
    }
}

/// Storage-and-search contract shared by the exact and approximate
/// backends. The identity layer composes with a boxed implementation and
/// never touches backend capacity directly; a capacity-exceeded condition
/// during `add_record` is absorbed inside the backend by growth and retry,
/// never surfaced to the caller.
pub trait VectorBackend: Send + Sync {
    /// Store a vector under a fresh internal id.
    fn add_record(&self, internal_id: u64, vector: &InternedVector) -> Result<()>;

    /// Soft-delete an internal id; physical space is reclaimed only by a
    /// later compaction or resize pass.
    fn remove_record(&self, internal_id: u64) -> Result<()>;

    /// Replace the content stored under an internal id. Returns `false`
    /// without mutating anything when the candidate matches the stored
    /// content bit-for-bit.
    fn modify_record(&self, internal_id: u64, vector: &InternedVector) -> Result<bool>;

    /// k-nearest-neighbor search. Results are (distance, internal id)
    /// pairs in ascending distance order. `search_breadth` overrides the
    /// backend's runtime breadth where the algorithm has one.
    fn search(
        &self,
        query: &[f32],
        k: usize,
        predicate: Option<&dyn SearchPredicate>,
        search_breadth: Option<usize>,
    ) -> Result<Vec<(f32, u64)>>;

    /// Distance from one live internal id's stored vector to a query.
    /// Fails if the id's slot has been soft-deleted.
    fn compute_distance(&self, internal_id: u64, query: &[f32]) -> Result<f32>;

    /// Stored content for a live internal id.
    fn vector(&self, internal_id: u64) -> Result<InternedVector>;

    /// Physical slot budget.
    fn capacity(&self) -> usize;

    /// Occupied slots, including soft-deleted ones.
    fn count(&self) -> u64;

    fn deleted_count(&self) -> u64;

    /// Current algorithm parameters, including runtime-settable ones.
    fn algorithm_config(&self) -> AlgorithmConfig;

    /// Serialize backend state onto a sequential stream.
    fn save(&self, out: &mut dyn Write) -> Result<()>;
}
