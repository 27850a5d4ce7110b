//! Approximate backend wrapping the layered proximity graph. No
//! `GraphError` crosses this module's public surface: every call site
//! converts to a typed failure carrying the graph's message, and the
//! capacity-exceeded condition during insert is absorbed entirely by
//! growth and retry.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use parking_lot::RwLock;

use crate::core::errors::{IndexError, Result};
use crate::hnsw::graph::{GraphError, HnswGraph, HnswParams};
use crate::hnsw::search::search_knn;
use crate::index::config::{AlgorithmConfig, HNSW_BLOCK_SIZE};
use crate::interning::InternedVector;
use crate::persist::{StreamReader, StreamWriter};
use crate::vector::distance::DistanceMetric;

use super::{SearchPredicate, VectorBackend};

pub struct HnswBackend {
    block_size: AtomicU32,
    graph: RwLock<HnswGraph>,
}

fn not_found(internal_id: u64) -> IndexError {
    IndexError::NotFound(format!("internal id: {}", internal_id))
}

impl HnswBackend {
    pub fn new(
        dim: usize,
        metric: DistanceMetric,
        m: usize,
        ef_construction: usize,
        ef_runtime: usize,
        initial_capacity: usize,
    ) -> Self {
        HnswBackend {
            block_size: AtomicU32::new(HNSW_BLOCK_SIZE),
            graph: RwLock::new(HnswGraph::new(
                dim,
                metric,
                HnswParams::new(m, ef_construction),
                initial_capacity,
                ef_runtime,
            )),
        }
    }

    /// Deserialize a graph saved by `save`. The runtime search breadth is
    /// not part of the persisted structure and is applied from
    /// configuration here.
    pub fn load<R: Read>(
        r: &mut StreamReader<R>,
        dim: usize,
        metric: DistanceMetric,
        ef_runtime: usize,
        initial_capacity: usize,
        first_word: Option<u64>,
    ) -> Result<Self> {
        let mut graph = HnswGraph::load(r, dim, metric, initial_capacity, first_word)?;
        graph.set_ef(ef_runtime);
        Ok(HnswBackend {
            block_size: AtomicU32::new(HNSW_BLOCK_SIZE),
            graph: RwLock::new(graph),
        })
    }

    /// Used just for testing.
    pub fn set_block_size(&self, block_size: u32) {
        self.block_size.store(block_size.max(1), Ordering::Relaxed);
    }

    pub fn set_ef_runtime(&self, ef: usize) {
        self.graph.write().set_ef(ef);
    }

    /// Double-checked growth: cheap shared check, then exclusive
    /// re-check-and-grow by one block. The graph cannot shrink after
    /// expansion.
    fn resize_if_full(&self) {
        {
            let graph = self.graph.read();
            if graph.count() < graph.capacity() {
                return;
            }
        }
        let mut graph = self.graph.write();
        if graph.count() < graph.capacity() {
            return;
        }
        let started = Instant::now();
        let current = graph.capacity();
        let block = self.block_size.load(Ordering::Relaxed) as usize;
        graph.resize(current + block);
        tracing::warn!(
            current_size = current,
            expand_by = block,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "resizing hnsw index"
        );
    }
}

impl VectorBackend for HnswBackend {
    fn add_record(&self, internal_id: u64, vector: &InternedVector) -> Result<()> {
        // Each retry is preceded by an actual capacity increase, so the
        // loop terminates.
        loop {
            {
                let mut graph = self.graph.write();
                match graph.insert(internal_id, vector.clone()) {
                    Ok(()) => return Ok(()),
                    Err(GraphError::CapacityExceeded { .. }) => {}
                    Err(e) => {
                        return Err(IndexError::BackendFailure(format!(
                            "error while adding a record: {}",
                            e
                        )));
                    }
                }
            }
            self.resize_if_full();
        }
    }

    fn remove_record(&self, internal_id: u64) -> Result<()> {
        let mut graph = self.graph.write();
        graph.mark_deleted(internal_id).map_err(|e| match e {
            GraphError::UnknownLabel(_) => not_found(internal_id),
            other => {
                IndexError::BackendFailure(format!("error while removing a record: {}", other))
            }
        })
    }

    fn modify_record(&self, internal_id: u64, vector: &InternedVector) -> Result<bool> {
        // Compare, soft-delete and re-insert under one guard so no reader
        // or writer observes the id mid-replacement. Re-adding the same
        // label revives its slot, so capacity is never involved here.
        let mut graph = self.graph.write();
        match graph.content_matches(internal_id, vector) {
            Ok(true) => return Ok(false),
            Ok(false) => {}
            Err(GraphError::UnknownLabel(_)) => return Err(not_found(internal_id)),
            Err(e) => {
                return Err(IndexError::BackendFailure(format!(
                    "error while modifying a record: {}",
                    e
                )));
            }
        }
        graph.mark_deleted(internal_id).map_err(|e| {
            IndexError::BackendFailure(format!("error while modifying a record: {}", e))
        })?;
        graph.insert(internal_id, vector.clone()).map_err(|e| {
            IndexError::BackendFailure(format!("error while modifying a record: {}", e))
        })?;
        Ok(true)
    }

    fn search(
        &self,
        query: &[f32],
        k: usize,
        predicate: Option<&dyn SearchPredicate>,
        search_breadth: Option<usize>,
    ) -> Result<Vec<(f32, u64)>> {
        let graph = self.graph.read();
        match predicate {
            Some(predicate) => {
                let allow = |label: u64| predicate.matches(label);
                Ok(search_knn(&graph, query, k, search_breadth, Some(&allow)))
            }
            None => Ok(search_knn(&graph, query, k, search_breadth, None)),
        }
    }

    fn compute_distance(&self, internal_id: u64, query: &[f32]) -> Result<f32> {
        let graph = self.graph.read();
        graph.distance_to(internal_id, query).map_err(|e| match e {
            GraphError::UnknownLabel(_) => not_found(internal_id),
            other => IndexError::BackendFailure(format!(
                "error while computing a distance: {}",
                other
            )),
        })
    }

    fn vector(&self, internal_id: u64) -> Result<InternedVector> {
        let graph = self.graph.read();
        graph.vector(internal_id).map_err(|e| match e {
            GraphError::UnknownLabel(_) => not_found(internal_id),
            other => IndexError::BackendFailure(format!("error while reading a record: {}", other)),
        })
    }

    fn capacity(&self) -> usize {
        self.graph.read().capacity()
    }

    fn count(&self) -> u64 {
        self.graph.read().count() as u64
    }

    fn deleted_count(&self) -> u64 {
        self.graph.read().deleted_count() as u64
    }

    fn algorithm_config(&self) -> AlgorithmConfig {
        let graph = self.graph.read();
        AlgorithmConfig::Hnsw {
            m: graph.params().m,
            ef_construction: graph.params().ef_construction,
            ef_runtime: graph.ef(),
        }
    }

    fn save(&self, out: &mut dyn Write) -> Result<()> {
        let graph = self.graph.read();
        graph.save(&mut StreamWriter::new(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interning::intern_vector;

    fn vector(data: &[f32]) -> InternedVector {
        intern_vector(data.to_vec())
    }

    fn backend(initial_capacity: usize) -> HnswBackend {
        let b = HnswBackend::new(4, DistanceMetric::L2, 8, 32, 16, initial_capacity);
        b.set_block_size(4);
        b
    }

    #[test]
    fn test_capacity_exceeded_is_absorbed_by_growth() {
        let b = backend(2);
        for id in 0..10u64 {
            b.add_record(id, &vector(&[id as f32, 0.0, 0.0, 0.0]))
                .unwrap();
        }
        assert_eq!(b.count(), 10);
        assert!(b.capacity() >= 10);
    }

    #[test]
    fn test_modify_short_circuits_on_identical_bits() {
        let b = backend(8);
        b.add_record(1, &vector(&[1.0, 2.0, 3.0, 4.0])).unwrap();
        assert!(!b.modify_record(1, &vector(&[1.0, 2.0, 3.0, 4.0])).unwrap());
        assert!(b.modify_record(1, &vector(&[4.0, 3.0, 2.0, 1.0])).unwrap());
        assert_eq!(b.count(), 1);
        assert_eq!(b.deleted_count(), 0);

        let results = b.search(&[4.0, 3.0, 2.0, 1.0], 1, None, None).unwrap();
        assert_eq!(results[0], (0.0, 1));
    }

    #[test]
    fn test_compute_distance_fails_for_deleted_id() {
        let b = backend(8);
        b.add_record(1, &vector(&[1.0, 0.0, 0.0, 0.0])).unwrap();
        assert_eq!(
            b.compute_distance(1, &[1.0, 0.0, 0.0, 0.0]).unwrap(),
            0.0
        );
        b.remove_record(1).unwrap();
        assert!(matches!(
            b.compute_distance(1, &[1.0, 0.0, 0.0, 0.0]),
            Err(IndexError::NotFound(_))
        ));
    }

    #[test]
    fn test_search_breadth_override_and_runtime_ef() {
        let b = backend(64);
        for id in 0..32u64 {
            b.add_record(id, &vector(&[id as f32, 1.0, 0.0, 0.0]))
                .unwrap();
        }
        let results = b
            .search(&[3.0, 1.0, 0.0, 0.0], 2, None, Some(64))
            .unwrap();
        assert_eq!(results[0], (0.0, 3));

        b.set_ef_runtime(64);
        match b.algorithm_config() {
            AlgorithmConfig::Hnsw { ef_runtime, .. } => assert_eq!(ef_runtime, 64),
            other => panic!("unexpected algorithm config: {:?}", other),
        }
    }

    #[test]
    fn test_save_load_reapplies_runtime_breadth() {
        let b = backend(8);
        for id in 0..5u64 {
            b.add_record(id, &vector(&[id as f32, 0.0, 0.0, 0.0]))
                .unwrap();
        }
        let mut buf = Vec::new();
        b.save(&mut buf).unwrap();

        let loaded = HnswBackend::load(
            &mut StreamReader::new(buf.as_slice()),
            4,
            DistanceMetric::L2,
            48,
            8,
            None,
        )
        .unwrap();
        match loaded.algorithm_config() {
            AlgorithmConfig::Hnsw { ef_runtime, .. } => assert_eq!(ef_runtime, 48),
            other => panic!("unexpected algorithm config: {:?}", other),
        }
        let query = [2.0, 0.0, 0.0, 0.0];
        assert_eq!(
            loaded.search(&query, 3, None, None).unwrap(),
            b.search(&query, 3, None, None).unwrap()
        );
    }
}
