//! Exact brute-force backend with block-granularity capacity growth.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::io::{Read, Write};
use std::time::Instant;

use parking_lot::RwLock;

use crate::core::errors::{IndexError, Result};
use crate::index::config::AlgorithmConfig;
use crate::interning::{intern_vector, InternedVector};
use crate::persist::{StreamReader, StreamWriter};
use crate::vector::distance::DistanceMetric;

use super::{SearchPredicate, VectorBackend};

#[derive(Debug, Clone)]
struct FlatSlot {
    label: u64,
    vector: InternedVector,
    deleted: bool,
}

struct FlatStore {
    block_size: u32,
    capacity: usize,
    num_deleted: usize,
    slots: Vec<FlatSlot>,
    slot_by_label: HashMap<u64, usize>,
}

impl FlatStore {
    /// Drop soft-deleted slots and rebuild the label map. Labels are
    /// stable; only slot positions move.
    fn compact(&mut self) {
        self.slots.retain(|slot| !slot.deleted);
        self.slot_by_label.clear();
        for (position, slot) in self.slots.iter().enumerate() {
            self.slot_by_label.insert(slot.label, position);
        }
        self.num_deleted = 0;
    }

    fn live_position(&self, label: u64) -> Option<usize> {
        let position = *self.slot_by_label.get(&label)?;
        if self.slots[position].deleted {
            None
        } else {
            Some(position)
        }
    }
}

/// Max-heap entry keeping the k smallest distances: the farthest retained
/// candidate sits at the top and is evicted first.
#[derive(Debug)]
struct ScanEntry {
    distance: f32,
    label: u64,
}

impl Eq for ScanEntry {}

impl PartialEq for ScanEntry {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label
    }
}

impl Ord for ScanEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .partial_cmp(&other.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.label.cmp(&other.label))
    }
}

impl PartialOrd for ScanEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub struct FlatBackend {
    dim: usize,
    metric: DistanceMetric,
    store: RwLock<FlatStore>,
}

impl FlatBackend {
    pub fn new(
        dim: usize,
        metric: DistanceMetric,
        block_size: u32,
        initial_capacity: usize,
    ) -> Self {
        FlatBackend {
            dim,
            metric,
            store: RwLock::new(FlatStore {
                block_size: block_size.max(1),
                capacity: initial_capacity.max(1),
                num_deleted: 0,
                slots: Vec::new(),
                slot_by_label: HashMap::new(),
            }),
        }
    }

    /// Double-checked growth: cheap shared check, then exclusive re-check.
    /// A full store with soft-deleted slots is compacted in place before
    /// any new block is paid for.
    fn resize_if_full(&self) {
        {
            let store = self.store.read();
            if store.slots.len() < store.capacity {
                return;
            }
        }
        let mut store = self.store.write();
        if store.slots.len() < store.capacity {
            return;
        }
        let started = Instant::now();
        if store.num_deleted > 0 {
            let reclaimed = store.num_deleted;
            store.compact();
            tracing::info!(
                reclaimed,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "compacted flat index"
            );
        } else {
            let current = store.capacity;
            let block = store.block_size as usize;
            store.capacity = current + block;
            tracing::warn!(
                current_size = current,
                expand_by = block,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "resizing flat index"
            );
        }
    }

    /// Deserialize a store saved by `save`. `first_word`, when present, is
    /// the leading capacity field already consumed by layout
    /// auto-detection.
    pub fn load<R: Read>(
        r: &mut StreamReader<R>,
        dim: usize,
        metric: DistanceMetric,
        initial_capacity: usize,
        first_word: Option<u64>,
    ) -> Result<Self> {
        let capacity = match first_word {
            Some(word) => word,
            None => r.read_u64()?,
        } as usize;
        let count = r.read_u64()? as usize;
        let num_deleted = r.read_u64()? as usize;
        let block_size = r.read_u32()?;
        if num_deleted > count {
            return Err(IndexError::PersistenceCorrupt(format!(
                "deleted count {} exceeds element count {}",
                num_deleted, count
            )));
        }
        let mut slots = Vec::with_capacity(count);
        let mut slot_by_label = HashMap::with_capacity(count);
        for position in 0..count {
            let label = r.read_u64()?;
            let deleted = r.read_u8()? != 0;
            let vector = intern_vector(r.read_f32s(dim)?);
            if slot_by_label.insert(label, position).is_some() {
                return Err(IndexError::PersistenceCorrupt(format!(
                    "duplicate label {} in flat data",
                    label
                )));
            }
            slots.push(FlatSlot {
                label,
                vector,
                deleted,
            });
        }
        let floor = if count == 0 { initial_capacity } else { 0 };
        Ok(FlatBackend {
            dim,
            metric,
            store: RwLock::new(FlatStore {
                block_size: block_size.max(1),
                capacity: capacity.max(count).max(floor).max(1),
                num_deleted,
                slots,
                slot_by_label,
            }),
        })
    }
}

impl VectorBackend for FlatBackend {
    fn add_record(&self, internal_id: u64, vector: &InternedVector) -> Result<()> {
        loop {
            self.resize_if_full();
            let mut store = self.store.write();
            if store.slots.len() >= store.capacity {
                // Lost the block to concurrent inserts; grow again.
                continue;
            }
            if store.slot_by_label.contains_key(&internal_id) {
                return Err(IndexError::BackendFailure(format!(
                    "error while adding a record: label {} is already present",
                    internal_id
                )));
            }
            let position = store.slots.len();
            store.slots.push(FlatSlot {
                label: internal_id,
                vector: vector.clone(),
                deleted: false,
            });
            store.slot_by_label.insert(internal_id, position);
            return Ok(());
        }
    }

    fn remove_record(&self, internal_id: u64) -> Result<()> {
        let mut store = self.store.write();
        let position = store
            .live_position(internal_id)
            .ok_or_else(|| IndexError::NotFound(format!("internal id: {}", internal_id)))?;
        store.slots[position].deleted = true;
        store.num_deleted += 1;
        Ok(())
    }

    fn modify_record(&self, internal_id: u64, vector: &InternedVector) -> Result<bool> {
        let mut store = self.store.write();
        let position = store
            .live_position(internal_id)
            .ok_or_else(|| IndexError::NotFound(format!("internal id: {}", internal_id)))?;
        if store.slots[position].vector == *vector {
            return Ok(false);
        }
        store.slots[position].vector = vector.clone();
        Ok(true)
    }

    fn search(
        &self,
        query: &[f32],
        k: usize,
        predicate: Option<&dyn SearchPredicate>,
        _search_breadth: Option<usize>,
    ) -> Result<Vec<(f32, u64)>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let store = self.store.read();
        let mut heap: BinaryHeap<ScanEntry> = BinaryHeap::with_capacity(k + 1);
        for slot in store.slots.iter() {
            if slot.deleted {
                continue;
            }
            if let Some(predicate) = predicate {
                if !predicate.matches(slot.label) {
                    continue;
                }
            }
            let distance = self.metric.distance(query, slot.vector.as_slice());
            heap.push(ScanEntry {
                distance,
                label: slot.label,
            });
            if heap.len() > k {
                heap.pop();
            }
        }
        let mut results = Vec::with_capacity(heap.len());
        while let Some(entry) = heap.pop() {
            results.push((entry.distance, entry.label));
        }
        results.reverse();
        Ok(results)
    }

    fn compute_distance(&self, internal_id: u64, query: &[f32]) -> Result<f32> {
        let store = self.store.read();
        let position = store
            .live_position(internal_id)
            .ok_or_else(|| IndexError::NotFound(format!("internal id: {}", internal_id)))?;
        Ok(self
            .metric
            .distance(query, store.slots[position].vector.as_slice()))
    }

    fn vector(&self, internal_id: u64) -> Result<InternedVector> {
        let store = self.store.read();
        let position = store
            .live_position(internal_id)
            .ok_or_else(|| IndexError::NotFound(format!("internal id: {}", internal_id)))?;
        Ok(store.slots[position].vector.clone())
    }

    fn capacity(&self) -> usize {
        self.store.read().capacity
    }

    fn count(&self) -> u64 {
        self.store.read().slots.len() as u64
    }

    fn deleted_count(&self) -> u64 {
        self.store.read().num_deleted as u64
    }

    fn algorithm_config(&self) -> AlgorithmConfig {
        AlgorithmConfig::Flat {
            block_size: self.store.read().block_size,
        }
    }

    fn save(&self, out: &mut dyn Write) -> Result<()> {
        let store = self.store.read();
        let mut w = StreamWriter::new(out);
        w.write_u64(store.capacity as u64)?;
        w.write_u64(store.slots.len() as u64)?;
        w.write_u64(store.num_deleted as u64)?;
        w.write_u32(store.block_size)?;
        for slot in store.slots.iter() {
            w.write_u64(slot.label)?;
            w.write_u8(slot.deleted as u8)?;
            w.write_f32s(slot.vector.as_slice())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(data: &[f32]) -> InternedVector {
        intern_vector(data.to_vec())
    }

    fn backend() -> FlatBackend {
        FlatBackend::new(4, DistanceMetric::L2, 2, 2)
    }

    #[test]
    fn test_add_grows_past_initial_capacity() {
        let b = backend();
        for id in 0..7u64 {
            b.add_record(id, &vector(&[id as f32, 0.0, 0.0, 0.0]))
                .unwrap();
        }
        assert_eq!(b.count(), 7);
        assert!(b.capacity() >= 7);
    }

    #[test]
    fn test_growth_compacts_deleted_slots_first() {
        let b = backend();
        b.add_record(0, &vector(&[0.0, 0.0, 0.0, 0.0])).unwrap();
        b.add_record(1, &vector(&[1.0, 0.0, 0.0, 0.0])).unwrap();
        b.remove_record(0).unwrap();
        // Store is full but holds a tombstone; the next add reclaims it
        // instead of growing.
        b.add_record(2, &vector(&[2.0, 0.0, 0.0, 0.0])).unwrap();
        assert_eq!(b.capacity(), 2);
        assert_eq!(b.count(), 2);
        assert_eq!(b.deleted_count(), 0);
    }

    #[test]
    fn test_search_orders_by_distance_and_honors_predicate() {
        let b = FlatBackend::new(4, DistanceMetric::L2, 1024, 16);
        b.add_record(1, &vector(&[1.0, 0.0, 0.0, 0.0])).unwrap();
        b.add_record(2, &vector(&[0.0, 1.0, 0.0, 0.0])).unwrap();
        b.add_record(3, &vector(&[1.0, 1.0, 0.0, 0.0])).unwrap();

        let results = b.search(&[1.0, 0.0, 0.0, 0.0], 2, None, None).unwrap();
        assert_eq!(results, vec![(0.0, 1), (1.0, 3)]);

        let skip_one = |label: u64| label != 1;
        let results = b
            .search(&[1.0, 0.0, 0.0, 0.0], 2, Some(&skip_one), None)
            .unwrap();
        assert_eq!(results[0].1, 3);
    }

    #[test]
    fn test_modify_identical_content_is_a_no_op() {
        let b = backend();
        b.add_record(1, &vector(&[1.0, 2.0, 3.0, 4.0])).unwrap();
        assert!(!b.modify_record(1, &vector(&[1.0, 2.0, 3.0, 4.0])).unwrap());
        assert!(b.modify_record(1, &vector(&[4.0, 3.0, 2.0, 1.0])).unwrap());
    }

    #[test]
    fn test_remove_twice_reports_not_found() {
        let b = backend();
        b.add_record(1, &vector(&[1.0, 0.0, 0.0, 0.0])).unwrap();
        b.remove_record(1).unwrap();
        assert!(matches!(
            b.remove_record(1),
            Err(IndexError::NotFound(_))
        ));
    }

    #[test]
    fn test_save_load_round_trip() {
        let b = backend();
        for id in 0..5u64 {
            b.add_record(id, &vector(&[id as f32, 1.0, 2.0, 3.0]))
                .unwrap();
        }
        b.remove_record(3).unwrap();

        let mut buf = Vec::new();
        b.save(&mut buf).unwrap();
        let loaded = FlatBackend::load(
            &mut StreamReader::new(buf.as_slice()),
            4,
            DistanceMetric::L2,
            2,
            None,
        )
        .unwrap();

        assert_eq!(loaded.count(), b.count());
        assert_eq!(loaded.deleted_count(), 1);
        assert_eq!(loaded.capacity(), b.capacity());
        let query = [2.0, 1.0, 2.0, 3.0];
        assert_eq!(
            loaded.search(&query, 3, None, None).unwrap(),
            b.search(&query, 3, None, None).unwrap()
        );
    }
}
