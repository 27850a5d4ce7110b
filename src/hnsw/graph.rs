use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};

use crate::core::errors::{IndexError, Result};
use crate::interning::{intern_vector, InternedVector};
use crate::persist::{StreamReader, StreamWriter};
use crate::vector::distance::DistanceMetric;

/// Failure surface of the graph algorithm. Callers wrapping the graph are
/// expected to convert these into their own error type; `CapacityExceeded`
/// is the one variant meant to be absorbed by growth-and-retry.
#[derive(Debug, Clone)]
pub enum GraphError {
    CapacityExceeded { capacity: usize },
    DuplicateLabel(u64),
    UnknownLabel(u64),
    DimensionMismatch { expected: usize, got: usize },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::CapacityExceeded { capacity } => {
                write!(f, "the number of elements exceeds the specified limit ({})", capacity)
            }
            GraphError::DuplicateLabel(label) => {
                write!(f, "label {} is already present", label)
            }
            GraphError::UnknownLabel(label) => {
                write!(f, "label {} is not present or is deleted", label)
            }
            GraphError::DimensionMismatch { expected, got } => {
                write!(f, "vector has {} dimensions, graph expects {}", got, expected)
            }
        }
    }
}

impl std::error::Error for GraphError {}

pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// Construction-time graph parameters. `level_mult` follows the standard
/// 1/ln(m) assignment multiplier.
#[derive(Debug, Clone, Copy)]
pub struct HnswParams {
    pub m: usize,
    pub ef_construction: usize,
    pub level_mult: f64,
}

impl HnswParams {
    pub fn new(m: usize, ef_construction: usize) -> Self {
        let m = m.max(2);
        HnswParams {
            m,
            ef_construction: ef_construction.max(m),
            level_mult: 1.0 / (m as f64).ln(),
        }
    }

    /// Max neighbors kept per node at a layer; layer 0 keeps twice as many.
    pub fn m_max(&self, level: usize) -> usize {
        if level == 0 {
            self.m * 2
        } else {
            self.m
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub label: u64,
    pub vector: InternedVector,
    pub level: usize,
    /// Adjacency per layer, index 0..=level.
    pub neighbors: Vec<Vec<u32>>,
    pub deleted: bool,
}

/// Multi-layer proximity graph with fixed capacity, soft delete and
/// stream persistence. Slots are allocated sequentially and never
/// reclaimed; a soft-deleted slot stays addressable for routing and can be
/// revived in place under the same label.
pub struct HnswGraph {
    dim: usize,
    metric: DistanceMetric,
    params: HnswParams,
    /// Runtime search breadth. Not persisted with the graph structure;
    /// re-applied by the owner after load.
    ef: usize,
    capacity: usize,
    num_deleted: usize,
    pub(crate) nodes: Vec<Node>,
    pub(crate) slot_by_label: HashMap<u64, u32>,
    pub(crate) entry_point: Option<u32>,
    pub(crate) max_level: usize,
}

impl HnswGraph {
    pub fn new(
        dim: usize,
        metric: DistanceMetric,
        params: HnswParams,
        initial_capacity: usize,
        ef: usize,
    ) -> Self {
        HnswGraph {
            dim,
            metric,
            params,
            ef: ef.max(1),
            capacity: initial_capacity.max(1),
            num_deleted: 0,
            nodes: Vec::new(),
            slot_by_label: HashMap::new(),
            entry_point: None,
            max_level: 0,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dim
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn params(&self) -> &HnswParams {
        &self.params
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Occupied slots, including soft-deleted ones.
    pub fn count(&self) -> usize {
        self.nodes.len()
    }

    pub fn deleted_count(&self) -> usize {
        self.num_deleted
    }

    pub fn ef(&self) -> usize {
        self.ef
    }

    pub fn set_ef(&mut self, ef: usize) {
        self.ef = ef.max(1);
    }

    /// Grow the slot budget. The graph cannot shrink after expansion.
    pub fn resize(&mut self, new_capacity: usize) {
        if new_capacity > self.capacity {
            self.capacity = new_capacity;
            self.nodes.reserve(new_capacity - self.nodes.len());
        }
    }

    pub(crate) fn node_vector(&self, slot: u32) -> &[f32] {
        self.nodes[slot as usize].vector.as_slice()
    }

    pub(crate) fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        self.metric.distance(a, b)
    }

    /// Slot for a label, only if the node is live.
    pub fn live_slot(&self, label: u64) -> Option<u32> {
        let slot = *self.slot_by_label.get(&label)?;
        if self.nodes[slot as usize].deleted {
            None
        } else {
            Some(slot)
        }
    }

    /// Insert a vector under a label. A soft-deleted node with the same
    /// label is revived in its original slot with fresh links; a live
    /// duplicate is rejected. Fails with `CapacityExceeded` when all slots
    /// are occupied, which the caller is expected to absorb via resize.
    pub fn insert(&mut self, label: u64, vector: InternedVector) -> GraphResult<()> {
        if vector.len() != self.dim {
            return Err(GraphError::DimensionMismatch {
                expected: self.dim,
                got: vector.len(),
            });
        }
        if let Some(&slot) = self.slot_by_label.get(&label) {
            if !self.nodes[slot as usize].deleted {
                return Err(GraphError::DuplicateLabel(label));
            }
            self.num_deleted -= 1;
            super::insert::revive_node(self, slot, vector);
            return Ok(());
        }
        if self.nodes.len() >= self.capacity {
            return Err(GraphError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        let level = super::insert::assign_level(&self.params);
        let slot = self.nodes.len() as u32;
        self.nodes.push(Node {
            label,
            vector,
            level,
            neighbors: vec![Vec::new(); level + 1],
            deleted: false,
        });
        self.slot_by_label.insert(label, slot);
        if self.entry_point.is_none() {
            self.entry_point = Some(slot);
            self.max_level = level;
            return Ok(());
        }
        super::insert::link_node(self, slot);
        if level > self.max_level {
            self.max_level = level;
            self.entry_point = Some(slot);
        }
        Ok(())
    }

    /// Soft-delete a label. The slot keeps routing traffic until a revive
    /// or a future compaction; only result visibility changes.
    pub fn mark_deleted(&mut self, label: u64) -> GraphResult<()> {
        let slot = self.live_slot(label).ok_or(GraphError::UnknownLabel(label))?;
        self.nodes[slot as usize].deleted = true;
        self.num_deleted += 1;
        Ok(())
    }

    /// Stored vector for a live label.
    pub fn vector(&self, label: u64) -> GraphResult<InternedVector> {
        let slot = self.live_slot(label).ok_or(GraphError::UnknownLabel(label))?;
        Ok(self.nodes[slot as usize].vector.clone())
    }

    /// Whether the stored content for a live label matches `candidate`
    /// bit-for-bit.
    pub fn content_matches(&self, label: u64, candidate: &InternedVector) -> GraphResult<bool> {
        let slot = self.live_slot(label).ok_or(GraphError::UnknownLabel(label))?;
        Ok(self.nodes[slot as usize].vector == *candidate)
    }

    /// Distance from a live label's stored vector to a query.
    pub fn distance_to(&self, label: u64, query: &[f32]) -> GraphResult<f32> {
        let slot = self.live_slot(label).ok_or(GraphError::UnknownLabel(label))?;
        Ok(self.metric.distance(query, self.node_vector(slot)))
    }

    const NO_ENTRY: u64 = u64::MAX;

    /// Serialize the graph structure. The runtime `ef` is configuration,
    /// not structure, and is not written.
    pub fn save<W: Write>(&self, w: &mut StreamWriter<W>) -> Result<()> {
        w.write_u64(self.capacity as u64)?;
        w.write_u64(self.nodes.len() as u64)?;
        w.write_u64(self.num_deleted as u64)?;
        w.write_u64(self.entry_point.map(u64::from).unwrap_or(Self::NO_ENTRY))?;
        w.write_u32(self.max_level as u32)?;
        w.write_u32(self.params.m as u32)?;
        w.write_u32(self.params.ef_construction as u32)?;
        for node in &self.nodes {
            w.write_u64(node.label)?;
            w.write_u32(node.level as u32)?;
            w.write_u8(node.deleted as u8)?;
            w.write_f32s(node.vector.as_slice())?;
            for list in &node.neighbors {
                w.write_u32(list.len() as u32)?;
                for &neighbor in list {
                    w.write_u32(neighbor)?;
                }
            }
        }
        Ok(())
    }

    /// Deserialize a graph saved by `save`. `first_word`, when present, is
    /// the leading capacity field already consumed by format
    /// auto-detection. `initial_capacity` keeps an empty index's original
    /// slot budget across a round trip.
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
        let entry_word = r.read_u64()?;
        let max_level = r.read_u32()? as usize;
        let m = r.read_u32()? as usize;
        let ef_construction = r.read_u32()? as usize;
        if num_deleted > count {
            return Err(IndexError::PersistenceCorrupt(format!(
                "deleted count {} exceeds element count {}",
                num_deleted, count
            )));
        }
        let mut nodes = Vec::with_capacity(count);
        let mut slot_by_label = HashMap::with_capacity(count);
        for slot in 0..count {
            let label = r.read_u64()?;
            let level = r.read_u32()? as usize;
            let deleted = r.read_u8()? != 0;
            let vector = intern_vector(r.read_f32s(dim)?);
            let mut neighbors = Vec::with_capacity(level + 1);
            for _ in 0..=level {
                let len = r.read_u32()? as usize;
                let mut list = Vec::with_capacity(len);
                for _ in 0..len {
                    let neighbor = r.read_u32()?;
                    if neighbor as usize >= count {
                        return Err(IndexError::PersistenceCorrupt(format!(
                            "neighbor slot {} out of range ({} nodes)",
                            neighbor, count
                        )));
                    }
                    list.push(neighbor);
                }
                neighbors.push(list);
            }
            if slot_by_label.insert(label, slot as u32).is_some() {
                return Err(IndexError::PersistenceCorrupt(format!(
                    "duplicate label {} in graph data",
                    label
                )));
            }
            nodes.push(Node {
                label,
                vector,
                level,
                neighbors,
                deleted,
            });
        }
        let entry_point = if entry_word == Self::NO_ENTRY {
            None
        } else if (entry_word as usize) < count {
            Some(entry_word as u32)
        } else {
            return Err(IndexError::PersistenceCorrupt(format!(
                "entry point {} out of range ({} nodes)",
                entry_word, count
            )));
        };
        let floor = if count == 0 { initial_capacity } else { 0 };
        Ok(HnswGraph {
            dim,
            metric,
            params: HnswParams::new(m, ef_construction),
            ef: 1,
            capacity: capacity.max(count).max(floor).max(1),
            num_deleted,
            nodes,
            slot_by_label,
            entry_point,
            max_level,
        })
    }
}
