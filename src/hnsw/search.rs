use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use super::graph::HnswGraph;

/// Wrapper for the result heap: max-heap on distance so the farthest kept
/// result sits at the top and is evicted first.
#[derive(Debug, Clone)]
struct HeapEntry {
    distance: f32,
    slot: u32,
}

impl Eq for HeapEntry {}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .partial_cmp(&other.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.slot.cmp(&other.slot))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Candidate queue entry; wrapped in `Reverse` so the nearest unexpanded
/// candidate pops first.
type Candidate = std::cmp::Reverse<HeapEntry>;

/// Greedy single-step descent at one layer: keep moving to the closest
/// neighbor until no neighbor improves on the current position.
pub(crate) fn greedy_closest(graph: &HnswGraph, query: &[f32], start: u32, level: usize) -> u32 {
    let mut current = start;
    let mut current_dist = graph.distance(query, graph.node_vector(current));
    loop {
        let mut improved = false;
        if let Some(neighbors) = graph.nodes[current as usize].neighbors.get(level) {
            for &neighbor in neighbors {
                let dist = graph.distance(query, graph.node_vector(neighbor));
                if dist < current_dist {
                    current_dist = dist;
                    current = neighbor;
                    improved = true;
                }
            }
        }
        if !improved {
            return current;
        }
    }
}

/// ef-bounded best-first search at one layer. Soft-deleted and filtered-out
/// nodes still route traffic (their edges are expanded) but are kept out of
/// the result set unless `include_deleted` asks for link candidates.
/// Returns (slot, distance) pairs in ascending distance order.
pub(crate) fn search_layer(
    graph: &HnswGraph,
    query: &[f32],
    entries: &[u32],
    ef: usize,
    level: usize,
    filter: Option<&dyn Fn(u64) -> bool>,
    include_deleted: bool,
) -> Vec<(u32, f32)> {
    let ef = ef.max(1);
    let mut visited: HashSet<u32> = HashSet::new();
    let mut results: BinaryHeap<HeapEntry> = BinaryHeap::new();
    let mut candidates: BinaryHeap<Candidate> = BinaryHeap::new();

    let eligible = |slot: u32| -> bool {
        let node = &graph.nodes[slot as usize];
        (include_deleted || !node.deleted)
            && filter.map_or(true, |predicate| predicate(node.label))
    };

    for &entry in entries {
        if !visited.insert(entry) {
            continue;
        }
        let dist = graph.distance(query, graph.node_vector(entry));
        candidates.push(std::cmp::Reverse(HeapEntry {
            distance: dist,
            slot: entry,
        }));
        if eligible(entry) {
            results.push(HeapEntry {
                distance: dist,
                slot: entry,
            });
        }
    }

    while let Some(std::cmp::Reverse(candidate)) = candidates.pop() {
        let lowerbound = results.peek().map(|e| e.distance).unwrap_or(f32::MAX);
        if candidate.distance > lowerbound && results.len() >= ef {
            break;
        }
        if let Some(neighbors) = graph.nodes[candidate.slot as usize].neighbors.get(level) {
            for &neighbor in neighbors {
                if !visited.insert(neighbor) {
                    continue;
                }
                let dist = graph.distance(query, graph.node_vector(neighbor));
                let lowerbound = results.peek().map(|e| e.distance).unwrap_or(f32::MAX);
                if results.len() < ef || dist < lowerbound {
                    candidates.push(std::cmp::Reverse(HeapEntry {
                        distance: dist,
                        slot: neighbor,
                    }));
                    if eligible(neighbor) {
                        results.push(HeapEntry {
                            distance: dist,
                            slot: neighbor,
                        });
                        if results.len() > ef {
                            results.pop();
                        }
                    }
                }
            }
        }
    }

    let mut ordered = Vec::with_capacity(results.len());
    while let Some(entry) = results.pop() {
        ordered.push((entry.slot, entry.distance));
    }
    ordered.reverse();
    ordered
}

/// k-nearest-neighbor search: greedy descent from the entry point through
/// the upper layers, then an ef-wide layer-0 search. The effective breadth
/// is the override when given, the graph's runtime ef otherwise, and never
/// below k. Returns (distance, label) pairs in ascending distance order.
pub fn search_knn(
    graph: &HnswGraph,
    query: &[f32],
    k: usize,
    ef_override: Option<usize>,
    filter: Option<&dyn Fn(u64) -> bool>,
) -> Vec<(f32, u64)> {
    let entry = match graph.entry_point {
        Some(entry) if k > 0 => entry,
        _ => return Vec::new(),
    };
    let mut current = entry;
    for level in (1..=graph.max_level).rev() {
        current = greedy_closest(graph, query, current, level);
    }
    let ef = ef_override.unwrap_or_else(|| graph.ef()).max(k);
    search_layer(graph, query, &[current], ef, 0, filter, false)
        .into_iter()
        .take(k)
        .map(|(slot, distance)| (distance, graph.nodes[slot as usize].label))
        .collect()
}
