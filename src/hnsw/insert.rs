use rand::Rng;

use crate::interning::InternedVector;

use super::graph::{HnswGraph, HnswParams};
use super::search;

/// Assign a level for a new node using the exponential distribution.
pub(crate) fn assign_level(params: &HnswParams) -> usize {
    let mut rng = rand::thread_rng();
    let u: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    (-u.ln() * params.level_mult).floor() as usize
}

/// Wire a freshly allocated slot into the graph: greedy descent through the
/// layers above the node's level, then ef_construction-wide candidate
/// search and bidirectional linking at each layer from the node's level
/// down to 0.
pub(crate) fn link_node(graph: &mut HnswGraph, slot: u32) {
    let query = graph.nodes[slot as usize].vector.clone();
    let query = query.as_slice();
    let node_level = graph.nodes[slot as usize].level;

    let mut current = match graph.entry_point {
        Some(entry) if entry != slot => entry,
        _ => return,
    };
    for level in (node_level + 1..=graph.max_level).rev() {
        current = search::greedy_closest(graph, query, current, level);
    }

    let top = node_level.min(graph.max_level);
    let mut entries = vec![current];
    for level in (0..=top).rev() {
        let candidates = search::search_layer(
            graph,
            query,
            &entries,
            graph.params().ef_construction,
            level,
            None,
            true,
        );
        let selected: Vec<u32> = candidates
            .iter()
            .filter(|(candidate, _)| *candidate != slot)
            .take(graph.params().m)
            .map(|(candidate, _)| *candidate)
            .collect();
        let m_max = graph.params().m_max(level);
        for &neighbor in &selected {
            add_edge(graph, slot, neighbor, level);
            add_edge(graph, neighbor, slot, level);
            prune_neighbors(graph, neighbor, level, m_max);
        }
        if !candidates.is_empty() {
            entries = candidates.iter().map(|(candidate, _)| *candidate).collect();
        }
    }
}

/// Revive a soft-deleted slot under its original label: new content, the
/// original level, fresh outgoing links. Stale incoming edges keep routing
/// through the slot, now against the new vector.
pub(crate) fn revive_node(graph: &mut HnswGraph, slot: u32, vector: InternedVector) {
    let node = &mut graph.nodes[slot as usize];
    node.vector = vector;
    node.deleted = false;
    for list in node.neighbors.iter_mut() {
        list.clear();
    }
    if graph.entry_point == Some(slot) {
        // The entry point cannot link through itself; hand the role to the
        // highest remaining node for the duration of the relink.
        let alternative = graph
            .nodes
            .iter()
            .enumerate()
            .filter(|(other, _)| *other != slot as usize)
            .max_by_key(|(_, node)| node.level)
            .map(|(other, node)| (other as u32, node.level));
        match alternative {
            Some((other, level)) => {
                graph.entry_point = Some(other);
                graph.max_level = level;
                link_node(graph, slot);
                if graph.nodes[slot as usize].level > graph.max_level {
                    graph.max_level = graph.nodes[slot as usize].level;
                    graph.entry_point = Some(slot);
                }
            }
            None => {}
        }
        return;
    }
    link_node(graph, slot);
}

fn add_edge(graph: &mut HnswGraph, from: u32, to: u32, level: usize) {
    if from == to {
        return;
    }
    let list = &mut graph.nodes[from as usize].neighbors[level];
    if !list.contains(&to) {
        list.push(to);
    }
}

/// Keep a node's adjacency at a layer within m_max by retaining the
/// closest neighbors.
fn prune_neighbors(graph: &mut HnswGraph, slot: u32, level: usize, m_max: usize) {
    if graph.nodes[slot as usize].neighbors[level].len() <= m_max {
        return;
    }
    let base = graph.nodes[slot as usize].vector.clone();
    let mut scored: Vec<(f32, u32)> = graph.nodes[slot as usize].neighbors[level]
        .iter()
        .map(|&neighbor| {
            (
                graph.distance(base.as_slice(), graph.node_vector(neighbor)),
                neighbor,
            )
        })
        .collect();
    scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(m_max);
    graph.nodes[slot as usize].neighbors[level] = scored.into_iter().map(|(_, n)| n).collect();
}
