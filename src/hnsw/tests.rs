use crate::interning::intern_vector;
use crate::persist::{StreamReader, StreamWriter};
use crate::vector::distance::DistanceMetric;

use super::graph::{GraphError, HnswGraph, HnswParams};
use super::search::search_knn;

fn test_graph(capacity: usize) -> HnswGraph {
    HnswGraph::new(4, DistanceMetric::L2, HnswParams::new(8, 32), capacity, 16)
}

fn insert_point(graph: &mut HnswGraph, label: u64, data: [f32; 4]) {
    graph
        .insert(label, intern_vector(data.to_vec()))
        .expect("insert should succeed");
}

#[test]
fn test_insert_and_exact_self_match() {
    let mut graph = test_graph(16);
    insert_point(&mut graph, 1, [1.0, 0.0, 0.0, 0.0]);
    insert_point(&mut graph, 2, [0.0, 1.0, 0.0, 0.0]);
    insert_point(&mut graph, 3, [1.0, 1.0, 0.0, 0.0]);

    let results = search_knn(&graph, &[1.0, 0.0, 0.0, 0.0], 2, None, None);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0], (0.0, 1));
    assert_eq!(results[1], (1.0, 3));
}

#[test]
fn test_capacity_exceeded_then_resize() {
    let mut graph = test_graph(2);
    insert_point(&mut graph, 1, [1.0, 0.0, 0.0, 0.0]);
    insert_point(&mut graph, 2, [0.0, 1.0, 0.0, 0.0]);
    let err = graph
        .insert(3, intern_vector(vec![0.0, 0.0, 1.0, 0.0]))
        .unwrap_err();
    assert!(matches!(err, GraphError::CapacityExceeded { capacity: 2 }));

    graph.resize(4);
    insert_point(&mut graph, 3, [0.0, 0.0, 1.0, 0.0]);
    assert_eq!(graph.count(), 3);
    assert_eq!(graph.capacity(), 4);
}

#[test]
fn test_deleted_nodes_route_but_do_not_match() {
    let mut graph = test_graph(16);
    insert_point(&mut graph, 1, [1.0, 0.0, 0.0, 0.0]);
    insert_point(&mut graph, 2, [0.9, 0.1, 0.0, 0.0]);
    insert_point(&mut graph, 3, [0.0, 1.0, 0.0, 0.0]);
    graph.mark_deleted(1).unwrap();

    assert_eq!(graph.deleted_count(), 1);
    assert!(graph.live_slot(1).is_none());
    let results = search_knn(&graph, &[1.0, 0.0, 0.0, 0.0], 3, None, None);
    assert!(results.iter().all(|(_, label)| *label != 1));
    assert_eq!(results[0].1, 2);
}

#[test]
fn test_revive_deleted_label_in_place() {
    let mut graph = test_graph(2);
    insert_point(&mut graph, 1, [1.0, 0.0, 0.0, 0.0]);
    insert_point(&mut graph, 2, [0.0, 1.0, 0.0, 0.0]);
    graph.mark_deleted(1).unwrap();

    // Revival reuses the slot even with zero free capacity.
    insert_point(&mut graph, 1, [0.0, 0.0, 1.0, 0.0]);
    assert_eq!(graph.count(), 2);
    assert_eq!(graph.deleted_count(), 0);
    let results = search_knn(&graph, &[0.0, 0.0, 1.0, 0.0], 1, None, None);
    assert_eq!(results[0], (0.0, 1));
}

#[test]
fn test_duplicate_live_label_rejected() {
    let mut graph = test_graph(4);
    insert_point(&mut graph, 1, [1.0, 0.0, 0.0, 0.0]);
    let err = graph
        .insert(1, intern_vector(vec![0.0, 1.0, 0.0, 0.0]))
        .unwrap_err();
    assert!(matches!(err, GraphError::DuplicateLabel(1)));
}

#[test]
fn test_filter_excludes_labels() {
    let mut graph = test_graph(16);
    insert_point(&mut graph, 1, [1.0, 0.0, 0.0, 0.0]);
    insert_point(&mut graph, 2, [0.9, 0.0, 0.0, 0.0]);
    insert_point(&mut graph, 3, [0.8, 0.0, 0.0, 0.0]);

    let only_odd = |label: u64| label % 2 == 1;
    let results = search_knn(&graph, &[1.0, 0.0, 0.0, 0.0], 3, None, Some(&only_odd));
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|(_, label)| label % 2 == 1));
}

#[test]
fn test_distance_to_deleted_label_fails() {
    let mut graph = test_graph(4);
    insert_point(&mut graph, 1, [1.0, 0.0, 0.0, 0.0]);
    graph.mark_deleted(1).unwrap();
    assert!(matches!(
        graph.distance_to(1, &[1.0, 0.0, 0.0, 0.0]),
        Err(GraphError::UnknownLabel(1))
    ));
}

#[test]
fn test_save_load_round_trip_preserves_results() {
    let mut graph = test_graph(8);
    for (label, v) in [
        (1, [1.0, 0.0, 0.0, 0.0]),
        (2, [0.0, 1.0, 0.0, 0.0]),
        (3, [1.0, 1.0, 0.0, 0.0]),
        (4, [0.5, 0.5, 0.0, 0.0]),
    ] {
        insert_point(&mut graph, label, v);
    }
    graph.mark_deleted(2).unwrap();

    let mut buf = Vec::new();
    graph.save(&mut StreamWriter::new(&mut buf)).unwrap();
    let mut loaded = HnswGraph::load(
        &mut StreamReader::new(buf.as_slice()),
        4,
        DistanceMetric::L2,
        8,
        None,
    )
    .unwrap();
    loaded.set_ef(graph.ef());

    assert_eq!(loaded.count(), graph.count());
    assert_eq!(loaded.deleted_count(), 1);
    assert_eq!(loaded.capacity(), graph.capacity());

    let query = [0.9, 0.2, 0.0, 0.0];
    let before = search_knn(&graph, &query, 3, None, None);
    let after = search_knn(&loaded, &query, 3, None, None);
    assert_eq!(before, after);
}

#[test]
fn test_load_rejects_out_of_range_neighbor() {
    let mut graph = test_graph(4);
    insert_point(&mut graph, 1, [1.0, 0.0, 0.0, 0.0]);
    let mut buf = Vec::new();
    graph.save(&mut StreamWriter::new(&mut buf)).unwrap();
    // Truncating the stream must fail the load rather than half-build it.
    let truncated = &buf[..buf.len() - 4];
    assert!(HnswGraph::load(
        &mut StreamReader::new(truncated),
        4,
        DistanceMetric::L2,
        4,
        None,
    )
    .is_err());
}

#[test]
fn test_recall_on_clustered_data() {
    use rand::Rng;
    let mut graph = HnswGraph::new(8, DistanceMetric::L2, HnswParams::new(16, 100), 256, 64);
    let mut rng = rand::thread_rng();
    let mut points = Vec::new();
    for label in 0..200u64 {
        let v: Vec<f32> = (0..8).map(|_| rng.gen_range(-1.0..1.0)).collect();
        graph.insert(label, intern_vector(v.clone())).unwrap();
        points.push((label, v));
    }
    // The nearest point to itself must come back first.
    for (label, v) in points.iter().take(20) {
        let results = search_knn(&graph, v, 1, Some(128), None);
        assert_eq!(results[0].1, *label);
        assert!(results[0].0.abs() < 1e-6);
    }
}
