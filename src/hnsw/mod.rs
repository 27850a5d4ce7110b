pub mod graph;
pub mod insert;
pub mod search;

pub use graph::{GraphError, GraphResult, HnswGraph, HnswParams};
pub use search::search_knn;

#[cfg(test)]
mod tests;
