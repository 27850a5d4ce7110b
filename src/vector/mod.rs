pub mod distance;
pub mod normalization;
pub mod types;

pub use distance::DistanceMetric;
pub use types::VectorDataType;
