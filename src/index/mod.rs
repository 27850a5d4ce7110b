//! Identity & tracking layer: owns the bidirectional mapping between
//! external keys and dense internal ids, the normalization policy and the
//! persistence of that identity, and delegates storage and search to a
//! pluggable backend.

pub mod config;

use std::collections::HashMap;
use std::io::{Read, Write};

use parking_lot::Mutex;

use crate::backend::{FlatBackend, HnswBackend, SearchPredicate, VectorBackend};
use crate::core::errors::{IndexError, Result};
use crate::interning::{intern_key, intern_vector, InternedKey, InternedVector};
use crate::persist::{StreamReader, StreamWriter};
use crate::vector::distance::DistanceMetric;
use crate::vector::normalization;
use crate::vector::types::{
    encode_record, parse_record, validate_record_shape, VectorDataType,
};

use config::{
    name_by_value, AlgorithmConfig, IndexConfig, IndexInfo, DATA_TYPE_BY_NAME, METRIC_BY_NAME,
};

/// Magnitude stored when normalization is disabled.
pub const NO_MAGNITUDE: f32 = -1.0;

/// Transient sentinel while loading the legacy layout, replaced by the
/// backfill pass before the load returns.
const UNKNOWN_MAGNITUDE: f32 = f32::NEG_INFINITY;

const INDEX_STREAM_MAGIC: u64 = 0x5645_4344_4558_0002;
const INDEX_FORMAT_VERSION: u32 = 2;

/// Attribute payload attached to a search result by the query layer.
pub type RecordContents = HashMap<String, Vec<u8>>;

/// One search result: external key, metric-specific distance, and an
/// optional attribute payload filled in by the caller.
#[derive(Debug, Clone)]
pub struct Neighbor {
    pub key: InternedKey,
    pub distance: f32,
    pub attribute_contents: Option<RecordContents>,
}

impl Neighbor {
    pub fn new(key: InternedKey, distance: f32) -> Self {
        Neighbor {
            key,
            distance,
            attribute_contents: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct TrackedKeyMetadata {
    internal_id: u64,
    /// `-1.0` when normalization is disabled; the original vector's norm
    /// when enabled; `-inf` only between a legacy load and its backfill.
    magnitude: f32,
}

#[derive(Default)]
struct TrackedKeys {
    metadata_by_key: HashMap<InternedKey, TrackedKeyMetadata>,
    key_by_internal_id: HashMap<u64, InternedKey>,
    /// Strictly increasing; ids are never reused.
    next_internal_id: u64,
}

/// A mutable, concurrently-accessed vector similarity index.
pub struct VectorIndex {
    dimensions: usize,
    data_type: VectorDataType,
    metric: DistanceMetric,
    normalize: bool,
    initial_capacity: usize,
    backend: Box<dyn VectorBackend>,
    /// Guards the key↔id and tracked-metadata maps. Never held across a
    /// backend call; backend calls happen strictly before or after the
    /// critical section to keep the lock order flat.
    tracked: Mutex<TrackedKeys>,
}

impl VectorIndex {
    /// Build an empty index from structural configuration.
    pub fn from_config(config: &IndexConfig) -> Result<Self> {
        config.validate()?;
        let backend = Self::build_backend(config);
        Ok(VectorIndex {
            dimensions: config.dimensions,
            data_type: config.data_type,
            metric: config.metric,
            normalize: config.metric.normalizes(),
            initial_capacity: config.initial_capacity,
            backend,
            tracked: Mutex::new(TrackedKeys::default()),
        })
    }

    fn build_backend(config: &IndexConfig) -> Box<dyn VectorBackend> {
        match config.algorithm {
            AlgorithmConfig::Flat { block_size } => Box::new(FlatBackend::new(
                config.dimensions,
                config.metric,
                block_size,
                config.initial_capacity,
            )),
            AlgorithmConfig::Hnsw {
                m,
                ef_construction,
                ef_runtime,
            } => Box::new(HnswBackend::new(
                config.dimensions,
                config.metric,
                m,
                ef_construction,
                ef_runtime,
                config.initial_capacity,
            )),
        }
    }

    /// Structural configuration, including runtime-settable backend
    /// parameters at their current values.
    pub fn config(&self) -> IndexConfig {
        IndexConfig {
            dimensions: self.dimensions,
            data_type: self.data_type,
            metric: self.metric,
            initial_capacity: self.initial_capacity,
            algorithm: self.backend.algorithm_config(),
        }
    }

    /// Operator-facing structural snapshot.
    pub fn info(&self) -> IndexInfo {
        IndexInfo {
            dimensions: self.dimensions,
            data_type: name_by_value(&DATA_TYPE_BY_NAME, self.data_type),
            metric: name_by_value(&METRIC_BY_NAME, self.metric),
            capacity: self.backend.capacity(),
            record_count: self.record_count(),
            deleted_count: self.backend.deleted_count(),
            algorithm: self.backend.algorithm_config(),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn normalizes(&self) -> bool {
        self.normalize
    }

    /// Validate, parse and (when the metric calls for it) normalize a
    /// record, interning the content. The returned magnitude is the
    /// original norm, or `NO_MAGNITUDE` when normalization is off.
    fn prepare_vector(&self, record: &[u8]) -> Result<(InternedVector, f32)> {
        validate_record_shape(record, self.dimensions, self.data_type)?;
        let floats = parse_record(record);
        if self.normalize {
            let (normalized, magnitude) = normalization::normalize_embedding(&floats);
            Ok((intern_vector(normalized), magnitude))
        } else {
            Ok((intern_vector(floats), NO_MAGNITUDE))
        }
    }

    fn prepare_query(&self, query: &[u8]) -> Result<Vec<f32>> {
        validate_record_shape(query, self.dimensions, self.data_type)?;
        let floats = parse_record(query);
        if self.normalize {
            Ok(normalization::normalize_embedding(&floats).0)
        } else {
            Ok(floats)
        }
    }

    /// Track a record under a key. Returns `true` if the key is newly
    /// tracked; an already-tracked key is left untouched (updates go
    /// through `modify_record`). A backend capacity limit is absorbed by
    /// backend growth, never surfaced here; any other backend failure
    /// rolls the identity mapping back before propagating.
    pub fn add_record(&self, key: &[u8], record: &[u8]) -> Result<bool> {
        let (vector, magnitude) = self.prepare_vector(record)?;
        let key = intern_key(key);
        let internal_id = {
            let mut tracked = self.tracked.lock();
            if tracked.metadata_by_key.contains_key(&key) {
                return Ok(false);
            }
            let internal_id = tracked.next_internal_id;
            tracked.next_internal_id += 1;
            tracked.metadata_by_key.insert(
                key.clone(),
                TrackedKeyMetadata {
                    internal_id,
                    magnitude,
                },
            );
            tracked.key_by_internal_id.insert(internal_id, key.clone());
            internal_id
        };
        if let Err(e) = self.backend.add_record(internal_id, &vector) {
            let mut tracked = self.tracked.lock();
            tracked.metadata_by_key.remove(&key);
            tracked.key_by_internal_id.remove(&internal_id);
            return Err(e);
        }
        Ok(true)
    }

    /// Stop tracking a key. Returns `true` if a tracked entry existed and
    /// was removed. The backend slot is soft-deleted; physical space is
    /// reclaimed only by backend compaction or resize.
    pub fn remove_record(&self, key: &[u8]) -> Result<bool> {
        let key = intern_key(key);
        let internal_id = {
            let mut tracked = self.tracked.lock();
            match tracked.metadata_by_key.remove(&key) {
                None => return Ok(false),
                Some(metadata) => {
                    tracked.key_by_internal_id.remove(&metadata.internal_id);
                    metadata.internal_id
                }
            }
        };
        if let Err(e) = self.backend.remove_record(internal_id) {
            tracing::error!(internal_id, error = %e, "backend disagrees with identity map on remove");
            return Err(e);
        }
        Ok(true)
    }

    /// Replace the content tracked under a key. Returns `false` when the
    /// candidate is byte-identical to the stored content (no backend
    /// mutation, no new interned entry); `true` when the association was
    /// replaced. Reaching this for an untracked key signals caller-state
    /// divergence and reports `NotFound`.
    pub fn modify_record(&self, key: &[u8], record: &[u8]) -> Result<bool> {
        let (vector, magnitude) = self.prepare_vector(record)?;
        let key = intern_key(key);
        let internal_id = {
            let tracked = self.tracked.lock();
            tracked
                .metadata_by_key
                .get(&key)
                .map(|metadata| metadata.internal_id)
        }
        .ok_or_else(|| IndexError::NotFound("key is not tracked".to_string()))?;
        let changed = self.backend.modify_record(internal_id, &vector)?;
        if changed {
            let mut tracked = self.tracked.lock();
            if let Some(metadata) = tracked.metadata_by_key.get_mut(&key) {
                metadata.magnitude = magnitude;
            }
        }
        Ok(changed)
    }

    pub fn is_tracked(&self, key: &[u8]) -> bool {
        let key = intern_key(key);
        self.tracked.lock().metadata_by_key.contains_key(&key)
    }

    /// Number of currently tracked (non-deleted) keys.
    pub fn record_count(&self) -> u64 {
        self.tracked.lock().metadata_by_key.len() as u64
    }

    /// Visit a point-in-time snapshot of tracked keys under the identity
    /// lock. The visitor must not re-enter mutating operations on the same
    /// index; reentrancy is undefined.
    pub fn for_each_tracked_key<F: FnMut(&InternedKey)>(&self, mut visitor: F) {
        let tracked = self.tracked.lock();
        for key in tracked.metadata_by_key.keys() {
            visitor(key);
        }
    }

    /// k-nearest-neighbor search. The query is shape-validated and
    /// normalized under the same rule as stored records, then delegated to
    /// the backend with the optional predicate and breadth override.
    /// Results come back in ascending distance order with external keys
    /// attached via the reverse map; that attachment assumes no concurrent
    /// schema-level mutation of this index during the search.
    pub fn search(
        &self,
        query: &[u8],
        k: usize,
        predicate: Option<&dyn SearchPredicate>,
        search_breadth: Option<usize>,
    ) -> Result<Vec<Neighbor>> {
        let floats = self.prepare_query(query)?;
        let raw = self.backend.search(&floats, k, predicate, search_breadth)?;
        let tracked = self.tracked.lock();
        let mut neighbors = Vec::with_capacity(raw.len());
        for (distance, internal_id) in raw {
            match tracked.key_by_internal_id.get(&internal_id) {
                Some(key) => neighbors.push(Neighbor::new(key.clone(), distance)),
                None => {
                    tracing::error!(
                        internal_id,
                        "search result references an internal id with no tracked key"
                    );
                    return Err(IndexError::NotFound(format!(
                        "internal id: {}",
                        internal_id
                    )));
                }
            }
        }
        Ok(neighbors)
    }

    /// Distance from one tracked key's stored vector to a query, for
    /// scoring outside a full search. Fails with `NotFound` when the key
    /// is untracked or its backend slot has been soft-deleted.
    pub fn compute_distance(&self, key: &[u8], query: &[u8]) -> Result<f32> {
        let floats = self.prepare_query(query)?;
        let key = intern_key(key);
        let internal_id = {
            let tracked = self.tracked.lock();
            tracked
                .metadata_by_key
                .get(&key)
                .map(|metadata| metadata.internal_id)
        }
        .ok_or_else(|| IndexError::NotFound("key is not tracked".to_string()))?;
        self.backend.compute_distance(internal_id, &floats)
    }

    /// Record bytes as the caller stored them. With normalization enabled
    /// the cached magnitude is multiplied back in.
    pub fn get_record(&self, key: &[u8]) -> Result<Vec<u8>> {
        let key = intern_key(key);
        let (internal_id, magnitude) = {
            let tracked = self.tracked.lock();
            tracked
                .metadata_by_key
                .get(&key)
                .map(|metadata| (metadata.internal_id, metadata.magnitude))
        }
        .ok_or_else(|| IndexError::NotFound("key is not tracked".to_string()))?;
        let vector = self.backend.vector(internal_id)?;
        if self.normalize && magnitude > 0.0 {
            Ok(encode_record(&normalization::denormalize_embedding(
                vector.as_slice(),
                magnitude,
            )))
        } else {
            Ok(encode_record(vector.as_slice()))
        }
    }

    /// Serialize the whole index: header with embedded configuration,
    /// backend section, the inline key/id stream older loaders expect, and
    /// the tracked-key table. The owner must serialize this against
    /// mutating operations, as with load.
    pub fn save_index<W: Write>(&self, mut out: W) -> Result<()> {
        {
            let mut w = StreamWriter::new(&mut out);
            w.write_u64(INDEX_STREAM_MAGIC)?;
            w.write_u32(INDEX_FORMAT_VERSION)?;
            let blob = bincode::serialize(&self.config()).map_err(|e| {
                IndexError::PersistenceCorrupt(format!("failed to encode configuration: {}", e))
            })?;
            w.write_bytes(&blob)?;
        }
        self.backend.save(&mut out)?;
        let mut w = StreamWriter::new(&mut out);
        let tracked = self.tracked.lock();
        w.write_u64(tracked.metadata_by_key.len() as u64)?;
        for (key, metadata) in tracked.metadata_by_key.iter() {
            w.write_bytes(key.as_bytes())?;
            w.write_u64(metadata.internal_id)?;
        }
        w.write_u64(tracked.metadata_by_key.len() as u64)?;
        for (key, metadata) in tracked.metadata_by_key.iter() {
            w.write_bytes(key.as_bytes())?;
            w.write_u64(metadata.internal_id)?;
            w.write_f32(metadata.magnitude)?;
        }
        Ok(())
    }

    /// Restore an index from a stream, auto-detecting the layout. The
    /// current layout leads with a magic word and carries the tracked-key
    /// table in its own section; the legacy layout starts directly with
    /// backend data and interleaves key/internal-id pairs after it, in
    /// which case unknown magnitudes are backfilled by recomputing from
    /// the stored vectors. Runs before the index is reachable by other
    /// callers, so no synchronization is needed here.
    pub fn load<R: Read>(input: R, config: &IndexConfig) -> Result<Self> {
        config.validate()?;
        let mut r = StreamReader::new(input);
        let first = r.read_u64()?;
        if first == INDEX_STREAM_MAGIC {
            let version = r.read_u32()?;
            if version != INDEX_FORMAT_VERSION {
                return Err(IndexError::PersistenceCorrupt(format!(
                    "unsupported index format version {}",
                    version
                )));
            }
            let blob = r.read_bytes()?;
            let saved: IndexConfig = bincode::deserialize(&blob).map_err(|e| {
                IndexError::PersistenceCorrupt(format!("failed to decode configuration: {}", e))
            })?;
            if saved.dimensions != config.dimensions
                || saved.data_type != config.data_type
                || saved.metric != config.metric
                || saved.algorithm.kind() != config.algorithm.kind()
            {
                return Err(IndexError::PersistenceCorrupt(
                    "persisted configuration does not match the catalog configuration".to_string(),
                ));
            }
            let backend = Self::load_backend(&mut r, config, None)?;
            Self::consume_inline_pairs(&mut r)?;
            let tracked = Self::load_tracked_table(&mut r)?;
            Self::assemble(config, backend, tracked)
        } else {
            let backend = Self::load_backend(&mut r, config, Some(first))?;
            let tracked =
                Self::load_legacy_pairs(&mut r, config.metric.normalizes())?;
            let index = Self::assemble(config, backend, tracked)?;
            index.backfill_magnitudes()?;
            Ok(index)
        }
    }

    fn load_backend<R: Read>(
        r: &mut StreamReader<R>,
        config: &IndexConfig,
        first_word: Option<u64>,
    ) -> Result<Box<dyn VectorBackend>> {
        match config.algorithm {
            AlgorithmConfig::Flat { .. } => Ok(Box::new(FlatBackend::load(
                r,
                config.dimensions,
                config.metric,
                config.initial_capacity,
                first_word,
            )?)),
            AlgorithmConfig::Hnsw { ef_runtime, .. } => Ok(Box::new(HnswBackend::load(
                r,
                config.dimensions,
                config.metric,
                ef_runtime,
                config.initial_capacity,
                first_word,
            )?)),
        }
    }

    fn assemble(
        config: &IndexConfig,
        backend: Box<dyn VectorBackend>,
        tracked: TrackedKeys,
    ) -> Result<Self> {
        Ok(VectorIndex {
            dimensions: config.dimensions,
            data_type: config.data_type,
            metric: config.metric,
            normalize: config.metric.normalizes(),
            initial_capacity: config.initial_capacity,
            backend,
            tracked: Mutex::new(tracked),
        })
    }

    /// The inline key/id stream is written for older loaders; the current
    /// layout reads its table instead, so these bytes are only consumed.
    fn consume_inline_pairs<R: Read>(r: &mut StreamReader<R>) -> Result<()> {
        let count = r.read_u64()?;
        for _ in 0..count {
            r.read_bytes()?;
            r.read_u64()?;
        }
        Ok(())
    }

    fn load_tracked_table<R: Read>(r: &mut StreamReader<R>) -> Result<TrackedKeys> {
        let count = r.read_u64()?;
        let mut tracked = TrackedKeys::default();
        for _ in 0..count {
            let key = intern_key(&r.read_bytes()?);
            let internal_id = r.read_u64()?;
            let magnitude = r.read_f32()?;
            Self::track_loaded(&mut tracked, key, internal_id, magnitude)?;
        }
        Ok(tracked)
    }

    fn load_legacy_pairs<R: Read>(
        r: &mut StreamReader<R>,
        normalize: bool,
    ) -> Result<TrackedKeys> {
        let count = r.read_u64()?;
        let mut tracked = TrackedKeys::default();
        let magnitude = if normalize {
            UNKNOWN_MAGNITUDE
        } else {
            NO_MAGNITUDE
        };
        for _ in 0..count {
            let key = intern_key(&r.read_bytes()?);
            let internal_id = r.read_u64()?;
            Self::track_loaded(&mut tracked, key, internal_id, magnitude)?;
        }
        Ok(tracked)
    }

    fn track_loaded(
        tracked: &mut TrackedKeys,
        key: InternedKey,
        internal_id: u64,
        magnitude: f32,
    ) -> Result<()> {
        if tracked.key_by_internal_id.contains_key(&internal_id) {
            return Err(IndexError::PersistenceCorrupt(format!(
                "duplicate internal id {} in tracked keys",
                internal_id
            )));
        }
        if tracked
            .metadata_by_key
            .insert(
                key.clone(),
                TrackedKeyMetadata {
                    internal_id,
                    magnitude,
                },
            )
            .is_some()
        {
            return Err(IndexError::PersistenceCorrupt(
                "duplicate key in tracked keys".to_string(),
            ));
        }
        tracked.key_by_internal_id.insert(internal_id, key);
        tracked.next_internal_id = tracked.next_internal_id.max(internal_id + 1);
        Ok(())
    }

    /// Replace the legacy-load magnitude sentinel by recomputing each
    /// norm from the stored vector.
    fn backfill_magnitudes(&self) -> Result<()> {
        if !self.normalize {
            return Ok(());
        }
        let pending: Vec<(InternedKey, u64)> = {
            let tracked = self.tracked.lock();
            tracked
                .metadata_by_key
                .iter()
                .filter(|(_, metadata)| metadata.magnitude == UNKNOWN_MAGNITUDE)
                .map(|(key, metadata)| (key.clone(), metadata.internal_id))
                .collect()
        };
        for (key, internal_id) in pending {
            let vector = self.backend.vector(internal_id)?;
            let magnitude = normalization::magnitude(vector.as_slice());
            let mut tracked = self.tracked.lock();
            if let Some(metadata) = tracked.metadata_by_key.get_mut(&key) {
                metadata.magnitude = magnitude;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::config::{AlgorithmConfig, IndexConfig};
    use super::*;

    fn flat_config(metric: DistanceMetric) -> IndexConfig {
        IndexConfig {
            dimensions: 4,
            data_type: VectorDataType::Float32,
            metric,
            initial_capacity: 4,
            algorithm: AlgorithmConfig::Flat { block_size: 4 },
        }
    }

    fn record(data: [f32; 4]) -> Vec<u8> {
        encode_record(&data)
    }

    fn internal_id_of(index: &VectorIndex, key: &[u8]) -> u64 {
        let key = intern_key(key);
        index.tracked.lock().metadata_by_key[&key].internal_id
    }

    #[test]
    fn test_readd_after_remove_assigns_fresh_internal_id() {
        let index = VectorIndex::from_config(&flat_config(DistanceMetric::L2)).unwrap();
        index.add_record(b"a", &record([1.0, 0.0, 0.0, 0.0])).unwrap();
        let first = internal_id_of(&index, b"a");
        index.remove_record(b"a").unwrap();
        index.add_record(b"a", &record([1.0, 0.0, 0.0, 0.0])).unwrap();
        let second = internal_id_of(&index, b"a");
        assert!(second > first);
    }

    #[test]
    fn test_concurrent_adds_assign_distinct_ids() {
        let index =
            Arc::new(VectorIndex::from_config(&flat_config(DistanceMetric::L2)).unwrap());
        let threads = 8;
        let per_thread = 25;
        std::thread::scope(|scope| {
            for t in 0..threads {
                let index = Arc::clone(&index);
                scope.spawn(move || {
                    for i in 0..per_thread {
                        let key = format!("key:{}:{}", t, i);
                        let added = index
                            .add_record(key.as_bytes(), &record([t as f32, i as f32, 0.0, 0.0]))
                            .unwrap();
                        assert!(added);
                    }
                });
            }
        });
        assert_eq!(index.record_count(), (threads * per_thread) as u64);
        let tracked = index.tracked.lock();
        let mut ids: Vec<u64> = tracked
            .metadata_by_key
            .values()
            .map(|metadata| metadata.internal_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), threads * per_thread);
    }

    #[test]
    fn test_magnitude_bookkeeping_for_cosine() {
        let index = VectorIndex::from_config(&flat_config(DistanceMetric::Cosine)).unwrap();
        index.add_record(b"a", &record([3.0, 4.0, 0.0, 0.0])).unwrap();
        let key = intern_key(b"a");
        let magnitude = index.tracked.lock().metadata_by_key[&key].magnitude;
        assert!((magnitude - 5.0).abs() < 1e-5);

        // Modify updates the cached magnitude along with the content.
        index.modify_record(b"a", &record([0.0, 0.0, 6.0, 8.0])).unwrap();
        let magnitude = index.tracked.lock().metadata_by_key[&key].magnitude;
        assert!((magnitude - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_magnitude_is_sentinel_without_normalization() {
        let index = VectorIndex::from_config(&flat_config(DistanceMetric::L2)).unwrap();
        index.add_record(b"a", &record([3.0, 4.0, 0.0, 0.0])).unwrap();
        let key = intern_key(b"a");
        assert_eq!(
            index.tracked.lock().metadata_by_key[&key].magnitude,
            NO_MAGNITUDE
        );
    }

    #[test]
    fn test_legacy_layout_load_backfills_magnitudes() {
        // Build the legacy stream by hand: backend section followed by
        // interleaved key/internal-id pairs, no magnitudes anywhere.
        let config = flat_config(DistanceMetric::Cosine);
        let backend = FlatBackend::new(4, DistanceMetric::Cosine, 4, 4);
        let stored = normalization::normalize_embedding(&[3.0, 4.0, 0.0, 0.0]).0;
        backend.add_record(7, &intern_vector(stored)).unwrap();

        let mut buf = Vec::new();
        backend.save(&mut buf).unwrap();
        let mut w = StreamWriter::new(&mut buf);
        w.write_u64(1).unwrap();
        w.write_bytes(b"legacy-key").unwrap();
        w.write_u64(7).unwrap();

        let index = VectorIndex::load(buf.as_slice(), &config).unwrap();
        assert!(index.is_tracked(b"legacy-key"));
        assert_eq!(index.record_count(), 1);
        let key = intern_key(b"legacy-key");
        let metadata = index.tracked.lock().metadata_by_key[&key];
        assert_eq!(metadata.internal_id, 7);
        // Recomputed from the stored (normalized) vector, never the -inf
        // sentinel.
        assert!((metadata.magnitude - 1.0).abs() < 1e-5);
        assert_eq!(index.tracked.lock().next_internal_id, 8);
    }

    #[test]
    fn test_load_rejects_mismatched_configuration() {
        let index = VectorIndex::from_config(&flat_config(DistanceMetric::L2)).unwrap();
        index.add_record(b"a", &record([1.0, 0.0, 0.0, 0.0])).unwrap();
        let mut buf = Vec::new();
        index.save_index(&mut buf).unwrap();

        let mut other = flat_config(DistanceMetric::L2);
        other.dimensions = 8;
        assert!(matches!(
            VectorIndex::load(buf.as_slice(), &other),
            Err(IndexError::PersistenceCorrupt(_))
        ));
    }
}
