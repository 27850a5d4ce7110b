//! Deduplicating, reference-counted pools for external keys and vector
//! contents. The index and its backends hold counted references into these
//! pools and never assume exclusive ownership of the underlying bytes.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use lazy_static::lazy_static;
use parking_lot::Mutex;

lazy_static! {
    static ref KEY_POOL: Mutex<HashMap<u64, Vec<Weak<[u8]>>>> = Mutex::new(HashMap::new());
    static ref VECTOR_POOL: Mutex<HashMap<u64, Vec<Weak<[f32]>>>> = Mutex::new(HashMap::new());
}

/// A deduplicated external key. Clones share the same allocation; the entry
/// leaves the pool when the last reference is dropped.
#[derive(Debug, Clone)]
pub struct InternedKey(Arc<[u8]>);

impl InternedKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl PartialEq for InternedKey {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for InternedKey {}

impl Hash for InternedKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

/// Deduplicated vector content, parsed once at the API boundary. Dedup is
/// by bit pattern, so two interned vectors are equal exactly when their
/// source records were byte-identical.
#[derive(Debug, Clone)]
pub struct InternedVector(Arc<[f32]>);

impl InternedVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq for InternedVector {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || bits_equal(&self.0, &other.0)
    }
}

impl Eq for InternedVector {}

fn bits_equal(a: &[f32], b: &[f32]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|(x, y)| x.to_bits() == y.to_bits())
}

fn hash_key_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

fn hash_vector_bits(data: &[f32]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for value in data {
        value.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}

/// Intern an external key, returning the shared entry for its content.
pub fn intern_key(bytes: &[u8]) -> InternedKey {
    let hash = hash_key_bytes(bytes);
    let mut pool = KEY_POOL.lock();
    let bucket = pool.entry(hash).or_default();
    bucket.retain(|weak| weak.strong_count() > 0);
    for weak in bucket.iter() {
        if let Some(existing) = weak.upgrade() {
            if existing.as_ref() == bytes {
                return InternedKey(existing);
            }
        }
    }
    let fresh: Arc<[u8]> = Arc::from(bytes);
    bucket.push(Arc::downgrade(&fresh));
    InternedKey(fresh)
}

/// Intern vector content, returning the shared entry for its bit pattern.
pub fn intern_vector(data: Vec<f32>) -> InternedVector {
    let hash = hash_vector_bits(&data);
    let mut pool = VECTOR_POOL.lock();
    let bucket = pool.entry(hash).or_default();
    bucket.retain(|weak| weak.strong_count() > 0);
    for weak in bucket.iter() {
        if let Some(existing) = weak.upgrade() {
            if bits_equal(&existing, &data) {
                return InternedVector(existing);
            }
        }
    }
    let fresh: Arc<[f32]> = Arc::from(data);
    bucket.push(Arc::downgrade(&fresh));
    InternedVector(fresh)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_dedup() {
        let a = intern_key(b"doc:1");
        let b = intern_key(b"doc:1");
        let c = intern_key(b"doc:2");
        assert!(Arc::ptr_eq(&a.0, &b.0));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_vector_dedup_by_bits() {
        let a = intern_vector(vec![1.0, 2.0, 3.0]);
        let b = intern_vector(vec![1.0, 2.0, 3.0]);
        let c = intern_vector(vec![1.0, 2.0, 3.5]);
        assert!(Arc::ptr_eq(&a.0, &b.0));
        assert_ne!(a, c);
    }

    #[test]
    fn test_pool_entry_released_on_drop() {
        let key = intern_key(b"transient-key-for-drop-test");
        let weak = Arc::downgrade(&key.0);
        drop(key);
        assert!(weak.upgrade().is_none());
    }
}
