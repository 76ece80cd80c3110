// LogLens - vector/cache.rs
//
// Small LRU cache for vector search results, keyed by a fingerprint of
// the quantized query vector and the requested k. Quantizing before
// hashing means float noise from repeated vectorizations of the same
// text cannot defeat cache hits.

use crate::util::constants::QUERY_QUANT_SCALE;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};

/// Cache key: hash of the quantized query components plus k.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryFingerprint {
    query_hash: u64,
    k: usize,
}

impl QueryFingerprint {
    /// Fingerprint a query: each component is rounded to
    /// 1/QUERY_QUANT_SCALE before hashing.
    pub fn new(query: &[f32], k: usize) -> Self {
        let mut hasher = DefaultHasher::new();
        for component in query {
            let quantized = (component * QUERY_QUANT_SCALE).round() as i64;
            quantized.hash(&mut hasher);
        }
        query.len().hash(&mut hasher);
        Self {
            query_hash: hasher.finish(),
            k,
        }
    }
}

/// Fixed-capacity least-recently-used cache.
///
/// A `get` promotes the key to most-recently-used; inserting beyond
/// capacity evicts the least-recently-used entry.
#[derive(Debug)]
pub struct LruCache<V> {
    capacity: usize,
    map: HashMap<QueryFingerprint, V>,
    /// Keys ordered least-recently-used first.
    order: VecDeque<QueryFingerprint>,
}

impl<V: Clone> LruCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            map: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Fetch a cached value, promoting the key.
    pub fn get(&mut self, key: &QueryFingerprint) -> Option<V> {
        if !self.map.contains_key(key) {
            return None;
        }
        self.promote(key);
        self.map.get(key).cloned()
    }

    /// Insert a value, evicting the LRU entry when full.
    pub fn put(&mut self, key: QueryFingerprint, value: V) {
        if self.capacity == 0 {
            return;
        }
        if self.map.insert(key, value).is_some() {
            self.promote(&key);
            return;
        }
        self.order.push_back(key);
        if self.map.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.map.remove(&evicted);
            }
        }
    }

    /// Drop every entry. Called on any store mutation.
    pub fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
    }

    fn promote(&mut self, key: &QueryFingerprint) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
            self.order.push_back(*key);
        }
    }
}
