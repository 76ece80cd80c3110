// LogLens - vector/store.rs
//
// Bounded in-memory vector store with cosine k-NN search and an LRU
// result cache.
//
// Concurrency contract:
//   - Readers (search / len) take the read lock and may run in parallel;
//     the result cache sits behind its own mutex so cached reads do not
//     block writers on the main lock.
//   - Writers (insert / delete / close) take the write lock and
//     invalidate the cache before releasing it, so a reader can never
//     observe a stale cached result for mutated contents.
//
// Lifecycle: Open -> Closed. Every operation after `close` fails with a
// lifecycle error.

use crate::util::constants::{
    DEFAULT_MAX_VECTOR_ENTRIES, DEFAULT_MIN_VECTOR_SCORE, DEFAULT_QUERY_CACHE_CAPACITY,
    DEFAULT_VECTOR_DIMENSION, DEFAULT_VECTOR_TIMEOUT_SECS,
};
use crate::util::error::{ComputationError, LifecycleError, ResourceError, Result};
use crate::vector::cache::{LruCache, QueryFingerprint};
use crate::vector::vectorizer::l2_normalize;
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};

/// How many entries are scanned between deadline checks during search.
const TIMEOUT_CHECK_STRIDE: usize = 1_024;

// =============================================================================
// Types
// =============================================================================

/// One stored vector with its originating text.
#[derive(Debug, Clone)]
pub struct VectorEntry {
    pub id: String,
    pub text: String,
    pub vector: Vec<f32>,
}

/// One k-NN search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub id: String,
    pub score: f64,
}

/// Vector store configuration.
#[derive(Debug, Clone)]
pub struct VectorStoreConfig {
    /// Required dimension of every stored and queried vector.
    pub dimension: usize,

    /// Entry cap; the oldest entry is evicted when it is exceeded.
    pub max_entries: usize,

    /// L2-normalize vectors at insert time so cosine reduces to a dot
    /// product against a normalized query.
    pub normalize_on_insert: bool,

    /// Hits scoring below this are dropped before results are returned.
    pub min_score: f64,

    /// LRU result-cache capacity. Zero disables caching.
    pub cache_capacity: usize,

    /// Deadline for a single search operation.
    pub timeout: Duration,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_VECTOR_DIMENSION,
            max_entries: DEFAULT_MAX_VECTOR_ENTRIES,
            normalize_on_insert: true,
            min_score: DEFAULT_MIN_VECTOR_SCORE,
            cache_capacity: DEFAULT_QUERY_CACHE_CAPACITY,
            timeout: Duration::from_secs(DEFAULT_VECTOR_TIMEOUT_SECS),
        }
    }
}

// =============================================================================
// VectorStore trait
// =============================================================================

/// Operation set of a vector store. The correlator depends on this
/// trait, never on a concrete representation.
pub trait VectorStore: Send + Sync {
    /// Insert an entry, replacing any entry with the same id.
    fn insert(&self, entry: VectorEntry) -> Result<()>;

    /// Top-k nearest entries to `query` by cosine similarity, best
    /// first, with sub-minimum scores filtered out.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<VectorHit>>;

    /// Remove an entry by id. Unknown ids are a silent no-op.
    fn delete(&self, id: &str) -> Result<()>;

    /// Current entry count.
    fn len(&self) -> Result<usize>;

    /// True when no entries are stored.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Release all buffers and reject further operations.
    fn close(&self);
}

// =============================================================================
// InMemoryVectorStore
// =============================================================================

struct Inner {
    /// Insertion-ordered entries; index 0 is the oldest.
    entries: Vec<VectorEntry>,
    closed: bool,
}

/// The in-memory `VectorStore` implementation.
pub struct InMemoryVectorStore {
    config: VectorStoreConfig,
    inner: RwLock<Inner>,
    cache: Mutex<LruCache<Vec<VectorHit>>>,
}

impl InMemoryVectorStore {
    pub fn new(config: VectorStoreConfig) -> Self {
        let cache = LruCache::new(config.cache_capacity);
        Self {
            config,
            inner: RwLock::new(Inner {
                entries: Vec::new(),
                closed: false,
            }),
            cache: Mutex::new(cache),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(VectorStoreConfig::default())
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.config.dimension {
            return Err(ComputationError::DimensionMismatch {
                expected: self.config.dimension,
                actual: vector.len(),
            }
            .into());
        }
        Ok(())
    }
}

fn ensure_open(inner: &Inner) -> Result<()> {
    if inner.closed {
        return Err(LifecycleError::StoreClosed {
            store: "vector store",
        }
        .into());
    }
    Ok(())
}

impl VectorStore for InMemoryVectorStore {
    fn insert(&self, mut entry: VectorEntry) -> Result<()> {
        self.check_dimension(&entry.vector)?;
        if self.config.normalize_on_insert {
            l2_normalize(&mut entry.vector);
        }

        let mut inner = self.inner.write().expect("vector store lock poisoned");
        ensure_open(&inner)?;

        if let Some(existing) = inner.entries.iter_mut().find(|e| e.id == entry.id) {
            *existing = entry;
        } else {
            inner.entries.push(entry);
            if inner.entries.len() > self.config.max_entries {
                let evicted = inner.entries.remove(0);
                tracing::debug!(id = %evicted.id, "Evicted oldest vector entry");
            }
        }

        // Invalidate before the writer lock drops so no reader can pick
        // up a result computed against the previous contents.
        self.cache.lock().expect("cache lock poisoned").clear();
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<VectorHit>> {
        self.check_dimension(query)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let fingerprint = QueryFingerprint::new(query, k);
        {
            let inner = self.inner.read().expect("vector store lock poisoned");
            ensure_open(&inner)?;
            let mut cache = self.cache.lock().expect("cache lock poisoned");
            if let Some(hits) = cache.get(&fingerprint) {
                return Ok(hits);
            }
        }

        let deadline = Instant::now() + self.config.timeout;
        let inner = self.inner.read().expect("vector store lock poisoned");
        ensure_open(&inner)?;

        let mut hits: Vec<VectorHit> = Vec::new();
        for (idx, entry) in inner.entries.iter().enumerate() {
            if idx % TIMEOUT_CHECK_STRIDE == 0 && Instant::now() > deadline {
                return Err(ResourceError::Timeout {
                    operation: "vector search",
                    limit: self.config.timeout,
                }
                .into());
            }
            let score = cosine_similarity(query, &entry.vector);
            if score >= self.config.min_score {
                hits.push(VectorHit {
                    id: entry.id.clone(),
                    score,
                });
            }
        }

        // Deterministic ordering: score descending, then id ascending,
        // so cache hits are byte-identical to cache misses.
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(k);

        self.cache
            .lock()
            .expect("cache lock poisoned")
            .put(fingerprint, hits.clone());
        Ok(hits)
    }

    fn delete(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.write().expect("vector store lock poisoned");
        ensure_open(&inner)?;
        inner.entries.retain(|e| e.id != id);
        self.cache.lock().expect("cache lock poisoned").clear();
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        let inner = self.inner.read().expect("vector store lock poisoned");
        ensure_open(&inner)?;
        Ok(inner.entries.len())
    }

    fn close(&self) {
        let mut inner = self.inner.write().expect("vector store lock poisoned");
        inner.entries = Vec::new();
        inner.closed = true;
        self.cache.lock().expect("cache lock poisoned").clear();
    }
}

/// Cosine similarity of two equal-length vectors. Zero when either has
/// zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut mag_a = 0.0f64;
    let mut mag_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += f64::from(*x) * f64::from(*y);
        mag_a += f64::from(*x) * f64::from(*x);
        mag_b += f64::from(*y) * f64::from(*y);
    }
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a.sqrt() * mag_b.sqrt())
}
