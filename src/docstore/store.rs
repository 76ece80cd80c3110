// LogLens - docstore/store.rs
//
// In-memory document store. Exclusively owns the documents and the
// inverted index; every mutation keeps the two consistent under one
// writer lock.
//
// Concurrency contract:
//   - Readers (get / list / search / count) take the read lock and may
//     run in parallel.
//   - Writers (add / add_batch / update / delete / clear / reindex) take
//     the write lock and are exclusive.
//   - Change listeners are invoked synchronously while the writer lock
//     is held. Listeners must not re-enter the store or they will
//     deadlock.

use crate::docstore::document::Document;
use crate::docstore::index::{self, InvertedIndex};
use crate::docstore::tokenize::tokenize;
use crate::util::error::{LifecycleError, LookupError, Result};
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

// =============================================================================
// Search types
// =============================================================================

/// A keyword search request against the store.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Raw query text. Classified as phrase mode (contains "..."),
    /// boolean mode (contains standalone AND/OR), or bag-of-words.
    pub text: String,

    /// Maximum results returned.
    pub limit: usize,

    /// Resolve query terms absent from the index via bounded edit
    /// distance.
    pub fuzzy: bool,

    /// Return the document body with matched terms wrapped in `**...**`.
    pub highlight: bool,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            text: String::new(),
            limit: crate::util::constants::KEYWORD_SEARCH_LIMIT,
            fuzzy: false,
            highlight: false,
        }
    }
}

/// One scored search hit.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub document: Arc<Document>,
    pub score: f64,
    pub matched_terms: Vec<String>,
    /// Present when the query requested highlighting.
    pub highlighted: Option<String>,
}

// =============================================================================
// Change events
// =============================================================================

/// Mutation notification delivered to subscribed listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Added(String),
    Updated(String),
    Removed(String),
    Cleared,
}

/// Listener callback. Invoked under the writer lock; must not re-enter
/// the store.
pub type ChangeListener = Box<dyn Fn(&ChangeEvent) + Send + Sync>;

// =============================================================================
// DocumentStore trait
// =============================================================================

/// Operation set of a document store. The correlator depends on this
/// trait, never on a concrete representation.
pub trait DocumentStore: Send + Sync {
    /// Add a document, replacing any existing document with the same id.
    fn add(&self, doc: Document) -> Result<()>;

    /// Add many documents under one writer lock. Returns the count added.
    fn add_batch(&self, docs: Vec<Document>) -> Result<usize>;

    /// Fetch a document by id.
    fn get(&self, id: &str) -> Result<Arc<Document>>;

    /// All documents, ordered by id.
    fn list(&self) -> Result<Vec<Arc<Document>>>;

    /// Replace an existing document. Errors if the id is unknown.
    fn update(&self, doc: Document) -> Result<()>;

    /// Remove a document by id. Errors if the id is unknown.
    fn delete(&self, id: &str) -> Result<()>;

    /// Remove all documents and index state.
    fn clear(&self) -> Result<()>;

    /// Rebuild the inverted index from the stored documents.
    fn reindex(&self) -> Result<()>;

    /// Keyword search. Empty queries return an empty list, never an error.
    fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>>;

    /// Current document count.
    fn count(&self) -> Result<usize>;

    /// Release internal buffers and reject all further operations.
    fn close(&self);
}

// =============================================================================
// MemoryStore
// =============================================================================

struct Inner {
    docs: HashMap<String, Arc<Document>>,
    index: InvertedIndex,
    listeners: Vec<ChangeListener>,
    closed: bool,
}

/// The in-memory `DocumentStore` implementation.
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                docs: HashMap::new(),
                index: InvertedIndex::new(),
                listeners: Vec::new(),
                closed: false,
            }),
        }
    }

    /// Register a change listener. Listeners fire synchronously under
    /// the writer lock for every subsequent mutation.
    pub fn subscribe(&self, listener: ChangeListener) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.listeners.push(listener);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_open(inner: &Inner) -> Result<()> {
    if inner.closed {
        return Err(LifecycleError::StoreClosed {
            store: "document store",
        }
        .into());
    }
    Ok(())
}

fn notify(inner: &Inner, event: &ChangeEvent) {
    for listener in &inner.listeners {
        listener(event);
    }
}

impl DocumentStore for MemoryStore {
    fn add(&self, doc: Document) -> Result<()> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        ensure_open(&inner)?;

        inner.index.add_document(&doc);
        let id = doc.id.clone();
        let replaced = inner.docs.insert(id.clone(), Arc::new(doc)).is_some();

        let event = if replaced {
            ChangeEvent::Updated(id)
        } else {
            ChangeEvent::Added(id)
        };
        notify(&inner, &event);
        Ok(())
    }

    fn add_batch(&self, docs: Vec<Document>) -> Result<usize> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        ensure_open(&inner)?;

        let mut added = 0;
        let mut events = Vec::with_capacity(docs.len());
        for doc in docs {
            inner.index.add_document(&doc);
            let id = doc.id.clone();
            let replaced = inner.docs.insert(id.clone(), Arc::new(doc)).is_some();
            events.push(if replaced {
                ChangeEvent::Updated(id)
            } else {
                ChangeEvent::Added(id)
            });
            added += 1;
        }
        for event in &events {
            notify(&inner, event);
        }
        tracing::debug!(count = added, "Document batch added");
        Ok(added)
    }

    fn get(&self, id: &str) -> Result<Arc<Document>> {
        let inner = self.inner.read().expect("store lock poisoned");
        ensure_open(&inner)?;
        inner
            .docs
            .get(id)
            .cloned()
            .ok_or_else(|| LookupError::DocumentNotFound { id: id.to_string() }.into())
    }

    fn list(&self) -> Result<Vec<Arc<Document>>> {
        let inner = self.inner.read().expect("store lock poisoned");
        ensure_open(&inner)?;
        let mut docs: Vec<Arc<Document>> = inner.docs.values().cloned().collect();
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(docs)
    }

    fn update(&self, doc: Document) -> Result<()> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        ensure_open(&inner)?;

        if !inner.docs.contains_key(&doc.id) {
            return Err(LookupError::DocumentNotFound { id: doc.id }.into());
        }
        inner.index.add_document(&doc);
        let id = doc.id.clone();
        inner.docs.insert(id.clone(), Arc::new(doc));
        notify(&inner, &ChangeEvent::Updated(id));
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        ensure_open(&inner)?;

        if inner.docs.remove(id).is_none() {
            return Err(LookupError::DocumentNotFound { id: id.to_string() }.into());
        }
        inner.index.remove_document(id);
        notify(&inner, &ChangeEvent::Removed(id.to_string()));
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        ensure_open(&inner)?;
        inner.docs.clear();
        inner.index.clear();
        notify(&inner, &ChangeEvent::Cleared);
        Ok(())
    }

    fn reindex(&self) -> Result<()> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        ensure_open(&inner)?;
        inner.index.clear();
        let docs: Vec<Arc<Document>> = inner.docs.values().cloned().collect();
        for doc in docs {
            inner.index.add_document(&doc);
        }
        tracing::debug!(
            docs = inner.docs.len(),
            terms = inner.index.term_count(),
            "Reindex complete"
        );
        Ok(())
    }

    fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        let inner = self.inner.read().expect("store lock poisoned");
        ensure_open(&inner)?;

        if query.text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let scores = match classify(&query.text) {
            QueryMode::Phrase(phrases) => score_phrases(&inner, &phrases),
            QueryMode::BooleanAnd(terms) => inner
                .index
                .score_terms_all(&terms)
                .into_iter()
                .map(|(id, ts)| (id, ts.score, ts.matched_terms))
                .collect(),
            QueryMode::BooleanOr(terms) | QueryMode::BagOfWords(terms) => inner
                .index
                .score_terms(&terms, query.fuzzy)
                .into_iter()
                .map(|(id, ts)| (id, ts.score, ts.matched_terms))
                .collect(),
        };

        let mut results: Vec<SearchResult> = scores
            .into_iter()
            .filter(|(_, score, _)| *score > 0.0)
            .filter_map(|(doc_id, score, matched_terms)| {
                let document = inner.docs.get(&doc_id)?.clone();
                let highlighted = query
                    .highlight
                    .then(|| index::highlight(&document.content, &matched_terms));
                Some(SearchResult {
                    document,
                    score,
                    matched_terms,
                    highlighted,
                })
            })
            .collect();

        // Deterministic ordering: score descending, then id ascending.
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.document.id.cmp(&b.document.id))
        });
        results.truncate(query.limit);
        Ok(results)
    }

    fn count(&self) -> Result<usize> {
        let inner = self.inner.read().expect("store lock poisoned");
        ensure_open(&inner)?;
        Ok(inner.docs.len())
    }

    fn close(&self) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.docs = HashMap::new();
        inner.index = InvertedIndex::new();
        inner.listeners = Vec::new();
        inner.closed = true;
    }
}

// =============================================================================
// Query classification
// =============================================================================

enum QueryMode {
    /// Quoted substrings, matched verbatim in title or body.
    Phrase(Vec<String>),
    /// Standalone AND present: documents must contain every term.
    BooleanAnd(Vec<String>),
    /// Standalone OR present: posting-list union.
    BooleanOr(Vec<String>),
    /// Plain TF-IDF bag-of-words.
    BagOfWords(Vec<String>),
}

fn quoted_phrase_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""([^"]+)""#).expect("quoted-phrase regex"))
}

fn classify(text: &str) -> QueryMode {
    let phrases: Vec<String> = quoted_phrase_re()
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .filter(|p| !p.trim().is_empty())
        .collect();
    if !phrases.is_empty() {
        return QueryMode::Phrase(phrases);
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    let has_and = words.iter().any(|w| *w == "AND");
    let has_or = words.iter().any(|w| *w == "OR");
    if has_and || has_or {
        let operands: String = words
            .iter()
            .filter(|w| **w != "AND" && **w != "OR")
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        let terms = tokenize(&operands);
        // AND tightens to intersection; a mixed query falls back to union.
        return if has_and && !has_or {
            QueryMode::BooleanAnd(terms)
        } else {
            QueryMode::BooleanOr(terms)
        };
    }

    QueryMode::BagOfWords(tokenize(text))
}

/// Phrase mode: each quoted substring found case-insensitively in a
/// document's title or body scores 1.0 for that document.
fn score_phrases(inner: &Inner, phrases: &[String]) -> Vec<(String, f64, Vec<String>)> {
    let mut results = Vec::new();
    for doc in inner.docs.values() {
        let title_lower = doc.title.to_lowercase();
        let content_lower = doc.content.to_lowercase();
        let mut score = 0.0;
        let mut matched = Vec::new();
        for phrase in phrases {
            let needle = phrase.to_lowercase();
            if title_lower.contains(&needle) || content_lower.contains(&needle) {
                score += 1.0;
                matched.push(phrase.clone());
            }
        }
        if score > 0.0 {
            results.push((doc.id.clone(), score, matched));
        }
    }
    results
}
