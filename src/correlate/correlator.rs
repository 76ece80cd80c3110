// LogLens - correlate/correlator.rs
//
// The hybrid correlator: orchestrates keyword retrieval against the
// document store and semantic retrieval against the vector store, and
// fuses the two score streams into ranked document matches per pattern
// and per detected raw error.
//
// Lifecycle: Created -> DocStoreSet -> [VectorStoreSet] -> Indexed.
// Correlate is rejected before a document store is attached; the vector
// pass participates only once a vector store is attached AND
// IndexDocuments has completed. After configuration the correlator is
// stateless: concurrent correlate calls do not interfere, and only
// IndexDocuments is serialized with itself.

use crate::core::model::{Analysis, PatternMatch};
use crate::correlate::direct::{self, DetectedError};
use crate::correlate::keywords;
use crate::correlate::{
    CorrelationResult, DocumentMatch, ErrorCorrelation, PatternCorrelation, SearchMethod,
};
use crate::docstore::store::{DocumentStore, SearchQuery};
use crate::util::constants::{
    DEFAULT_CORRELATION_TIMEOUT_SECS, DEFAULT_INDEXING_TIMEOUT_SECS, DEFAULT_KEYWORD_WEIGHT,
    DEFAULT_MAX_RESULTS, DEFAULT_MIN_VECTOR_SCORE, DEFAULT_VECTOR_TOP_K, DEFAULT_VECTOR_WEIGHT,
    KEYWORD_SEARCH_LIMIT, MAX_VECTOR_QUERY_SAMPLES, WEIGHT_SUM_TOLERANCE,
};
use crate::util::error::{ConfigError, LifecycleError, ResourceError, Result};
use crate::vector::store::{VectorEntry, VectorStore};
use crate::vector::vectorizer::TfIdfVectorizer;
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

/// Width of the highlighted snippet returned on each match, in bytes of
/// surrounding context either side of the first highlight marker.
const SNIPPET_CONTEXT: usize = 90;

// =============================================================================
// Configuration
// =============================================================================

/// Hybrid search configuration.
#[derive(Debug, Clone)]
pub struct HybridSearchConfig {
    /// Weight of the keyword (lexical) score in the fused ranking.
    pub keyword_weight: f64,

    /// Weight of the vector (semantic) score in the fused ranking.
    pub vector_weight: f64,

    /// Per-pattern cap on returned document matches.
    pub max_results: usize,

    /// Neighbour count requested from the vector store.
    pub vector_top_k: usize,

    /// Vector hits scoring below this are dropped.
    pub min_vector_score: f64,

    /// Master switch for the vector pass; when false (or when no vector
    /// store is attached) the pipeline degrades to keyword-only.
    pub enable_vector: bool,

    /// Deadline for one correlation pass.
    pub correlation_timeout: Duration,

    /// Deadline for indexing the document corpus.
    pub indexing_timeout: Duration,
}

impl Default for HybridSearchConfig {
    fn default() -> Self {
        Self {
            keyword_weight: DEFAULT_KEYWORD_WEIGHT,
            vector_weight: DEFAULT_VECTOR_WEIGHT,
            max_results: DEFAULT_MAX_RESULTS,
            vector_top_k: DEFAULT_VECTOR_TOP_K,
            min_vector_score: DEFAULT_MIN_VECTOR_SCORE,
            enable_vector: true,
            correlation_timeout: Duration::from_secs(DEFAULT_CORRELATION_TIMEOUT_SECS),
            indexing_timeout: Duration::from_secs(DEFAULT_INDEXING_TIMEOUT_SECS),
        }
    }
}

impl HybridSearchConfig {
    /// Validate the configuration: weights must be non-negative and sum
    /// to 1.0 within tolerance, and the result cap must be positive.
    pub fn validate(&self) -> Result<()> {
        if self.keyword_weight < 0.0 {
            return Err(ConfigError::NegativeWeight {
                field: "keyword_weight",
                value: self.keyword_weight,
            }
            .into());
        }
        if self.vector_weight < 0.0 {
            return Err(ConfigError::NegativeWeight {
                field: "vector_weight",
                value: self.vector_weight,
            }
            .into());
        }
        let sum = self.keyword_weight + self.vector_weight;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::InvalidWeights {
                keyword_weight: self.keyword_weight,
                vector_weight: self.vector_weight,
                tolerance: WEIGHT_SUM_TOLERANCE,
            }
            .into());
        }
        if self.max_results == 0 {
            return Err(ConfigError::ValueOutOfRange {
                field: "max_results".to_string(),
                value: "0".to_string(),
                expected: "> 0".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

// =============================================================================
// Correlator
// =============================================================================

/// The hybrid correlator. Holds non-owning references to the stores and
/// mutates them only through their public operations.
pub struct Correlator {
    config: HybridSearchConfig,
    doc_store: Option<Arc<dyn DocumentStore>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    vectorizer: RwLock<TfIdfVectorizer>,
    indexed: AtomicBool,
    /// Serializes IndexDocuments with itself.
    indexing: Mutex<()>,
}

impl Correlator {
    /// Create a correlator with a validated configuration.
    pub fn new(config: HybridSearchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            doc_store: None,
            vector_store: None,
            vectorizer: RwLock::new(TfIdfVectorizer::with_defaults()),
            indexed: AtomicBool::new(false),
            indexing: Mutex::new(()),
        })
    }

    /// Attach the document store (Created -> DocStoreSet).
    pub fn set_document_store(&mut self, store: Arc<dyn DocumentStore>) {
        self.doc_store = Some(store);
    }

    /// Attach the vector store (DocStoreSet -> VectorStoreSet).
    pub fn set_vector_store(&mut self, store: Arc<dyn VectorStore>) {
        self.vector_store = Some(store);
    }

    fn doc_store(&self, operation: &'static str) -> Result<&Arc<dyn DocumentStore>> {
        self.doc_store.as_ref().ok_or_else(|| {
            LifecycleError::NotConfigured {
                operation,
                missing: "document store",
            }
            .into()
        })
    }

    /// True when the vector pass can participate in correlation.
    fn vector_ready(&self) -> bool {
        self.config.enable_vector
            && self.vector_store.is_some()
            && self.indexed.load(Ordering::Acquire)
    }

    // -------------------------------------------------------------------------
    // Indexing
    // -------------------------------------------------------------------------

    /// Fit the vectorizer on the full corpus and insert one vector per
    /// document into the vector store.
    ///
    /// The vectorizer is fit exactly once: a second call is a lifecycle
    /// error. Individual vectorization failures are logged and skipped;
    /// they never abort the batch. Returns the number of documents
    /// vectorized.
    pub fn index_documents(&self) -> Result<usize> {
        let doc_store = self.doc_store("index documents")?;
        let vector_store = self.vector_store.as_ref().ok_or(LifecycleError::NotConfigured {
            operation: "index documents",
            missing: "vector store",
        })?;

        let _guard = self.indexing.lock().expect("indexing lock poisoned");
        if self.indexed.load(Ordering::Acquire) {
            return Err(LifecycleError::AlreadyIndexed.into());
        }

        let deadline = Instant::now() + self.config.indexing_timeout;
        let documents = doc_store.list()?;
        let corpus: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();

        {
            let mut vectorizer = self.vectorizer.write().expect("vectorizer lock poisoned");
            vectorizer.fit(&corpus);
        }

        // Vectorize in parallel; insert sequentially in document order
        // so eviction order stays deterministic.
        let vectorizer = self.vectorizer.read().expect("vectorizer lock poisoned");
        let vectors: Vec<_> = documents
            .par_iter()
            .map(|doc| (doc.id.clone(), vectorizer.transform(&doc.content)))
            .collect();
        drop(vectorizer);

        let mut inserted = 0usize;
        for (doc, (id, vector)) in documents.iter().zip(vectors) {
            if Instant::now() > deadline {
                return Err(ResourceError::Timeout {
                    operation: "document indexing",
                    limit: self.config.indexing_timeout,
                }
                .into());
            }
            let vector = match vector {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(doc = %id, error = %e, "Skipping unvectorizable document");
                    continue;
                }
            };
            if vector.iter().all(|v| *v == 0.0) {
                tracing::debug!(doc = %id, "Skipping zero vector (no vocabulary overlap)");
                continue;
            }
            match vector_store.insert(VectorEntry {
                id,
                text: doc.title.clone(),
                vector,
            }) {
                Ok(()) => inserted += 1,
                Err(e) => tracing::warn!(doc = %doc.id, error = %e, "Vector insert failed"),
            }
        }

        self.indexed.store(true, Ordering::Release);
        tracing::info!(
            documents = documents.len(),
            vectors = inserted,
            "Document indexing complete"
        );
        Ok(inserted)
    }

    // -------------------------------------------------------------------------
    // Correlation
    // -------------------------------------------------------------------------

    /// Correlate an analysis against the document corpus.
    ///
    /// Per-pattern and per-error failures are logged and skipped; the
    /// pass as a whole fails only on missing configuration or on the
    /// correlation deadline.
    pub fn correlate(&self, analysis: &Analysis) -> Result<CorrelationResult> {
        let doc_store = self.doc_store("correlate")?;
        let deadline = Instant::now() + self.config.correlation_timeout;

        let mut result = CorrelationResult {
            total_patterns: analysis.patterns.len(),
            ..Default::default()
        };

        for matched in &analysis.patterns {
            if Instant::now() > deadline {
                return Err(ResourceError::Timeout {
                    operation: "correlation",
                    limit: self.config.correlation_timeout,
                }
                .into());
            }
            match self.correlate_pattern(doc_store, matched) {
                Ok(Some(correlation)) => result.correlations.push(correlation),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        pattern = %matched.pattern.id,
                        error = %e,
                        "Pattern correlation failed; skipping"
                    );
                }
            }
        }
        result.correlated_patterns = result.correlations.len();

        // Direct-error path over the raw error-level entries.
        for detected in direct::detect_error_classes(&analysis.entries) {
            if Instant::now() > deadline {
                return Err(ResourceError::Timeout {
                    operation: "correlation",
                    limit: self.config.correlation_timeout,
                }
                .into());
            }
            match self.correlate_error(doc_store, &detected) {
                Ok(Some(correlation)) => result.error_correlations.push(correlation),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        error_type = %detected.error_type,
                        error = %e,
                        "Direct-error correlation failed; skipping"
                    );
                }
            }
        }

        tracing::debug!(
            total = result.total_patterns,
            correlated = result.correlated_patterns,
            direct_errors = result.error_correlations.len(),
            "Correlation complete"
        );
        Ok(result)
    }

    /// One pattern through the hybrid pipeline. Returns Ok(None) when no
    /// document matched (the pattern is dropped from the result set).
    fn correlate_pattern(
        &self,
        doc_store: &Arc<dyn DocumentStore>,
        matched: &PatternMatch,
    ) -> Result<Option<PatternCorrelation>> {
        let mut extracted = vec![keywords::extract_from_pattern(&matched.pattern)];
        for entry in &matched.entries {
            extracted.push(keywords::extract_from_entry(entry));
        }
        let query_keywords = merge_keywords(extracted);

        let vector_query = self.vector_ready().then(|| {
            let mut parts = vec![matched.pattern.description.clone()];
            parts.extend(
                matched
                    .entries
                    .iter()
                    .take(MAX_VECTOR_QUERY_SAMPLES)
                    .map(|e| e.message.clone()),
            );
            parts.join(" ")
        });

        let matches = self.hybrid_search(doc_store, &query_keywords, vector_query.as_deref())?;
        if matches.is_empty() {
            return Ok(None);
        }
        Ok(Some(PatternCorrelation {
            pattern: matched.pattern.clone(),
            keywords: query_keywords,
            match_count: matches.len(),
            matches,
        }))
    }

    /// One detected raw error through the hybrid pipeline.
    fn correlate_error(
        &self,
        doc_store: &Arc<dyn DocumentStore>,
        detected: &DetectedError,
    ) -> Result<Option<ErrorCorrelation>> {
        let query_keywords = keywords::extract_from_message(&detected.message);
        let vector_query = self.vector_ready().then(|| detected.message.clone());

        let matches = self.hybrid_search(doc_store, &query_keywords, vector_query.as_deref())?;
        if matches.is_empty() {
            return Ok(None);
        }
        Ok(Some(ErrorCorrelation {
            error_type: detected.error_type.clone(),
            message: detected.message.clone(),
            occurrences: detected.occurrences,
            confidence: direct::error_confidence(&detected.message),
            keywords: query_keywords,
            match_count: matches.len(),
            matches,
        }))
    }

    // -------------------------------------------------------------------------
    // Hybrid pipeline
    // -------------------------------------------------------------------------

    /// Keyword pass + optional vector pass, merged by document id and
    /// ranked by the fused score.
    fn hybrid_search(
        &self,
        doc_store: &Arc<dyn DocumentStore>,
        query_keywords: &[String],
        vector_query: Option<&str>,
    ) -> Result<Vec<DocumentMatch>> {
        struct Partial {
            keyword_score: f64,
            vector_score: f64,
            matched_keywords: Vec<String>,
            snippet: String,
        }
        let mut merged: HashMap<String, Partial> = HashMap::new();

        // Keyword pass: one store query per keyword, keeping the maximum
        // per-document score and accumulating which keywords hit.
        for keyword in query_keywords {
            let hits = doc_store.search(&SearchQuery {
                text: keyword.clone(),
                limit: KEYWORD_SEARCH_LIMIT,
                fuzzy: false,
                highlight: true,
            })?;
            for hit in hits {
                let partial = merged
                    .entry(hit.document.id.clone())
                    .or_insert_with(|| Partial {
                        keyword_score: 0.0,
                        vector_score: 0.0,
                        matched_keywords: Vec::new(),
                        snippet: String::new(),
                    });
                if hit.score > partial.keyword_score {
                    partial.keyword_score = hit.score;
                }
                if !partial
                    .matched_keywords
                    .iter()
                    .any(|k| k.eq_ignore_ascii_case(keyword))
                {
                    partial.matched_keywords.push(keyword.clone());
                }
                if partial.snippet.is_empty() {
                    if let Some(highlighted) = &hit.highlighted {
                        partial.snippet = make_snippet(highlighted);
                    }
                }
            }
        }

        // Vector pass.
        if let Some(query_text) = vector_query {
            match self.vector_pass(query_text) {
                Ok(hits) => {
                    for (id, score) in hits {
                        let partial = merged.entry(id).or_insert_with(|| Partial {
                            keyword_score: 0.0,
                            vector_score: 0.0,
                            matched_keywords: Vec::new(),
                            snippet: String::new(),
                        });
                        if score > partial.vector_score {
                            partial.vector_score = score;
                        }
                    }
                }
                // A failed vector pass degrades to keyword-only.
                Err(e) => tracing::warn!(error = %e, "Vector pass failed; keyword-only"),
            }
        }

        // Merge, label, rank.
        let mut matches: Vec<DocumentMatch> = Vec::with_capacity(merged.len());
        for (doc_id, partial) in merged {
            let score = self.config.keyword_weight * partial.keyword_score
                + self.config.vector_weight * partial.vector_score;
            if score <= 0.0 {
                continue;
            }
            let method = match (partial.keyword_score > 0.0, partial.vector_score > 0.0) {
                (true, true) => SearchMethod::Hybrid,
                (false, true) => SearchMethod::Vector,
                _ => SearchMethod::Keyword,
            };
            let document = match doc_store.get(&doc_id) {
                Ok(doc) => doc,
                // The document vanished between passes; skip it.
                Err(_) => continue,
            };
            let snippet = if partial.snippet.is_empty() {
                make_snippet(&document.content)
            } else {
                partial.snippet
            };
            matches.push(DocumentMatch {
                document,
                score,
                keyword_score: partial.keyword_score,
                vector_score: partial.vector_score,
                matched_keywords: partial.matched_keywords,
                snippet,
                method,
            });
        }

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.document.id.cmp(&b.document.id))
        });
        matches.truncate(self.config.max_results);
        Ok(matches)
    }

    /// Vectorize the query and fetch neighbours above the configured
    /// minimum score.
    fn vector_pass(&self, query_text: &str) -> Result<Vec<(String, f64)>> {
        let vector_store = self.vector_store.as_ref().ok_or(LifecycleError::NotConfigured {
            operation: "vector search",
            missing: "vector store",
        })?;
        let query = {
            let vectorizer = self.vectorizer.read().expect("vectorizer lock poisoned");
            vectorizer.transform(query_text)?
        };
        let hits = vector_store.search(&query, self.config.vector_top_k)?;
        Ok(hits
            .into_iter()
            .filter(|h| h.score >= self.config.min_vector_score)
            .map(|h| (h.id, h.score))
            .collect())
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Merge keyword lists with case-insensitive dedup, preserving first
/// appearance order and casing.
fn merge_keywords(lists: Vec<Vec<String>>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut merged = Vec::new();
    for list in lists {
        for keyword in list {
            if seen.insert(keyword.to_lowercase()) {
                merged.push(keyword);
            }
        }
    }
    merged
}

/// A short excerpt around the first highlight marker, or the start of
/// the text when nothing is highlighted.
fn make_snippet(text: &str) -> String {
    let center = text.find("**").unwrap_or(0);
    let mut start = center.saturating_sub(SNIPPET_CONTEXT);
    let mut end = (center + SNIPPET_CONTEXT).min(text.len());
    while start > 0 && !text.is_char_boundary(start) {
        start -= 1;
    }
    while end < text.len() && !text.is_char_boundary(end) {
        end += 1;
    }

    let mut snippet = String::new();
    if start > 0 {
        snippet.push('…');
    }
    snippet.push_str(text[start..end].trim());
    if end < text.len() {
        snippet.push('…');
    }
    snippet
}
