// LogLens - vector/vectorizer.rs
//
// Classical TF-IDF vectorization: fit a vocabulary from a training
// corpus, then transform strings into dense float vectors. No learned
// embeddings anywhere; this is bag-of-terms weighting.
//
// Lifecycle is strictly two-phase: `fit` exactly once, then any number
// of `transform` calls. Transforming before fitting is a computation
// error. Refitting after a corpus change is the caller's decision; the
// correlator fits exactly once during document indexing.

use crate::docstore::tokenize::tokenize;
use crate::util::constants::DEFAULT_VECTOR_DIMENSION;
use crate::util::error::{ComputationError, Result};
use std::collections::HashMap;

/// Fitted TF-IDF vocabulary and transformer.
#[derive(Debug)]
pub struct TfIdfVectorizer {
    /// Output vector length; also the maximum vocabulary size.
    dimension: usize,

    /// L2-normalize transformed vectors.
    normalize: bool,

    /// Term -> vector slot, chosen at fit time.
    vocabulary: HashMap<String, usize>,

    /// Per-slot IDF weights (smoothed: ln(n/df) + 1).
    idf: Vec<f64>,

    fitted: bool,
}

impl TfIdfVectorizer {
    pub fn new(dimension: usize, normalize: bool) -> Self {
        Self {
            dimension: dimension.max(1),
            normalize,
            vocabulary: HashMap::new(),
            idf: Vec::new(),
            fitted: false,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_VECTOR_DIMENSION, true)
    }

    /// True once `fit` has completed.
    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    /// Vocabulary size actually in use (≤ dimension).
    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Learn the vocabulary from a corpus.
    ///
    /// The `dimension` most frequent terms (by total occurrence count,
    /// ties broken alphabetically for determinism) become the vector
    /// slots; each slot's IDF is ln(n / df) + 1 over the corpus.
    pub fn fit(&mut self, corpus: &[String]) {
        let mut total_freq: HashMap<String, usize> = HashMap::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for text in corpus {
            let tokens = tokenize(text);
            let mut seen: std::collections::HashSet<&str> = std::collections::HashSet::new();
            for token in &tokens {
                *total_freq.entry(token.clone()).or_insert(0) += 1;
                seen.insert(token.as_str());
            }
            for term in seen {
                *doc_freq.entry(term.to_string()).or_insert(0) += 1;
            }
        }

        let mut ranked: Vec<(String, usize)> = total_freq.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(self.dimension);

        let n = corpus.len().max(1) as f64;
        self.vocabulary = HashMap::with_capacity(ranked.len());
        self.idf = vec![0.0; self.dimension];
        for (slot, (term, _)) in ranked.into_iter().enumerate() {
            let df = doc_freq.get(&term).copied().unwrap_or(1).max(1) as f64;
            self.idf[slot] = (n / df).ln() + 1.0;
            self.vocabulary.insert(term, slot);
        }
        self.fitted = true;

        tracing::debug!(
            corpus = corpus.len(),
            vocabulary = self.vocabulary.len(),
            dimension = self.dimension,
            "Vectorizer fitted"
        );
    }

    /// Transform text into a dense vector of length `dimension`:
    /// component i is tf_i * idf_i where tf_i is the term's frequency in
    /// the input normalised by the input's token count.
    pub fn transform(&self, text: &str) -> Result<Vec<f32>> {
        if !self.fitted {
            return Err(ComputationError::VectorizerNotFitted.into());
        }

        let tokens = tokenize(text);
        let mut vector = vec![0.0f32; self.dimension];
        if tokens.is_empty() {
            return Ok(vector);
        }

        let total = tokens.len() as f64;
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for token in &tokens {
            *counts.entry(token.as_str()).or_insert(0) += 1;
        }
        for (term, count) in counts {
            if let Some(&slot) = self.vocabulary.get(term) {
                vector[slot] = (count as f64 / total * self.idf[slot]) as f32;
            }
        }

        if self.normalize {
            l2_normalize(&mut vector);
        }
        Ok(vector)
    }
}

/// Scale a vector to unit length in place. Zero vectors are untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let magnitude = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for v in vector.iter_mut() {
            *v /= magnitude;
        }
    }
}
