// LogLens - correlate/mod.rs
//
// Document correlation layer: keyword extraction, the hybrid
// keyword+vector correlator, and direct-error correlation. The result
// types here are the user-visible output of the correlation pipeline.

pub mod correlator;
pub mod direct;
pub mod keywords;

use crate::core::model::Pattern;
use crate::docstore::document::Document;
use std::sync::Arc;

/// How a document match was found, recorded by the fused ranker so
/// provenance survives into the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMethod {
    Keyword,
    Vector,
    Hybrid,
}

impl SearchMethod {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Keyword => "keyword",
            Self::Vector => "vector",
            Self::Hybrid => "hybrid",
        }
    }
}

/// One document correlated to a pattern or error, with sub-scores from
/// both retrieval paths.
#[derive(Debug, Clone)]
pub struct DocumentMatch {
    pub document: Arc<Document>,

    /// Fused score: keyword_weight * keyword_score + vector_weight *
    /// vector_score.
    pub score: f64,

    /// Best per-keyword TF-IDF score for this document.
    pub keyword_score: f64,

    /// Cosine similarity from the vector pass (0 when not found there).
    pub vector_score: f64,

    /// Which extracted keywords hit this document.
    pub matched_keywords: Vec<String>,

    /// Highlighted excerpt around the first keyword hit.
    pub snippet: String,

    /// Which retrieval path(s) produced this match.
    pub method: SearchMethod,
}

/// All document matches for one pattern.
#[derive(Debug, Clone)]
pub struct PatternCorrelation {
    pub pattern: Pattern,

    /// Keywords extracted from the pattern and its matching entries.
    pub keywords: Vec<String>,

    /// Ranked document matches.
    pub matches: Vec<DocumentMatch>,

    pub match_count: usize,
}

/// A correlation produced by the direct-error path: a well-known error
/// class detected in a raw error-level entry.
#[derive(Debug, Clone)]
pub struct ErrorCorrelation {
    /// Detected error class or exception type name.
    pub error_type: String,

    /// The offending message (first occurrence).
    pub message: String,

    /// How many entries carried this error type.
    pub occurrences: usize,

    /// Keywords extracted from the offending message.
    pub keywords: Vec<String>,

    /// Ranked document matches.
    pub matches: Vec<DocumentMatch>,

    pub match_count: usize,

    /// Confidence in (0, 1]: higher for messages with more distinctive
    /// tokens, lower for generic ones.
    pub confidence: f64,
}

/// Complete output of one correlation pass.
#[derive(Debug, Clone, Default)]
pub struct CorrelationResult {
    /// Patterns present in the analysis.
    pub total_patterns: usize,

    /// Patterns that produced at least one document match.
    pub correlated_patterns: usize,

    pub correlations: Vec<PatternCorrelation>,

    /// Direct-error correlations from raw error-level entries.
    pub error_correlations: Vec<ErrorCorrelation>,
}
