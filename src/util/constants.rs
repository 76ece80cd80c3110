// LogLens - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.
// Every bound on a growing collection or long-running operation is
// defined here by name, never inline.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "LogLens";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prefix for environment variables that override config-file values,
/// e.g. `LOGLENS_AI_PROVIDER` overrides `ai.provider`.
pub const ENV_PREFIX: &str = "LOGLENS_";

// =============================================================================
// Analysis limits
// =============================================================================

/// Default maximum number of log entries accepted by a single analysis.
pub const DEFAULT_MAX_ENTRIES: usize = 100_000;

/// Default number of equal-width timeline buckets between the earliest
/// and latest observed timestamps.
pub const DEFAULT_TIMELINE_BUCKETS: usize = 12;

/// Hard upper bound on configurable timeline buckets.
pub const MAX_TIMELINE_BUCKETS: usize = 1_000;

/// How many entries are processed between checks of the cancellation flag.
/// Cancellation latency is bounded by this many entries' worth of work.
pub const DEFAULT_CANCEL_CHECK_PERIOD: usize = 100;

/// Default maximum length of a single log line accepted by the parsers.
/// Longer lines are truncated with a marker suffix.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024; // 64 KB

/// Default parser read-buffer size in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024; // 64 KB

/// Suffix appended to truncated log lines.
pub const TRUNCATION_MARKER: &str = "... [truncated]";

/// Number of sample entries included per pattern in rendered reports.
pub const MAX_SAMPLE_ENTRIES: usize = 3;

/// Minimum matched-entry count before the error-trend insight fires.
pub const ERROR_TREND_THRESHOLD: usize = 5;

/// Minimum performance-pattern hit count before the slow-response
/// insight fires.
pub const PERFORMANCE_THRESHOLD: usize = 3;

/// Minimum security-pattern hit count before the security insight fires.
pub const SECURITY_THRESHOLD: usize = 1;

/// Fraction of total entries that must be errors before the high
/// error-rate insight fires.
pub const ERROR_RATE_THRESHOLD: f64 = 0.10;

// =============================================================================
// Timeouts
// =============================================================================

/// Default deadline for a single vector-store operation (seconds).
pub const DEFAULT_VECTOR_TIMEOUT_SECS: u64 = 30;

/// Default deadline for a full correlation pass (seconds).
pub const DEFAULT_CORRELATION_TIMEOUT_SECS: u64 = 60;

/// Default deadline for indexing the document corpus (seconds).
pub const DEFAULT_INDEXING_TIMEOUT_SECS: u64 = 120;

/// Default timeout for AI provider requests (seconds). The AI pass is
/// strictly optional; this bound only applies when it is enabled.
pub const DEFAULT_AI_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Tokenizer limits
// =============================================================================

/// Tokens with length at or below this are discarded.
pub const MIN_TOKEN_LENGTH: usize = 2;

/// Minimum length for a quoted substring to survive keyword extraction.
pub const MIN_QUOTED_KEYWORD_LENGTH: usize = 3;

/// Maximum number of keywords extracted per pattern or entry.
pub const MAX_KEYWORDS_PER_SOURCE: usize = 32;

/// Hex runs at or above this length are treated as identifier noise.
pub const MIN_NOISE_HEX_LENGTH: usize = 8;

// =============================================================================
// Inverted index limits
// =============================================================================

/// Default per-keyword result limit used by the correlator's keyword pass.
pub const KEYWORD_SEARCH_LIMIT: usize = 10;

/// Maximum Levenshtein distance for fuzzy term matching.
pub const FUZZY_MAX_DISTANCE: usize = 2;

/// Minimum query-term length before fuzzy matching is attempted.
/// Very short terms produce too many spurious neighbours.
pub const FUZZY_MIN_TERM_LENGTH: usize = 4;

// =============================================================================
// Vectorizer / vector store limits
// =============================================================================

/// Default dense vector dimension (vocabulary size kept by the fitter).
pub const DEFAULT_VECTOR_DIMENSION: usize = 384;

/// Default maximum entry count held by the in-memory vector store.
/// Oldest entries are evicted when the bound is reached.
pub const DEFAULT_MAX_VECTOR_ENTRIES: usize = 10_000;

/// Default capacity of the vector store's LRU query cache.
pub const DEFAULT_QUERY_CACHE_CAPACITY: usize = 64;

/// Quantization scale applied to query vector components when building
/// cache fingerprints. Components are rounded to 1/QUERY_QUANT_SCALE so
/// that float noise does not defeat cache hits.
pub const QUERY_QUANT_SCALE: f32 = 1_000.0;

// =============================================================================
// Correlation defaults
// =============================================================================

/// Default keyword-score weight in the hybrid ranker.
pub const DEFAULT_KEYWORD_WEIGHT: f64 = 0.6;

/// Default vector-score weight in the hybrid ranker.
pub const DEFAULT_VECTOR_WEIGHT: f64 = 0.4;

/// Allowed deviation of keyword_weight + vector_weight from 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.1;

/// Default per-pattern cap on returned document matches.
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Default neighbour count requested from the vector store.
pub const DEFAULT_VECTOR_TOP_K: usize = 10;

/// Default minimum cosine score for a vector hit to survive filtering.
pub const DEFAULT_MIN_VECTOR_SCORE: f64 = 0.1;

/// Maximum sample entry messages concatenated into the vector query.
pub const MAX_VECTOR_QUERY_SAMPLES: usize = 3;

// =============================================================================
// Document corpus limits
// =============================================================================

/// Maximum size of a single corpus document in bytes.
pub const MAX_DOCUMENT_SIZE: u64 = 10 * 1024 * 1024; // 10 MB

/// Maximum directory recursion depth when scanning the corpus.
pub const MAX_SCAN_DEPTH: usize = 16;

/// File extensions recognised as corpus documents.
pub const DOCUMENT_EXTENSIONS: &[&str] = &["md", "markdown", "txt"];

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";
