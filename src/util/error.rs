// LogLens - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// No string-based error propagation. All errors preserve the causal
// chain for diagnostic logging, and every user-visible message names
// the operation and the responsible item where known.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level error type for all LogLens operations.
/// Errors are categorised by the kind of failure, not the subsystem,
/// so callers can branch on retryability.
#[derive(Debug)]
pub enum LogLensError {
    /// Configuration is invalid: malformed YAML, bad weights, unknown
    /// provider. Surfaced to the caller; never retried.
    Config(ConfigError),

    /// An operation was attempted against an unconfigured or closed
    /// component.
    Lifecycle(LifecycleError),

    /// A lookup by identity failed.
    Lookup(LookupError),

    /// A computation could not be performed: regex failed to compile,
    /// vectorizer used before fitting, dimension mismatch.
    Computation(ComputationError),

    /// A resource bound was hit: timeout, buffer full.
    Resource(ResourceError),

    /// Pattern catalog loading or validation failed.
    Pattern(PatternError),

    /// The operation was cancelled via the caller-supplied flag.
    /// Propagated unchanged through all layers.
    Cancelled,

    /// I/O error with path context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl fmt::Display for LogLensError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Lifecycle(e) => write!(f, "Lifecycle error: {e}"),
            Self::Lookup(e) => write!(f, "Lookup error: {e}"),
            Self::Computation(e) => write!(f, "Computation error: {e}"),
            Self::Resource(e) => write!(f, "Resource error: {e}"),
            Self::Pattern(e) => write!(f, "Pattern error: {e}"),
            Self::Cancelled => write!(f, "Operation cancelled"),
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for LogLensError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Lifecycle(e) => Some(e),
            Self::Lookup(e) => Some(e),
            Self::Computation(e) => Some(e),
            Self::Resource(e) => Some(e),
            Self::Pattern(e) => Some(e),
            Self::Cancelled => None,
            Self::Io { source, .. } => Some(source),
        }
    }
}

impl LogLensError {
    /// Returns true when this error is the cancellation marker.
    /// Callers use this to distinguish user-driven aborts from failures.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading and validation.
#[derive(Debug)]
pub enum ConfigError {
    /// YAML file could not be parsed.
    YamlParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// Hybrid search weights do not sum to 1.0 within tolerance.
    InvalidWeights {
        keyword_weight: f64,
        vector_weight: f64,
        tolerance: f64,
    },

    /// A weight is negative.
    NegativeWeight { field: &'static str, value: f64 },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// An environment variable override has the wrong type.
    InvalidEnvValue {
        variable: String,
        value: String,
        expected: &'static str,
    },

    /// The configured AI provider is not recognised.
    UnknownProvider { provider: String },

    /// I/O error reading the config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::YamlParse { path, source } => {
                write!(f, "Failed to parse YAML '{}': {source}", path.display())
            }
            Self::InvalidWeights {
                keyword_weight,
                vector_weight,
                tolerance,
            } => write!(
                f,
                "keyword_weight ({keyword_weight}) + vector_weight ({vector_weight}) \
                 must sum to 1.0 within {tolerance}"
            ),
            Self::NegativeWeight { field, value } => {
                write!(f, "'{field}' must be non-negative, got {value}")
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::InvalidEnvValue {
                variable,
                value,
                expected,
            } => write!(
                f,
                "Environment variable {variable}='{value}' is not a valid {expected}"
            ),
            Self::UnknownProvider { provider } => {
                write!(f, "Unknown AI provider '{provider}'")
            }
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::YamlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for LogLensError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Lifecycle errors
// ---------------------------------------------------------------------------

/// Errors from operations against components in the wrong state.
#[derive(Debug)]
pub enum LifecycleError {
    /// The store has been closed; no further operations are accepted.
    StoreClosed { store: &'static str },

    /// The correlator is missing a prerequisite for the operation.
    NotConfigured {
        operation: &'static str,
        missing: &'static str,
    },

    /// IndexDocuments was invoked after the vectorizer was already fit.
    AlreadyIndexed,
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StoreClosed { store } => {
                write!(f, "{store} is closed; no further operations are accepted")
            }
            Self::NotConfigured { operation, missing } => {
                write!(f, "Cannot {operation}: {missing} has not been configured")
            }
            Self::AlreadyIndexed => {
                write!(f, "Documents are already indexed; the vectorizer may only be fit once")
            }
        }
    }
}

impl std::error::Error for LifecycleError {}

impl From<LifecycleError> for LogLensError {
    fn from(e: LifecycleError) -> Self {
        Self::Lifecycle(e)
    }
}

// ---------------------------------------------------------------------------
// Lookup errors
// ---------------------------------------------------------------------------

/// Errors from by-identity lookups. Where the caller asked for a specific
/// item these are surfaced; during iteration missing items are skipped.
#[derive(Debug)]
pub enum LookupError {
    /// No document with the given id exists in the store.
    DocumentNotFound { id: String },

    /// A term is not present in the fitted vocabulary.
    TermNotInVocabulary { term: String },
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DocumentNotFound { id } => write!(f, "Document '{id}' not found"),
            Self::TermNotInVocabulary { term } => {
                write!(f, "Term '{term}' is not in the fitted vocabulary")
            }
        }
    }
}

impl std::error::Error for LookupError {}

impl From<LookupError> for LogLensError {
    fn from(e: LookupError) -> Self {
        Self::Lookup(e)
    }
}

// ---------------------------------------------------------------------------
// Computation errors
// ---------------------------------------------------------------------------

/// Errors from failed computations. Per-item failures inside bulk
/// operations are logged and skipped; these variants surface only when
/// the caller operated on a single item.
#[derive(Debug)]
pub enum ComputationError {
    /// The vectorizer was asked to transform before `fit` was called.
    VectorizerNotFitted,

    /// A vector's dimension does not match the store's configured one.
    DimensionMismatch { expected: usize, actual: usize },

    /// Input text produced an all-zero vector (no vocabulary overlap).
    EmptyVector { id: String },
}

impl fmt::Display for ComputationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VectorizerNotFitted => {
                write!(f, "Vectorizer must be fit on a corpus before transform")
            }
            Self::DimensionMismatch { expected, actual } => {
                write!(f, "Vector dimension {actual} does not match expected {expected}")
            }
            Self::EmptyVector { id } => {
                write!(f, "'{id}' produced an empty vector (no vocabulary overlap)")
            }
        }
    }
}

impl std::error::Error for ComputationError {}

impl From<ComputationError> for LogLensError {
    fn from(e: ComputationError) -> Self {
        Self::Computation(e)
    }
}

// ---------------------------------------------------------------------------
// Resource errors
// ---------------------------------------------------------------------------

/// Errors from exhausted resource bounds.
#[derive(Debug)]
pub enum ResourceError {
    /// An operation exceeded its configured deadline. All locks held by
    /// the operation are released before this is returned.
    Timeout {
        operation: &'static str,
        limit: Duration,
    },

    /// The analysis entry cap was reached.
    TooManyEntries { count: usize, max: usize },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { operation, limit } => {
                write!(f, "{operation} exceeded deadline of {limit:?}")
            }
            Self::TooManyEntries { count, max } => write!(
                f,
                "Analysis of {count} entries exceeds maximum of {max}. \
                 Raise analysis.max_entries or narrow the input."
            ),
        }
    }
}

impl std::error::Error for ResourceError {}

impl From<ResourceError> for LogLensError {
    fn from(e: ResourceError) -> Self {
        Self::Resource(e)
    }
}

// ---------------------------------------------------------------------------
// Pattern errors
// ---------------------------------------------------------------------------

/// Errors related to pattern catalog loading and compilation.
/// One bad pattern never prevents loading the others; these variants
/// are collected per-pattern and reported alongside the good ones.
#[derive(Debug)]
pub enum PatternError {
    /// YAML file could not be parsed.
    YamlParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// A pattern has neither a regex nor any keywords.
    EmptyPattern { pattern_id: String },

    /// A pattern's regex is invalid.
    InvalidRegex {
        pattern_id: String,
        pattern: String,
        source: regex::Error,
    },

    /// A pattern's type string is not one of the recognised classes.
    InvalidType { pattern_id: String, value: String },

    /// I/O error reading a pattern file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::YamlParse { path, source } => {
                write!(f, "Failed to parse pattern file '{}': {source}", path.display())
            }
            Self::EmptyPattern { pattern_id } => {
                write!(
                    f,
                    "Pattern '{pattern_id}': at least one of regex or keywords is required"
                )
            }
            Self::InvalidRegex {
                pattern_id,
                pattern,
                source,
            } => write!(
                f,
                "Pattern '{pattern_id}': invalid regex '{pattern}': {source}"
            ),
            Self::InvalidType { pattern_id, value } => write!(
                f,
                "Pattern '{pattern_id}': unknown type '{value}' \
                 (expected error, anomaly, performance, or security)"
            ),
            Self::Io { path, source } => {
                write!(
                    f,
                    "I/O error reading pattern file '{}': {source}",
                    path.display()
                )
            }
        }
    }
}

impl std::error::Error for PatternError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::YamlParse { source, .. } => Some(source),
            Self::InvalidRegex { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<PatternError> for LogLensError {
    fn from(e: PatternError) -> Self {
        Self::Pattern(e)
    }
}

/// Convenience type alias for LogLens results.
pub type Result<T> = std::result::Result<T, LogLensError>;
