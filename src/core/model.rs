// LogLens - core/model.rs
//
// Core data model types. Pure data definitions with no I/O.
// These types are the shared vocabulary across analysis, correlation,
// and output layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =============================================================================
// Log Entry (normalised output of parsing)
// =============================================================================

/// A single parsed log event, normalised across all source formats.
///
/// This is the unit that flows through pattern matching, timeline
/// bucketing, and the direct-error correlation path. Immutable after
/// parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Parsed timestamp in UTC.
    pub timestamp: DateTime<Utc>,

    /// Normalised level.
    pub level: LogLevel,

    /// Full message text.
    pub message: String,

    /// Source location string (file path, service name, or host).
    pub source: String,

    /// Structured fields extracted from the line (JSON / logfmt formats).
    /// `None` for plain-text lines.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<HashMap<String, serde_json::Value>>,

    /// Line number in the source where this entry begins.
    pub line_number: u64,
}

// =============================================================================
// Log level
// =============================================================================

/// Normalised log levels, ordered from least to most severe.
///
/// All format-specific level strings (ERROR, ERR, error, WARNING, CRIT,
/// etc.) are mapped to one of these variants during parsing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    /// Parse a raw level string, accepting the common aliases.
    /// Returns `None` for unrecognised strings.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "DEBUG" | "DBG" | "TRACE" | "TRC" | "VERBOSE" => Some(Self::Debug),
            "INFO" | "INFORMATION" | "NOTICE" => Some(Self::Info),
            "WARN" | "WARNING" => Some(Self::Warn),
            "ERROR" | "ERR" | "SEVERE" => Some(Self::Error),
            "FATAL" | "CRITICAL" | "CRIT" | "PANIC" | "EMERGENCY" => Some(Self::Fatal),
            _ => None,
        }
    }

    /// Human-readable label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Debug => "Debug",
            Self::Info => "Info",
            Self::Warn => "Warn",
            Self::Error => "Error",
            Self::Fatal => "Fatal",
        }
    }

    /// Returns true for Error and Fatal entries.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error | Self::Fatal)
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Pattern
// =============================================================================

/// Classification of the operational problem a pattern identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternType {
    Error,
    Anomaly,
    Performance,
    Security,
}

impl PatternType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Anomaly => "anomaly",
            Self::Performance => "performance",
            Self::Security => "security",
        }
    }
}

/// A named rule identifying a class of log lines.
///
/// Invariant (enforced at compile time by `pattern::compile`): at least
/// one of `regex` and `keywords` is non-empty. When both are present
/// they are OR-combined at match time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    /// Unique pattern identifier (e.g. "db-connection-failure").
    pub id: String,

    /// Human-readable name.
    pub name: String,

    /// Problem classification.
    #[serde(rename = "type")]
    pub pattern_type: PatternType,

    /// Severity assigned to matches of this pattern.
    pub severity: LogLevel,

    /// Optional regex, compiled lazily and case-insensitively.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,

    /// Optional keyword list, matched as case-insensitive substrings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    /// What this pattern means and what to do about it.
    #[serde(default)]
    pub description: String,

    /// Free-form tags for grouping.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

// =============================================================================
// Pattern match
// =============================================================================

/// All entries that matched one pattern during an analysis.
#[derive(Debug, Clone, Serialize)]
pub struct PatternMatch {
    /// The pattern that matched.
    pub pattern: Pattern,

    /// Matching entries in input order.
    pub entries: Vec<LogEntry>,

    /// Aggregate match count (equals `entries.len()`).
    pub count: usize,

    /// Earliest matching entry timestamp.
    pub first_seen: DateTime<Utc>,

    /// Latest matching entry timestamp.
    pub last_seen: DateTime<Utc>,
}

// =============================================================================
// Insight
// =============================================================================

/// Classification of a synthesized observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InsightType {
    Performance,
    Security,
    ErrorTrend,
    Anomaly,
}

/// A synthesized observation over tallies and pattern hits.
#[derive(Debug, Clone, Serialize)]
pub struct Insight {
    /// Observation classification.
    #[serde(rename = "type")]
    pub insight_type: InsightType,

    /// Severity assigned to this observation.
    pub severity: LogLevel,

    /// Short headline.
    pub title: String,

    /// What was observed and why it matters.
    pub description: String,

    /// Confidence in [0, 1]. Deterministic for identical inputs.
    pub confidence: f64,

    /// Entries supporting the observation (capped for report size).
    pub evidence: Vec<LogEntry>,

    /// Total supporting entry count (may exceed `evidence.len()`).
    pub evidence_count: usize,
}

// =============================================================================
// Timeline
// =============================================================================

/// One bucket of the analysis timeline.
#[derive(Debug, Clone, Serialize)]
pub struct TimeBucket {
    /// Bucket start (inclusive).
    pub start: DateTime<Utc>,

    /// Bucket end (exclusive, except the final bucket which is inclusive).
    pub end: DateTime<Utc>,

    /// Entries whose timestamps fall in this bucket.
    pub entry_count: usize,

    /// Error and Fatal entries in this bucket.
    pub error_count: usize,

    /// Warn entries in this bucket.
    pub warn_count: usize,
}

/// Entry activity partitioned into contiguous equal-width buckets
/// between the earliest and latest observed timestamps.
#[derive(Debug, Clone, Serialize)]
pub struct Timeline {
    /// Width of each bucket.
    #[serde(serialize_with = "serialize_duration_secs")]
    pub bucket_size: chrono::Duration,

    /// Ordered buckets covering [earliest, latest].
    pub buckets: Vec<TimeBucket>,
}

fn serialize_duration_secs<S: serde::Serializer>(
    d: &chrono::Duration,
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.num_milliseconds() as f64 / 1_000.0)
}

// =============================================================================
// Analysis
// =============================================================================

/// Complete result of one analysis run.
///
/// Retains the raw entries so the correlator's direct-error path can
/// scan error-level lines that matched no pattern.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    /// Total entries analysed.
    pub total_entries: usize,

    /// Error + Fatal entry count.
    pub error_count: usize,

    /// Warn entry count.
    pub warn_count: usize,

    /// Earliest observed timestamp. `None` when no entries were analysed.
    pub start_time: Option<DateTime<Utc>>,

    /// Latest observed timestamp. `None` when no entries were analysed.
    pub end_time: Option<DateTime<Utc>>,

    /// Per-pattern match groups, in catalog order.
    pub patterns: Vec<PatternMatch>,

    /// Synthesized observations.
    pub insights: Vec<Insight>,

    /// Bucketed entry activity. `None` when no entries were analysed.
    pub timeline: Option<Timeline>,

    /// The analysed entries, retained for direct-error correlation.
    #[serde(skip)]
    pub entries: Vec<LogEntry>,
}
