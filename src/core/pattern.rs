// LogLens - core/pattern.rs
//
// Pattern catalog loading, validation, and compilation.
// Core layer: accepts YAML strings, never touches the filesystem
// directly (file reading is a thin wrapper at the bottom).
//
// One bad pattern never prevents loading the others: compilation errors
// are collected per-pattern and reported alongside the good ones.

use crate::core::model::{LogEntry, LogLevel, Pattern, PatternType};
use crate::util::error::PatternError;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// =============================================================================
// YAML deserialization structure (raw input)
// =============================================================================

/// Raw pattern definition as deserialized from a catalog file.
/// Validated and compiled into a `CompiledPattern` for runtime use.
#[derive(Debug, Deserialize)]
pub struct PatternDefinition {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(rename = "type")]
    pub pattern_type: String,

    /// Numeric (0-4) or named level. Defaults to the pattern type's
    /// natural severity when absent.
    #[serde(default)]
    pub severity: Option<serde_yaml::Value>,

    #[serde(default)]
    pub regex: Option<String>,

    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub tags: Vec<String>,
}

// =============================================================================
// Compiled pattern
// =============================================================================

/// A validated pattern with its regex precompiled (case-insensitive)
/// and its keywords lowercased for substring matching.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub pattern: Pattern,
    regex: Option<Regex>,
    keywords_lower: Vec<String>,
}

impl CompiledPattern {
    /// Test an entry's message against this pattern. The regex and the
    /// keyword list are OR-combined: either match counts as a hit.
    pub fn matches(&self, entry: &LogEntry) -> bool {
        if let Some(regex) = &self.regex {
            if regex.is_match(&entry.message) {
                return true;
            }
        }
        if !self.keywords_lower.is_empty() {
            let message_lower = entry.message.to_lowercase();
            if self
                .keywords_lower
                .iter()
                .any(|k| message_lower.contains(k))
            {
                return true;
            }
        }
        false
    }
}

/// Validate and compile a runtime `Pattern`.
///
/// Validates that at least one of regex and keywords is present and
/// that the regex compiles (case-insensitively).
pub fn compile(pattern: Pattern) -> Result<CompiledPattern, PatternError> {
    let has_regex = pattern.regex.as_deref().is_some_and(|r| !r.is_empty());
    let has_keywords = pattern.keywords.iter().any(|k| !k.trim().is_empty());
    if !has_regex && !has_keywords {
        return Err(PatternError::EmptyPattern {
            pattern_id: pattern.id.clone(),
        });
    }

    let regex = match pattern.regex.as_deref().filter(|r| !r.is_empty()) {
        Some(raw) => Some(
            RegexBuilder::new(raw)
                .case_insensitive(true)
                .build()
                .map_err(|e| PatternError::InvalidRegex {
                    pattern_id: pattern.id.clone(),
                    pattern: raw.to_string(),
                    source: e,
                })?,
        ),
        None => None,
    };

    let keywords_lower = pattern
        .keywords
        .iter()
        .filter(|k| !k.trim().is_empty())
        .map(|k| k.to_lowercase())
        .collect();

    Ok(CompiledPattern {
        pattern,
        regex,
        keywords_lower,
    })
}

// =============================================================================
// Definition validation
// =============================================================================

/// Validate a raw definition into a runtime `Pattern`.
pub fn validate_definition(def: PatternDefinition) -> Result<Pattern, PatternError> {
    let pattern_type = match def.pattern_type.to_lowercase().as_str() {
        "error" => PatternType::Error,
        "anomaly" => PatternType::Anomaly,
        "performance" => PatternType::Performance,
        "security" => PatternType::Security,
        other => {
            return Err(PatternError::InvalidType {
                pattern_id: def.id,
                value: other.to_string(),
            })
        }
    };

    let severity = match def.severity {
        None => default_severity(pattern_type),
        Some(value) => parse_severity(&value).unwrap_or_else(|| {
            tracing::warn!(
                pattern_id = %def.id,
                "Unrecognised severity; using the pattern type's default"
            );
            default_severity(pattern_type)
        }),
    };

    let name = if def.name.is_empty() {
        def.id.clone()
    } else {
        def.name
    };

    Ok(Pattern {
        id: def.id,
        name,
        pattern_type,
        severity,
        regex: def.regex,
        keywords: def.keywords,
        description: def.description,
        tags: def.tags,
    })
}

/// Severity from a YAML value: named level string or numeric 0-4
/// (debug through fatal; values above 4 clamp to fatal).
fn parse_severity(value: &serde_yaml::Value) -> Option<LogLevel> {
    match value {
        serde_yaml::Value::String(s) => LogLevel::parse(s),
        serde_yaml::Value::Number(n) => {
            let n = n.as_u64()?;
            Some(match n {
                0 => LogLevel::Debug,
                1 => LogLevel::Info,
                2 => LogLevel::Warn,
                3 => LogLevel::Error,
                _ => LogLevel::Fatal,
            })
        }
        _ => None,
    }
}

fn default_severity(pattern_type: PatternType) -> LogLevel {
    match pattern_type {
        PatternType::Error => LogLevel::Error,
        PatternType::Anomaly => LogLevel::Warn,
        PatternType::Performance => LogLevel::Warn,
        PatternType::Security => LogLevel::Error,
    }
}

// =============================================================================
// Catalog loading
// =============================================================================

/// Result of loading one or more catalog sources.
#[derive(Debug, Default)]
pub struct CatalogLoadResult {
    /// Compiled patterns in load order (later sources win id conflicts).
    pub patterns: Vec<CompiledPattern>,

    /// Per-pattern failures, reported but non-fatal.
    pub errors: Vec<PatternError>,
}

/// Parse one YAML catalog: a top-level list of pattern objects.
pub fn parse_catalog_yaml(
    yaml: &str,
    source_path: &Path,
) -> Result<Vec<PatternDefinition>, PatternError> {
    serde_yaml::from_str(yaml).map_err(|e| PatternError::YamlParse {
        path: source_path.to_path_buf(),
        source: e,
    })
}

/// Load and merge multiple catalog sources, each a (path, content)
/// pair. Patterns are merged by id: a duplicate id replaces the earlier
/// pattern with a warning. Per-pattern failures are collected, not
/// fatal; a file-level parse failure skips that file only.
pub fn load_catalog(sources: &[(PathBuf, String)]) -> CatalogLoadResult {
    let mut result = CatalogLoadResult::default();
    let mut by_id: HashMap<String, usize> = HashMap::new();

    for (path, content) in sources {
        let definitions = match parse_catalog_yaml(content, path) {
            Ok(defs) => defs,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping pattern file");
                result.errors.push(e);
                continue;
            }
        };

        for def in definitions {
            let compiled = match validate_definition(def).and_then(compile) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping invalid pattern");
                    result.errors.push(e);
                    continue;
                }
            };

            match by_id.get(&compiled.pattern.id) {
                Some(&existing) => {
                    tracing::warn!(
                        id = %compiled.pattern.id,
                        path = %path.display(),
                        "Duplicate pattern id; last definition wins"
                    );
                    result.patterns[existing] = compiled;
                }
                None => {
                    by_id.insert(compiled.pattern.id.clone(), result.patterns.len());
                    result.patterns.push(compiled);
                }
            }
        }
    }

    result
}

/// Read catalog files from disk and load them. Unreadable files are
/// collected as errors and skipped.
pub fn load_catalog_files(paths: &[PathBuf]) -> CatalogLoadResult {
    let mut sources = Vec::new();
    let mut io_errors = Vec::new();
    for path in paths {
        match std::fs::read_to_string(path) {
            Ok(content) => sources.push((path.clone(), content)),
            Err(e) => io_errors.push(PatternError::Io {
                path: path.clone(),
                source: e,
            }),
        }
    }
    let mut result = load_catalog(&sources);
    result.errors.extend(io_errors);
    result
}

// =============================================================================
// Built-in catalog
// =============================================================================

/// Default pattern catalog covering the common operational problem
/// classes. Enabled via `patterns.enable_defaults`.
const BUILTIN_CATALOG: &str = r#"
- id: db-connection-failure
  name: Database connection failure
  type: error
  severity: error
  regex: "(connection|connect).*(refused|reset|timeout|timed out|failed)"
  keywords:
    - connection refused
    - connection reset
    - connection timeout
  description: Database or downstream connections failing or timing out
  tags: [database, network]

- id: out-of-memory
  name: Out of memory
  type: error
  severity: fatal
  regex: "out of memory|OutOfMemoryError|oom[- ]?kill"
  keywords:
    - out of memory
  description: Process or container exhausted available memory
  tags: [memory, resource]

- id: slow-response
  name: Slow response times
  type: performance
  severity: warn
  regex: "(slow|latency|took \\d+\\s*(ms|s)).*"
  keywords:
    - slow query
    - high latency
    - timeout
  description: Requests or queries exceeding expected latency
  tags: [performance, latency]

- id: auth-failure
  name: Authentication failure
  type: security
  severity: error
  regex: "(authentication|authorization|login).*(failed|denied|invalid)"
  keywords:
    - access denied
    - unauthorized
    - invalid credentials
  description: Failed authentication or authorization attempts
  tags: [security, auth]

- id: disk-pressure
  name: Disk space pressure
  type: anomaly
  severity: warn
  regex: "(disk|filesystem).*(full|no space|pressure)"
  keywords:
    - no space left on device
  description: Storage approaching or at capacity
  tags: [disk, resource]
"#;

/// Compile the built-in catalog. The catalog is maintained alongside
/// the tests that assert it compiles cleanly, so errors here indicate a
/// packaging mistake rather than user input.
pub fn builtin_patterns() -> Vec<CompiledPattern> {
    let result = load_catalog(&[(PathBuf::from("<builtin>"), BUILTIN_CATALOG.to_string())]);
    for error in &result.errors {
        tracing::error!(error = %error, "Built-in pattern failed to compile");
    }
    result.patterns
}
