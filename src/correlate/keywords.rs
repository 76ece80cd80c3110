// LogLens - correlate/keywords.rs
//
// Keyword extraction: turns patterns and log entries into filtered,
// deduplicated query-term bags for the document search layer.
//
// The extractor is deliberately more permissive than the corpus
// tokenizer: identifiers, quoted strings, and exception names carry the
// search signal in log messages, so they are preserved before generic
// word splitting can destroy them. Machine noise (UUID fragments, hex
// runs, timestamp-shaped tokens) is dropped.

use crate::core::model::{LogEntry, Pattern};
use crate::docstore::tokenize::is_stop_word;
use crate::util::constants::{
    MAX_KEYWORDS_PER_SOURCE, MIN_NOISE_HEX_LENGTH, MIN_QUOTED_KEYWORD_LENGTH,
};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Domain terms exempted from stop-word filtering so they always reach
/// the search layer, even the ones short or common enough to be
/// filtered otherwise.
const DOMAIN_ALLOW_LIST: &[&str] = &[
    "term",
    "terms",
    "exception",
    "error",
    "errors",
    "database",
    "connection",
    "timeout",
    "auth",
    "failed",
    "failure",
    "denied",
    "refused",
];

fn allow_list() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| DOMAIN_ALLOW_LIST.iter().copied().collect())
}

// =============================================================================
// Collector (case-insensitive dedup, original casing preserved)
// =============================================================================

struct KeywordCollector {
    keywords: Vec<String>,
    seen: HashSet<String>,
}

impl KeywordCollector {
    fn new() -> Self {
        Self {
            keywords: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn push(&mut self, keyword: &str) {
        if self.keywords.len() >= MAX_KEYWORDS_PER_SOURCE {
            return;
        }
        let trimmed = keyword.trim();
        if trimmed.is_empty() {
            return;
        }
        let lower = trimmed.to_lowercase();
        if self.seen.insert(lower) {
            self.keywords.push(trimmed.to_string());
        }
    }

    /// Push subject to length, noise, and stop-word filtering.
    fn push_filtered(&mut self, keyword: &str) {
        let trimmed = keyword.trim_matches(|c: char| !c.is_alphanumeric() && c != '_');
        if trimmed.len() < MIN_QUOTED_KEYWORD_LENGTH {
            return;
        }
        if is_noise_token(trimmed) {
            return;
        }
        let lower = trimmed.to_lowercase();
        if is_stop_word(&lower) && !allow_list().contains(lower.as_str()) {
            return;
        }
        self.push(trimmed);
    }

    fn finish(self) -> Vec<String> {
        self.keywords
    }
}

// =============================================================================
// Public extraction entry points
// =============================================================================

/// Extract query keywords from a pattern: its name, description,
/// explicit keyword list, and the literal islands of its regex.
pub fn extract_from_pattern(pattern: &Pattern) -> Vec<String> {
    let mut collector = KeywordCollector::new();

    for keyword in &pattern.keywords {
        collector.push_filtered(keyword);
    }
    collect_from_text(&mut collector, &pattern.name);
    collect_from_text(&mut collector, &pattern.description);
    if let Some(regex) = &pattern.regex {
        collect_from_text(&mut collector, &strip_regex_metacharacters(regex));
    }

    collector.finish()
}

/// Extract query keywords from a log entry: its message plus any
/// stringly-typed structured field values.
pub fn extract_from_entry(entry: &LogEntry) -> Vec<String> {
    let mut collector = KeywordCollector::new();
    collect_from_text(&mut collector, &entry.message);
    if let Some(fields) = &entry.fields {
        for value in fields.values() {
            if let serde_json::Value::String(s) = value {
                collect_from_text(&mut collector, s);
            }
        }
    }
    collector.finish()
}

/// Extract query keywords from free text (the message path).
pub fn extract_from_message(message: &str) -> Vec<String> {
    let mut collector = KeywordCollector::new();
    collect_from_text(&mut collector, message);
    collector.finish()
}

// =============================================================================
// Extraction passes
// =============================================================================

fn quoted_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"["']([^"']{3,})["']"#).expect("quoted regex"))
}

fn dotted_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Dotted identifiers such as SUMMER2024.DISCOUNT_RATE. At least one
    // letter required so IP addresses and version numbers do not match.
    RE.get_or_init(|| {
        Regex::new(r"\b[A-Za-z0-9_]*[A-Za-z][A-Za-z0-9_]*(?:\.[A-Za-z0-9_]*[A-Za-z][A-Za-z0-9_]*)+\b")
            .expect("dotted id regex")
    })
}

fn key_value_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)=([^\s,;]+)").expect("key=value regex")
    })
}

fn snake_case_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b[A-Za-z0-9]+(?:_[A-Za-z0-9]+)+\b").expect("snake_case regex")
    })
}

fn camel_case_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b[A-Z][a-z0-9]+(?:[A-Z][a-z0-9]+)+\b").expect("CamelCase regex")
    })
}

/// Run all extraction passes over one piece of text.
///
/// Identifier-shaped tokens are collected first, before whitespace and
/// punctuation splitting destroys them; plain words come last.
fn collect_from_text(collector: &mut KeywordCollector, text: &str) {
    if text.is_empty() {
        return;
    }

    // Quoted substrings are preserved verbatim.
    for captures in quoted_re().captures_iter(text) {
        collector.push(&captures[1]);
    }

    // Identifier shapes, most specific first.
    for m in dotted_id_re().find_iter(text) {
        collector.push_filtered(m.as_str());
    }
    for captures in key_value_re().captures_iter(text) {
        collector.push_filtered(&captures[1]);
        collector.push_filtered(&captures[2]);
    }
    for m in snake_case_re().find_iter(text) {
        collector.push_filtered(m.as_str());
    }
    for m in camel_case_re().find_iter(text) {
        collector.push_filtered(m.as_str());
    }

    // Words containing "Exception" keep the whole name and contribute
    // their case-boundary parts, so TermNotFoundException yields
    // {TermNotFoundException, term, not, found, exception}.
    for word in text.split(|c: char| c.is_whitespace() || matches!(c, ':' | ',' | ';' | '(' | ')')) {
        let word = word.trim_matches(|c: char| !c.is_alphanumeric() && c != '_');
        if word.contains("Exception") || word.contains("exception") {
            collector.push_filtered(word);
            for part in split_case_boundaries(word) {
                let lower = part.to_lowercase();
                if lower.len() >= MIN_QUOTED_KEYWORD_LENGTH || lower == "not" {
                    collector.push(&lower);
                }
            }
        }
    }

    // Plain word pass. The whole word is noise-checked before the
    // hyphen split so UUID halves cannot slip through individually.
    for word in text.split(|c: char| !c.is_alphanumeric() && c != '_' && c != '-') {
        if is_noise_token(word) {
            continue;
        }
        for piece in word.split('-') {
            collector.push_filtered(piece);
        }
    }
}

/// Strip regex metacharacters, leaving the literal islands separated by
/// spaces, e.g. `connection.*timeout` -> `connection  timeout`.
fn strip_regex_metacharacters(pattern: &str) -> String {
    pattern
        .chars()
        .map(|c| match c {
            '(' | ')' | '[' | ']' | '{' | '}' | '*' | '+' | '?' | '^' | '$' | '|' | '\\' | '.' => {
                ' '
            }
            other => other,
        })
        .collect()
}

/// Split an identifier at case boundaries, acronym-aware:
/// `TermNotFoundException` -> [Term, Not, Found, Exception],
/// `HTTPTimeout` -> [HTTP, Timeout].
pub(crate) fn split_case_boundaries(word: &str) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    let mut parts = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let start = i;
        let c = chars[i];

        if c.is_ascii_uppercase() {
            i += 1;
            if i < chars.len() && chars[i].is_ascii_lowercase() {
                // Capitalised word: consume following lowercase.
                while i < chars.len() && chars[i].is_ascii_lowercase() {
                    i += 1;
                }
            } else {
                // Acronym: consume consecutive uppercase; when followed
                // by lowercase the last capital starts the next word.
                while i < chars.len() && chars[i].is_ascii_uppercase() {
                    i += 1;
                }
                if i < chars.len() && chars[i].is_ascii_lowercase() && i - start > 1 {
                    i -= 1;
                }
            }
            parts.push(chars[start..i].iter().collect());
        } else if c.is_ascii_lowercase() {
            while i < chars.len() && chars[i].is_ascii_lowercase() {
                i += 1;
            }
            parts.push(chars[start..i].iter().collect());
        } else if c.is_ascii_digit() {
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            parts.push(chars[start..i].iter().collect());
        } else {
            i += 1;
        }
    }

    parts
}

// =============================================================================
// Noise filtering
// =============================================================================

fn uuid_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
            .expect("uuid regex")
    })
}

/// True for tokens that are machine noise rather than search signal:
/// UUIDs and UUID fragments, long hex runs, and timestamp-shaped tokens.
pub(crate) fn is_noise_token(token: &str) -> bool {
    if token.is_empty() {
        return true;
    }

    // Full UUIDs.
    if uuid_re().is_match(token) {
        return true;
    }

    // Long hex runs (UUID fragments, hashes, addresses). Must contain a
    // digit so ordinary words spelled in a-f ("decade" is not hex
    // anyway) do not trip the filter.
    if token.len() >= MIN_NOISE_HEX_LENGTH
        && token.chars().all(|c| c.is_ascii_hexdigit())
        && token.chars().any(|c| c.is_ascii_digit())
    {
        return true;
    }

    // Timestamp-shaped: all-digit prefix with a trailing Z
    // (e.g. 20240115T103000Z after delimiter splitting leaves 103000Z).
    if token.ends_with('Z') || token.ends_with('z') {
        let prefix = &token[..token.len() - 1];
        if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_digit() || c == 'T') {
            return true;
        }
    }

    // Digit runs glued by the ISO 'T' separator (e.g. 15T10): digits on
    // both sides of a single T.
    if let Some((before, after)) = token.split_once(['T', 't']) {
        if !before.is_empty()
            && !after.is_empty()
            && before.chars().all(|c| c.is_ascii_digit())
            && after.chars().all(|c| c.is_ascii_digit())
        {
            return true;
        }
    }

    // Hour-of-day tokens t10..t23 produced by splitting ISO timestamps.
    if token.len() == 3 {
        let mut chars = token.chars();
        if matches!(chars.next(), Some('t') | Some('T')) {
            if let Ok(hour) = token[1..].parse::<u32>() {
                if (10..=23).contains(&hour) {
                    return true;
                }
            }
        }
    }

    // Pure digit runs.
    if token.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{LogLevel, PatternType};
    use chrono::Utc;

    fn pattern(name: &str, description: &str, regex: Option<&str>, keywords: &[&str]) -> Pattern {
        Pattern {
            id: "p1".to_string(),
            name: name.to_string(),
            pattern_type: PatternType::Error,
            severity: LogLevel::Error,
            regex: regex.map(|r| r.to_string()),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            description: description.to_string(),
            tags: Vec::new(),
        }
    }

    fn contains_ci(keywords: &[String], expected: &str) -> bool {
        keywords.iter().any(|k| k.eq_ignore_ascii_case(expected))
    }

    #[test]
    fn test_pattern_regex_literal_islands() {
        let p = pattern(
            "Connection timeout",
            "",
            Some(r"connection.*timeout\s+exceeded"),
            &[],
        );
        let keywords = extract_from_pattern(&p);
        assert!(contains_ci(&keywords, "connection"));
        assert!(contains_ci(&keywords, "timeout"));
        assert!(contains_ci(&keywords, "exceeded"));
        assert!(!keywords.iter().any(|k| k.contains('*')));
    }

    #[test]
    fn test_pattern_explicit_keywords_included() {
        let p = pattern("Slow queries", "database latency", None, &["deadlock"]);
        let keywords = extract_from_pattern(&p);
        assert!(contains_ci(&keywords, "deadlock"));
        assert!(contains_ci(&keywords, "database"));
        assert!(contains_ci(&keywords, "latency"));
    }

    #[test]
    fn test_exception_word_split_at_case_boundaries() {
        let keywords = extract_from_message(
            "TermNotFoundException: No terms found for promo",
        );
        assert!(contains_ci(&keywords, "TermNotFoundException"));
        assert!(contains_ci(&keywords, "term"));
        assert!(contains_ci(&keywords, "not"));
        assert!(contains_ci(&keywords, "found"));
        assert!(contains_ci(&keywords, "exception"));
    }

    #[test]
    fn test_dotted_and_key_value_identifiers_preserved() {
        let keywords = extract_from_message(
            "No terms found for promo_id=SUMMER2024. Missing term: SUMMER2024.DISCOUNT_RATE",
        );
        assert!(contains_ci(&keywords, "SUMMER2024.DISCOUNT_RATE"));
        assert!(contains_ci(&keywords, "promo_id"));
        assert!(contains_ci(&keywords, "SUMMER2024"));
    }

    #[test]
    fn test_quoted_substrings_preserved_verbatim() {
        let keywords = extract_from_message("failed to open 'data source alpha' for writing");
        assert!(keywords.contains(&"data source alpha".to_string()));
    }

    #[test]
    fn test_short_quoted_substrings_dropped() {
        let keywords = extract_from_message("flag 'on' was set");
        assert!(!keywords.contains(&"on".to_string()));
    }

    #[test]
    fn test_noise_tokens_filtered() {
        let keywords = extract_from_message(
            "request 550e8400-e29b-41d4-a716-446655440000 at 2024-01-15T10:30:00Z failed with deadbeef12",
        );
        assert!(contains_ci(&keywords, "request"));
        assert!(contains_ci(&keywords, "failed"));
        assert!(!keywords.iter().any(|k| k.contains("550e8400")));
        assert!(!keywords.iter().any(|k| k.eq_ignore_ascii_case("e29b")));
        assert!(!keywords.iter().any(|k| k.eq_ignore_ascii_case("deadbeef12")));
        assert!(!keywords.iter().any(|k| k.ends_with('Z')));
        assert!(!keywords.iter().any(|k| k.eq_ignore_ascii_case("15T10")));
    }

    #[test]
    fn test_dedup_preserves_first_casing() {
        let keywords = extract_from_message("Database error then DATABASE error again");
        let db: Vec<&String> = keywords
            .iter()
            .filter(|k| k.eq_ignore_ascii_case("database"))
            .collect();
        assert_eq!(db.len(), 1);
        assert_eq!(db[0], "Database");
    }

    #[test]
    fn test_entry_field_values_contribute() {
        let mut fields = std::collections::HashMap::new();
        fields.insert(
            "component".to_string(),
            serde_json::Value::String("billing-gateway".to_string()),
        );
        fields.insert("attempt".to_string(), serde_json::Value::from(3));
        let entry = LogEntry {
            timestamp: Utc::now(),
            level: LogLevel::Error,
            message: "charge declined".to_string(),
            source: "app.log".to_string(),
            fields: Some(fields),
            line_number: 1,
        };
        let keywords = extract_from_entry(&entry);
        assert!(contains_ci(&keywords, "billing"));
        assert!(contains_ci(&keywords, "gateway"));
        assert!(contains_ci(&keywords, "declined"));
    }

    #[test]
    fn test_split_case_boundaries_acronym_aware() {
        assert_eq!(
            split_case_boundaries("TermNotFoundException"),
            vec!["Term", "Not", "Found", "Exception"]
        );
        assert_eq!(split_case_boundaries("HTTPTimeout"), vec!["HTTP", "Timeout"]);
        assert_eq!(split_case_boundaries("v2Error"), vec!["v", "2", "Error"]);
    }

    #[test]
    fn test_is_noise_token() {
        assert!(is_noise_token("550e8400-e29b-41d4-a716-446655440000"));
        assert!(is_noise_token("deadbeef12"));
        assert!(is_noise_token("103000Z"));
        assert!(is_noise_token("t14"));
        assert!(is_noise_token("12345"));
        assert!(!is_noise_token("t42"));
        assert!(!is_noise_token("database"));
        assert!(!is_noise_token("promo_id"));
    }

    #[test]
    fn test_keyword_cap() {
        let long: String = (0..100)
            .map(|i| format!("uniqueword{i:03}"))
            .collect::<Vec<_>>()
            .join(" ");
        let keywords = extract_from_message(&long);
        assert_eq!(keywords.len(), MAX_KEYWORDS_PER_SOURCE);
    }
}
