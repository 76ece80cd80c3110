// LogLens - docstore/tokenize.rs
//
// Pure tokenizer and stop-word filtering, shared by the inverted index
// (indexing and querying) and the TF-IDF vectorizer. No I/O, no state.

use crate::util::constants::MIN_TOKEN_LENGTH;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Common English stop words plus log-noise terms that carry no search
/// value in a log/documentation corpus.
const STOP_WORDS: &[&str] = &[
    // Common English
    "the", "and", "for", "are", "but", "not", "you", "all", "can", "had", "her", "was", "one",
    "our", "out", "has", "have", "been", "were", "they", "their", "them", "this", "that", "with",
    "from", "will", "would", "could", "should", "there", "where", "when", "what", "which", "while",
    "into", "onto", "over", "under", "then", "than", "these", "those", "some", "such", "only",
    "also", "more", "most", "other", "about", "after", "before", "between", "because", "being",
    "both", "each", "does", "doing", "during", "here", "how", "its", "itself", "just", "may",
    "might", "must", "now", "off", "once", "same", "she", "him", "his", "hers", "too", "very",
    "why", "yet", "your", "yours", "any", "own",
    // Log noise
    "log", "logs", "logged", "logging", "text", "data", "info", "code", "time", "date", "null",
    "true", "false", "none", "value", "values", "item", "items", "line", "lines", "file", "files",
    "message", "messages", "new", "old", "get", "set", "use", "used", "using",
];

fn stop_words() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOP_WORDS.iter().copied().collect())
}

/// Returns true when a word is in the stop-word set.
/// Expects lowercased input.
pub fn is_stop_word(word: &str) -> bool {
    stop_words().contains(word)
}

/// Tokenize text into an ordered lowercase token list.
///
/// Rules:
///   - lowercase the input
///   - emit maximal runs of [a-z0-9_] that contain at least one letter
///   - discard tokens of length <= MIN_TOKEN_LENGTH
///   - discard stop words
///
/// The function is pure: tokens it emits, re-fed individually, emit
/// themselves unchanged.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut tokens = Vec::new();
    let mut current = String::new();

    for ch in lower.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' {
            current.push(ch);
        } else if !current.is_empty() {
            push_token(&mut tokens, std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        push_token(&mut tokens, current);
    }

    tokens
}

fn push_token(tokens: &mut Vec<String>, token: String) {
    if token.len() <= MIN_TOKEN_LENGTH {
        return;
    }
    // Runs of digits and underscores alone are not searchable terms.
    if !token.chars().any(|c| c.is_ascii_lowercase()) {
        return;
    }
    if is_stop_word(&token) {
        return;
    }
    tokens.push(token);
}
