// LogLens - docstore/index.rs
//
// In-memory inverted index with TF-IDF scoring.
//
// The index maps lowercased terms to postings: per-document frequency,
// token positions, and the fields the term appeared in. IDF is
// maintained incrementally: after every add or remove, the IDF of the
// affected terms is recomputed as ln(N / df).
//
// The index owns no documents. Query classification (phrase / boolean /
// bag-of-words) and result assembly live in docstore::store, which owns
// both the documents and this index.

use crate::docstore::document::Document;
use crate::docstore::tokenize::tokenize;
use crate::util::constants::{FUZZY_MAX_DISTANCE, FUZZY_MIN_TERM_LENGTH};
use regex::Regex;
use std::collections::{HashMap, HashSet};

// =============================================================================
// Posting types
// =============================================================================

/// Which document field a term occurrence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Title,
    Body,
    Author,
    Tags,
    SectionHeading,
    SectionBody,
}

/// Occurrences of one term within one document.
#[derive(Debug, Clone, Default)]
pub struct TermOccurrence {
    /// Total occurrence count across all fields.
    pub frequency: usize,

    /// Token positions, numbered continuously across indexed fields.
    pub positions: Vec<usize>,

    /// Distinct fields the term appeared in.
    pub fields: HashSet<FieldKind>,
}

/// One indexed term: its IDF and the documents containing it.
#[derive(Debug, Clone)]
pub struct IndexTerm {
    /// ln(N / df) where N is the current document count and df the
    /// number of documents containing this term.
    pub idf: f64,

    /// Per-document occurrences, keyed by document id.
    pub postings: HashMap<String, TermOccurrence>,
}

// =============================================================================
// Inverted index
// =============================================================================

/// Full-text index over the document corpus.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    terms: HashMap<String, IndexTerm>,

    /// Body token count per document (the |d| normaliser in scoring).
    doc_lengths: HashMap<String, usize>,
}

/// A scored posting-level hit: per-document score plus which query
/// terms contributed.
#[derive(Debug, Clone)]
pub struct TermScore {
    pub score: f64,
    pub matched_terms: Vec<String>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current indexed document count.
    pub fn doc_count(&self) -> usize {
        self.doc_lengths.len()
    }

    /// Distinct term count (diagnostics).
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// IDF of a term, if indexed.
    pub fn idf(&self, term: &str) -> Option<f64> {
        self.terms.get(term).map(|t| t.idf)
    }

    /// Index one document: title, body, author, tags, and each section's
    /// heading and body are tokenized as separate fields. Re-adding an
    /// id replaces the previous postings for that document.
    pub fn add_document(&mut self, doc: &Document) {
        if self.doc_lengths.contains_key(&doc.id) {
            self.remove_document(&doc.id);
        }

        let mut position = 0usize;

        let mut index_field = |index: &mut HashMap<String, IndexTerm>,
                               position: &mut usize,
                               text: &str,
                               field: FieldKind| {
            for token in tokenize(text) {
                let entry = index.entry(token).or_insert_with(|| IndexTerm {
                    idf: 0.0,
                    postings: HashMap::new(),
                });
                let occ = entry.postings.entry(doc.id.clone()).or_default();
                occ.frequency += 1;
                occ.positions.push(*position);
                occ.fields.insert(field);
                *position += 1;
            }
        };

        index_field(
            &mut self.terms,
            &mut position,
            &doc.title,
            FieldKind::Title,
        );
        index_field(
            &mut self.terms,
            &mut position,
            &doc.content,
            FieldKind::Body,
        );
        index_field(
            &mut self.terms,
            &mut position,
            &doc.metadata.author,
            FieldKind::Author,
        );
        for tag in &doc.metadata.tags {
            index_field(
                &mut self.terms,
                &mut position,
                tag,
                FieldKind::Tags,
            );
        }
        for section in &doc.sections {
            index_field(
                &mut self.terms,
                &mut position,
                &section.heading,
                FieldKind::SectionHeading,
            );
            index_field(
                &mut self.terms,
                &mut position,
                &section.content,
                FieldKind::SectionBody,
            );
        }

        self.doc_lengths
            .insert(doc.id.clone(), tokenize(&doc.content).len());

        // Adding a document changes N, which changes IDF for every term.
        self.recompute_all_idf();
    }

    /// Remove a document's postings. Terms whose last posting disappears
    /// are removed from the index entirely.
    pub fn remove_document(&mut self, doc_id: &str) {
        if self.doc_lengths.remove(doc_id).is_none() {
            return;
        }
        self.terms.retain(|_, term| {
            term.postings.remove(doc_id);
            !term.postings.is_empty()
        });
        self.recompute_all_idf();
    }

    /// Drop all postings and lengths.
    pub fn clear(&mut self) {
        self.terms.clear();
        self.doc_lengths.clear();
    }

    fn recompute_all_idf(&mut self) {
        let n = self.doc_lengths.len();
        for term in self.terms.values_mut() {
            term.idf = idf(n, term.postings.len());
        }
    }

    // -------------------------------------------------------------------------
    // Scoring
    // -------------------------------------------------------------------------

    /// Bag-of-words scoring: for each query term present in the index,
    /// each posting (doc d, frequency f) contributes
    /// f / |d| * (idf(t) + 1) to the document's score. Scores are summed
    /// over terms. The +1 smoothing keeps matches on small corpora above
    /// zero (a term present in every document of a one-document corpus
    /// has idf 0 but is still a real match).
    ///
    /// With `fuzzy` enabled, query terms absent from the index are
    /// resolved to index terms within Levenshtein distance
    /// FUZZY_MAX_DISTANCE (first character must match, which keeps the
    /// vocabulary scan linear in practice) and their postings are
    /// scored under the original term.
    pub fn score_terms(&self, query_terms: &[String], fuzzy: bool) -> HashMap<String, TermScore> {
        let mut scores: HashMap<String, TermScore> = HashMap::new();

        for raw_term in query_terms {
            let resolved: Vec<&str> = if self.terms.contains_key(raw_term.as_str()) {
                vec![raw_term.as_str()]
            } else if fuzzy {
                self.fuzzy_candidates(raw_term)
            } else {
                Vec::new()
            };

            for term in resolved {
                let Some(index_term) = self.terms.get(term) else {
                    continue;
                };
                for (doc_id, occ) in &index_term.postings {
                    let len = self.doc_lengths.get(doc_id).copied().unwrap_or(1).max(1);
                    let contribution = occ.frequency as f64 / len as f64 * (index_term.idf + 1.0);
                    let entry = scores.entry(doc_id.clone()).or_insert_with(|| TermScore {
                        score: 0.0,
                        matched_terms: Vec::new(),
                    });
                    entry.score += contribution;
                    if !entry.matched_terms.iter().any(|t| t == raw_term) {
                        entry.matched_terms.push(raw_term.clone());
                    }
                }
            }
        }

        scores
    }

    /// Intersection scoring for boolean AND: only documents containing
    /// every query term (exact postings, no fuzzy) are scored.
    pub fn score_terms_all(&self, query_terms: &[String]) -> HashMap<String, TermScore> {
        let mut scores = self.score_terms(query_terms, false);
        let present: Vec<&String> = query_terms
            .iter()
            .filter(|t| self.terms.contains_key(t.as_str()))
            .collect();
        scores.retain(|doc_id, _| {
            present.iter().all(|t| {
                self.terms
                    .get(t.as_str())
                    .map(|term| term.postings.contains_key(doc_id))
                    .unwrap_or(false)
            })
        });
        scores
    }

    /// Index terms within the fuzzy edit-distance bound of `query`,
    /// sharing its first character.
    fn fuzzy_candidates(&self, query: &str) -> Vec<&str> {
        if query.len() < FUZZY_MIN_TERM_LENGTH {
            return Vec::new();
        }
        let first = query.chars().next();
        self.terms
            .keys()
            .filter(|term| term.chars().next() == first)
            .filter(|term| levenshtein_within(query, term, FUZZY_MAX_DISTANCE))
            .map(|s| s.as_str())
            .collect()
    }
}

/// ln(N / df); zero when either count is zero.
fn idf(doc_count: usize, doc_freq: usize) -> f64 {
    if doc_count == 0 || doc_freq == 0 {
        return 0.0;
    }
    (doc_count as f64 / doc_freq as f64).ln()
}

// =============================================================================
// Bounded edit distance
// =============================================================================

/// Are two strings within `max` edits of each other?
///
/// Bounded Levenshtein with two early exits: a length-difference lower
/// bound before the DP, and a per-row minimum check during it. Both are
/// sound; neither rejects a valid match.
pub(crate) fn levenshtein_within(a: &str, b: &str, max: usize) -> bool {
    let a_len = a.chars().count();
    let b_len = b.chars().count();

    if (a_len as isize - b_len as isize).unsigned_abs() > max {
        return false;
    }

    let mut dp: Vec<usize> = (0..=b_len).collect();
    for (i, ac) in a.chars().enumerate() {
        let mut prev = dp[0];
        dp[0] = i + 1;
        let mut min_row = dp[0];

        for (j, bc) in b.chars().enumerate() {
            let temp = dp[j + 1];
            let cost = usize::from(ac != bc);
            dp[j + 1] = (dp[j + 1] + 1).min(dp[j] + 1).min(prev + cost);
            prev = temp;
            if dp[j + 1] < min_row {
                min_row = dp[j + 1];
            }
        }

        if min_row > max {
            return false;
        }
    }

    dp[b_len] <= max
}

// =============================================================================
// Highlighting
// =============================================================================

/// Wrap each case-insensitive word-boundary occurrence of the given
/// terms in `**...**`. Terms are regex-escaped; invalid or empty terms
/// are skipped.
pub fn highlight(text: &str, terms: &[String]) -> String {
    let mut result = text.to_string();
    for term in terms {
        if term.is_empty() {
            continue;
        }
        let pattern = format!(r"(?i)\b({})\b", regex::escape(term));
        if let Ok(re) = Regex::new(&pattern) {
            result = re.replace_all(&result, "**$1**").into_owned();
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, title: &str, content: &str) -> Document {
        Document::from_content(id, title, content)
    }

    fn terms(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_add_and_score_single_doc() {
        let mut index = InvertedIndex::new();
        index.add_document(&doc(
            "db.md",
            "Database troubleshooting",
            "Database connection timeout troubleshooting guide",
        ));

        // Single doc: idf = ln(1/1) = 0, but the smoothed contribution
        // keeps a genuine match above zero.
        let scores = index.score_terms(&terms(&["database"]), false);
        assert_eq!(scores.len(), 1);
        assert!(scores["db.md"].score > 0.0);
        assert_eq!(scores["db.md"].matched_terms, vec!["database"]);
    }

    /// After any add/remove sequence, IDF(t) = ln(N / df(t)) for every
    /// remaining term, and terms with no postings are gone.
    #[test]
    fn test_idf_consistency_over_add_remove() {
        let mut index = InvertedIndex::new();
        index.add_document(&doc("a.md", "A", "database timeout retries"));
        index.add_document(&doc("b.md", "B", "database network partition"));
        index.add_document(&doc("c.md", "C", "cooking recipes"));

        let n = 3.0f64;
        assert!((index.idf("database").unwrap() - (n / 2.0).ln()).abs() < 1e-9);
        assert!((index.idf("timeout").unwrap() - (n / 1.0).ln()).abs() < 1e-9);

        index.remove_document("a.md");
        let n = 2.0f64;
        assert!((index.idf("database").unwrap() - (n / 1.0).ln()).abs() < 1e-9);
        // "timeout" appeared only in a.md and must be gone entirely.
        assert!(index.idf("timeout").is_none());

        index.remove_document("b.md");
        assert!(index.idf("database").is_none());
        assert_eq!(index.doc_count(), 1);
    }

    /// A document containing every query term scores at least as high
    /// as a same-length document containing a proper subset.
    #[test]
    fn test_search_monotonicity() {
        let mut index = InvertedIndex::new();
        index.add_document(&doc(
            "full.md",
            "Full",
            "database timeout retries exhausted quickly",
        ));
        index.add_document(&doc(
            "partial.md",
            "Partial",
            "database latency growing under sustained load",
        ));
        index.add_document(&doc("other.md", "Other", "cooking recipes with paprika"));

        let scores = index.score_terms(&terms(&["database", "timeout"]), false);
        assert!(
            scores["full.md"].score >= scores["partial.md"].score,
            "superset doc must not score below subset doc"
        );
    }

    #[test]
    fn test_score_terms_all_requires_every_term() {
        let mut index = InvertedIndex::new();
        index.add_document(&doc("a.md", "A", "database timeout handling"));
        index.add_document(&doc("b.md", "B", "database replication basics"));

        let scores = index.score_terms_all(&terms(&["database", "timeout"]));
        assert!(scores.contains_key("a.md"));
        assert!(!scores.contains_key("b.md"));
    }

    #[test]
    fn test_readd_replaces_postings() {
        let mut index = InvertedIndex::new();
        index.add_document(&doc("a.md", "A", "alpha beta"));
        index.add_document(&doc("a.md", "A", "gamma delta"));

        assert_eq!(index.doc_count(), 1);
        assert!(index.idf("alpha").is_none());
        assert!(index.idf("gamma").is_some());
    }

    #[test]
    fn test_fields_recorded() {
        let mut index = InvertedIndex::new();
        let mut d = doc("a.md", "Gateway setup", "body text about routing");
        d.metadata.tags = vec!["networking".to_string()];
        index.add_document(&d);

        let term = index.terms.get("gateway").unwrap();
        assert!(term.postings["a.md"].fields.contains(&FieldKind::Title));
        let term = index.terms.get("networking").unwrap();
        assert!(term.postings["a.md"].fields.contains(&FieldKind::Tags));
    }

    #[test]
    fn test_fuzzy_matches_close_terms() {
        let mut index = InvertedIndex::new();
        index.add_document(&doc("a.md", "A", "database timeout troubleshooting"));
        index.add_document(&doc("b.md", "B", "unrelated cooking material"));

        // "timeot" is one deletion away from "timeout".
        let scores = index.score_terms(&terms(&["timeot"]), true);
        assert!(scores.contains_key("a.md"), "fuzzy should reach a.md");
        assert!(!scores.contains_key("b.md"));

        // Without fuzzy the misspelling matches nothing.
        let scores = index.score_terms(&terms(&["timeot"]), false);
        assert!(scores.is_empty());
    }

    #[test]
    fn test_fuzzy_prefix_gate() {
        let mut index = InvertedIndex::new();
        index.add_document(&doc("a.md", "A", "timeout handling"));

        // "rimeout" is within distance 1 of "timeout" but fails the
        // first-character gate.
        let scores = index.score_terms(&terms(&["rimeout"]), true);
        assert!(scores.is_empty());
    }

    #[test]
    fn test_empty_query_returns_empty() {
        let mut index = InvertedIndex::new();
        index.add_document(&doc("a.md", "A", "content here"));
        assert!(index.score_terms(&[], false).is_empty());
        assert!(index.score_terms(&terms(&[""]), true).is_empty());
    }

    #[test]
    fn test_levenshtein_within() {
        assert!(levenshtein_within("hello", "hello", 0));
        assert!(levenshtein_within("hello", "hallo", 1));
        assert!(levenshtein_within("timeout", "timeot", 2));
        assert!(!levenshtein_within("a", "abcdef", 2));
        assert!(!levenshtein_within("hello", "world", 2));
    }

    #[test]
    fn test_highlight_word_boundaries() {
        let text = "Database connection timeout while connecting";
        let out = highlight(text, &terms(&["timeout", "database"]));
        assert!(out.contains("**Database**"));
        assert!(out.contains("**timeout**"));
        // "connecting" must not be highlighted for term "connection".
        let out = highlight(text, &terms(&["connection"]));
        assert!(out.contains("**connection**"));
        assert!(out.contains("connecting"));
        assert!(!out.contains("**connecting**"));
    }
}
