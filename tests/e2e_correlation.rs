// LogLens - tests/e2e_correlation.rs
//
// End-to-end tests for the correlation pipeline: a real corpus on
// disk, real scanning, real indexing, real keyword and vector
// retrieval. No mocks, no stubs.

use chrono::{TimeZone, Utc};
use loglens::core::analyze::{AnalysisConfig, Engine};
use loglens::core::model::{Analysis, LogEntry, LogLevel};
use loglens::core::pattern;
use loglens::correlate::correlator::{Correlator, HybridSearchConfig};
use loglens::correlate::SearchMethod;
use loglens::docstore::scanner;
use loglens::docstore::store::{DocumentStore, MemoryStore};
use loglens::vector::store::{InMemoryVectorStore, VectorStore, VectorStoreConfig};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

// =============================================================================
// Helpers
// =============================================================================

fn entry(offset: i64, level: LogLevel, message: &str) -> LogEntry {
    LogEntry {
        timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
            + chrono::Duration::seconds(offset),
        level,
        message: message.to_string(),
        source: "app.log".to_string(),
        fields: None,
        line_number: (offset + 1) as u64,
    }
}

fn analyze(pattern_yaml: &str, entries: Vec<LogEntry>) -> Analysis {
    let loaded = pattern::load_catalog(&[(PathBuf::from("cat.yaml"), pattern_yaml.to_string())]);
    assert!(loaded.errors.is_empty(), "{:?}", loaded.errors);
    let engine = Engine::new(loaded.patterns, AnalysisConfig::default());
    engine.analyze(&entries, &AtomicBool::new(false)).unwrap()
}

/// Write a corpus to disk, scan it back, and load it into a store —
/// exercising the real scanner path.
fn store_from_disk(docs: &[(&str, &str)]) -> Arc<dyn DocumentStore> {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in docs {
        std::fs::write(dir.path().join(name), content).unwrap();
    }
    let scan = scanner::scan_directory(dir.path());
    assert!(scan.warnings.is_empty(), "{:?}", scan.warnings);
    assert_eq!(scan.documents.len(), docs.len());

    let store = MemoryStore::new();
    store.add_batch(scan.documents).unwrap();
    Arc::new(store)
}

fn keyword_only() -> HybridSearchConfig {
    HybridSearchConfig {
        keyword_weight: 1.0,
        vector_weight: 0.0,
        enable_vector: false,
        ..Default::default()
    }
}

fn hybrid_correlator(
    config: HybridSearchConfig,
    store: Arc<dyn DocumentStore>,
) -> Correlator {
    let mut correlator = Correlator::new(config).unwrap();
    correlator.set_document_store(store);
    let vectors: Arc<dyn VectorStore> = Arc::new(InMemoryVectorStore::new(VectorStoreConfig {
        min_score: 0.0,
        ..Default::default()
    }));
    correlator.set_vector_store(vectors);
    correlator.index_documents().unwrap();
    correlator
}

// =============================================================================
// Scenarios
// =============================================================================

/// A connection-timeout pattern correlates to the database doc with a
/// positive score and sensible matched keywords.
#[test]
fn e2e_connection_timeout_pattern_finds_database_doc() {
    let store = store_from_disk(&[(
        "database.md",
        "# Database\nDatabase connection timeout troubleshooting: check pool \
         sizing, retry budgets, and server load before raising limits.\n",
    )]);
    let correlator = hybrid_correlator(HybridSearchConfig::default(), store);

    let analysis = analyze(
        "- id: conn-timeout\n  type: error\n  regex: \"connection.*timeout\"\n  description: connection timeouts\n",
        vec![entry(
            0,
            LogLevel::Error,
            "connection timeout while accessing database",
        )],
    );
    let result = correlator.correlate(&analysis).unwrap();

    assert_eq!(result.correlations.len(), 1, "one PatternCorrelation");
    let correlation = &result.correlations[0];
    let m = correlation
        .matches
        .iter()
        .find(|m| m.document.id == "database.md")
        .expect("database.md must appear");
    assert!(m.score > 0.0);
    assert!(
        m.method == SearchMethod::Keyword || m.method == SearchMethod::Hybrid,
        "label must be keyword or hybrid, got {:?}",
        m.method
    );
    assert!(
        m.matched_keywords.iter().any(|k| {
            ["connection", "timeout", "database"].contains(&k.to_lowercase().as_str())
        }),
        "matched keywords: {:?}",
        m.matched_keywords
    );
}

/// Direct-error correlation: a TermNotFoundException entry correlates
/// to the terms doc and never to the unrelated API doc.
#[test]
fn e2e_named_exception_targets_terms_doc_only() {
    let store = store_from_disk(&[
        (
            "terms-setup.md",
            "# Terms setup\nResolving TermNotFoundException: promo terms such as \
             SUMMER2024 must define every attribute, including DISCOUNT_RATE, \
             before activation.\n",
        ),
        (
            "api-gateway.md",
            "# API gateway\nREST endpoint deployment, routing tables, and \
             upstream health checks.\n",
        ),
    ]);
    let mut correlator = Correlator::new(keyword_only()).unwrap();
    correlator.set_document_store(store);

    let analysis = analyze(
        "- id: unused\n  type: error\n  keywords: [zzzznothing]\n",
        vec![entry(
            0,
            LogLevel::Error,
            "TermNotFoundException: No terms found for promo_id=SUMMER2024. \
             Missing term: SUMMER2024.DISCOUNT_RATE",
        )],
    );
    let result = correlator.correlate(&analysis).unwrap();

    let correlation = result
        .error_correlations
        .iter()
        .find(|c| c.error_type.contains("TermNotFoundException"))
        .expect("direct-error correlation with TermNotFoundException");
    assert!(correlation
        .matches
        .iter()
        .any(|m| m.document.id == "terms-setup.md"));
    assert!(correlation
        .matches
        .iter()
        .all(|m| m.document.id != "api-gateway.md"));
}

/// Confidence ordering: the detailed exception message scores strictly
/// higher than a generic "Exception occurred", both within (0, 1].
#[test]
fn e2e_detailed_exception_outscores_generic() {
    let store = store_from_disk(&[
        (
            "terms-setup.md",
            "# Terms setup\nTermNotFoundException remediation: define SUMMER2024 \
             DISCOUNT_RATE terms. A bare exception occurred message usually \
             means the stack trace was swallowed.\n",
        ),
        ("api-gateway.md", "# API gateway\nREST routing notes.\n"),
    ]);
    let mut correlator = Correlator::new(keyword_only()).unwrap();
    correlator.set_document_store(store);

    let analysis = analyze(
        "- id: unused\n  type: error\n  keywords: [zzzznothing]\n",
        vec![
            entry(
                0,
                LogLevel::Error,
                "TermNotFoundException: No terms found for promo_id=SUMMER2024. \
                 Missing term: SUMMER2024.DISCOUNT_RATE",
            ),
            entry(1, LogLevel::Error, "Exception occurred"),
        ],
    );
    let result = correlator.correlate(&analysis).unwrap();

    let detailed = result
        .error_correlations
        .iter()
        .find(|c| c.error_type == "TermNotFoundException")
        .expect("detailed correlation");
    assert!(detailed.confidence > 0.0 && detailed.confidence <= 1.0);

    // The generic message alone yields a strictly lower confidence,
    // whether or not it produced its own correlation.
    let generic_confidence =
        loglens::correlate::direct::error_confidence("Exception occurred");
    assert!(generic_confidence > 0.0 && generic_confidence <= 1.0);
    assert!(detailed.confidence > generic_confidence);
}

/// Keyword-only configuration: every match is keyword-labelled with a
/// zero vector score.
#[test]
fn e2e_keyword_only_labels_and_zero_vector_scores() {
    let store = store_from_disk(&[
        (
            "database.md",
            "# Database\ndatabase timeout and connection failure guidance\n",
        ),
        (
            "network.md",
            "# Network\nconnection resets, packet loss, and retry storms\n",
        ),
    ]);
    let mut correlator = Correlator::new(keyword_only()).unwrap();
    correlator.set_document_store(store);

    let analysis = analyze(
        "- id: p\n  type: error\n  regex: \"connection.*timeout\"\n",
        vec![entry(0, LogLevel::Error, "connection timeout to database")],
    );
    let result = correlator.correlate(&analysis).unwrap();

    assert!(!result.correlations.is_empty());
    for correlation in &result.correlations {
        for m in &correlation.matches {
            assert_eq!(m.method, SearchMethod::Keyword);
            assert_eq!(m.vector_score, 0.0);
        }
    }
    for correlation in &result.error_correlations {
        for m in &correlation.matches {
            assert_eq!(m.method, SearchMethod::Keyword);
            assert_eq!(m.vector_score, 0.0);
        }
    }
}

/// A high vector threshold on an unrelated corpus yields no vector or
/// hybrid labels; anything returned came from the keyword path.
#[test]
fn e2e_high_vector_threshold_on_unrelated_corpus() {
    let store = store_from_disk(&[(
        "recipes.md",
        "# Cooking recipes\nGoulash with paprika, dumplings, and a rich beef \
         stock database of seasonal flavours.\n",
    )]);
    let correlator = hybrid_correlator(
        HybridSearchConfig {
            min_vector_score: 0.9,
            ..Default::default()
        },
        store,
    );

    let analysis = analyze(
        "- id: db\n  type: error\n  keywords: [database]\n  description: database errors\n",
        vec![entry(0, LogLevel::Error, "database error while saving order")],
    );
    let result = correlator.correlate(&analysis).unwrap();

    for correlation in result
        .correlations
        .iter()
        .map(|c| &c.matches)
        .chain(result.error_correlations.iter().map(|c| &c.matches))
    {
        for m in correlation {
            assert_eq!(
                m.method,
                SearchMethod::Keyword,
                "vector hits must be filtered by the 0.9 threshold"
            );
            assert_eq!(m.vector_score, 0.0);
        }
    }
}

/// An empty analysis correlates to an empty result without error.
#[test]
fn e2e_empty_analysis_is_not_an_error() {
    let store = store_from_disk(&[("a.md", "# A\nsome content\n")]);
    let mut correlator = Correlator::new(keyword_only()).unwrap();
    correlator.set_document_store(store);

    let analysis = analyze("- id: p\n  type: error\n  keywords: [x]\n", vec![]);
    let result = correlator.correlate(&analysis).unwrap();

    assert_eq!(result.total_patterns, 0);
    assert_eq!(result.correlated_patterns, 0);
    assert!(result.correlations.is_empty());
    assert!(result.error_correlations.is_empty());
}

/// Concurrent correlate calls on one correlator do not interfere.
#[test]
fn e2e_concurrent_correlation() {
    let store = store_from_disk(&[(
        "database.md",
        "# Database\ndatabase timeout troubleshooting notes\n",
    )]);
    let mut correlator = Correlator::new(keyword_only()).unwrap();
    correlator.set_document_store(store);
    let correlator = Arc::new(correlator);

    let analysis = Arc::new(analyze(
        "- id: p\n  type: error\n  keywords: [timeout]\n",
        vec![entry(0, LogLevel::Error, "timeout in database call")],
    ));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let correlator = Arc::clone(&correlator);
        let analysis = Arc::clone(&analysis);
        handles.push(std::thread::spawn(move || {
            for _ in 0..10 {
                let result = correlator.correlate(&analysis).unwrap();
                assert_eq!(result.correlated_patterns, 1);
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
}
