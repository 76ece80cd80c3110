// LogLens - correlate/direct.rs
//
// Direct-error correlation: scans raw error-level entries for
// well-known error-class signatures via a fixed detector table, so a
// log line can be correlated with documentation even when no catalog
// pattern matched it.

use crate::core::model::LogEntry;
use crate::correlate::keywords;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// One detected error class with its representative entry.
#[derive(Debug, Clone)]
pub struct DetectedError {
    /// Error class name (e.g. "DatabaseError") or the named exception
    /// type found in the message (e.g. "TermNotFoundException").
    pub error_type: String,

    /// First message carrying this error type.
    pub message: String,

    /// How many entries carried it.
    pub occurrences: usize,
}

/// A class detector: a fixed name and the signature regex that detects
/// it in a message.
struct Detector {
    error_type: &'static str,
    re: Regex,
}

fn detectors() -> &'static Vec<Detector> {
    static TABLE: OnceLock<Vec<Detector>> = OnceLock::new();
    TABLE.get_or_init(|| {
        fn detector(error_type: &'static str, pattern: &str) -> Detector {
            Detector {
                error_type,
                re: Regex::new(pattern).expect("detector regex"),
            }
        }

        vec![
            detector(
                "DatabaseError",
                r"(?i)\b(database|sql|query|deadlock)\b.*\b(error|fail(ed|ure)?|refused|timeout)\b|\bdatabase error\b",
            ),
            detector(
                "AuthenticationError",
                r"(?i)\b(authentication|authorization|login|credential|token)s?\b.*\b(fail(ed|ure)?|denied|invalid|expired|rejected)\b",
            ),
            detector(
                "NotFoundError",
                r"(?i)\b(not found|no such|missing|does not exist|404)\b",
            ),
            detector(
                "NetworkError",
                r"(?i)\b(connection|network|socket|dns|host)\b.*\b(refused|reset|unreachable|lost|fail(ed|ure)?)\b",
            ),
            detector(
                "TimeoutError",
                r"(?i)\b(timed? ?out|deadline exceeded)\b",
            ),
        ]
    })
}

fn named_exception_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // CamelCase types ending in Exception or Error, e.g.
    // TermNotFoundException, NullPointerException.
    RE.get_or_init(|| {
        Regex::new(r"\b([A-Z][A-Za-z0-9]*(?:Exception|Error))\b").expect("exception regex")
    })
}

/// Scan error-level entries for error-class signatures.
///
/// Each distinct error type yields one `DetectedError` carrying the
/// first message seen and the total occurrence count. Named exception
/// types are checked before the class detectors, and an entry
/// contributes to at most two types so noisy lines do not fan out.
pub fn detect_error_classes(entries: &[LogEntry]) -> Vec<DetectedError> {
    let mut found: Vec<DetectedError> = Vec::new();
    let mut by_type: HashMap<String, usize> = HashMap::new();

    let mut record = |found: &mut Vec<DetectedError>,
                      by_type: &mut HashMap<String, usize>,
                      error_type: String,
                      message: &str| {
        match by_type.get(&error_type) {
            Some(&idx) => found[idx].occurrences += 1,
            None => {
                by_type.insert(error_type.clone(), found.len());
                found.push(DetectedError {
                    error_type,
                    message: message.to_string(),
                    occurrences: 1,
                });
            }
        }
    };

    for entry in entries.iter().filter(|e| e.level.is_error()) {
        let mut contributions = 0;
        let mut named_type: Option<String> = None;
        if let Some(captures) = named_exception_re().captures(&entry.message) {
            let name = captures[1].to_string();
            // Bare "Exception"/"Error" carries no class information.
            if name != "Exception" && name != "Error" {
                record(&mut found, &mut by_type, name.clone(), &entry.message);
                named_type = Some(name);
                contributions += 1;
            }
        }

        for detector in detectors() {
            if contributions >= 2 {
                break;
            }
            // The named type may coincide with a class name; count once.
            if named_type.as_deref() == Some(detector.error_type) {
                continue;
            }
            if detector.re.is_match(&entry.message) {
                record(
                    &mut found,
                    &mut by_type,
                    detector.error_type.to_string(),
                    &entry.message,
                );
                contributions += 1;
            }
        }
    }

    found
}

/// Confidence for a direct-error correlation, in (0, 1].
///
/// Grows with the number of distinctive keywords the message yields:
/// min(1.0, 0.2 + 0.08 * keyword_count). A generic "Exception occurred"
/// extracts almost nothing and lands near the floor; a message naming
/// identifiers and values climbs towards 1.0.
pub fn error_confidence(message: &str) -> f64 {
    let keyword_count = keywords::extract_from_message(message).len();
    (0.2 + 0.08 * keyword_count as f64).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::LogLevel;
    use chrono::Utc;

    fn entry(level: LogLevel, message: &str) -> LogEntry {
        LogEntry {
            timestamp: Utc::now(),
            level,
            message: message.to_string(),
            source: "app.log".to_string(),
            fields: None,
            line_number: 1,
        }
    }

    fn types(detected: &[DetectedError]) -> Vec<&str> {
        detected.iter().map(|d| d.error_type.as_str()).collect()
    }

    #[test]
    fn test_named_exception_detected() {
        let entries = vec![entry(
            LogLevel::Error,
            "TermNotFoundException: No terms found for promo_id=SUMMER2024",
        )];
        let detected = detect_error_classes(&entries);
        assert!(types(&detected).contains(&"TermNotFoundException"));
    }

    #[test]
    fn test_class_detectors() {
        let entries = vec![
            entry(LogLevel::Error, "database query failed with deadlock"),
            entry(LogLevel::Error, "authentication failed for user admin"),
            entry(LogLevel::Error, "resource not found: /api/v2/promo"),
            entry(LogLevel::Error, "connection refused by upstream host"),
            entry(LogLevel::Fatal, "request timed out after 30s"),
        ];
        let detected = detect_error_classes(&entries);
        let found = types(&detected);
        assert!(found.contains(&"DatabaseError"));
        assert!(found.contains(&"AuthenticationError"));
        assert!(found.contains(&"NotFoundError"));
        assert!(found.contains(&"NetworkError"));
        assert!(found.contains(&"TimeoutError"));
    }

    #[test]
    fn test_non_error_levels_ignored() {
        let entries = vec![entry(LogLevel::Info, "database error recovered")];
        assert!(detect_error_classes(&entries).is_empty());
    }

    #[test]
    fn test_occurrences_grouped_by_type() {
        let entries = vec![
            entry(LogLevel::Error, "connection refused by db-1"),
            entry(LogLevel::Error, "connection refused by db-2"),
        ];
        let detected = detect_error_classes(&entries);
        let network = detected
            .iter()
            .find(|d| d.error_type == "NetworkError")
            .unwrap();
        assert_eq!(network.occurrences, 2);
        assert!(network.message.contains("db-1"), "first message kept");
    }

    #[test]
    fn test_bare_exception_word_not_a_named_type() {
        let entries = vec![entry(LogLevel::Error, "Exception occurred")];
        let detected = detect_error_classes(&entries);
        assert!(!types(&detected).contains(&"Exception"));
    }

    /// Detailed messages must score strictly higher than the generic
    /// "Exception occurred", both in (0, 1].
    #[test]
    fn test_confidence_ordering() {
        let detailed = error_confidence(
            "TermNotFoundException: No terms found for promo_id=SUMMER2024. \
             Missing term: SUMMER2024.DISCOUNT_RATE",
        );
        let generic = error_confidence("Exception occurred");

        assert!(detailed > generic, "{detailed} must exceed {generic}");
        assert!(generic > 0.0 && generic <= 1.0);
        assert!(detailed > 0.0 && detailed <= 1.0);
    }

    #[test]
    fn test_confidence_saturates_at_one() {
        let huge: String = (0..50)
            .map(|i| format!("distinctterm{i:02}"))
            .collect::<Vec<_>>()
            .join(" ");
        assert!((error_confidence(&huge) - 1.0).abs() < 1e-9);
    }
}
