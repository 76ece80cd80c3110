// LogLens - core/parser.rs
//
// Line-oriented log parsing into normalised `LogEntry` values.
// Core layer: accepts string content, never touches the filesystem.
//
// Three formats are supported, auto-detected per file from a sample of
// leading lines:
//   - JSON lines: one JSON object per line
//   - logfmt: whitespace-separated key=value pairs
//   - plain text: free-form lines with embedded timestamps and level
//     markers
//
// Entries without a parseable timestamp inherit the previous entry's
// timestamp (continuation behaviour); a file whose first lines carry no
// timestamp at all starts from the Unix epoch so ordering stays
// deterministic.

use crate::core::model::{LogEntry, LogLevel};
use crate::util::constants::{DEFAULT_MAX_LINE_LENGTH, TRUNCATION_MARKER};
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Number of leading non-empty lines sampled for format detection.
const DETECTION_SAMPLE_LINES: usize = 10;

// =============================================================================
// Configuration and results
// =============================================================================

/// Parsing configuration.
#[derive(Debug, Clone)]
pub struct ParseConfig {
    /// Lines longer than this are truncated with a marker suffix.
    pub max_line_length: usize,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

/// Detected input format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Logfmt,
    Text,
}

/// Result of parsing one content block.
#[derive(Debug)]
pub struct ParseResult {
    /// Parsed entries in input order.
    pub entries: Vec<LogEntry>,

    /// Format the content was parsed as.
    pub format: LogFormat,

    /// (line number, reason) for lines that could not be parsed.
    pub skipped: Vec<(u64, String)>,
}

// =============================================================================
// Format detection
// =============================================================================

/// Detect the format from the first few non-empty lines: JSON wins when
/// a majority of sampled lines parse as objects, logfmt when a majority
/// carry key=value pairs, otherwise plain text.
pub fn detect_format(content: &str) -> LogFormat {
    let sample: Vec<&str> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(DETECTION_SAMPLE_LINES)
        .collect();
    if sample.is_empty() {
        return LogFormat::Text;
    }

    let json_hits = sample
        .iter()
        .filter(|l| {
            let t = l.trim();
            t.starts_with('{')
                && serde_json::from_str::<serde_json::Value>(t)
                    .map(|v| v.is_object())
                    .unwrap_or(false)
        })
        .count();
    if json_hits * 2 > sample.len() {
        return LogFormat::Json;
    }

    let logfmt_hits = sample
        .iter()
        .filter(|l| logfmt_pair_re().find_iter(l).count() >= 2)
        .count();
    if logfmt_hits * 2 > sample.len() {
        return LogFormat::Logfmt;
    }

    LogFormat::Text
}

// =============================================================================
// Entry point
// =============================================================================

/// Parse a content block into entries, auto-detecting the format.
///
/// `source` is recorded on every entry (file path or stream name).
pub fn parse_content(content: &str, source: &str, config: &ParseConfig) -> ParseResult {
    let format = detect_format(content);
    let mut entries = Vec::new();
    let mut skipped = Vec::new();
    let mut last_timestamp: Option<DateTime<Utc>> = None;

    for (idx, raw_line) in content.lines().enumerate() {
        let line_number = idx as u64 + 1;
        if raw_line.trim().is_empty() {
            continue;
        }

        let mut line = raw_line;
        let truncated;
        if line.len() > config.max_line_length {
            let mut cut = config.max_line_length;
            while !line.is_char_boundary(cut) {
                cut -= 1;
            }
            line = &line[..cut];
            truncated = true;
        } else {
            truncated = false;
        }

        let parsed = match format {
            LogFormat::Json => parse_json_line(line),
            LogFormat::Logfmt => Ok(parse_logfmt_line(line)),
            LogFormat::Text => Ok(parse_text_line(line)),
        };

        match parsed {
            Ok(mut partial) => {
                if truncated {
                    partial.message.push_str(TRUNCATION_MARKER);
                }
                let timestamp = partial
                    .timestamp
                    .or(last_timestamp)
                    .unwrap_or(DateTime::UNIX_EPOCH);
                last_timestamp = Some(timestamp);
                entries.push(LogEntry {
                    timestamp,
                    level: partial.level,
                    message: partial.message,
                    source: source.to_string(),
                    fields: partial.fields,
                    line_number,
                });
            }
            Err(reason) => skipped.push((line_number, reason)),
        }
    }

    tracing::debug!(
        source,
        format = ?format,
        entries = entries.len(),
        skipped = skipped.len(),
        "Parsing complete"
    );

    ParseResult {
        entries,
        format,
        skipped,
    }
}

/// A line parsed up to entry assembly.
struct PartialEntry {
    timestamp: Option<DateTime<Utc>>,
    level: LogLevel,
    message: String,
    fields: Option<HashMap<String, serde_json::Value>>,
}

// =============================================================================
// JSON lines
// =============================================================================

const TIMESTAMP_KEYS: &[&str] = &["timestamp", "time", "ts", "@timestamp", "datetime"];
const LEVEL_KEYS: &[&str] = &["level", "severity", "lvl", "loglevel"];
const MESSAGE_KEYS: &[&str] = &["message", "msg", "text"];

fn parse_json_line(line: &str) -> Result<PartialEntry, String> {
    let value: serde_json::Value =
        serde_json::from_str(line.trim()).map_err(|e| format!("invalid JSON: {e}"))?;
    let serde_json::Value::Object(map) = value else {
        return Err("JSON line is not an object".to_string());
    };

    let mut timestamp = None;
    let mut level = None;
    let mut message = None;
    let mut fields = HashMap::new();

    for (key, value) in map {
        let key_lower = key.to_lowercase();
        if TIMESTAMP_KEYS.contains(&key_lower.as_str()) && timestamp.is_none() {
            timestamp = json_timestamp(&value);
        } else if LEVEL_KEYS.contains(&key_lower.as_str()) && level.is_none() {
            level = value.as_str().and_then(LogLevel::parse);
        } else if MESSAGE_KEYS.contains(&key_lower.as_str()) && message.is_none() {
            message = value.as_str().map(|s| s.to_string());
        } else {
            fields.insert(key, value);
        }
    }

    Ok(PartialEntry {
        timestamp,
        level: level.unwrap_or_default(),
        message: message.unwrap_or_else(|| line.trim().to_string()),
        fields: (!fields.is_empty()).then_some(fields),
    })
}

fn json_timestamp(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::String(s) => sniff_timestamp(s),
        serde_json::Value::Number(n) => {
            // Seconds or milliseconds since the epoch, by magnitude.
            let n = n.as_f64()?;
            let secs = if n > 1e12 { n / 1_000.0 } else { n };
            DateTime::from_timestamp(secs as i64, 0)
        }
        _ => None,
    }
}

// =============================================================================
// logfmt
// =============================================================================

fn logfmt_pair_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([A-Za-z_][A-Za-z0-9_]*)=("([^"]*)"|\S+)"#).expect("logfmt regex")
    })
}

fn parse_logfmt_line(line: &str) -> PartialEntry {
    let mut timestamp = None;
    let mut level = None;
    let mut message = None;
    let mut fields = HashMap::new();

    for captures in logfmt_pair_re().captures_iter(line) {
        let key = captures[1].to_lowercase();
        let value = captures
            .get(3)
            .map(|m| m.as_str())
            .unwrap_or_else(|| captures.get(2).map(|m| m.as_str()).unwrap_or(""));

        if TIMESTAMP_KEYS.contains(&key.as_str()) && timestamp.is_none() {
            timestamp = sniff_timestamp(value);
        } else if LEVEL_KEYS.contains(&key.as_str()) && level.is_none() {
            level = LogLevel::parse(value);
        } else if MESSAGE_KEYS.contains(&key.as_str()) && message.is_none() {
            message = Some(value.to_string());
        } else {
            fields.insert(key, serde_json::Value::String(value.to_string()));
        }
    }

    PartialEntry {
        timestamp: timestamp.or_else(|| sniff_timestamp(line)),
        level: level.unwrap_or_else(|| infer_level(line)),
        // Without an explicit msg key the whole line is the message.
        message: message.unwrap_or_else(|| line.trim().to_string()),
        fields: (!fields.is_empty()).then_some(fields),
    }
}

// =============================================================================
// Plain text
// =============================================================================

fn parse_text_line(line: &str) -> PartialEntry {
    PartialEntry {
        timestamp: sniff_timestamp(line),
        level: infer_level(line),
        message: line.trim().to_string(),
        fields: None,
    }
}

/// Infer a level from embedded markers, most severe first, so a line
/// mentioning both FATAL and INFO classifies as Fatal.
fn infer_level(line: &str) -> LogLevel {
    let upper = line.to_uppercase();
    const MARKERS: &[(&str, LogLevel)] = &[
        ("FATAL", LogLevel::Fatal),
        ("CRITICAL", LogLevel::Fatal),
        ("PANIC", LogLevel::Fatal),
        ("ERROR", LogLevel::Error),
        ("ERR]", LogLevel::Error),
        ("SEVERE", LogLevel::Error),
        ("WARN", LogLevel::Warn),
        ("DEBUG", LogLevel::Debug),
        ("TRACE", LogLevel::Debug),
    ];
    for (marker, level) in MARKERS {
        if upper.contains(marker) {
            return *level;
        }
    }
    LogLevel::Info
}

// =============================================================================
// Timestamp sniffing
// =============================================================================

/// Find and parse the first recognisable timestamp embedded anywhere in
/// the line. Patterns are tried most-precise first so explicit-timezone
/// forms win over looser matches on the same line. Never errors.
pub(crate) fn sniff_timestamp(raw_line: &str) -> Option<DateTime<Utc>> {
    /// A sniff candidate: a regex locating the timestamp substring plus
    /// a parser converting the matched text.
    struct Sniffer {
        re: Regex,
        parse: fn(&str) -> Option<DateTime<Utc>>,
    }

    static SNIFFERS: OnceLock<Vec<Sniffer>> = OnceLock::new();

    let sniffers = SNIFFERS.get_or_init(|| {
        fn re(pat: &str) -> Regex {
            Regex::new(pat).expect("sniff_timestamp: invalid regex")
        }

        vec![
            // RFC 3339 / ISO 8601 with explicit timezone:
            //   2024-01-15T14:30:22Z, 2024-01-15T14:30:22.123+05:30
            Sniffer {
                re: re(r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:[.,]\d+)?(?:Z|[+-]\d{2}:\d{2})"),
                parse: |s| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.into()),
            },
            // ISO 8601 without timezone, comma or dot fractional seconds:
            //   2024-01-15 14:30:22,123  /  2024-01-15T14:30:22.123
            Sniffer {
                re: re(r"\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(?:[.,]\d+)?"),
                parse: |s| {
                    let s = s.replace('T', " ").replace(',', ".");
                    NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S%.f")
                        .ok()
                        .map(|ndt| ndt.and_utc())
                },
            },
            // Slash year-first: 2024/01/15 14:30:22
            Sniffer {
                re: re(r"\d{4}/\d{2}/\d{2}[ T]\d{2}:\d{2}:\d{2}(?:\.\d+)?"),
                parse: |s| {
                    let s = s.replace('/', "-").replace('T', " ");
                    NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S%.f")
                        .ok()
                        .map(|ndt| ndt.and_utc())
                },
            },
            // BSD syslog year-less: Jan 15 14:30:22 (current year injected;
            // files spanning a year boundary will misdate the older part).
            Sniffer {
                re: re(r"[A-Z][a-z]{2} [ \d]\d \d{2}:\d{2}:\d{2}"),
                parse: |s| {
                    use chrono::Datelike;
                    let year = Utc::now().year();
                    let with_year = format!("{year} {s}");
                    NaiveDateTime::parse_from_str(&with_year, "%Y %b %e %H:%M:%S")
                        .ok()
                        .map(|ndt| ndt.and_utc())
                },
            },
            // Unix epoch seconds at line start (not mid-line, to avoid
            // matching ports and PIDs).
            Sniffer {
                re: re(r"^\d{10}(?:\.\d+)?"),
                parse: |s| {
                    let (secs, _) = s.split_once('.').unwrap_or((s, ""));
                    secs.parse::<i64>()
                        .ok()
                        .and_then(|secs| DateTime::from_timestamp(secs, 0))
                },
            },
        ]
    });

    for sniffer in sniffers {
        if let Some(m) = sniffer.re.find(raw_line) {
            if let Some(dt) = (sniffer.parse)(m.as_str()) {
                return Some(dt);
            }
        }
    }
    None
}
