// LogLens - output/json.rs
//
// JSON report: the stable machine-readable shape
// {summary, patterns, insights, timeline} with up to three sample
// entries per pattern.

use crate::core::model::{Analysis, Insight, LogEntry, TimeBucket};
use crate::util::constants::MAX_SAMPLE_ENTRIES;
use serde::Serialize;

#[derive(Serialize)]
struct Report<'a> {
    summary: Summary,
    patterns: Vec<PatternReport<'a>>,
    insights: &'a [Insight],
    timeline: Option<TimelineReport<'a>>,
}

#[derive(Serialize)]
struct Summary {
    total_entries: usize,
    error_count: usize,
    warning_count: usize,
    time_range: TimeRange,
}

#[derive(Serialize)]
struct TimeRange {
    start: Option<String>,
    end: Option<String>,
    /// Seconds between the earliest and latest entries.
    duration: f64,
}

#[derive(Serialize)]
struct PatternReport<'a> {
    pattern: &'a crate::core::model::Pattern,
    matches: usize,
    first_seen: String,
    last_seen: String,
    sample_entries: Vec<&'a LogEntry>,
}

#[derive(Serialize)]
struct TimelineReport<'a> {
    /// Bucket width in seconds.
    bucket_size: f64,
    buckets: &'a [TimeBucket],
}

/// Render the analysis as pretty-printed JSON.
pub fn render(analysis: &Analysis) -> Result<String, serde_json::Error> {
    let duration = match (analysis.start_time, analysis.end_time) {
        (Some(start), Some(end)) => (end - start).num_milliseconds() as f64 / 1_000.0,
        _ => 0.0,
    };

    let report = Report {
        summary: Summary {
            total_entries: analysis.total_entries,
            error_count: analysis.error_count,
            warning_count: analysis.warn_count,
            time_range: TimeRange {
                start: analysis.start_time.map(|t| t.to_rfc3339()),
                end: analysis.end_time.map(|t| t.to_rfc3339()),
                duration,
            },
        },
        patterns: analysis
            .patterns
            .iter()
            .map(|m| PatternReport {
                pattern: &m.pattern,
                matches: m.count,
                first_seen: m.first_seen.to_rfc3339(),
                last_seen: m.last_seen.to_rfc3339(),
                sample_entries: m.entries.iter().take(MAX_SAMPLE_ENTRIES).collect(),
            })
            .collect(),
        insights: &analysis.insights,
        timeline: analysis.timeline.as_ref().map(|t| TimelineReport {
            bucket_size: t.bucket_size.num_milliseconds() as f64 / 1_000.0,
            buckets: &t.buckets,
        }),
    };

    serde_json::to_string_pretty(&report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analyze::{AnalysisConfig, Engine};
    use crate::core::model::{LogEntry, LogLevel};
    use crate::core::pattern;
    use chrono::{TimeZone, Utc};
    use std::path::PathBuf;

    fn sample_analysis() -> Analysis {
        let result = pattern::load_catalog(&[(
            PathBuf::from("t.yaml"),
            "- id: boom\n  type: error\n  keywords: [boom]\n".to_string(),
        )]);
        let engine = Engine::new(result.patterns, AnalysisConfig::default());
        let entries: Vec<LogEntry> = (0..5)
            .map(|i| LogEntry {
                timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, i).unwrap(),
                level: if i % 2 == 0 {
                    LogLevel::Error
                } else {
                    LogLevel::Info
                },
                message: format!("boom number {i}"),
                source: "app.log".to_string(),
                fields: None,
                line_number: i as u64 + 1,
            })
            .collect();
        engine
            .analyze(&entries, &std::sync::atomic::AtomicBool::new(false))
            .unwrap()
    }

    #[test]
    fn test_json_shape() {
        let json = render(&sample_analysis()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["summary"]["total_entries"], 5);
        assert_eq!(value["summary"]["error_count"], 3);
        assert_eq!(value["summary"]["warning_count"], 0);
        assert!(value["summary"]["time_range"]["start"].is_string());
        assert_eq!(value["summary"]["time_range"]["duration"], 4.0);

        let patterns = value["patterns"].as_array().unwrap();
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0]["matches"], 5);
        // Sample entries are capped at three.
        assert_eq!(patterns[0]["sample_entries"].as_array().unwrap().len(), 3);

        assert!(value["timeline"]["buckets"].is_array());
        assert!(value["insights"].is_array());
    }

    #[test]
    fn test_json_empty_analysis() {
        let result = pattern::load_catalog(&[(
            PathBuf::from("t.yaml"),
            "- id: p\n  type: error\n  keywords: [x]\n".to_string(),
        )]);
        let engine = Engine::new(result.patterns, AnalysisConfig::default());
        let analysis = engine
            .analyze(&[], &std::sync::atomic::AtomicBool::new(false))
            .unwrap();

        let json = render(&analysis).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["summary"]["total_entries"], 0);
        assert!(value["summary"]["time_range"]["start"].is_null());
        assert!(value["timeline"].is_null());
    }
}
