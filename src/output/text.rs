// LogLens - output/text.rs
//
// Human-readable plain-text report.

use crate::core::model::Analysis;
use crate::correlate::CorrelationResult;
use crate::util::constants::MAX_SAMPLE_ENTRIES;
use std::fmt::Write;

/// Render the analysis (and correlation, when present) as plain text.
pub fn render(analysis: &Analysis, correlation: Option<&CorrelationResult>) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Log Analysis");
    let _ = writeln!(out, "============");
    let _ = writeln!(out, "Entries:  {}", analysis.total_entries);
    let _ = writeln!(out, "Errors:   {}", analysis.error_count);
    let _ = writeln!(out, "Warnings: {}", analysis.warn_count);
    if let (Some(start), Some(end)) = (analysis.start_time, analysis.end_time) {
        let _ = writeln!(
            out,
            "Range:    {} .. {} ({}s)",
            start.format("%Y-%m-%d %H:%M:%S"),
            end.format("%Y-%m-%d %H:%M:%S"),
            (end - start).num_seconds()
        );
    }

    if !analysis.patterns.is_empty() {
        let _ = writeln!(out, "\nPatterns");
        let _ = writeln!(out, "--------");
        for matched in &analysis.patterns {
            let _ = writeln!(
                out,
                "[{}] {} — {} match(es), {} .. {}",
                matched.pattern.pattern_type.label(),
                matched.pattern.name,
                matched.count,
                matched.first_seen.format("%H:%M:%S"),
                matched.last_seen.format("%H:%M:%S"),
            );
            for entry in matched.entries.iter().take(MAX_SAMPLE_ENTRIES) {
                let _ = writeln!(out, "    {}: {}", entry.line_number, entry.message);
            }
        }
    }

    if !analysis.insights.is_empty() {
        let _ = writeln!(out, "\nInsights");
        let _ = writeln!(out, "--------");
        for insight in &analysis.insights {
            let _ = writeln!(
                out,
                "[{:.0}%] {} — {}",
                insight.confidence * 100.0,
                insight.title,
                insight.description
            );
        }
    }

    if let Some(timeline) = &analysis.timeline {
        let _ = writeln!(out, "\nTimeline");
        let _ = writeln!(out, "--------");
        let max = timeline
            .buckets
            .iter()
            .map(|b| b.entry_count)
            .max()
            .unwrap_or(1)
            .max(1);
        for bucket in &timeline.buckets {
            let bar_len = bucket.entry_count * 40 / max;
            let _ = writeln!(
                out,
                "{} |{:<40}| {} ({} err)",
                bucket.start.format("%H:%M:%S"),
                "#".repeat(bar_len),
                bucket.entry_count,
                bucket.error_count
            );
        }
    }

    if let Some(correlation) = correlation {
        let _ = writeln!(out, "\nDocument Correlation");
        let _ = writeln!(out, "--------------------");
        let _ = writeln!(
            out,
            "{} of {} pattern(s) correlated",
            correlation.correlated_patterns, correlation.total_patterns
        );
        for pc in &correlation.correlations {
            let _ = writeln!(out, "\n{} ({} doc(s)):", pc.pattern.name, pc.match_count);
            for m in &pc.matches {
                let _ = writeln!(
                    out,
                    "  [{:.3}] {} ({}) via {}",
                    m.score,
                    m.document.title,
                    m.document.id,
                    m.method.label()
                );
                if !m.snippet.is_empty() {
                    let _ = writeln!(out, "      {}", m.snippet);
                }
            }
        }
        for ec in &correlation.error_correlations {
            let _ = writeln!(
                out,
                "\n{} (confidence {:.2}, seen {}x):",
                ec.error_type, ec.confidence, ec.occurrences
            );
            for m in &ec.matches {
                let _ = writeln!(
                    out,
                    "  [{:.3}] {} ({}) via {}",
                    m.score,
                    m.document.title,
                    m.document.id,
                    m.method.label()
                );
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analyze::{AnalysisConfig, Engine};
    use crate::core::model::{LogEntry, LogLevel};
    use crate::core::pattern;
    use chrono::{TimeZone, Utc};
    use std::path::PathBuf;

    #[test]
    fn test_text_report_sections() {
        let result = pattern::load_catalog(&[(
            PathBuf::from("t.yaml"),
            "- id: boom\n  name: Boom pattern\n  type: error\n  keywords: [boom]\n".to_string(),
        )]);
        let engine = Engine::new(result.patterns, AnalysisConfig::default());
        let entries: Vec<LogEntry> = (0..3)
            .map(|i| LogEntry {
                timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, i).unwrap(),
                level: LogLevel::Error,
                message: "boom".to_string(),
                source: "app.log".to_string(),
                fields: None,
                line_number: i as u64 + 1,
            })
            .collect();
        let analysis = engine
            .analyze(&entries, &std::sync::atomic::AtomicBool::new(false))
            .unwrap();

        let text = render(&analysis, None);
        assert!(text.contains("Entries:  3"));
        assert!(text.contains("Errors:   3"));
        assert!(text.contains("Boom pattern"));
        assert!(text.contains("Timeline"));
    }
}
