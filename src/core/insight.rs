// LogLens - core/insight.rs
//
// Post-hoc insight synthesis over level tallies, pattern hits, and the
// timeline. Confidence is a deterministic bounded function of evidence
// count against the firing threshold: min(1.0, count / (2 * threshold)),
// so an insight starts at 0.5 when it first fires and saturates at
// double the threshold.

use crate::core::model::{
    Analysis, Insight, InsightType, LogEntry, LogLevel, PatternMatch, PatternType, Timeline,
};
use crate::util::constants::{
    ERROR_RATE_THRESHOLD, ERROR_TREND_THRESHOLD, MAX_SAMPLE_ENTRIES, PERFORMANCE_THRESHOLD,
    SECURITY_THRESHOLD,
};

/// Confidence from an evidence count and its firing threshold.
fn confidence(count: usize, threshold: usize) -> f64 {
    (count as f64 / (2.0 * threshold.max(1) as f64)).clamp(0.0, 1.0)
}

/// Up to MAX_SAMPLE_ENTRIES supporting entries for the report.
fn sample(entries: &[&LogEntry]) -> Vec<LogEntry> {
    entries
        .iter()
        .take(MAX_SAMPLE_ENTRIES)
        .map(|e| (*e).clone())
        .collect()
}

/// Synthesize insights from the completed tallies and pattern matches.
/// Deterministic: identical inputs produce identical insights in
/// identical order.
pub fn synthesize(
    entries: &[LogEntry],
    patterns: &[PatternMatch],
    timeline: Option<&Timeline>,
) -> Vec<Insight> {
    let mut insights = Vec::new();
    let total = entries.len();
    if total == 0 {
        return insights;
    }

    // High error rate across the whole window.
    let errors: Vec<&LogEntry> = entries.iter().filter(|e| e.level.is_error()).collect();
    let error_rate = errors.len() as f64 / total as f64;
    if errors.len() >= ERROR_TREND_THRESHOLD && error_rate >= ERROR_RATE_THRESHOLD {
        insights.push(Insight {
            insight_type: InsightType::ErrorTrend,
            severity: LogLevel::Error,
            title: "High error rate".to_string(),
            description: format!(
                "{} of {} entries ({:.0}%) are errors",
                errors.len(),
                total,
                error_rate * 100.0
            ),
            confidence: confidence(errors.len(), ERROR_TREND_THRESHOLD),
            evidence: sample(&errors),
            evidence_count: errors.len(),
        });
    }

    // Slow responses: performance-typed pattern hits plus raw timeout
    // mentions.
    let perf_hits: Vec<&LogEntry> = patterns
        .iter()
        .filter(|m| m.pattern.pattern_type == PatternType::Performance)
        .flat_map(|m| m.entries.iter())
        .collect();
    let timeout_hits: Vec<&LogEntry> = entries
        .iter()
        .filter(|e| {
            let lower = e.message.to_lowercase();
            lower.contains("timeout") || lower.contains("timed out")
        })
        .collect();
    let slow_count = perf_hits.len() + timeout_hits.len();
    if slow_count >= PERFORMANCE_THRESHOLD {
        let evidence_source = if perf_hits.is_empty() {
            &timeout_hits
        } else {
            &perf_hits
        };
        insights.push(Insight {
            insight_type: InsightType::Performance,
            severity: LogLevel::Warn,
            title: "Slow response times detected".to_string(),
            description: format!(
                "{slow_count} entries indicate latency problems (performance patterns or timeouts)"
            ),
            confidence: confidence(slow_count, PERFORMANCE_THRESHOLD),
            evidence: sample(evidence_source),
            evidence_count: slow_count,
        });
    }

    // Security-typed pattern hits.
    let security_hits: Vec<&LogEntry> = patterns
        .iter()
        .filter(|m| m.pattern.pattern_type == PatternType::Security)
        .flat_map(|m| m.entries.iter())
        .collect();
    if security_hits.len() >= SECURITY_THRESHOLD {
        insights.push(Insight {
            insight_type: InsightType::Security,
            severity: LogLevel::Error,
            title: "Security-relevant activity".to_string(),
            description: format!(
                "{} entries matched security patterns",
                security_hits.len()
            ),
            confidence: confidence(security_hits.len(), SECURITY_THRESHOLD),
            evidence: sample(&security_hits),
            evidence_count: security_hits.len(),
        });
    }

    // Error burst: one timeline bucket holding the majority of errors.
    if let Some(timeline) = timeline {
        let total_errors: usize = timeline.buckets.iter().map(|b| b.error_count).sum();
        if total_errors >= ERROR_TREND_THRESHOLD {
            if let Some(burst) = timeline
                .buckets
                .iter()
                .find(|b| b.error_count * 2 > total_errors)
            {
                let burst_errors: Vec<&LogEntry> = entries
                    .iter()
                    .filter(|e| {
                        e.level.is_error()
                            && e.timestamp >= burst.start
                            && e.timestamp <= burst.end
                    })
                    .collect();
                insights.push(Insight {
                    insight_type: InsightType::Anomaly,
                    severity: LogLevel::Warn,
                    title: "Error burst".to_string(),
                    description: format!(
                        "{} of {} errors occurred in one {}s window starting {}",
                        burst.error_count,
                        total_errors,
                        (burst.end - burst.start).num_seconds(),
                        burst.start.format("%Y-%m-%d %H:%M:%S"),
                    ),
                    confidence: confidence(burst.error_count, ERROR_TREND_THRESHOLD),
                    evidence: sample(&burst_errors),
                    evidence_count: burst.error_count,
                });
            }
        }
    }

    insights
}

/// Convenience wrapper used by the engine after the analysis struct is
/// otherwise complete.
pub fn attach_insights(analysis: &mut Analysis) {
    analysis.insights = synthesize(
        &analysis.entries,
        &analysis.patterns,
        analysis.timeline.as_ref(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(offset_secs: i64, level: LogLevel, message: &str) -> LogEntry {
        LogEntry {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
                + chrono::Duration::seconds(offset_secs),
            level,
            message: message.to_string(),
            source: "app.log".to_string(),
            fields: None,
            line_number: offset_secs as u64 + 1,
        }
    }

    #[test]
    fn test_confidence_bounds() {
        assert!((confidence(0, 5) - 0.0).abs() < 1e-9);
        assert!((confidence(5, 5) - 0.5).abs() < 1e-9);
        assert!((confidence(10, 5) - 1.0).abs() < 1e-9);
        assert!((confidence(1_000, 5) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_error_trend_fires_on_high_rate() {
        let mut entries: Vec<LogEntry> = (0..6)
            .map(|i| entry(i, LogLevel::Error, "boom"))
            .collect();
        entries.extend((6..10).map(|i| entry(i, LogLevel::Info, "fine")));

        let insights = synthesize(&entries, &[], None);
        let trend = insights
            .iter()
            .find(|i| i.insight_type == InsightType::ErrorTrend)
            .expect("error-trend insight expected");
        assert_eq!(trend.evidence_count, 6);
        assert!(trend.confidence > 0.0 && trend.confidence <= 1.0);
        assert_eq!(trend.evidence.len(), MAX_SAMPLE_ENTRIES);
    }

    #[test]
    fn test_error_trend_silent_below_thresholds() {
        // Two errors out of two hundred: rate far below threshold.
        let mut entries: Vec<LogEntry> = (0..198)
            .map(|i| entry(i, LogLevel::Info, "fine"))
            .collect();
        entries.push(entry(198, LogLevel::Error, "boom"));
        entries.push(entry(199, LogLevel::Error, "boom"));

        let insights = synthesize(&entries, &[], None);
        assert!(insights
            .iter()
            .all(|i| i.insight_type != InsightType::ErrorTrend));
    }

    #[test]
    fn test_performance_insight_from_timeout_messages() {
        let entries: Vec<LogEntry> = (0..4)
            .map(|i| entry(i, LogLevel::Warn, "request timed out after 30s"))
            .collect();

        let insights = synthesize(&entries, &[], None);
        let perf = insights
            .iter()
            .find(|i| i.insight_type == InsightType::Performance)
            .expect("performance insight expected");
        assert_eq!(perf.title, "Slow response times detected");
        assert_eq!(perf.evidence_count, 4);
    }

    #[test]
    fn test_determinism() {
        let entries: Vec<LogEntry> = (0..8)
            .map(|i| entry(i, LogLevel::Error, "timeout talking to db"))
            .collect();
        let a = synthesize(&entries, &[], None);
        let b = synthesize(&entries, &[], None);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.title, y.title);
            assert!((x.confidence - y.confidence).abs() < 1e-12);
        }
    }

    #[test]
    fn test_empty_input_yields_no_insights() {
        assert!(synthesize(&[], &[], None).is_empty());
    }
}
