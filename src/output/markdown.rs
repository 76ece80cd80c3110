// LogLens - output/markdown.rs
//
// Markdown report, suitable for pasting into an incident document.

use crate::core::model::Analysis;
use crate::correlate::CorrelationResult;
use crate::util::constants::MAX_SAMPLE_ENTRIES;
use std::fmt::Write;

/// Render the analysis (and correlation, when present) as markdown.
pub fn render(analysis: &Analysis, correlation: Option<&CorrelationResult>) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# Log Analysis\n");
    let _ = writeln!(out, "| Metric | Value |");
    let _ = writeln!(out, "|---|---|");
    let _ = writeln!(out, "| Entries | {} |", analysis.total_entries);
    let _ = writeln!(out, "| Errors | {} |", analysis.error_count);
    let _ = writeln!(out, "| Warnings | {} |", analysis.warn_count);
    if let (Some(start), Some(end)) = (analysis.start_time, analysis.end_time) {
        let _ = writeln!(
            out,
            "| Range | {} — {} |",
            start.format("%Y-%m-%d %H:%M:%S"),
            end.format("%Y-%m-%d %H:%M:%S")
        );
    }

    if !analysis.patterns.is_empty() {
        let _ = writeln!(out, "\n## Patterns\n");
        for matched in &analysis.patterns {
            let _ = writeln!(
                out,
                "### {} (`{}`, {} matches)\n",
                matched.pattern.name,
                matched.pattern.pattern_type.label(),
                matched.count
            );
            if !matched.pattern.description.is_empty() {
                let _ = writeln!(out, "{}\n", matched.pattern.description);
            }
            for entry in matched.entries.iter().take(MAX_SAMPLE_ENTRIES) {
                let _ = writeln!(out, "- line {}: `{}`", entry.line_number, entry.message);
            }
            let _ = writeln!(out);
        }
    }

    if !analysis.insights.is_empty() {
        let _ = writeln!(out, "## Insights\n");
        for insight in &analysis.insights {
            let _ = writeln!(
                out,
                "- **{}** ({:.0}% confidence): {}",
                insight.title,
                insight.confidence * 100.0,
                insight.description
            );
        }
        let _ = writeln!(out);
    }

    if let Some(correlation) = correlation {
        let _ = writeln!(out, "## Related Documentation\n");
        for pc in &correlation.correlations {
            let _ = writeln!(out, "### {}\n", pc.pattern.name);
            for m in &pc.matches {
                let _ = writeln!(
                    out,
                    "- [{}]({}) — score {:.3} ({})",
                    m.document.title,
                    m.document.path.display(),
                    m.score,
                    m.method.label()
                );
                if !m.snippet.is_empty() {
                    let _ = writeln!(out, "  > {}", m.snippet);
                }
            }
            let _ = writeln!(out);
        }
        for ec in &correlation.error_correlations {
            let _ = writeln!(
                out,
                "### {} (confidence {:.2})\n",
                ec.error_type, ec.confidence
            );
            for m in &ec.matches {
                let _ = writeln!(
                    out,
                    "- [{}]({}) — score {:.3} ({})",
                    m.document.title,
                    m.document.path.display(),
                    m.score,
                    m.method.label()
                );
            }
            let _ = writeln!(out);
        }
    }

    out
}
