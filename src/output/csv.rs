// LogLens - output/csv.rs
//
// CSV report: one row per pattern-matched entry, for spreadsheet
// triage. Writes to any Write target.

use crate::core::model::Analysis;
use std::io::Write;

/// Export pattern-matched entries as CSV. Returns the row count.
pub fn render<W: Write>(analysis: &Analysis, writer: W) -> Result<usize, csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record([
        "pattern_id",
        "pattern_type",
        "timestamp",
        "level",
        "line",
        "source",
        "message",
    ])?;

    let mut count = 0;
    for matched in &analysis.patterns {
        for entry in &matched.entries {
            csv_writer.write_record([
                matched.pattern.id.as_str(),
                matched.pattern.pattern_type.label(),
                &entry.timestamp.to_rfc3339(),
                entry.level.label(),
                &entry.line_number.to_string(),
                entry.source.as_str(),
                entry.message.as_str(),
            ])?;
            count += 1;
        }
    }

    csv_writer.flush()?;
    Ok(count)
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
    fn test_csv_rows_per_matched_entry() {
        let result = pattern::load_catalog(&[(
            PathBuf::from("t.yaml"),
            "- id: boom\n  type: error\n  keywords: [boom]\n".to_string(),
        )]);
        let engine = Engine::new(result.patterns, AnalysisConfig::default());
        let entries: Vec<LogEntry> = (0..2)
            .map(|i| LogEntry {
                timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, i).unwrap(),
                level: LogLevel::Error,
                message: format!("boom {i}"),
                source: "app.log".to_string(),
                fields: None,
                line_number: i as u64 + 1,
            })
            .collect();
        let analysis = engine
            .analyze(&entries, &std::sync::atomic::AtomicBool::new(false))
            .unwrap();

        let mut buf = Vec::new();
        let count = render(&analysis, &mut buf).unwrap();
        assert_eq!(count, 2);

        let output = String::from_utf8(buf).unwrap();
        assert!(output.starts_with("pattern_id,pattern_type"));
        assert!(output.contains("boom 0"));
        assert!(output.contains("boom 1"));
    }
}
