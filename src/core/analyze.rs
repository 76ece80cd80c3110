// LogLens - core/analyze.rs
//
// The analysis engine: streams entries through the compiled pattern
// set, tallies levels, buckets the timeline, and synthesizes insights.
//
// Single-threaded per invocation, re-entrant across invocations.
// Cancellation is cooperative: the caller-supplied flag is checked at
// least every `cancel_check_period` entries, and a cancelled run
// returns Err(Cancelled) with no partial result.

use crate::core::insight;
use crate::core::model::{Analysis, LogEntry, PatternMatch, TimeBucket, Timeline};
use crate::core::pattern::CompiledPattern;
use crate::util::constants::{
    DEFAULT_CANCEL_CHECK_PERIOD, DEFAULT_MAX_ENTRIES, DEFAULT_TIMELINE_BUCKETS,
    MAX_TIMELINE_BUCKETS,
};
use crate::util::error::{LogLensError, ResourceError, Result};
use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicBool, Ordering};

// =============================================================================
// Configuration
// =============================================================================

/// Analysis engine configuration.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Number of equal-width timeline buckets.
    pub timeline_buckets: usize,

    /// Entries processed between cancellation checks.
    pub cancel_check_period: usize,

    /// Maximum entries accepted per analysis.
    pub max_entries: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            timeline_buckets: DEFAULT_TIMELINE_BUCKETS,
            cancel_check_period: DEFAULT_CANCEL_CHECK_PERIOD,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

// =============================================================================
// Engine
// =============================================================================

/// The analysis engine. Holds the compiled pattern set and
/// configuration; `analyze` may be called any number of times.
pub struct Engine {
    patterns: Vec<CompiledPattern>,
    config: AnalysisConfig,
}

impl Engine {
    pub fn new(patterns: Vec<CompiledPattern>, config: AnalysisConfig) -> Self {
        let config = AnalysisConfig {
            timeline_buckets: config.timeline_buckets.clamp(1, MAX_TIMELINE_BUCKETS),
            cancel_check_period: config.cancel_check_period.max(1),
            ..config
        };
        Self { patterns, config }
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Analyse a slice of entries against the pattern set.
    ///
    /// Returns the full `Analysis`, or `Err(Cancelled)` when the cancel
    /// flag is observed set, or a resource error when the entry cap is
    /// exceeded.
    pub fn analyze(&self, entries: &[LogEntry], cancel: &AtomicBool) -> Result<Analysis> {
        if entries.len() > self.config.max_entries {
            return Err(ResourceError::TooManyEntries {
                count: entries.len(),
                max: self.config.max_entries,
            }
            .into());
        }

        let mut error_count = 0usize;
        let mut warn_count = 0usize;
        let mut start_time: Option<DateTime<Utc>> = None;
        let mut end_time: Option<DateTime<Utc>> = None;

        // Per-pattern accumulation, in catalog order.
        let mut matched: Vec<Vec<LogEntry>> = vec![Vec::new(); self.patterns.len()];

        for (idx, entry) in entries.iter().enumerate() {
            if idx % self.config.cancel_check_period == 0 && cancel.load(Ordering::Relaxed) {
                tracing::debug!(processed = idx, "Analysis cancelled");
                return Err(LogLensError::Cancelled);
            }

            if entry.level.is_error() {
                error_count += 1;
            } else if entry.level == crate::core::model::LogLevel::Warn {
                warn_count += 1;
            }

            start_time = Some(match start_time {
                Some(t) => t.min(entry.timestamp),
                None => entry.timestamp,
            });
            end_time = Some(match end_time {
                Some(t) => t.max(entry.timestamp),
                None => entry.timestamp,
            });

            for (pattern_idx, pattern) in self.patterns.iter().enumerate() {
                if pattern.matches(entry) {
                    matched[pattern_idx].push(entry.clone());
                }
            }
        }

        // A cancellation signalled mid-stream but after the last
        // periodic check still aborts before result assembly.
        if cancel.load(Ordering::Relaxed) {
            return Err(LogLensError::Cancelled);
        }

        let patterns: Vec<PatternMatch> = self
            .patterns
            .iter()
            .zip(matched)
            .filter(|(_, hits)| !hits.is_empty())
            .map(|(pattern, hits)| {
                let first_seen = hits.iter().map(|e| e.timestamp).min().expect("non-empty");
                let last_seen = hits.iter().map(|e| e.timestamp).max().expect("non-empty");
                PatternMatch {
                    pattern: pattern.pattern.clone(),
                    count: hits.len(),
                    entries: hits,
                    first_seen,
                    last_seen,
                }
            })
            .collect();

        let timeline = match (start_time, end_time) {
            (Some(start), Some(end)) => Some(build_timeline(
                entries,
                start,
                end,
                self.config.timeline_buckets,
            )),
            _ => None,
        };

        let mut analysis = Analysis {
            total_entries: entries.len(),
            error_count,
            warn_count,
            start_time,
            end_time,
            patterns,
            insights: Vec::new(),
            timeline,
            entries: entries.to_vec(),
        };
        insight::attach_insights(&mut analysis);

        tracing::debug!(
            entries = analysis.total_entries,
            errors = analysis.error_count,
            patterns_matched = analysis.patterns.len(),
            insights = analysis.insights.len(),
            "Analysis complete"
        );
        Ok(analysis)
    }
}

// =============================================================================
// Timeline bucketing
// =============================================================================

/// Partition [start, end] into `bucket_count` contiguous equal buckets
/// and assign each entry to its bucket. A zero-width span collapses to
/// a single bucket holding every entry.
fn build_timeline(
    entries: &[LogEntry],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    bucket_count: usize,
) -> Timeline {
    let span_ms = (end - start).num_milliseconds();
    if span_ms <= 0 {
        let mut bucket = TimeBucket {
            start,
            end,
            entry_count: 0,
            error_count: 0,
            warn_count: 0,
        };
        for entry in entries {
            tally(&mut bucket, entry);
        }
        return Timeline {
            bucket_size: Duration::zero(),
            buckets: vec![bucket],
        };
    }

    let bucket_count = bucket_count.max(1);
    // Milliseconds per bucket, rounded up so bucket_count * width covers
    // the whole span.
    let width_ms = (span_ms + bucket_count as i64 - 1) / bucket_count as i64;
    let width = Duration::milliseconds(width_ms);

    let mut buckets: Vec<TimeBucket> = (0..bucket_count)
        .map(|i| {
            let bucket_start = start + Duration::milliseconds(width_ms * i as i64);
            let bucket_end = if i + 1 == bucket_count {
                end
            } else {
                start + Duration::milliseconds(width_ms * (i as i64 + 1))
            };
            TimeBucket {
                start: bucket_start,
                end: bucket_end,
                entry_count: 0,
                error_count: 0,
                warn_count: 0,
            }
        })
        .collect();

    for entry in entries {
        let offset_ms = (entry.timestamp - start).num_milliseconds().max(0);
        let idx = ((offset_ms / width_ms) as usize).min(bucket_count - 1);
        tally(&mut buckets[idx], entry);
    }

    Timeline {
        bucket_size: width,
        buckets,
    }
}

fn tally(bucket: &mut TimeBucket, entry: &LogEntry) {
    bucket.entry_count += 1;
    if entry.level.is_error() {
        bucket.error_count += 1;
    } else if entry.level == crate::core::model::LogLevel::Warn {
        bucket.warn_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::LogLevel;
    use crate::core::pattern;
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn entry(offset_secs: i64, level: LogLevel, message: &str) -> LogEntry {
        LogEntry {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
                + Duration::seconds(offset_secs),
            level,
            message: message.to_string(),
            source: "app.log".to_string(),
            fields: None,
            line_number: (offset_secs + 1) as u64,
        }
    }

    fn patterns(yaml: &str) -> Vec<pattern::CompiledPattern> {
        let result =
            pattern::load_catalog(&[(PathBuf::from("test.yaml"), yaml.to_string())]);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        result.patterns
    }

    fn engine(yaml: &str) -> Engine {
        Engine::new(patterns(yaml), AnalysisConfig::default())
    }

    fn no_cancel() -> AtomicBool {
        AtomicBool::new(false)
    }

    #[test]
    fn test_tallies_and_time_range() {
        let engine = engine("- id: p\n  type: error\n  keywords: [boom]\n");
        let entries = vec![
            entry(0, LogLevel::Info, "starting"),
            entry(10, LogLevel::Warn, "slowish"),
            entry(20, LogLevel::Error, "boom"),
            entry(30, LogLevel::Fatal, "boom boom"),
        ];

        let analysis = engine.analyze(&entries, &no_cancel()).unwrap();
        assert_eq!(analysis.total_entries, 4);
        assert_eq!(analysis.error_count, 2);
        assert_eq!(analysis.warn_count, 1);
        assert_eq!(
            analysis.start_time.unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
        );
        assert_eq!(
            analysis.end_time.unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 30).unwrap()
        );
    }

    #[test]
    fn test_pattern_matches_with_first_last_seen() {
        let engine = engine("- id: p\n  type: error\n  keywords: [timeout]\n");
        let entries = vec![
            entry(0, LogLevel::Info, "ok"),
            entry(5, LogLevel::Error, "timeout A"),
            entry(25, LogLevel::Error, "timeout B"),
        ];

        let analysis = engine.analyze(&entries, &no_cancel()).unwrap();
        assert_eq!(analysis.patterns.len(), 1);
        let matched = &analysis.patterns[0];
        assert_eq!(matched.count, 2);
        assert_eq!(matched.first_seen, entries[1].timestamp);
        assert_eq!(matched.last_seen, entries[2].timestamp);
    }

    #[test]
    fn test_unmatched_patterns_omitted() {
        let engine = engine(
            "- id: hit\n  type: error\n  keywords: [boom]\n\
             - id: miss\n  type: error\n  keywords: [unseen]\n",
        );
        let entries = vec![entry(0, LogLevel::Error, "boom")];
        let analysis = engine.analyze(&entries, &no_cancel()).unwrap();
        assert_eq!(analysis.patterns.len(), 1);
        assert_eq!(analysis.patterns[0].pattern.id, "hit");
    }

    #[test]
    fn test_timeline_buckets_partition_span() {
        let engine = Engine::new(
            patterns("- id: p\n  type: error\n  keywords: [x]\n"),
            AnalysisConfig {
                timeline_buckets: 4,
                ..Default::default()
            },
        );
        // 40 seconds of entries, one every 10s.
        let entries: Vec<LogEntry> = (0..5)
            .map(|i| {
                entry(
                    i * 10,
                    if i == 4 { LogLevel::Error } else { LogLevel::Info },
                    "tick",
                )
            })
            .collect();

        let analysis = engine.analyze(&entries, &no_cancel()).unwrap();
        let timeline = analysis.timeline.unwrap();
        assert_eq!(timeline.buckets.len(), 4);

        // Buckets are contiguous and cover [start, end].
        assert_eq!(timeline.buckets[0].start, analysis.start_time.unwrap());
        assert_eq!(
            timeline.buckets.last().unwrap().end,
            analysis.end_time.unwrap()
        );
        for pair in timeline.buckets.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }

        // Every entry lands in exactly one bucket.
        let total: usize = timeline.buckets.iter().map(|b| b.entry_count).sum();
        assert_eq!(total, 5);
        // The final entry is the error and sits in the last bucket.
        assert_eq!(timeline.buckets.last().unwrap().error_count, 1);
    }

    #[test]
    fn test_single_timestamp_collapses_to_one_bucket() {
        let engine = engine("- id: p\n  type: error\n  keywords: [x]\n");
        let entries = vec![
            entry(0, LogLevel::Info, "a"),
            entry(0, LogLevel::Error, "b"),
        ];
        let analysis = engine.analyze(&entries, &no_cancel()).unwrap();
        let timeline = analysis.timeline.unwrap();
        assert_eq!(timeline.buckets.len(), 1);
        assert_eq!(timeline.buckets[0].entry_count, 2);
        assert_eq!(timeline.buckets[0].error_count, 1);
    }

    #[test]
    fn test_empty_input_produces_empty_analysis() {
        let engine = engine("- id: p\n  type: error\n  keywords: [x]\n");
        let analysis = engine.analyze(&[], &no_cancel()).unwrap();
        assert_eq!(analysis.total_entries, 0);
        assert!(analysis.patterns.is_empty());
        assert!(analysis.timeline.is_none());
        assert!(analysis.start_time.is_none());
    }

    /// Cancellation signalled before the run aborts within one check
    /// period: the engine returns Err(Cancelled) and no partial result.
    #[test]
    fn test_pre_signalled_cancellation() {
        let engine = engine("- id: p\n  type: error\n  keywords: [x]\n");
        let entries: Vec<LogEntry> =
            (0..500).map(|i| entry(i, LogLevel::Info, "tick")).collect();

        let cancel = AtomicBool::new(true);
        let result = engine.analyze(&entries, &cancel);
        assert!(matches!(result, Err(LogLensError::Cancelled)));
    }

    #[test]
    fn test_entry_cap_enforced() {
        let engine = Engine::new(
            patterns("- id: p\n  type: error\n  keywords: [x]\n"),
            AnalysisConfig {
                max_entries: 10,
                ..Default::default()
            },
        );
        let entries: Vec<LogEntry> =
            (0..11).map(|i| entry(i, LogLevel::Info, "tick")).collect();
        let result = engine.analyze(&entries, &no_cancel());
        assert!(matches!(
            result,
            Err(LogLensError::Resource(ResourceError::TooManyEntries { .. }))
        ));
    }

    #[test]
    fn test_reentrant_across_invocations() {
        let engine = engine("- id: p\n  type: error\n  keywords: [boom]\n");
        let entries = vec![entry(0, LogLevel::Error, "boom")];
        let a = engine.analyze(&entries, &no_cancel()).unwrap();
        let b = engine.analyze(&entries, &no_cancel()).unwrap();
        assert_eq!(a.patterns.len(), b.patterns.len());
        assert_eq!(a.error_count, b.error_count);
    }
}
