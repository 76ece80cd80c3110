// LogLens - cli.rs
//
// Command-line surface: a thin wrapper over the library operations.
// Parsing, analysis, correlation, and rendering all live in the
// library; this module only wires them together.

use crate::config::{AppConfig, OutputFormat};
use crate::core::analyze::{AnalysisConfig, Engine};
use crate::core::parser::{self, ParseConfig};
use crate::core::pattern::{self, CompiledPattern};
use crate::correlate::correlator::{Correlator, HybridSearchConfig};
use crate::docstore::scanner;
use crate::docstore::store::{DocumentStore, MemoryStore};
use crate::util::error::{LogLensError, Result};
use crate::vector::store::{InMemoryVectorStore, VectorStore, VectorStoreConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// Offline log analysis with pattern detection and documentation
/// correlation.
#[derive(Debug, Parser)]
#[command(name = "loglens", version, about)]
pub struct Cli {
    /// Enable debug logging.
    #[arg(long, global = true)]
    pub debug: bool,

    /// Configuration file (YAML).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Analyse a log file against the pattern catalog.
    Analyze {
        /// Log file to analyse.
        file: PathBuf,

        /// Additional pattern catalog files.
        #[arg(long = "patterns")]
        patterns: Vec<PathBuf>,

        /// Documentation corpus directory for correlation.
        #[arg(long)]
        docs: Option<PathBuf>,

        /// Output format: text, json, markdown, csv.
        #[arg(long)]
        format: Option<String>,

        /// Disable the semantic vector pass (keyword-only correlation).
        #[arg(long)]
        no_vector: bool,
    },
}

/// Execute a parsed command. Returns the rendered report.
pub fn run(cli: &Cli) -> Result<String> {
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::from_env()?,
    };

    match &cli.command {
        Command::Analyze {
            file,
            patterns,
            docs,
            format,
            no_vector,
        } => analyze_command(&config, file, patterns, docs.as_deref(), format.as_deref(), *no_vector),
    }
}

fn analyze_command(
    config: &AppConfig,
    file: &PathBuf,
    extra_patterns: &[PathBuf],
    docs: Option<&std::path::Path>,
    format: Option<&str>,
    no_vector: bool,
) -> Result<String> {
    // Pattern catalog: built-ins, then configured sources, then CLI
    // extras (later sources win id conflicts).
    let mut compiled: Vec<CompiledPattern> = Vec::new();
    if config.patterns.enable_defaults {
        compiled.extend(pattern::builtin_patterns());
    }
    let mut catalog_files: Vec<PathBuf> = Vec::new();
    for dir in &config.patterns.directories {
        if let Ok(read) = std::fs::read_dir(dir) {
            for entry in read.flatten() {
                let path = entry.path();
                if matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("yaml") | Some("yml")
                ) {
                    catalog_files.push(path);
                }
            }
        }
    }
    catalog_files.sort();
    catalog_files.extend(config.patterns.custom_patterns.iter().cloned());
    catalog_files.extend(extra_patterns.iter().cloned());
    let loaded = pattern::load_catalog_files(&catalog_files);
    for error in &loaded.errors {
        tracing::warn!(error = %error, "Pattern catalog problem");
    }
    merge_patterns(&mut compiled, loaded.patterns);

    // Parse.
    let content = std::fs::read_to_string(file).map_err(|e| LogLensError::Io {
        path: file.clone(),
        operation: "read log file",
        source: e,
    })?;
    let parse_result = parser::parse_content(
        &content,
        &file.display().to_string(),
        &ParseConfig {
            max_line_length: config.analysis.max_line_length,
        },
    );
    for (line, reason) in parse_result.skipped.iter().take(5) {
        tracing::warn!(line, reason, "Skipped unparseable line");
    }

    // Analyse.
    let engine = Engine::new(
        compiled,
        AnalysisConfig {
            timeline_buckets: config.analysis.timeline_buckets,
            cancel_check_period: config.analysis.cancel_check_period,
            max_entries: config.analysis.max_entries,
        },
    );
    let analysis = engine.analyze(&parse_result.entries, &AtomicBool::new(false))?;

    // Correlate when a corpus was supplied.
    let correlation = match docs {
        Some(docs_dir) => {
            let scan = scanner::scan_directory(docs_dir);
            for warning in &scan.warnings {
                tracing::warn!(warning, "Corpus scan problem");
            }
            let store = MemoryStore::new();
            store.add_batch(scan.documents)?;

            let mut correlator = Correlator::new(HybridSearchConfig {
                enable_vector: !no_vector,
                correlation_timeout: Duration::from_secs(config.analysis.correlation_timeout),
                indexing_timeout: Duration::from_secs(config.analysis.indexing_timeout),
                ..Default::default()
            })?;
            let store: Arc<dyn DocumentStore> = Arc::new(store);
            correlator.set_document_store(Arc::clone(&store));
            if !no_vector {
                let vector_store: Arc<dyn VectorStore> =
                    Arc::new(InMemoryVectorStore::new(VectorStoreConfig {
                        timeout: Duration::from_secs(config.analysis.vector_timeout),
                        ..Default::default()
                    }));
                correlator.set_vector_store(vector_store);
                correlator.index_documents()?;
            }
            Some(correlator.correlate(&analysis)?)
        }
        None => None,
    };

    let format = match format {
        Some(raw) => OutputFormat::parse(raw).ok_or_else(|| {
            crate::util::error::ConfigError::ValueOutOfRange {
                field: "--format".to_string(),
                value: raw.to_string(),
                expected: "text, json, markdown, or csv".to_string(),
            }
        })?,
        None => config.output.default_format,
    };

    crate::output::render(&analysis, correlation.as_ref(), format)
}

/// Merge later-loaded patterns over earlier ones by id.
fn merge_patterns(base: &mut Vec<CompiledPattern>, extra: Vec<CompiledPattern>) {
    for pattern in extra {
        match base
            .iter()
            .position(|p| p.pattern.id == pattern.pattern.id)
        {
            Some(idx) => {
                tracing::warn!(id = %pattern.pattern.id, "Pattern overrides an earlier definition");
                base[idx] = pattern;
            }
            None => base.push(pattern),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_analyze_args() {
        let cli = Cli::parse_from([
            "loglens", "analyze", "app.log", "--docs", "docs/", "--format", "json",
        ]);
        match cli.command {
            Command::Analyze {
                file,
                docs,
                format,
                no_vector,
                ..
            } => {
                assert_eq!(file, PathBuf::from("app.log"));
                assert_eq!(docs, Some(PathBuf::from("docs/")));
                assert_eq!(format.as_deref(), Some("json"));
                assert!(!no_vector);
            }
        }
    }
}
