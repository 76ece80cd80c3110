// LogLens - config/mod.rs
//
// Application configuration: YAML file with serde defaults, overridden
// by LOGLENS_-prefixed environment variables. Invalid types fail
// loading with a precise error naming the offending field or variable.

use crate::util::constants::{
    DEFAULT_AI_TIMEOUT_SECS, DEFAULT_BUFFER_SIZE, DEFAULT_CANCEL_CHECK_PERIOD,
    DEFAULT_CORRELATION_TIMEOUT_SECS, DEFAULT_INDEXING_TIMEOUT_SECS, DEFAULT_MAX_ENTRIES,
    DEFAULT_MAX_LINE_LENGTH, DEFAULT_TIMELINE_BUCKETS, DEFAULT_VECTOR_TIMEOUT_SECS, ENV_PREFIX,
    MAX_TIMELINE_BUCKETS,
};
use crate::util::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// =============================================================================
// Sections
// =============================================================================

/// AI enrichment settings. The AI pass is strictly optional; analysis
/// and correlation never require it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub provider: String,
    pub model: String,
    pub endpoint: String,
    /// Request timeout in seconds.
    pub timeout: u64,
    pub api_key: String,
    pub max_retries: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: String::new(),
            endpoint: String::new(),
            timeout: DEFAULT_AI_TIMEOUT_SECS,
            api_key: String::new(),
            max_retries: 0,
        }
    }
}

/// Report output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub default_format: OutputFormat,
    pub verbose: bool,
    pub color_mode: ColorMode,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_format: OutputFormat::Text,
            verbose: false,
            color_mode: ColorMode::Auto,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Markdown,
    Csv,
}

impl OutputFormat {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            "markdown" | "md" => Some(Self::Markdown),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

/// Analysis and correlation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub max_entries: usize,
    pub timeline_buckets: usize,
    pub buffer_size: usize,
    pub max_line_length: usize,
    /// Deadline for a single vector operation, seconds.
    pub vector_timeout: u64,
    /// Deadline for a correlation pass, seconds.
    pub correlation_timeout: u64,
    /// Deadline for corpus indexing, seconds.
    pub indexing_timeout: u64,
    pub cancel_check_period: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            timeline_buckets: DEFAULT_TIMELINE_BUCKETS,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            vector_timeout: DEFAULT_VECTOR_TIMEOUT_SECS,
            correlation_timeout: DEFAULT_CORRELATION_TIMEOUT_SECS,
            indexing_timeout: DEFAULT_INDEXING_TIMEOUT_SECS,
            cancel_check_period: DEFAULT_CANCEL_CHECK_PERIOD,
        }
    }
}

/// Pattern catalog settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternSettings {
    /// Directories scanned for *.yaml / *.yml catalog files.
    pub directories: Vec<PathBuf>,

    /// Individual catalog files loaded after the directories.
    pub custom_patterns: Vec<PathBuf>,

    /// Load the built-in catalog first.
    pub enable_defaults: bool,
}

impl Default for PatternSettings {
    fn default() -> Self {
        Self {
            directories: Vec::new(),
            custom_patterns: Vec::new(),
            enable_defaults: true,
        }
    }
}

// =============================================================================
// Top-level config
// =============================================================================

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ai: AiConfig,
    pub output: OutputConfig,
    pub analysis: AnalysisSettings,
    pub patterns: PatternSettings,
}

/// Providers the AI layer knows how to talk to.
const KNOWN_PROVIDERS: &[&str] = &["ollama", "openai", "anthropic", "none"];

impl AppConfig {
    /// Load from a YAML file, apply environment overrides, validate.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut config: AppConfig =
            serde_yaml::from_str(&raw).map_err(|e| ConfigError::YamlParse {
                path: path.to_path_buf(),
                source: e,
            })?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides (no file).
    pub fn from_env() -> Result<Self> {
        let mut config = AppConfig::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `LOGLENS_SECTION_FIELD` environment overrides. An override
    /// with the wrong type fails loading.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        fn var(name: &str) -> Option<(String, String)> {
            let full = format!("{ENV_PREFIX}{name}");
            std::env::var(&full).ok().map(|v| (full, v))
        }
        fn parse<T: std::str::FromStr>(
            variable: String,
            value: String,
            expected: &'static str,
        ) -> Result<T> {
            value.parse().map_err(|_| {
                ConfigError::InvalidEnvValue {
                    variable,
                    value,
                    expected,
                }
                .into()
            })
        }

        if let Some((_, v)) = var("AI_PROVIDER") {
            self.ai.provider = v;
        }
        if let Some((_, v)) = var("AI_MODEL") {
            self.ai.model = v;
        }
        if let Some((_, v)) = var("AI_ENDPOINT") {
            self.ai.endpoint = v;
        }
        if let Some((name, v)) = var("AI_TIMEOUT") {
            self.ai.timeout = parse(name, v, "integer number of seconds")?;
        }
        if let Some((_, v)) = var("AI_API_KEY") {
            self.ai.api_key = v;
        }
        if let Some((name, v)) = var("AI_MAX_RETRIES") {
            self.ai.max_retries = parse(name, v, "non-negative integer")?;
        }

        if let Some((name, v)) = var("OUTPUT_DEFAULT_FORMAT") {
            self.output.default_format =
                OutputFormat::parse(&v).ok_or(ConfigError::InvalidEnvValue {
                    variable: name,
                    value: v,
                    expected: "one of text, json, markdown, csv",
                })?;
        }
        if let Some((name, v)) = var("OUTPUT_VERBOSE") {
            self.output.verbose = parse(name, v, "boolean")?;
        }

        if let Some((name, v)) = var("ANALYSIS_MAX_ENTRIES") {
            self.analysis.max_entries = parse(name, v, "positive integer")?;
        }
        if let Some((name, v)) = var("ANALYSIS_TIMELINE_BUCKETS") {
            self.analysis.timeline_buckets = parse(name, v, "positive integer")?;
        }
        if let Some((name, v)) = var("ANALYSIS_CANCEL_CHECK_PERIOD") {
            self.analysis.cancel_check_period = parse(name, v, "positive integer")?;
        }
        if let Some((name, v)) = var("ANALYSIS_VECTOR_TIMEOUT") {
            self.analysis.vector_timeout = parse(name, v, "integer number of seconds")?;
        }
        if let Some((name, v)) = var("ANALYSIS_CORRELATION_TIMEOUT") {
            self.analysis.correlation_timeout = parse(name, v, "integer number of seconds")?;
        }
        if let Some((name, v)) = var("ANALYSIS_INDEXING_TIMEOUT") {
            self.analysis.indexing_timeout = parse(name, v, "integer number of seconds")?;
        }

        if let Some((_, v)) = var("PATTERNS_DIRECTORIES") {
            self.patterns.directories = v.split(',').map(PathBuf::from).collect();
        }
        if let Some((name, v)) = var("PATTERNS_ENABLE_DEFAULTS") {
            self.patterns.enable_defaults = parse(name, v, "boolean")?;
        }

        Ok(())
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if !KNOWN_PROVIDERS.contains(&self.ai.provider.as_str()) {
            return Err(ConfigError::UnknownProvider {
                provider: self.ai.provider.clone(),
            }
            .into());
        }
        if self.analysis.timeline_buckets == 0
            || self.analysis.timeline_buckets > MAX_TIMELINE_BUCKETS
        {
            return Err(ConfigError::ValueOutOfRange {
                field: "analysis.timeline_buckets".to_string(),
                value: self.analysis.timeline_buckets.to_string(),
                expected: format!("1..={MAX_TIMELINE_BUCKETS}"),
            }
            .into());
        }
        if self.analysis.cancel_check_period == 0 {
            return Err(ConfigError::ValueOutOfRange {
                field: "analysis.cancel_check_period".to_string(),
                value: "0".to_string(),
                expected: ">= 1".to_string(),
            }
            .into());
        }
        if self.analysis.max_entries == 0 {
            return Err(ConfigError::ValueOutOfRange {
                field: "analysis.max_entries".to_string(),
                value: "0".to_string(),
                expected: ">= 1".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::error::LogLensError;
    use std::io::Write;

    // Environment-variable tests mutate process state; each uses a
    // distinct variable so they stay independent under parallel runs.

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.ai.provider, "ollama");
        assert_eq!(config.ai.timeout, 30);
        assert_eq!(config.analysis.max_entries, 100_000);
        assert_eq!(config.analysis.timeline_buckets, 12);
        assert_eq!(config.analysis.cancel_check_period, 100);
        assert_eq!(config.output.default_format, OutputFormat::Text);
        assert!(config.patterns.enable_defaults);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "ai:\n  provider: none\nanalysis:\n  timeline_buckets: 24\noutput:\n  default_format: json\n"
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.ai.provider, "none");
        assert_eq!(config.analysis.timeline_buckets, 24);
        assert_eq!(config.output.default_format, OutputFormat::Json);
        // Unspecified sections keep their defaults.
        assert_eq!(config.analysis.max_entries, 100_000);
    }

    #[test]
    fn test_malformed_yaml_fails_with_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "analysis: [not a map").unwrap();
        assert!(matches!(
            AppConfig::load(file.path()),
            Err(LogLensError::Config(ConfigError::YamlParse { .. }))
        ));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let config = AppConfig {
            ai: AiConfig {
                provider: "skynet".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(LogLensError::Config(ConfigError::UnknownProvider { .. }))
        ));
    }

    #[test]
    fn test_bucket_range_validated() {
        let config = AppConfig {
            analysis: AnalysisSettings {
                timeline_buckets: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_override_applies() {
        std::env::set_var("LOGLENS_ANALYSIS_TIMELINE_BUCKETS", "6");
        let mut config = AppConfig::default();
        config.apply_env_overrides().unwrap();
        std::env::remove_var("LOGLENS_ANALYSIS_TIMELINE_BUCKETS");
        assert_eq!(config.analysis.timeline_buckets, 6);
    }

    #[test]
    fn test_env_override_wrong_type_fails() {
        std::env::set_var("LOGLENS_ANALYSIS_MAX_ENTRIES", "a-lot");
        let mut config = AppConfig::default();
        let result = config.apply_env_overrides();
        std::env::remove_var("LOGLENS_ANALYSIS_MAX_ENTRIES");
        assert!(matches!(
            result,
            Err(LogLensError::Config(ConfigError::InvalidEnvValue { .. }))
        ));
    }

    #[test]
    fn test_env_override_format_list() {
        std::env::set_var("LOGLENS_OUTPUT_DEFAULT_FORMAT", "sideways");
        let mut config = AppConfig::default();
        let result = config.apply_env_overrides();
        std::env::remove_var("LOGLENS_OUTPUT_DEFAULT_FORMAT");
        assert!(result.is_err());
    }
}
