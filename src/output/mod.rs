// LogLens - output/mod.rs
//
// Report formatters: text, JSON, markdown, CSV. All render an
// `Analysis` (and the correlation result where the format supports it)
// to a string; the caller decides where it goes.

pub mod csv;
pub mod json;
pub mod markdown;
pub mod text;

use crate::config::OutputFormat;
use crate::core::model::Analysis;
use crate::correlate::CorrelationResult;
use crate::util::error::{LogLensError, Result};
use std::path::PathBuf;

/// Render an analysis in the requested format.
///
/// The JSON shape is the stable machine interface and carries the
/// analysis only; text and markdown include the correlation section
/// when one is supplied.
pub fn render(
    analysis: &Analysis,
    correlation: Option<&CorrelationResult>,
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(text::render(analysis, correlation)),
        OutputFormat::Markdown => Ok(markdown::render(analysis, correlation)),
        OutputFormat::Json => json::render(analysis).map_err(|e| LogLensError::Io {
            path: PathBuf::from("<stdout>"),
            operation: "render JSON report",
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        }),
        OutputFormat::Csv => {
            let mut buf = Vec::new();
            csv::render(analysis, &mut buf).map_err(|e| LogLensError::Io {
                path: PathBuf::from("<stdout>"),
                operation: "render CSV report",
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            })?;
            String::from_utf8(buf).map_err(|e| LogLensError::Io {
                path: PathBuf::from("<stdout>"),
                operation: "render CSV report",
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            })
        }
    }
}
