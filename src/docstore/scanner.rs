// LogLens - docstore/scanner.rs
//
// Corpus loading: walks a documentation directory, parses markdown
// frontmatter and ATX-heading sections, and produces `Document` values
// ready for the store.
//
// Per-file failures (unreadable, oversized, non-UTF-8) are non-fatal:
// they are logged, recorded as warnings, and the scan continues.

use crate::docstore::document::{DocMetadata, Document, Section};
use crate::util::constants::{DOCUMENT_EXTENSIONS, MAX_DOCUMENT_SIZE, MAX_SCAN_DEPTH};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;
use walkdir::WalkDir;

/// Result of scanning a corpus directory.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Successfully loaded documents.
    pub documents: Vec<Document>,

    /// Human-readable notes about files that were skipped.
    pub warnings: Vec<String>,
}

/// Recursively load all recognised documents under `root`.
///
/// Files are recognised by extension (see DOCUMENT_EXTENSIONS). Hidden
/// directories are not descended into.
pub fn scan_directory(root: &Path) -> ScanResult {
    let mut result = ScanResult::default();

    if !root.is_dir() {
        result
            .warnings
            .push(format!("'{}' is not a directory", root.display()));
        return result;
    }

    let walker = WalkDir::new(root)
        .max_depth(MAX_SCAN_DEPTH)
        .into_iter()
        .filter_entry(|e| {
            // Skip hidden directories (.git and friends).
            !(e.file_type().is_dir()
                && e.file_name()
                    .to_str()
                    .map(|n| n.starts_with('.'))
                    .unwrap_or(false))
        });

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                result.warnings.push(format!("traversal error: {e}"));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        if !matches!(extension.as_deref(), Some(ext) if DOCUMENT_EXTENSIONS.contains(&ext)) {
            continue;
        }

        match load_document(path) {
            Ok(doc) => result.documents.push(doc),
            Err(reason) => {
                tracing::warn!(path = %path.display(), reason, "Skipping corpus file");
                result.warnings.push(format!("{}: {reason}", path.display()));
            }
        }
    }

    tracing::info!(
        root = %root.display(),
        documents = result.documents.len(),
        warnings = result.warnings.len(),
        "Corpus scan complete"
    );
    result
}

/// Load a single corpus file into a `Document`.
pub fn load_document(path: &Path) -> std::result::Result<Document, String> {
    let meta = std::fs::metadata(path).map_err(|e| format!("stat failed: {e}"))?;
    if meta.len() > MAX_DOCUMENT_SIZE {
        return Err(format!(
            "file is {} bytes, exceeds maximum of {MAX_DOCUMENT_SIZE}",
            meta.len()
        ));
    }
    let raw = std::fs::read_to_string(path).map_err(|e| format!("read failed: {e}"))?;
    let last_modified: Option<DateTime<Utc>> = meta.modified().ok().map(DateTime::from);

    Ok(parse_document(path, &raw, meta.len(), last_modified))
}

/// Build a `Document` from raw file content: strip and parse the
/// frontmatter, split sections, and derive the title.
pub fn parse_document(
    path: &Path,
    raw: &str,
    size: u64,
    last_modified: Option<DateTime<Utc>>,
) -> Document {
    let (mut metadata, body) = parse_frontmatter(raw);
    if metadata.format.is_empty() {
        metadata.format = match path.extension().and_then(|e| e.to_str()) {
            Some("md") | Some("markdown") => "markdown".to_string(),
            _ => "text".to_string(),
        };
    }

    let sections = parse_sections(body);
    let title = metadata
        .custom
        .get("title")
        .cloned()
        .or_else(|| {
            sections
                .iter()
                .find(|s| !s.heading.is_empty())
                .map(|s| s.heading.clone())
        })
        .unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

    Document {
        id: Document::id_from_path(path),
        path: path.to_path_buf(),
        title,
        content: body.to_string(),
        metadata,
        sections,
        last_modified,
        size,
        hash: Document::content_hash(body),
    }
}

// =============================================================================
// Frontmatter
// =============================================================================

/// Extract YAML frontmatter (between leading `---` fences) into
/// metadata, returning the metadata and the remaining body.
///
/// Malformed frontmatter is left in place: the whole input becomes the
/// body and metadata stays default.
pub fn parse_frontmatter(raw: &str) -> (DocMetadata, &str) {
    let Some(rest) = raw.strip_prefix("---\n").or_else(|| raw.strip_prefix("---\r\n")) else {
        return (DocMetadata::default(), raw);
    };
    let Some(end) = rest.find("\n---").map(|i| {
        // Consume the closing fence line including its newline.
        let after = &rest[i + 1..];
        let fence_len = after.find('\n').map(|n| n + 1).unwrap_or(after.len());
        (i + 1, fence_len)
    }) else {
        return (DocMetadata::default(), raw);
    };
    let (yaml_len, fence_len) = end;
    let yaml = &rest[..yaml_len];
    let body = &rest[yaml_len + fence_len..];

    let parsed: Result<HashMap<String, serde_yaml::Value>, _> = serde_yaml::from_str(yaml);
    let mut metadata = DocMetadata::default();
    match parsed {
        Ok(map) => {
            for (key, value) in map {
                match key.as_str() {
                    "tags" => {
                        metadata.tags = match value {
                            serde_yaml::Value::Sequence(seq) => seq
                                .into_iter()
                                .filter_map(|v| yaml_to_string(&v))
                                .collect(),
                            other => yaml_to_string(&other)
                                .map(|s| vec![s])
                                .unwrap_or_default(),
                        }
                    }
                    "author" => metadata.author = yaml_to_string(&value).unwrap_or_default(),
                    "date" => metadata.date = yaml_to_string(&value).unwrap_or_default(),
                    "language" | "lang" => {
                        metadata.language = yaml_to_string(&value).unwrap_or_default()
                    }
                    "format" => metadata.format = yaml_to_string(&value).unwrap_or_default(),
                    _ => {
                        if let Some(s) = yaml_to_string(&value) {
                            metadata.custom.insert(key, s);
                        }
                    }
                }
            }
        }
        Err(e) => {
            tracing::debug!(error = %e, "Malformed frontmatter ignored");
            return (DocMetadata::default(), raw);
        }
    }

    (metadata, body.trim_start_matches('\n'))
}

fn yaml_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// =============================================================================
// Sections
// =============================================================================

/// Split a body into ATX-heading sections (`#` through `######`).
/// Content before the first heading, or a body with no headings at all,
/// becomes one implicit section with an empty heading.
pub fn parse_sections(body: &str) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    let mut current_heading = String::new();
    let mut current_level: u8 = 1;
    let mut current_start: usize = 1;
    let mut current_lines: Vec<&str> = Vec::new();
    let mut section_index = 0usize;

    let mut flush = |sections: &mut Vec<Section>,
                     heading: &str,
                     level: u8,
                     start: usize,
                     end: usize,
                     lines: &[&str],
                     index: &mut usize| {
        let content = lines.join("\n");
        // Skip the implicit leading section when it is empty.
        if heading.is_empty() && content.trim().is_empty() {
            return;
        }
        sections.push(Section {
            id: format!("s{}", *index),
            heading: heading.to_string(),
            word_count: content.split_whitespace().count(),
            content,
            level,
            start_line: start,
            end_line: end,
        });
        *index += 1;
    };

    for (idx, line) in body.lines().enumerate() {
        let line_number = idx + 1;
        if let Some((level, heading)) = parse_atx_heading(line) {
            flush(
                &mut sections,
                &current_heading,
                current_level,
                current_start,
                line_number.saturating_sub(1).max(current_start),
                &current_lines,
                &mut section_index,
            );
            current_heading = heading.to_string();
            current_level = level;
            current_start = line_number;
            current_lines = Vec::new();
        } else {
            current_lines.push(line);
        }
    }

    let total_lines = body.lines().count().max(1);
    flush(
        &mut sections,
        &current_heading,
        current_level,
        current_start,
        total_lines,
        &current_lines,
        &mut section_index,
    );

    // A heading-less body still yields its one implicit section even if
    // blank lines were all it contained.
    if sections.is_empty() && !body.trim().is_empty() {
        sections.push(Section {
            id: "s0".to_string(),
            heading: String::new(),
            content: body.to_string(),
            level: 1,
            start_line: 1,
            end_line: total_lines,
            word_count: body.split_whitespace().count(),
        });
    }

    sections
}

/// Parse an ATX heading line, returning (level, heading text).
fn parse_atx_heading(line: &str) -> Option<(u8, &str)> {
    let trimmed = line.trim_start();
    let hashes = trimmed.bytes().take_while(|b| *b == b'#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &trimmed[hashes..];
    // ATX requires whitespace (or end of line) after the hashes.
    if !rest.is_empty() && !rest.starts_with(' ') && !rest.starts_with('\t') {
        return None;
    }
    Some((hashes as u8, rest.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_frontmatter_extracted() {
        let raw = "---\ntitle: Database Guide\nauthor: ops\ntags:\n  - database\n  - timeout\n---\n# Heading\nBody text\n";
        let (meta, body) = parse_frontmatter(raw);
        assert_eq!(meta.author, "ops");
        assert_eq!(meta.tags, vec!["database", "timeout"]);
        assert_eq!(meta.custom.get("title").unwrap(), "Database Guide");
        assert!(body.starts_with("# Heading"));
    }

    #[test]
    fn test_no_frontmatter_passes_through() {
        let raw = "# Just a doc\ncontent\n";
        let (meta, body) = parse_frontmatter(raw);
        assert!(meta.author.is_empty());
        assert_eq!(body, raw);
    }

    #[test]
    fn test_malformed_frontmatter_kept_in_body() {
        let raw = "---\n: : bad yaml [\n---\ncontent\n";
        let (meta, body) = parse_frontmatter(raw);
        assert!(meta.custom.is_empty());
        assert_eq!(body, raw);
    }

    #[test]
    fn test_sections_from_atx_headings() {
        let body = "intro line\n# First\nalpha beta\n## Nested\ngamma\n# Second\ndelta\n";
        let sections = parse_sections(body);

        assert_eq!(sections.len(), 4);
        assert_eq!(sections[0].heading, ""); // implicit leading section
        assert_eq!(sections[0].content, "intro line");
        assert_eq!(sections[1].heading, "First");
        assert_eq!(sections[1].level, 1);
        assert_eq!(sections[2].heading, "Nested");
        assert_eq!(sections[2].level, 2);
        assert_eq!(sections[3].heading, "Second");
        assert_eq!(sections[3].word_count, 1);
    }

    #[test]
    fn test_headingless_body_yields_implicit_section() {
        let sections = parse_sections("no headings at all\njust prose\n");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].heading, "");
        assert_eq!(sections[0].level, 1);
        assert_eq!(sections[0].word_count, 6);
    }

    #[test]
    fn test_hashes_without_space_are_not_headings() {
        assert!(parse_atx_heading("#hashtag").is_none());
        assert!(parse_atx_heading("####### seven").is_none());
        assert_eq!(parse_atx_heading("### Three"), Some((3, "Three")));
        assert_eq!(parse_atx_heading("#"), Some((1, "")));
    }

    #[test]
    fn test_parse_document_title_priority() {
        // Frontmatter title wins over the first heading.
        let raw = "---\ntitle: Override\n---\n# Heading Title\nbody\n";
        let doc = parse_document(&PathBuf::from("guide.md"), raw, raw.len() as u64, None);
        assert_eq!(doc.title, "Override");
        assert_eq!(doc.id, "guide.md");
        assert_eq!(doc.metadata.format, "markdown");

        // Without frontmatter the first heading is used.
        let raw = "# Heading Title\nbody\n";
        let doc = parse_document(&PathBuf::from("guide.md"), raw, raw.len() as u64, None);
        assert_eq!(doc.title, "Heading Title");

        // Without either, the file stem is used.
        let raw = "plain text\n";
        let doc = parse_document(&PathBuf::from("notes.txt"), raw, raw.len() as u64, None);
        assert_eq!(doc.title, "notes");
        assert_eq!(doc.metadata.format, "text");
    }

    #[test]
    fn test_scan_directory_loads_and_warns() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "# Doc A\ncontent\n").unwrap();
        std::fs::write(dir.path().join("b.txt"), "plain doc\n").unwrap();
        std::fs::write(dir.path().join("ignore.rs"), "fn main() {}\n").unwrap();
        std::fs::create_dir(dir.path().join(".hidden")).unwrap();
        std::fs::write(dir.path().join(".hidden").join("c.md"), "# Hidden\n").unwrap();

        let result = scan_directory(dir.path());
        let mut ids: Vec<&str> = result.documents.iter().map(|d| d.id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["a.md", "b.txt"]);
    }

    #[test]
    fn test_scan_missing_directory_warns() {
        let result = scan_directory(Path::new("/nonexistent/loglens-test-path"));
        assert!(result.documents.is_empty());
        assert_eq!(result.warnings.len(), 1);
    }
}
