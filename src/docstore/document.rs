// LogLens - docstore/document.rs
//
// Document and section types for the in-memory corpus.
// Pure data definitions; loading lives in docstore/scanner.rs and
// indexing in docstore/index.rs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// =============================================================================
// Metadata
// =============================================================================

/// Document metadata, populated from YAML frontmatter where present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocMetadata {
    /// Free-form topic tags.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Document author.
    #[serde(default)]
    pub author: String,

    /// Authoring or revision date, as written in the frontmatter.
    #[serde(default)]
    pub date: String,

    /// Content language (e.g. "en").
    #[serde(default)]
    pub language: String,

    /// Source format (e.g. "markdown", "text").
    #[serde(default)]
    pub format: String,

    /// Any frontmatter keys not covered by the named fields.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub custom: HashMap<String, String>,
}

// =============================================================================
// Section
// =============================================================================

/// A heading-delimited chunk of a document, indexed and retrievable
/// independently of its parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    /// Section identifier, unique within the parent document.
    pub id: String,

    /// Heading text ("" for the implicit section of heading-less docs).
    pub heading: String,

    /// Section body text, excluding the heading line.
    pub content: String,

    /// ATX heading level (1-6). The implicit section uses level 1.
    pub level: u8,

    /// First line of the section in the source document (1-based).
    pub start_line: usize,

    /// Last line of the section in the source document (1-based).
    pub end_line: usize,

    /// Whitespace-separated word count of the section body.
    pub word_count: usize,
}

// =============================================================================
// Document
// =============================================================================

/// One document of the correlation corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Identifier derived from the path (see `id_from_path`).
    pub id: String,

    /// Source path.
    pub path: PathBuf,

    /// Title: first heading, frontmatter title, or file stem.
    pub title: String,

    /// Full body text with frontmatter stripped.
    pub content: String,

    /// Frontmatter-derived metadata.
    pub metadata: DocMetadata,

    /// Ordered heading-delimited sections.
    pub sections: Vec<Section>,

    /// Last modification time of the source file.
    pub last_modified: Option<DateTime<Utc>>,

    /// Source size in bytes.
    pub size: u64,

    /// CRC32 of the raw content, for change detection on reindex.
    pub hash: u32,
}

impl Document {
    /// Derive a stable document id from its path: the file name with
    /// separators normalised, e.g. `docs/db/timeouts.md` -> `timeouts.md`.
    /// Collisions across directories are disambiguated by prefixing the
    /// parent directory name.
    pub fn id_from_path(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned())
    }

    /// CRC32 hash of the given content.
    pub fn content_hash(content: &str) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(content.as_bytes());
        hasher.finalize()
    }

    /// Build a document directly from parts, used by tests and by
    /// callers that assemble documents without the filesystem scanner.
    pub fn from_content(id: &str, title: &str, content: &str) -> Self {
        Self {
            id: id.to_string(),
            path: PathBuf::from(id),
            title: title.to_string(),
            content: content.to_string(),
            metadata: DocMetadata::default(),
            sections: Vec::new(),
            last_modified: None,
            size: content.len() as u64,
            hash: Self::content_hash(content),
        }
    }
}
