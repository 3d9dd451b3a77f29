//! Domain types shared by the chunker, the storage engine and the scorer.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Filename reported for a hit whose source path is empty.
pub const UNKNOWN_FILE: &str = "unknown_file";

/// One page of extracted text as produced by a document loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub text: String,
    pub number: Option<u32>,
}

impl Page {
    pub fn new(text: impl Into<String>, number: Option<u32>) -> Self {
        Self { text: text.into(), number }
    }
}

/// A bounded slice of a page that is embedded and retrieved as a unit.
///
/// - `text`: the fragment content, at most `chunk_size` characters
/// - `source_path`: absolute path of the originating document
/// - `page_number`: originating page, when the loader knows it
/// - `start`: byte offset of `text` inside the page text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFragment {
    pub text: String,
    pub source_path: String,
    pub page_number: Option<u32>,
    pub start: usize,
}

impl DocumentFragment {
    /// Stable storage key: the same text from the same page of the same file
    /// always maps to the same id, which makes re-ingestion an upsert.
    pub fn content_id(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.source_path.as_bytes());
        hasher.update(&[0]);
        hasher.update(self.page_number.map(|p| p.to_string()).unwrap_or_default().as_bytes());
        hasher.update(&[0]);
        hasher.update(self.text.as_bytes());
        hasher.finalize().to_hex().to_string()
    }
}

/// Raw nearest-neighbour result. Lower `distance` means more similar; the
/// metric itself is whatever the storage engine uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub fragment: DocumentFragment,
    pub distance: f32,
}

/// One ranked entry of the response payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredSource {
    pub filename: String,
    pub trust_percent: f64,
    pub full_path: String,
}

impl ScoredSource {
    pub fn new(full_path: &str, trust_percent: f64) -> Self {
        Self {
            filename: filename_of(full_path),
            trust_percent,
            full_path: full_path.to_string(),
        }
    }
}

/// The engine's output contract, built fresh for every query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalResponse {
    pub summary: String,
    pub sources: Vec<ScoredSource>,
    pub total_hits: usize,
    /// Set only when retrieval itself failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RetrievalResponse {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Final path segment, accepting both `/` and `\` separators.
pub fn filename_of(full_path: &str) -> String {
    match full_path.rsplit(['/', '\\']).next() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => UNKNOWN_FILE.to_string(),
    }
}

/// Absolute form of `path` without touching the filesystem beyond the cwd.
pub fn absolute_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map(|cwd| cwd.join(path)).unwrap_or_else(|_| path.to_path_buf())
    }
}
