//! Recursive character chunker.
//!
//! Pages are cut on the largest boundary that still respects `chunk_size`:
//! paragraph breaks first, then line breaks, then spaces, and finally single
//! characters. Separators stay attached to the start of the piece that follows
//! them, so every fragment is a contiguous slice of its page and the page can
//! be rebuilt from the fragments by dropping the overlapping prefixes.

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::error::{Error, Result};
use crate::types::{DocumentFragment, Page};

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Sizes are measured in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE, chunk_overlap: DEFAULT_CHUNK_OVERLAP }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Configuration("chunking.chunk_size must be positive".into()));
        }
        if self.chunk_overlap > self.chunk_size {
            return Err(Error::Configuration(format!(
                "chunking.chunk_overlap ({}) is larger than chunking.chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Default for Chunker {
    fn default() -> Self {
        Self { config: ChunkingConfig::default() }
    }
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Split every page of `source_path` into fragments. Blank pages yield nothing.
    pub fn chunk(&self, source_path: &str, pages: &[Page]) -> Vec<DocumentFragment> {
        let mut fragments = Vec::new();
        for page in pages {
            if page.text.trim().is_empty() {
                continue;
            }
            for range in self.split_ranges(&page.text) {
                fragments.push(DocumentFragment {
                    text: page.text[range.clone()].to_string(),
                    source_path: source_path.to_string(),
                    page_number: page.number,
                    start: range.start,
                });
            }
        }
        fragments
    }

    /// Byte ranges of the fragments of `text`, in order.
    pub fn split_ranges(&self, text: &str) -> Vec<Range<usize>> {
        self.split_recursive(text, 0..text.len(), &SEPARATORS)
    }

    fn split_recursive(&self, text: &str, range: Range<usize>, separators: &[&str]) -> Vec<Range<usize>> {
        let slice = &text[range.clone()];
        let (separator, remaining) = pick_separator(slice, separators);

        let mut out = Vec::new();
        let mut small: Vec<Range<usize>> = Vec::new();
        for piece in split_keep_separator(slice, separator) {
            let piece = (piece.start + range.start)..(piece.end + range.start);
            if char_len(text, &piece) < self.config.chunk_size {
                small.push(piece);
                continue;
            }
            if !small.is_empty() {
                out.extend(self.merge(text, &small));
                small.clear();
            }
            if remaining.is_empty() {
                out.push(piece);
            } else {
                out.extend(self.split_recursive(text, piece, remaining));
            }
        }
        if !small.is_empty() {
            out.extend(self.merge(text, &small));
        }
        out
    }

    /// Greedily join adjacent pieces into fragments of at most `chunk_size`
    /// characters, keeping up to `chunk_overlap` trailing characters as the
    /// head of the next fragment.
    fn merge(&self, text: &str, pieces: &[Range<usize>]) -> Vec<Range<usize>> {
        let ChunkingConfig { chunk_size, chunk_overlap } = self.config;
        let mut out = Vec::new();
        let mut window: std::collections::VecDeque<(Range<usize>, usize)> = Default::default();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(text, piece);
            if total + len > chunk_size && !window.is_empty() {
                out.push(span(&window));
                while total > chunk_overlap || (total + len > chunk_size && total > 0) {
                    match window.pop_front() {
                        Some((_, dropped)) => total -= dropped,
                        None => break,
                    }
                }
            }
            window.push_back((piece.clone(), len));
            total += len;
        }
        if !window.is_empty() {
            out.push(span(&window));
        }
        out
    }
}

fn span(window: &std::collections::VecDeque<(Range<usize>, usize)>) -> Range<usize> {
    let start = window.front().map_or(0, |(r, _)| r.start);
    let end = window.back().map_or(start, |(r, _)| r.end);
    start..end
}

fn pick_separator<'a>(text: &str, separators: &'a [&'a str]) -> (&'a str, &'a [&'a str]) {
    for (i, &sep) in separators.iter().enumerate() {
        if sep.is_empty() {
            return (sep, &[]);
        }
        if text.contains(sep) {
            return (sep, &separators[i + 1..]);
        }
    }
    ("", &[])
}

/// Split `text` on `separator`, attaching each separator to the piece after
/// it. Empty pieces are dropped. An empty separator splits into characters.
fn split_keep_separator(text: &str, separator: &str) -> Vec<Range<usize>> {
    if separator.is_empty() {
        return text.char_indices().map(|(i, c)| i..i + c.len_utf8()).collect();
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(start..idx);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(start..text.len());
    }
    pieces
}

fn char_len(text: &str, range: &Range<usize>) -> usize {
    text[range.clone()].chars().count()
}
