//! Document loaders.
//!
//! [`PdfLoader`] yields one page per PDF page. [`PlainTextLoader`] treats form
//! feed (`\x0c`) as a page break, which matches what `pdftotext` and similar
//! extractors emit; files without form feeds are a single page.
//! [`FileLoader`] picks between them by extension.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::traits::DocumentLoader;
use crate::types::Page;

/// Dispatches on file extension: `.pdf` goes to [`PdfLoader`], everything
/// else to [`PlainTextLoader`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FileLoader {
    pdf: PdfLoader,
    text: PlainTextLoader,
}

impl FileLoader {
    pub fn new() -> Self { Self::default() }
}

impl DocumentLoader for FileLoader {
    fn load(&self, path: &Path) -> Result<Vec<Page>> {
        let is_pdf = path.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if is_pdf { self.pdf.load(path) } else { self.text.load(path) }
    }
}

/// Text layer of a PDF, page by page. Pages whose text cannot be decoded
/// come back empty so the remaining pages keep their numbers.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfLoader;

impl PdfLoader {
    pub fn new() -> Self { Self }
}

impl DocumentLoader for PdfLoader {
    fn load(&self, path: &Path) -> Result<Vec<Page>> {
        let doc = lopdf::Document::load(path).with_context(|| format!("opening PDF {}", path.display()))?;
        let mut pages = Vec::new();
        for number in doc.get_pages().into_keys() {
            let text = match doc.extract_text(&[number]) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(path = %path.display(), page = number, error = %e, "could not extract page text");
                    String::new()
                }
            };
            pages.push(Page::new(text, Some(number)));
        }
        tracing::debug!(path = %path.display(), pages = pages.len(), "loaded PDF");
        Ok(pages)
    }
}

const PAGE_BREAK: char = '\x0c';

#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextLoader;

impl PlainTextLoader {
    pub fn new() -> Self { Self }

    fn read_file_content(&self, file_path: &Path) -> Result<String> {
        let bytes = fs::read(file_path).with_context(|| format!("reading {}", file_path.display()))?;
        match String::from_utf8(bytes) {
            Ok(content) => Ok(content),
            Err(e) => {
                tracing::debug!(path = %file_path.display(), "file is not valid UTF-8; decoding lossily");
                Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
            }
        }
    }
}

impl DocumentLoader for PlainTextLoader {
    fn load(&self, path: &Path) -> Result<Vec<Page>> {
        let content = self.read_file_content(path)?;
        let mut pages: Vec<Page> = content
            .split(PAGE_BREAK)
            .enumerate()
            .map(|(i, text)| Page::new(text, u32::try_from(i + 1).ok()))
            .collect();
        // A trailing form feed does not open a new page.
        if pages.len() > 1 && pages.last().is_some_and(|p| p.text.is_empty()) {
            pages.pop();
        }
        Ok(pages)
    }
}
