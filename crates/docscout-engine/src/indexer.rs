use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use docscout_core::chunker::Chunker;
use docscout_core::error::{Error, Result};
use docscout_core::traits::{DocumentLoader, Embedder, StoreOpener};
use docscout_core::types::{absolute_path, DocumentFragment};

use crate::lock::BuildLock;

/// Drives ingestion: discover, load, chunk, embed, persist.
pub struct Indexer {
    loader: Arc<dyn DocumentLoader>,
    embedder: Arc<dyn Embedder>,
    opener: Arc<dyn StoreOpener>,
    chunker: Chunker,
    extensions: HashSet<String>,
    location: PathBuf,
    collection: String,
}

impl Indexer {
    pub fn new(
        loader: Arc<dyn DocumentLoader>,
        embedder: Arc<dyn Embedder>,
        opener: Arc<dyn StoreOpener>,
        chunker: Chunker,
        extensions: &[String],
        location: PathBuf,
        collection: &str,
    ) -> Self {
        let extensions = extensions.iter().map(|e| e.trim_start_matches('.').to_ascii_lowercase()).collect();
        Self { loader, embedder, opener, chunker, extensions, location, collection: collection.to_string() }
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Ingest every supported document of `source_dir` and return the number
    /// of fragments stored. Holds the build lock for the whole run.
    pub fn build_index(&self, source_dir: &Path) -> Result<usize> {
        let lock = BuildLock::acquire(&self.location)?;
        self.build_index_locked(&lock, source_dir)
    }

    pub(crate) fn build_index_locked(&self, _lock: &BuildLock, source_dir: &Path) -> Result<usize> {
        let files = self.discover(source_dir)?;
        tracing::info!(dir = %source_dir.display(), files = files.len(), "starting ingestion");

        let fragments = self.load_fragments(&files);
        if fragments.is_empty() {
            tracing::info!("no fragments were created; skipping index creation");
            return Ok(0);
        }

        // The recorded model is checked before anything is embedded.
        let store = self.opener.open(&self.location, &self.collection).map_err(Error::Ingestion)?;
        let model_id = self.embedder.model_id();
        if let Some(recorded) = store.recorded_model().map_err(Error::Ingestion)? {
            if recorded != model_id {
                return Err(Error::Configuration(format!(
                    "collection '{}' was built with embedding model '{}' but '{}' is configured",
                    self.collection, recorded, model_id
                )));
            }
        }

        let texts: Vec<String> = fragments.iter().map(|f| f.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).map_err(Error::Ingestion)?;
        if embeddings.len() != fragments.len() {
            return Err(Error::Ingestion(anyhow::anyhow!(
                "embedder returned {} vectors for {} fragments",
                embeddings.len(),
                fragments.len()
            )));
        }
        let stored = store.upsert(&fragments, &embeddings).map_err(Error::Ingestion)?;
        store.record_model(model_id).map_err(Error::Ingestion)?;
        tracing::info!(stored, collection = %self.collection, location = %self.location.display(), "stored fragments");
        Ok(stored)
    }

    /// Top-level files with a supported extension, sorted by path.
    pub fn discover(&self, source_dir: &Path) -> Result<Vec<PathBuf>> {
        if !source_dir.is_dir() {
            return Err(Error::SourceDirNotFound(source_dir.to_path_buf()));
        }
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(source_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| absolute_path(e.path()))
            .filter(|p| self.is_supported(p))
            .collect();
        files.sort();
        Ok(files)
    }

    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.contains(&e.to_ascii_lowercase()))
    }

    /// Load and chunk `files`. A file that fails to load is logged and skipped.
    fn load_fragments(&self, files: &[PathBuf]) -> Vec<DocumentFragment> {
        let mut all = Vec::new();
        for (i, path) in files.iter().enumerate() {
            let pages = match self.loader.load(path) {
                Ok(pages) => pages,
                Err(source) => {
                    let err = Error::PerFileLoad { path: path.clone(), source };
                    tracing::warn!(error = %err, "skipping document");
                    continue;
                }
            };
            if pages.is_empty() {
                tracing::warn!(path = %path.display(), "document loaded but contained no pages");
                continue;
            }
            let fragments = self.chunker.chunk(&path.to_string_lossy(), &pages);
            tracing::debug!(file = i + 1, of = files.len(), path = %path.display(), pages = pages.len(), fragments = fragments.len(), "chunked document");
            all.extend(fragments);
        }
        all
    }
}
