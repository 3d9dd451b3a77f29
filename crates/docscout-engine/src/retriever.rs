use std::path::{Path, PathBuf};
use std::sync::Arc;

use docscout_core::error::{Error, Result};
use docscout_core::traits::{Embedder, StoreOpener};
use docscout_core::types::RetrievalHit;

use crate::indexer::Indexer;
use crate::lock::BuildLock;

/// Nearest-neighbour lookup over the persisted index. Builds the index on
/// first use when it does not exist yet.
pub struct Retriever {
    indexer: Arc<Indexer>,
    embedder: Arc<dyn Embedder>,
    opener: Arc<dyn StoreOpener>,
    source_dir: PathBuf,
    collection: String,
}

impl Retriever {
    pub fn new(
        indexer: Arc<Indexer>,
        embedder: Arc<dyn Embedder>,
        opener: Arc<dyn StoreOpener>,
        source_dir: PathBuf,
        collection: &str,
    ) -> Self {
        Self { indexer, embedder, opener, source_dir, collection: collection.to_string() }
    }

    fn location(&self) -> &Path {
        self.indexer.location()
    }

    /// Build the index from the source directory if none is persisted.
    /// Returns the number of fragments written, 0 when nothing was built.
    pub fn ensure_index(&self) -> Result<usize> {
        if self.location().exists() {
            return Ok(0);
        }
        let lock = BuildLock::acquire(self.location())?;
        // Another process may have finished a build between the check and the lock.
        if self.location().exists() {
            return Ok(0);
        }
        tracing::info!(location = %self.location().display(), "index not found; building it now");
        match self.indexer.build_index_locked(&lock, &self.source_dir) {
            Ok(n) => Ok(n),
            Err(e) if e.is_missing_source() => {
                tracing::warn!(error = %e, "cannot build index");
                Ok(0)
            }
            Err(e) => Err(e),
        }
    }

    /// Up to `k` hits for `query`, closest first.
    pub fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievalHit>> {
        if k == 0 {
            return Err(Error::Configuration("k must be at least 1".into()));
        }
        self.ensure_index()?;
        if !self.location().exists() {
            tracing::info!("index is empty; nothing to search");
            return Ok(Vec::new());
        }

        let store = self.opener.open(self.location(), &self.collection).map_err(Error::Retrieval)?;
        if let Some(recorded) = store.recorded_model().map_err(Error::Retrieval)? {
            if recorded != self.embedder.model_id() {
                return Err(Error::Configuration(format!(
                    "collection '{}' was built with embedding model '{}' but '{}' is configured",
                    self.collection,
                    recorded,
                    self.embedder.model_id()
                )));
            }
        }
        tracing::debug!(total = ?store.count().ok(), collection = %self.collection, "searching collection");

        let vector = self.embedder.embed_query(query).map_err(Error::Retrieval)?;
        let mut hits = store.search(&vector, k).map_err(Error::Retrieval)?;
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        tracing::info!(hits = hits.len(), k, "retrieved fragments");
        Ok(hits)
    }
}
