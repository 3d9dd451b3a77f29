use std::path::Path;

use crate::types::{DocumentFragment, Page, RetrievalHit};

/// Text-to-vector capability. Query and ingestion must use the same model.
pub trait Embedder: Send + Sync {
    /// Identifier recorded with a collection so query-time embeddings can be
    /// checked against the ones the index was built with.
    fn model_id(&self) -> &str;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed_query(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector for query"))
    }
}

/// Persistent nearest-neighbour index for one collection.
pub trait VectorStore {
    /// Insert or replace fragments keyed by `DocumentFragment::content_id`.
    /// Returns the number of rows written.
    fn upsert(&self, fragments: &[DocumentFragment], embeddings: &[Vec<f32>]) -> anyhow::Result<usize>;
    fn count(&self) -> anyhow::Result<usize>;
    /// Up to `k` hits ordered by ascending distance.
    fn search(&self, query: &[f32], k: usize) -> anyhow::Result<Vec<RetrievalHit>>;
    fn recorded_model(&self) -> anyhow::Result<Option<String>>;
    fn record_model(&self, model_id: &str) -> anyhow::Result<()>;
}

/// Opens (creating on first write) the store living at `location`.
pub trait StoreOpener: Send + Sync {
    fn open(&self, location: &Path, collection: &str) -> anyhow::Result<Box<dyn VectorStore>>;
}

/// Turns one source document into per-page text. Failures are per file.
pub trait DocumentLoader: Send + Sync {
    fn load(&self, path: &Path) -> anyhow::Result<Vec<Page>>;
}

/// Optional natural-language generation used for the response summary.
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}
