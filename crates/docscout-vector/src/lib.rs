//! LanceDB-backed fragment store.
//!
//! Each collection is one Lance table under the index directory; a shared
//! `_docscout_meta` table records which embedding model built each collection. The
//! async client is driven from a private runtime so callers stay synchronous.

use anyhow::Result;
use lancedb::Connection;
use std::path::Path;
use tokio::runtime::Runtime;

use docscout_core::config::DistanceMetric;
use docscout_core::traits::{StoreOpener, VectorStore};
use docscout_core::types::{DocumentFragment, RetrievalHit};

pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub struct LanceStore {
    rt: Runtime,
    db: Connection,
    collection: String,
    metric: DistanceMetric,
}

impl LanceStore {
    pub fn open(location: &Path, collection: &str, metric: DistanceMetric) -> Result<Self> {
        let rt = Runtime::new()?;
        let uri = location.to_string_lossy().to_string();
        let db = rt.block_on(table::open_db(&uri))?;
        tracing::debug!(location = %location.display(), collection, "opened lance store");
        Ok(Self { rt, db, collection: collection.to_string(), metric })
    }

    fn model_key(&self) -> String {
        format!("embedder_id:{}", self.collection)
    }
}

impl VectorStore for LanceStore {
    fn upsert(&self, fragments: &[DocumentFragment], embeddings: &[Vec<f32>]) -> Result<usize> {
        self.rt.block_on(writer::upsert_fragments(&self.db, &self.collection, fragments, embeddings))
    }

    fn count(&self) -> Result<usize> {
        self.rt.block_on(table::count_rows(&self.db, &self.collection))
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievalHit>> {
        self.rt.block_on(search::search_fragments(&self.db, &self.collection, query, k, self.metric))
    }

    fn recorded_model(&self) -> Result<Option<String>> {
        self.rt.block_on(table::get_meta(&self.db, &self.model_key()))
    }

    fn record_model(&self, model_id: &str) -> Result<()> {
        self.rt.block_on(table::set_meta(&self.db, &self.model_key(), model_id))
    }
}

/// Opens [`LanceStore`]s with a fixed distance metric.
#[derive(Debug, Clone, Copy, Default)]
pub struct LanceOpener {
    pub metric: DistanceMetric,
}

impl LanceOpener {
    pub fn new(metric: DistanceMetric) -> Self {
        Self { metric }
    }
}

impl StoreOpener for LanceOpener {
    fn open(&self, location: &Path, collection: &str) -> Result<Box<dyn VectorStore>> {
        Ok(Box::new(LanceStore::open(location, collection, self.metric)?))
    }
}
