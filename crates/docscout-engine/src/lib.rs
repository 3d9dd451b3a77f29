//! Retrieval engine facade.
//!
//! [`RetrievalEngine`] ties the pipeline together: lazy index build,
//! nearest-neighbour retrieval, trust scoring and the optional summary.
//! Retrieval failures are folded into an error response so the caller always
//! gets a payload; only configuration errors (including an embedding model
//! that does not match the index) are returned as `Err`.

use std::path::PathBuf;
use std::sync::Arc;

use docscout_core::chunker::Chunker;
use docscout_core::config::Settings;
use docscout_core::error::{Error, Result};
use docscout_core::types::RetrievalResponse;

pub mod clients;
pub mod indexer;
pub mod lock;
pub mod ollama;
pub mod retriever;
pub mod scorer;
pub mod summary;

pub use clients::{clients_from_settings, Clients};
pub use indexer::Indexer;
pub use retriever::Retriever;
pub use scorer::{trust_scores, Assembler};

pub struct RetrievalEngine {
    indexer: Arc<Indexer>,
    retriever: Retriever,
    assembler: Assembler,
    source_dir: PathBuf,
    default_k: usize,
}

impl RetrievalEngine {
    /// Validates `settings` up front; a bad configuration never reaches a query.
    pub fn new(settings: &Settings, clients: Clients) -> Result<Self> {
        settings.validate()?;
        let source_dir = settings.source_dir()?;
        let location = settings.persist_dir()?;
        let collection = settings.index.collection.as_str();
        let chunker = Chunker::new(settings.chunking)?;

        let indexer = Arc::new(Indexer::new(
            clients.loader,
            clients.embedder.clone(),
            clients.opener.clone(),
            chunker,
            &settings.source.extensions,
            location,
            collection,
        ));
        let retriever = Retriever::new(indexer.clone(), clients.embedder, clients.opener, source_dir.clone(), collection);

        Ok(Self {
            indexer,
            retriever,
            assembler: Assembler::new(clients.generator),
            source_dir,
            default_k: settings.retrieval.k,
        })
    }

    /// Index the configured source directory. Safe to re-run: fragments are
    /// keyed by content so unchanged text is replaced rather than duplicated.
    pub fn ingest(&self) -> Result<usize> {
        self.indexer.build_index(&self.source_dir)
    }

    /// Ingest a directory other than the configured one into the same index.
    pub fn ingest_dir(&self, dir: &std::path::Path) -> Result<usize> {
        self.indexer.build_index(dir)
    }

    pub fn default_k(&self) -> usize {
        self.default_k
    }

    /// Retrieve and score without the error-response conversion.
    pub fn try_query(&self, query: &str, k: usize) -> Result<RetrievalResponse> {
        let hits = self.retriever.retrieve(query, k)?;
        Ok(self.assembler.assemble(query, hits))
    }

    pub fn query(&self, query: &str) -> Result<RetrievalResponse> {
        self.query_k(query, self.default_k)
    }

    pub fn query_k(&self, query: &str, k: usize) -> Result<RetrievalResponse> {
        match self.try_query(query, k) {
            Ok(response) => Ok(response),
            Err(e @ Error::Configuration(_)) => Err(e),
            Err(e) => {
                tracing::error!(error = %e, query, "retrieval failed");
                Ok(error_response(&e))
            }
        }
    }
}

/// The payload returned when retrieval fails.
pub fn error_response(err: &Error) -> RetrievalResponse {
    let message = err.to_string();
    RetrievalResponse {
        summary: format!("Error during document retrieval: {message}"),
        sources: Vec::new(),
        total_hits: 0,
        error: Some(message),
    }
}
