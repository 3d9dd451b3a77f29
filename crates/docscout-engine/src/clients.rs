use std::sync::Arc;

use docscout_core::config::{EmbeddingProvider, Settings};
use docscout_core::error::{Error, Result};
use docscout_core::loader::FileLoader;
use docscout_core::traits::{DocumentLoader, Embedder, Generator, StoreOpener};
use docscout_embed::{fake_embeddings_forced, get_default_embedder};
use docscout_vector::LanceOpener;

use crate::ollama::OllamaClient;

/// The external capabilities an engine runs against. Tests inject fakes;
/// [`clients_from_settings`] wires the real ones.
#[derive(Clone)]
pub struct Clients {
    pub loader: Arc<dyn DocumentLoader>,
    pub embedder: Arc<dyn Embedder>,
    pub opener: Arc<dyn StoreOpener>,
    pub generator: Option<Arc<dyn Generator>>,
}

pub fn clients_from_settings(settings: &Settings) -> Result<Clients> {
    let embedder: Arc<dyn Embedder> = match settings.embedding.provider {
        EmbeddingProvider::Ollama if !fake_embeddings_forced() => {
            let model = settings.embedding_model()?;
            Arc::new(OllamaClient::new(&settings.ollama.base_url, model).map_err(|e| Error::Configuration(e.to_string()))?)
        }
        _ => Arc::from(get_default_embedder(&settings.embedding).map_err(|e| Error::Configuration(e.to_string()))?),
    };
    tracing::info!(model = embedder.model_id(), "embedder ready");

    let generator: Option<Arc<dyn Generator>> = match settings.generation.model.as_deref() {
        Some(model) => {
            let client = OllamaClient::new(&settings.ollama.base_url, model).map_err(|e| Error::Configuration(e.to_string()))?;
            Some(Arc::new(client))
        }
        None => None,
    };

    Ok(Clients {
        loader: Arc::new(FileLoader::new()),
        embedder,
        opener: Arc::new(LanceOpener::new(settings.index.distance)),
        generator,
    })
}
