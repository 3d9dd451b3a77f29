//! Embedding models for docscout.
//!
//! [`LocalEmbedder`] runs an XLM-RoBERTa checkpoint (BGE-M3 by default) through
//! candle. [`FakeEmbedder`] hashes tokens into a fixed-size vector and is used
//! by tests and by `APP_USE_FAKE_EMBEDDINGS=1`.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;

use docscout_core::config::{expand_path, EmbeddingProvider, EmbeddingSettings};
use docscout_core::traits::Embedder;

pub mod device;
pub mod pool;
pub mod tokenize;

pub use pool::masked_mean_l2;

const MAX_LEN: usize = 256;
pub const FAKE_DIM: usize = 1024;

pub struct LocalEmbedder {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    model_id: String,
}

impl LocalEmbedder {
    pub fn new(model_dir: &Path, model_id: &str) -> Result<Self> {
        let device = device::select_device();
        tracing::info!(model = model_id, dir = %model_dir.display(), "loading embedding model");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config_path = model_dir.join("config.json");
        let config: XLMRobertaConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
        let weights_path = model_dir.join("pytorch_model.bin");
        let weights = candle_core::pickle::read_all(&weights_path)?;
        let weights_map: std::collections::HashMap<String, Tensor> = weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb)?;
        tracing::info!(model = model_id, "embedding model ready");
        Ok(Self { model, tokenizer, device, model_id: model_id.to_string() })
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize::tokenize_on_device(&self.tokenizer, text, MAX_LEN, &self.device)?;
        let token_type_ids = Tensor::zeros((1, MAX_LEN), DType::I64, &self.device)?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let emb = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1::<f32>()?;
        let elapsed = start.elapsed().as_millis();
        if elapsed > 100 {
            tracing::debug!(elapsed_ms = elapsed, "slow embedding");
        }
        Ok(emb)
    }
}

impl Embedder for LocalEmbedder {
    fn model_id(&self) -> &str { &self.model_id }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_text(t)).collect()
    }
}

/// Deterministic bag-of-tokens embedder. Texts sharing tokens land close to
/// each other, which is enough to exercise ranking in tests.
pub struct FakeEmbedder {
    dim: usize,
    model_id: String,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim, model_id: format!("fake:d{dim}") }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let token = token.to_lowercase();
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = usize::try_from(h % self.dim as u64).unwrap_or(0);
            let val = ((h >> 32) as u32) as f32 / u32::MAX as f32;
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

impl Embedder for FakeEmbedder {
    fn model_id(&self) -> &str { &self.model_id }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

pub fn fake_embeddings_forced() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Build the in-process embedder named by `settings`. Remote providers are
/// constructed by the engine crate.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    if fake_embeddings_forced() || settings.provider == EmbeddingProvider::Fake {
        tracing::info!("using FakeEmbedder");
        return Ok(Box::new(FakeEmbedder::new(FAKE_DIM)));
    }
    match settings.provider {
        EmbeddingProvider::Local => {
            let model_id = settings.model.as_deref().unwrap_or("bge-m3");
            let model_dir = resolve_model_dir(settings.model_dir.as_deref())?;
            Ok(Box::new(LocalEmbedder::new(&model_dir, model_id)?))
        }
        other => Err(anyhow!("embedding provider {:?} is not an in-process model", other)),
    }
}

fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    let candidates = configured
        .map(expand_path)
        .into_iter()
        .chain(std::env::var("APP_MODEL_DIR").ok().map(PathBuf::from))
        .chain([PathBuf::from("models/bge-m3")]);
    for dir in candidates {
        if dir.exists() {
            return Ok(dir);
        }
        tracing::debug!(dir = %dir.display(), "model directory not found");
    }
    Err(anyhow!("Could not locate embedding model directory (set embedding.model_dir)"))
}
