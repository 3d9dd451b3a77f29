//! Blocking client for a local Ollama server.
//!
//! Serves both capabilities the engine needs from a model host:
//! - `POST /api/embed` for fragment and query embeddings
//! - `POST /api/generate` (non-streaming) for the optional summary

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use docscout_core::traits::{Embedder, Generator};

/// Inputs per `/api/embed` call.
const EMBED_BATCH: usize = 64;

pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    model_id: String,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(None::<Duration>)
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            model_id: format!("ollama:{model}"),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn post<Req: Serialize, Resp: for<'de> Deserialize<'de>>(&self, path: &str, body: &Req) -> Result<Resp> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .with_context(|| format!("POST {url}"))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(anyhow!("{url} returned {status}: {text}"));
        }
        resp.json::<Resp>().with_context(|| format!("decoding response from {url}"))
    }
}

impl Embedder for OllamaClient {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBED_BATCH) {
            let resp: EmbedResponse = self.post("/api/embed", &EmbedRequest { model: &self.model, input: batch })?;
            if resp.embeddings.len() != batch.len() {
                return Err(anyhow!(
                    "ollama returned {} embeddings for {} inputs",
                    resp.embeddings.len(),
                    batch.len()
                ));
            }
            out.extend(resp.embeddings);
        }
        tracing::debug!(count = out.len(), model = %self.model, "embedded via ollama");
        Ok(out)
    }
}

impl Generator for OllamaClient {
    fn generate(&self, prompt: &str) -> Result<String> {
        let resp: GenerateResponse =
            self.post("/api/generate", &GenerateRequest { model: &self.model, prompt, stream: false })?;
        Ok(resp.response)
    }
}
