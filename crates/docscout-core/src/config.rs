//! Layered configuration and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nested keys, e.g. `APP_INDEX__PERSIST_DIR`). Typed access
//! goes through [`Settings`], which reports missing required keys as
//! configuration errors before any query runs.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::chunker::ChunkingConfig;
use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment })
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extract and validate the full settings tree.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::Configuration(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub source: SourceSettings,
    pub index: IndexSettings,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalSettings,
    pub embedding: EmbeddingSettings,
    pub ollama: OllamaSettings,
    pub generation: GenerationSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub dir: Option<String>,
    pub extensions: Vec<String>,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self { dir: None, extensions: vec!["pdf".to_string(), "txt".to_string(), "md".to_string()] }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    L2,
    Cosine,
    Dot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub persist_dir: Option<String>,
    pub collection: String,
    pub distance: DistanceMetric,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self { persist_dir: None, collection: "documents".to_string(), distance: DistanceMetric::L2 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { k: 3 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    Local,
    #[default]
    Ollama,
    Fake,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProvider,
    pub model: Option<String>,
    pub model_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaSettings {
    pub base_url: String,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self { base_url: "http://localhost:11434".to_string() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Summaries are disabled when unset.
    pub model: Option<String>,
}

/// Table names with this prefix belong to the store itself.
pub const RESERVED_TABLE_PREFIX: &str = "_docscout";

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.source_dir()?;
        self.persist_dir()?;
        self.embedding_model()?;
        self.chunking.validate()?;
        if self.retrieval.k == 0 {
            return Err(Error::Configuration("retrieval.k must be a positive integer".into()));
        }
        if self.index.collection.trim().is_empty() {
            return Err(Error::Configuration("index.collection must not be empty".into()));
        }
        if self.index.collection.starts_with(RESERVED_TABLE_PREFIX) {
            return Err(Error::Configuration(format!(
                "index.collection must not start with '{RESERVED_TABLE_PREFIX}', which is reserved for index bookkeeping"
            )));
        }
        if self.source.extensions.is_empty() {
            return Err(Error::Configuration("source.extensions must list at least one extension".into()));
        }
        Ok(())
    }

    pub fn source_dir(&self) -> Result<PathBuf> {
        required_path(self.source.dir.as_deref(), "source.dir")
    }

    pub fn persist_dir(&self) -> Result<PathBuf> {
        required_path(self.index.persist_dir.as_deref(), "index.persist_dir")
    }

    pub fn embedding_model(&self) -> Result<&str> {
        match self.embedding.model.as_deref().map(str::trim) {
            Some(m) if !m.is_empty() => Ok(m),
            _ => Err(Error::Configuration("missing required setting 'embedding.model'".into())),
        }
    }
}

fn required_path(value: Option<&str>, key: &str) -> Result<PathBuf> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => {
            let cwd = env::current_dir().map_err(|e| Error::Configuration(format!("cannot resolve '{key}': {e}")))?;
            Ok(resolve_with_base(&cwd, v))
        }
        _ => Err(Error::Configuration(format!("missing required setting '{key}'"))),
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
