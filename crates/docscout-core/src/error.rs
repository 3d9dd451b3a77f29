use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Source directory not found: {}", .0.display())]
    SourceDirNotFound(PathBuf),

    #[error("Ingestion failed: {0}")]
    Ingestion(#[source] anyhow::Error),

    #[error("Could not load document {}: {source}", .path.display())]
    PerFileLoad {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Index build already in progress for {}", .0.display())]
    IndexBuildInProgress(PathBuf),

    #[error("Retrieval failed: {0}")]
    Retrieval(#[source] anyhow::Error),

    #[error("Generation failed: {0}")]
    Generation(#[source] anyhow::Error),
}

impl Error {
    /// Directory-not-found is reported but callers may treat it as "nothing to index".
    pub fn is_missing_source(&self) -> bool {
        matches!(self, Error::SourceDirNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
