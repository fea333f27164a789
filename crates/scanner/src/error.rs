use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScanError>;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Cannot parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Walk error: {0}")]
    Walk(#[from] archmap_walker::WalkError),

    #[error("Cache error: {0}")]
    Cache(#[from] archmap_cache::CacheError),

    #[error("Extractor error: {0}")]
    Extract(#[from] archmap_extractor::ExtractError),

    #[error("Manifest error: {0}")]
    Manifest(#[from] archmap_manifest::ManifestError),
}

impl ScanError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
