use thiserror::Error;

/// Result type for manifest operations
pub type Result<T> = std::result::Result<T, ManifestError>;

/// Errors raised while building, loading or writing a manifest
#[derive(Error, Debug)]
pub enum ManifestError {
    /// IO error while reading or writing the manifest file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The manifest file parsed but does not have the expected shape
    #[error("Malformed manifest: {0}")]
    Malformed(String),

    /// An argument violated an operation's contract
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl ManifestError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
