use std::path::PathBuf;
use thiserror::Error;

/// Result type for extraction
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Errors that can occur while extracting entities from a file
#[derive(Error, Debug)]
pub enum ExtractError {
    /// IO error reading source
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Source file above the size cap
    #[error("{path} is {size} bytes, larger than the {limit} byte limit")]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    /// Every parser for a grammar is checked out
    #[error("Parser pool exhausted for {grammar} ({limit} in use)")]
    PoolExhausted { grammar: &'static str, limit: usize },

    /// Grammar could not be loaded into a parser
    #[error("Language error: {0}")]
    Language(String),

    /// A structural query failed to compile
    #[error("Query error in {name}: {message}")]
    Query { name: String, message: String },

    /// Tree-sitter returned no tree
    #[error("Failed to parse {0}")]
    ParseFailed(PathBuf),

    /// A plugin with the same name is already registered
    #[error("Plugin already registered: {0}")]
    DuplicatePlugin(String),

    /// No registered plugin claims the file
    #[error("No plugin supports {0}")]
    Unsupported(PathBuf),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An argument violated an operation's contract
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl ExtractError {
    pub fn query(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
