use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CacheError>;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{path} is {size} bytes, larger than the {limit} byte fingerprint limit")]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
