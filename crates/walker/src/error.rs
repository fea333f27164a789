use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WalkError>;

#[derive(Error, Debug)]
pub enum WalkError {
    #[error("Cannot walk {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot walk {0}: not a directory")]
    RootNotDirectory(PathBuf),

    #[error("Invalid ignore pattern: {0}")]
    Pattern(#[from] globset::Error),
}
