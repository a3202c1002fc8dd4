use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupt index store at {path}: {detail}")]
    Corrupt { path: PathBuf, detail: String },

    #[error("invalid corpus directory: {0}")]
    InvalidPath(String),

    #[error("unknown file: {0}")]
    UnknownFile(String),

    #[error("lock error: {0}")]
    Lock(String),

    #[error("watcher error: {0}")]
    Watch(String),
}
