//! Context store error types.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("context not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error("no current context set")]
    NoCurrent,

    #[error("lock {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config document: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
