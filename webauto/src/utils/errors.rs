//! Custom error types for webauto.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WebautoError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Failed to list objects in bucket {bucket}: {message}")]
    RemoteListing { bucket: String, message: String },

    #[error("Failed to read {path}: {source}")]
    LocalRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to upload {key}: {message}")]
    RemoteWrite { key: String, message: String },

    #[error("Provisioning error: {0}")]
    Provision(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl WebautoError {
    pub(crate) fn local_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::LocalRead {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, WebautoError>;
