//! Artifact store errors.

use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

/// Failure of a write-once artifact operation.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Artifact store misconfigured: {0}")]
    ConfigError(String),

    #[error("No artifact stored at {0}")]
    NotFound(String),

    #[error("Artifact {0} was already written")]
    AlreadyExists(String),

    #[error("Artifact write failed: {0}")]
    UploadFailed(String),

    #[error("Artifact read failed: {0}")]
    DownloadFailed(String),

    #[error("Artifact key rejected: {0}")]
    InvalidKey(String),

    #[error("Filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("R2 request failed: {0}")]
    AwsSdk(String),
}

impl StorageError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound(key.into())
    }

    pub fn already_exists(key: impl Into<String>) -> Self {
        Self::AlreadyExists(key.into())
    }

    pub fn upload_failed(msg: impl Into<String>) -> Self {
        Self::UploadFailed(msg.into())
    }
}
