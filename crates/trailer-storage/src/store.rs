//! Artifact store abstraction.

use std::path::Path;

use async_trait::async_trait;
use trailer_models::JobId;

use crate::error::{StorageError, StorageResult};

/// Result of a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Full object key (`{job_id}/{key}`)
    pub key: String,
    pub size_bytes: u64,
}

/// Write-once key-value store for job deliverables.
///
/// Objects live under `{job_id}/{key}`. Writing a key that already exists
/// fails with [`StorageError::AlreadyExists`].
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Backend name reported in provider status ("local", "r2").
    fn name(&self) -> &str;

    async fn put_bytes(
        &self,
        job_id: &JobId,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<StoredObject>;

    async fn put_file(
        &self,
        job_id: &JobId,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> StorageResult<StoredObject>;

    async fn get(&self, job_id: &JobId, key: &str) -> StorageResult<Vec<u8>>;

    async fn exists(&self, job_id: &JobId, key: &str) -> StorageResult<bool>;
}

/// Full object key for a job artifact.
///
/// Keys are flat file names; separators and parent references are rejected.
pub fn object_key(job_id: &JobId, key: &str) -> StorageResult<String> {
    if key.is_empty() || key.contains('/') || key.contains('\\') || key == "." || key == ".." {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    if job_id.as_str().is_empty() || job_id.as_str().contains('/') {
        return Err(StorageError::InvalidKey(job_id.to_string()));
    }
    Ok(format!("{}/{}", job_id, key))
}
