//! Local filesystem artifact store.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use trailer_models::JobId;

use crate::error::{StorageError, StorageResult};
use crate::store::{object_key, ArtifactStore, StoredObject};

/// Stores artifacts as files under a root directory.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path for an object key.
    pub fn path_for(&self, job_id: &JobId, key: &str) -> StorageResult<PathBuf> {
        Ok(self.root.join(object_key(job_id, key)?))
    }

    /// Create the destination, failing if it already exists.
    async fn create_new(&self, job_id: &JobId, key: &str) -> StorageResult<(String, PathBuf, tokio::fs::File)> {
        let full_key = object_key(job_id, key)?;
        let path = self.root.join(&full_key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => StorageError::already_exists(full_key.clone()),
                _ => StorageError::Io(e),
            })?;

        Ok((full_key, path, file))
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn put_bytes(
        &self,
        job_id: &JobId,
        key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> StorageResult<StoredObject> {
        let (full_key, path, mut file) = self.create_new(job_id, key).await?;
        file.write_all(&data).await?;
        file.flush().await?;

        debug!("Stored {} bytes at {}", data.len(), path.display());
        Ok(StoredObject {
            key: full_key,
            size_bytes: data.len() as u64,
        })
    }

    async fn put_file(
        &self,
        job_id: &JobId,
        key: &str,
        source: &Path,
        _content_type: &str,
    ) -> StorageResult<StoredObject> {
        if !source.exists() {
            return Err(StorageError::upload_failed(format!(
                "source file missing: {}",
                source.display()
            )));
        }

        let (full_key, path, mut file) = self.create_new(job_id, key).await?;
        let mut reader = tokio::fs::File::open(source).await?;
        let size_bytes = tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;

        info!("Stored {} at {}", source.display(), path.display());
        Ok(StoredObject { key: full_key, size_bytes })
    }

    async fn get(&self, job_id: &JobId, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.path_for(job_id, key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::not_found(object_key(job_id, key)?)),
            Err(e) => Err(StorageError::DownloadFailed(e.to_string())),
        }
    }

    async fn exists(&self, job_id: &JobId, key: &str) -> StorageResult<bool> {
        let path = self.path_for(job_id, key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }
}
