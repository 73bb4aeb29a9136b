//! Cloudflare R2 artifact store.

use std::path::Path;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};
use trailer_models::JobId;

use crate::error::{StorageError, StorageResult};
use crate::store::{object_key, ArtifactStore, StoredObject};

/// Bucket coordinates and credentials.
#[derive(Debug, Clone)]
pub struct R2Config {
    /// S3-compatible account endpoint
    pub endpoint_url: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    /// "auto" for R2
    pub region: String,
}

fn required(name: &str) -> StorageResult<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| StorageError::config_error(format!("{} must be set for the r2 backend", name)))
}

impl R2Config {
    /// Read `R2_ENDPOINT_URL`, `R2_ACCESS_KEY_ID`, `R2_SECRET_ACCESS_KEY`,
    /// `R2_BUCKET_NAME` and the optional `R2_REGION`.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            endpoint_url: required("R2_ENDPOINT_URL")?,
            access_key_id: required("R2_ACCESS_KEY_ID")?,
            secret_access_key: required("R2_SECRET_ACCESS_KEY")?,
            bucket_name: required("R2_BUCKET_NAME")?,
            region: std::env::var("R2_REGION").unwrap_or_else(|_| "auto".to_string()),
        })
    }
}

/// Artifact store backed by an R2 bucket.
#[derive(Clone)]
pub struct R2ArtifactStore {
    client: Client,
    bucket: String,
}

impl R2ArtifactStore {
    pub fn new(config: R2Config) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "r2",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket_name,
        }
    }

    pub fn from_env() -> StorageResult<Self> {
        Ok(Self::new(R2Config::from_env()?))
    }

    async fn object_exists(&self, full_key: &str) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(full_key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let message = e.to_string();
                if message.contains("NotFound") || message.contains("NoSuchKey") {
                    Ok(false)
                } else {
                    Err(StorageError::AwsSdk(message))
                }
            }
        }
    }

    async fn put_object(
        &self,
        full_key: &str,
        body: ByteStream,
        content_type: &str,
    ) -> StorageResult<()> {
        if self.object_exists(full_key).await? {
            return Err(StorageError::already_exists(full_key));
        }

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(full_key)
            .body(body)
            .content_type(content_type)
            .if_none_match("*")
            .send()
            .await
            .map_err(|e| {
                let message = e.to_string();
                if message.contains("PreconditionFailed") {
                    StorageError::already_exists(full_key)
                } else {
                    StorageError::upload_failed(message)
                }
            })?;
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for R2ArtifactStore {
    fn name(&self) -> &str {
        "r2"
    }

    async fn put_bytes(
        &self,
        job_id: &JobId,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<StoredObject> {
        let full_key = object_key(job_id, key)?;
        let size_bytes = data.len() as u64;
        debug!(key = %full_key, size = size_bytes, "Writing artifact to R2");

        self.put_object(&full_key, ByteStream::from(data), content_type).await?;
        Ok(StoredObject { key: full_key, size_bytes })
    }

    async fn put_file(
        &self,
        job_id: &JobId,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> StorageResult<StoredObject> {
        let full_key = object_key(job_id, key)?;
        let size_bytes = tokio::fs::metadata(path).await?.len();
        debug!(key = %full_key, path = %path.display(), "Streaming artifact to R2");

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;
        self.put_object(&full_key, body, content_type).await?;

        info!(bucket = %self.bucket, key = %full_key, size = size_bytes, "Artifact written");
        Ok(StoredObject { key: full_key, size_bytes })
    }

    async fn get(&self, job_id: &JobId, key: &str) -> StorageResult<Vec<u8>> {
        let full_key = object_key(job_id, key)?;
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("NoSuchKey") {
                    StorageError::not_found(full_key.clone())
                } else {
                    StorageError::DownloadFailed(e.to_string())
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?
            .into_bytes()
            .to_vec();
        Ok(bytes)
    }

    async fn exists(&self, job_id: &JobId, key: &str) -> StorageResult<bool> {
        self.object_exists(&object_key(job_id, key)?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env_requires_endpoint() {
        std::env::remove_var("R2_ENDPOINT_URL");
        let err = R2Config::from_env().unwrap_err();
        assert!(matches!(err, StorageError::ConfigError(_)));
    }
}
