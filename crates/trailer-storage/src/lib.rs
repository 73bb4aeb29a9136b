//! Write-once artifact storage for trailer deliverables.
//!
//! Two backends share the [`ArtifactStore`] trait: a local directory tree and
//! a Cloudflare R2 bucket reached through the S3 API.

pub mod error;
pub mod local;
pub mod r2;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use local::LocalArtifactStore;
pub use r2::{R2ArtifactStore, R2Config};
pub use store::{object_key, ArtifactStore, StoredObject};
