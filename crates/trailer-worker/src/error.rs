//! Worker error types.

use std::path::PathBuf;

use thiserror::Error;
use trailer_models::{FailureKind, JobFailure};

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid request: {0}")]
    InvalidInput(String),

    #[error("Unknown profile: {0}")]
    UnknownProfile(String),

    #[error("Asset not found: {0}")]
    AssetNotFound(PathBuf),

    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("Render failed for scene {scene_id}: {message}")]
    SegmentFailed { scene_id: String, message: String },

    #[error("Render failed: {0}")]
    RenderFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    Storage(#[from] trailer_storage::StorageError),

    #[error("Media error: {0}")]
    Media(#[from] trailer_media::MediaError),

    #[error("Vision error: {0}")]
    Vision(#[from] trailer_vision::VisionError),

    #[error("Invalid request: {0}")]
    Model(#[from] trailer_models::ModelError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn analysis_failed(msg: impl Into<String>) -> Self {
        Self::AnalysisFailed(msg.into())
    }

    pub fn segment_failed(scene_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::SegmentFailed {
            scene_id: scene_id.into(),
            message: msg.into(),
        }
    }

    pub fn render_failed(msg: impl Into<String>) -> Self {
        Self::RenderFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Failure category reported on the job.
    pub fn kind(&self) -> FailureKind {
        match self {
            WorkerError::InvalidInput(_)
            | WorkerError::UnknownProfile(_)
            | WorkerError::AssetNotFound(_)
            | WorkerError::ConfigError(_)
            | WorkerError::Model(_) => FailureKind::InputError,
            WorkerError::AnalysisFailed(_) | WorkerError::Vision(_) => FailureKind::AnalysisError,
            WorkerError::SegmentFailed { .. }
            | WorkerError::RenderFailed(_)
            | WorkerError::Media(_) => FailureKind::RenderError,
            WorkerError::Storage(_) | WorkerError::Json(_) | WorkerError::Io(_) => {
                FailureKind::StorageError
            }
        }
    }

    pub fn to_failure(&self) -> JobFailure {
        JobFailure::new(self.kind(), self.to_string())
    }
}
