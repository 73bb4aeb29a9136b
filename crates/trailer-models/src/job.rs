//! Job definitions for trailer generation.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::encoding::OutputFormat;
use crate::error::ModelError;
use crate::scene::{RankedScene, SceneAnalysis};
use crate::timeline::Timeline;
use crate::variant::{Selection, Variant};

/// Upper bound on the requested trailer length in seconds.
pub const MAX_TARGET_DURATION: f64 = 600.0;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Job accepted, no stage has run
    #[default]
    Pending,
    /// Pipeline is running
    Processing,
    /// All deliverables written
    Completed,
    /// Job stopped with a failure reason
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-job configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct JobConfig {
    /// Target trailer length in seconds
    pub target_duration: f64,

    /// Caption languages (ISO 639-1 codes)
    pub languages: Vec<String>,

    /// Output container
    pub output_format: OutputFormat,

    /// Write caption tracks
    pub captions: bool,

    /// Write the storyboard document
    pub storyboard: bool,

    /// Seed for every random choice; drawn fresh when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            target_duration: 60.0,
            languages: vec!["en".to_string()],
            output_format: OutputFormat::default(),
            captions: true,
            storyboard: true,
            seed: None,
        }
    }
}

impl JobConfig {
    pub fn validate(&self) -> Result<(), ModelError> {
        if !self.target_duration.is_finite()
            || self.target_duration <= 0.0
            || self.target_duration > MAX_TARGET_DURATION
        {
            return Err(ModelError::InvalidTargetDuration(self.target_duration));
        }
        if self.languages.is_empty() {
            return Err(ModelError::NoLanguages);
        }
        for (i, lang) in self.languages.iter().enumerate() {
            let valid = (2..=8).contains(&lang.len())
                && lang.chars().all(|c| c.is_ascii_alphabetic() || c == '-');
            if !valid {
                return Err(ModelError::InvalidLanguage(lang.clone()));
            }
            // Caption keys are per language, so repeats would collide
            if self.languages[..i].iter().any(|l| l.eq_ignore_ascii_case(lang)) {
                return Err(ModelError::DuplicateLanguage(lang.clone()));
            }
        }
        Ok(())
    }
}

/// Validated request that drives one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JobRequest {
    /// Profile to personalize for
    pub profile_id: String,

    /// Uploaded source asset
    pub asset_path: PathBuf,

    #[serde(flatten)]
    pub config: JobConfig,
}

impl JobRequest {
    pub fn new(profile_id: impl Into<String>, asset_path: impl Into<PathBuf>) -> Self {
        Self {
            profile_id: profile_id.into(),
            asset_path: asset_path.into(),
            config: JobConfig::default(),
        }
    }

    pub fn with_config(mut self, config: JobConfig) -> Self {
        self.config = config;
        self
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.profile_id.trim().is_empty() {
            return Err(ModelError::EmptyProfileId);
        }
        self.config.validate()
    }
}

/// Health of one external collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatusKind {
    Ok,
    Degraded,
    Failed,
}

/// Provider mode and status reported on the job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProviderStatus {
    /// "synthetic", "vision", "ffmpeg", "local", "r2", ...
    pub mode: String,

    pub status: ProviderStatusKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ProviderStatus {
    pub fn ok(mode: impl Into<String>) -> Self {
        Self {
            mode: mode.into(),
            status: ProviderStatusKind::Ok,
            detail: None,
        }
    }

    pub fn degraded(mode: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            mode: mode.into(),
            status: ProviderStatusKind::Degraded,
            detail: Some(detail.into()),
        }
    }

    pub fn failed(mode: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            mode: mode.into(),
            status: ProviderStatusKind::Failed,
            detail: Some(detail.into()),
        }
    }
}

/// Elapsed time of one pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StageTiming {
    pub stage: String,
    pub elapsed_ms: u64,
}

/// Failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InputError,
    AnalysisError,
    StorageError,
    RenderError,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::InputError => "input_error",
            FailureKind::AnalysisError => "analysis_error",
            FailureKind::StorageError => "storage_error",
            FailureKind::RenderError => "render_error",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Explicit reason a job failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JobFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl JobFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// A stored artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Deliverable {
    /// Store key relative to the job prefix
    pub key: String,

    pub content_type: String,

    pub size_bytes: u64,

    /// 1-based variant number, for per-variant artifacts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<usize>,
}

/// Scoring and selection output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Personalization {
    /// Scenes ordered by score, descending
    pub ranked: Vec<RankedScene>,

    /// Canonical 0.3/0.4/0.3 selection
    pub canonical: Selection,

    pub variants: Vec<Variant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyStatus {
    Rendered,
    Failed,
}

/// Timeline and render outcome for one variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Assembly {
    /// 1-based variant number
    pub variant: usize,

    pub timeline: Timeline,

    pub status: AssemblyStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A trailer generation job and everything it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    pub id: JobId,

    pub profile_id: String,

    pub asset_path: PathBuf,

    pub config: JobConfig,

    #[serde(default)]
    pub state: JobState,

    /// Effective seed (requested or drawn)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Probed or fallback source duration in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_duration: Option<f64>,

    /// True when `source_duration` was not probed
    #[serde(default)]
    pub duration_is_fallback: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<SceneAnalysis>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub personalization: Option<Personalization>,

    #[serde(default)]
    pub assemblies: Vec<Assembly>,

    /// Stored artifacts keyed by store key
    #[serde(default)]
    pub deliverables: BTreeMap<String, Deliverable>,

    #[serde(default)]
    pub providers: BTreeMap<String, ProviderStatus>,

    #[serde(default)]
    pub timings: Vec<StageTiming>,

    #[serde(default)]
    pub warnings: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<JobFailure>,

    pub created_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a pending job for a request.
    pub fn new(request: &JobRequest) -> Self {
        Self {
            id: JobId::new(),
            profile_id: request.profile_id.clone(),
            asset_path: request.asset_path.clone(),
            config: request.config.clone(),
            state: JobState::Pending,
            seed: None,
            source_duration: None,
            duration_is_fallback: false,
            analysis: None,
            personalization: None,
            assemblies: Vec::new(),
            deliverables: BTreeMap::new(),
            providers: BTreeMap::new(),
            timings: Vec::new(),
            warnings: Vec::new(),
            failure: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Mark job as processing.
    pub fn start(mut self) -> Self {
        self.state = JobState::Processing;
        self.started_at = Some(Utc::now());
        self
    }

    /// Mark job as completed.
    pub fn complete(mut self) -> Self {
        self.state = JobState::Completed;
        self.completed_at = Some(Utc::now());
        self
    }

    /// Mark job as failed.
    pub fn fail(mut self, failure: JobFailure) -> Self {
        self.state = JobState::Failed;
        self.failure = Some(failure);
        self.completed_at = Some(Utc::now());
        self
    }

    pub fn set_provider(&mut self, name: impl Into<String>, status: ProviderStatus) {
        self.providers.insert(name.into(), status);
    }

    pub fn record_timing(&mut self, stage: impl Into<String>, elapsed_ms: u64) {
        self.timings.push(StageTiming {
            stage: stage.into(),
            elapsed_ms,
        });
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn add_deliverable(&mut self, deliverable: Deliverable) {
        self.deliverables.insert(deliverable.key.clone(), deliverable);
    }

    /// Keys of rendered trailer deliverables.
    pub fn trailer_keys(&self) -> Vec<&str> {
        self.deliverables
            .keys()
            .filter(|k| k.starts_with("trailer_variant_"))
            .map(String::as_str)
            .collect()
    }
}
