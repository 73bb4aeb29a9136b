//! Worker configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::WorkerError;

/// Hard ceiling on concurrent variant renders.
pub const MAX_RENDER_PARALLEL: usize = 4;

/// Where scene analysis comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisMode {
    /// Deterministic seeded generator
    #[default]
    Synthetic,
    /// Sampled frames sent to the visual-analysis service
    Vision,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Synthetic => "synthetic",
            AnalysisMode::Vision => "vision",
        }
    }
}

impl FromStr for AnalysisMode {
    type Err = WorkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "synthetic" => Ok(AnalysisMode::Synthetic),
            "vision" => Ok(AnalysisMode::Vision),
            other => Err(WorkerError::config_error(format!("unknown analysis mode: {}", other))),
        }
    }
}

/// Artifact store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    #[default]
    Local,
    R2,
}

impl FromStr for StorageBackend {
    type Err = WorkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(StorageBackend::Local),
            "r2" => Ok(StorageBackend::R2),
            other => Err(WorkerError::config_error(format!("unknown storage backend: {}", other))),
        }
    }
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Parent directory for per-job temporary directories
    pub work_dir: PathBuf,
    /// Maximum variants rendered at once (capped at 4)
    pub max_render_parallel: usize,
    /// Scene analyzer implementation
    pub analysis_mode: AnalysisMode,
    /// Shortest synthetic scene in seconds
    pub min_scene_len: f64,
    /// Longest synthetic scene in seconds
    pub max_scene_len: f64,
    /// Frames sampled for visual analysis
    pub frame_samples: usize,
    /// Time buckets frames are merged into
    pub bucket_count: usize,
    /// Timeout for a single ffmpeg invocation
    pub render_timeout_secs: u64,
    /// Profiles JSON file; the built-in catalogue is used when unset
    pub profiles_path: Option<PathBuf>,
    /// Artifact store backend
    pub storage: StorageBackend,
    /// Root directory for the local artifact store
    pub storage_dir: PathBuf,
    /// Prometheus listener address
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("trailer"),
            max_render_parallel: MAX_RENDER_PARALLEL,
            analysis_mode: AnalysisMode::Synthetic,
            min_scene_len: 6.0,
            max_scene_len: 18.0,
            frame_samples: 30,
            bucket_count: 5,
            render_timeout_secs: 600,
            profiles_path: None,
            storage: StorageBackend::Local,
            storage_dir: PathBuf::from("./artifacts"),
            metrics_addr: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, WorkerError> {
        let defaults = Self::default();

        let analysis_mode = match std::env::var("TRAILER_ANALYSIS_MODE") {
            Ok(v) => v.parse()?,
            Err(_) => defaults.analysis_mode,
        };
        let storage = match std::env::var("TRAILER_STORAGE") {
            Ok(v) => v.parse()?,
            Err(_) => defaults.storage,
        };
        let metrics_addr = match std::env::var("METRICS_ADDR") {
            Ok(v) => Some(v.parse().map_err(|_| {
                WorkerError::config_error(format!("invalid METRICS_ADDR: {}", v))
            })?),
            Err(_) => None,
        };

        let config = Self {
            work_dir: std::env::var("TRAILER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            max_render_parallel: std::env::var("TRAILER_MAX_RENDER_PARALLEL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_render_parallel),
            analysis_mode,
            min_scene_len: std::env::var("TRAILER_MIN_SCENE_LEN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.min_scene_len),
            max_scene_len: std::env::var("TRAILER_MAX_SCENE_LEN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_scene_len),
            frame_samples: std::env::var("TRAILER_FRAME_SAMPLES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.frame_samples),
            bucket_count: std::env::var("TRAILER_BUCKET_COUNT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.bucket_count),
            render_timeout_secs: std::env::var("TRAILER_RENDER_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.render_timeout_secs),
            profiles_path: std::env::var("TRAILER_PROFILES_PATH").ok().map(PathBuf::from),
            storage,
            storage_dir: std::env::var("TRAILER_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_dir),
            metrics_addr,
        };

        config.validated()
    }

    /// Clamp parallelism and reject inconsistent bounds.
    pub fn validated(mut self) -> Result<Self, WorkerError> {
        self.max_render_parallel = self.max_render_parallel.clamp(1, MAX_RENDER_PARALLEL);

        if !(self.min_scene_len > 0.0 && self.max_scene_len >= self.min_scene_len) {
            return Err(WorkerError::config_error(format!(
                "invalid scene length bounds [{}, {}]",
                self.min_scene_len, self.max_scene_len
            )));
        }
        if self.frame_samples == 0 || self.bucket_count == 0 {
            return Err(WorkerError::config_error(
                "frame sample and bucket counts must be positive",
            ));
        }
        Ok(self)
    }

    /// Render pool size for `variants` variants.
    pub fn render_pool_size(&self, variants: usize) -> usize {
        variants.min(self.max_render_parallel).max(1)
    }
}
