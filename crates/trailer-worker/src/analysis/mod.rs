//! Scene analysis.
//!
//! Two analyzers share the [`SceneAnalyzer`] trait and one is picked per job
//! from configuration: a seeded synthetic generator and a visual-analysis
//! backed implementation that samples frames from the asset.

pub mod synthetic;
pub mod vision;

use std::path::Path;

use async_trait::async_trait;
use rand::rngs::StdRng;
use trailer_models::{Profile, SceneAnalysis};

use crate::error::WorkerResult;

pub use synthetic::SyntheticAnalyzer;
pub use vision::{FfmpegFrameSampler, FrameSampler, VisionAnalyzer};

/// Inputs shared by every analyzer.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisRequest<'a> {
    pub asset_path: &'a Path,
    pub duration: f64,
    pub profile: &'a Profile,
    /// Job-scoped scratch directory
    pub work_dir: &'a Path,
}

#[async_trait]
pub trait SceneAnalyzer: Send + Sync {
    /// Mode reported in provider status.
    fn mode(&self) -> &'static str;

    /// Produce chronological, non-overlapping scenes covering `[0, duration)`.
    async fn analyze(&self, request: &AnalysisRequest<'_>, rng: &mut StdRng) -> WorkerResult<SceneAnalysis>;
}
