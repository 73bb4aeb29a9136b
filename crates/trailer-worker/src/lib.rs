//! Personalized trailer generation.
//!
//! This crate provides:
//! - Scene analysis (seeded synthetic or frame-sampled vision)
//! - Preference scoring, region-budgeted selection and trailer variants
//! - Edit timelines and bounded parallel rendering
//! - Captions, storyboard and write-once deliverable storage
//! - Job orchestration with per-stage timings and provider status

pub mod analysis;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod package;
pub mod personalize;
pub mod pipeline;
pub mod probe;
pub mod profiles;
pub mod render;
pub mod timeline;

pub use analysis::{AnalysisRequest, SceneAnalyzer, SyntheticAnalyzer, VisionAnalyzer};
pub use config::{AnalysisMode, StorageBackend, WorkerConfig};
pub use error::{WorkerError, WorkerResult};
pub use logging::JobLogger;
pub use pipeline::TrailerPipeline;
pub use probe::{DurationProbe, FfprobeDurationProbe, SourceDuration};
pub use profiles::ProfileCatalog;
pub use render::{FfmpegRenderer, RenderRequest, TrailerRenderer};
