//! Client for the visual-analysis service.
//!
//! The service labels a single JPEG frame with objects, faces (with their
//! dominant emotion) and recognized public figures. Frames are posted one at
//! a time with a per-request timeout.

pub mod client;
pub mod error;
pub mod types;

use async_trait::async_trait;

pub use client::{VisionClient, VisionClientConfig};
pub use error::{VisionError, VisionResult};
pub use types::{AnalyzeRequest, Celebrity, Face, FrameAnalysis, Label};

/// Source of per-frame visual analysis.
#[async_trait]
pub trait VisualAnalysisProvider: Send + Sync {
    /// Short name reported in provider status.
    fn name(&self) -> &str;

    /// Analyze one JPEG frame taken at `timestamp` seconds.
    async fn analyze_frame(&self, jpeg: &[u8], timestamp: f64) -> VisionResult<FrameAnalysis>;
}
