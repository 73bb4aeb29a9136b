//! Visual-analysis request/response types.

use serde::{Deserialize, Serialize};

/// Frame submitted for analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    /// Base64-encoded JPEG
    pub image: String,
    /// Position of the frame in the source, in seconds
    pub timestamp: f64,
}

/// Detected object/scene label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    #[serde(default)]
    pub confidence: f64,
}

/// Detected face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    /// Dominant emotion of the face
    pub emotion: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

/// Recognized public figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Celebrity {
    pub name: String,
    #[serde(default)]
    pub confidence: f64,
}

/// Analysis of one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameAnalysis {
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub faces: Vec<Face>,
    #[serde(default)]
    pub celebrities: Vec<Celebrity>,
}

impl FrameAnalysis {
    /// No labels and no faces.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty() && self.faces.is_empty()
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}
