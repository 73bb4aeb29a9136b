//! Viewer profile models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// What a profile favors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct Preferences {
    /// Emotions the profile favors, strongest first
    #[serde(default)]
    pub dominant_emotions: Vec<String>,

    /// Content tags the profile favors, strongest first
    #[serde(default)]
    pub foreground_tags: Vec<String>,

    /// Opaque audio style hint for audio-cue selection
    #[serde(default)]
    pub audio_style: String,
}

/// Viewer-preference descriptor.
///
/// Loaded once at process start and shared read-only between jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Profile {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub summary: String,
    pub preferences: Preferences,
}

impl Profile {
    /// Whether the profile favors `emotion` (case-insensitive).
    pub fn prefers_emotion(&self, emotion: &str) -> bool {
        self.preferences
            .dominant_emotions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(emotion))
    }

    /// Whether the profile favors `tag` (case-insensitive).
    pub fn prefers_tag(&self, tag: &str) -> bool {
        self.preferences
            .foreground_tags
            .iter()
            .any(|t| t.eq_ignore_ascii_case(tag))
    }
}
