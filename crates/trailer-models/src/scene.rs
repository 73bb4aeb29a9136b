//! Scene models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A character detected (or synthesized) inside a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Character {
    /// Display name ("Lead", a celebrity match, or "Person N")
    pub name: String,

    /// Detection confidence in percent (0-100)
    pub confidence: f64,

    /// Dominant emotion shown by this character
    pub emotion: String,
}

/// A contiguous time window of the source asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Scene {
    /// Stable identifier, unique within one analysis run
    pub scene_id: String,

    /// Start in seconds
    pub start: f64,

    /// End in seconds (always greater than `start`)
    pub end: f64,

    /// `end - start`
    pub duration: f64,

    /// Dominant emotions, most prominent first (never empty)
    pub emotions: Vec<String>,

    /// Content tags (objects, activities, scene type)
    pub labels: Vec<String>,

    /// Characters detected in the window
    #[serde(default)]
    pub characters: Vec<Character>,
}

impl Scene {
    /// Create a scene for `[start, end)` with no tags yet.
    pub fn new(scene_id: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            scene_id: scene_id.into(),
            start,
            end,
            duration: end - start,
            emotions: Vec::new(),
            labels: Vec::new(),
            characters: Vec::new(),
        }
    }

    /// Identifier for the scene at `index` (0-based) of a run.
    pub fn id_for_index(index: usize) -> String {
        format!("scene_{:03}", index + 1)
    }

    pub fn with_emotions(mut self, emotions: Vec<String>) -> Self {
        self.emotions = emotions;
        self
    }

    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_characters(mut self, characters: Vec<Character>) -> Self {
        self.characters = characters;
        self
    }

    /// The most prominent emotion, if any.
    pub fn dominant_emotion(&self) -> Option<&str> {
        self.emotions.first().map(String::as_str)
    }
}

/// A scene augmented with its preference score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RankedScene {
    #[serde(flatten)]
    pub scene: Scene,

    /// Weighted preference score in [0.0, 1.0]
    pub score: f64,

    /// `start / total_duration`
    pub normalized_start: f64,

    /// Scene emotions that the profile prefers
    #[serde(default)]
    pub matched_emotions: Vec<String>,

    /// Scene labels that the profile prefers
    #[serde(default)]
    pub matched_tags: Vec<String>,
}

impl RankedScene {
    pub fn scene_id(&self) -> &str {
        &self.scene.scene_id
    }

    pub fn start(&self) -> f64 {
        self.scene.start
    }

    pub fn end(&self) -> f64 {
        self.scene.end
    }

    pub fn duration(&self) -> f64 {
        self.scene.duration
    }
}

/// Output of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SceneAnalysis {
    /// Source duration the scenes were generated against
    pub source_duration: f64,

    /// Sum of scene durations actually covered
    pub coverage_seconds: f64,

    /// `coverage_seconds / source_duration`, never above 1.0
    pub coverage_ratio: f64,

    /// Scenes in chronological order
    pub scenes: Vec<Scene>,
}

impl SceneAnalysis {
    /// Build an analysis and compute its true coverage.
    pub fn from_scenes(scenes: Vec<Scene>, source_duration: f64) -> Self {
        let covered: f64 = scenes.iter().map(|s| s.duration).sum();
        let coverage_seconds = covered.min(source_duration).max(0.0);
        let coverage_ratio = if source_duration > 0.0 {
            (coverage_seconds / source_duration).min(1.0)
        } else {
            0.0
        };

        Self {
            source_duration,
            coverage_seconds,
            coverage_ratio,
            scenes,
        }
    }

    /// Total duration of all scenes.
    pub fn total_scene_duration(&self) -> f64 {
        self.scenes.iter().map(|s| s.duration).sum()
    }
}
