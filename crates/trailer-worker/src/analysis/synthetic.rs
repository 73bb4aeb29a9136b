//! Deterministic synthetic scene generation.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::debug;
use trailer_models::{Character, Profile, Scene, SceneAnalysis};

use super::{AnalysisRequest, SceneAnalyzer};
use crate::error::WorkerResult;

const NEUTRAL_EMOTIONS: &[&str] = &["calm", "curiosity", "hope", "melancholy", "neutral"];
const GENERIC_TAGS: &[&str] = &[
    "city",
    "crowd",
    "dialogue",
    "interior",
    "landscape",
    "night",
    "vehicle",
];
const CHARACTER_NAMES: &[&str] = &["Lead", "Rival", "Mentor", "Ally", "Stranger"];

const EMOTIONS_PER_SCENE: usize = 2;
const LABELS_PER_SCENE: usize = 3;
const CONFIDENCE_MIN: f64 = 72.0;
const CONFIDENCE_MAX: f64 = 98.0;

/// Seeded scene generator driven by the profile's vocabulary.
#[derive(Debug, Clone)]
pub struct SyntheticAnalyzer {
    pub min_scene_len: f64,
    pub max_scene_len: f64,
}

impl Default for SyntheticAnalyzer {
    fn default() -> Self {
        Self {
            min_scene_len: 6.0,
            max_scene_len: 18.0,
        }
    }
}

impl SyntheticAnalyzer {
    pub fn new(min_scene_len: f64, max_scene_len: f64) -> Self {
        Self {
            min_scene_len,
            max_scene_len,
        }
    }

    /// Generate scenes for `[0, duration)`.
    ///
    /// Stops once the next scene would start within `min_scene_len` of the
    /// end, so a short tail may stay uncovered. A source shorter than one
    /// scene becomes a single scene.
    pub fn generate(&self, duration: f64, profile: &Profile, rng: &mut StdRng) -> Vec<Scene> {
        let emotion_pool = merge_pool(&profile.preferences.dominant_emotions, NEUTRAL_EMOTIONS);
        let tag_pool = merge_pool(&profile.preferences.foreground_tags, GENERIC_TAGS);

        let mut scenes = Vec::new();
        let mut start = 0.0;

        while duration - start >= self.min_scene_len {
            let len = rng.random_range(self.min_scene_len..=self.max_scene_len);
            let end = (start + len).min(duration);
            let scene = self.tag_scene(Scene::new(Scene::id_for_index(scenes.len()), start, end), &emotion_pool, &tag_pool, rng);
            scenes.push(scene);
            start = end;
        }

        if scenes.is_empty() && duration > 0.0 {
            let scene = self.tag_scene(Scene::new(Scene::id_for_index(0), 0.0, duration), &emotion_pool, &tag_pool, rng);
            scenes.push(scene);
        }

        scenes
    }

    fn tag_scene(&self, scene: Scene, emotion_pool: &[String], tag_pool: &[String], rng: &mut StdRng) -> Scene {
        let emotions: Vec<String> = emotion_pool
            .choose_multiple(rng, EMOTIONS_PER_SCENE)
            .cloned()
            .collect();
        let labels: Vec<String> = tag_pool.choose_multiple(rng, LABELS_PER_SCENE).cloned().collect();

        let count = rng.random_range(1..=3usize);
        let names: Vec<&str> = CHARACTER_NAMES.choose_multiple(rng, count).copied().collect();
        let characters = names
            .into_iter()
            .map(|name| {
                let confidence = rng.random_range(CONFIDENCE_MIN..=CONFIDENCE_MAX);
                let emotion = emotions
                    .choose(rng)
                    .cloned()
                    .unwrap_or_else(|| "neutral".to_string());
                Character {
                    name: name.to_string(),
                    confidence: (confidence * 10.0).round() / 10.0,
                    emotion,
                }
            })
            .collect();

        scene
            .with_emotions(emotions)
            .with_labels(labels)
            .with_characters(characters)
    }
}

/// Preferred entries first, then the generic pool, without case-insensitive duplicates.
fn merge_pool(preferred: &[String], generic: &[&str]) -> Vec<String> {
    let mut pool: Vec<String> = Vec::new();
    for item in preferred.iter().map(String::as_str).chain(generic.iter().copied()) {
        if !pool.iter().any(|p| p.eq_ignore_ascii_case(item)) {
            pool.push(item.to_string());
        }
    }
    pool
}

#[async_trait]
impl SceneAnalyzer for SyntheticAnalyzer {
    fn mode(&self) -> &'static str {
        "synthetic"
    }

    async fn analyze(&self, request: &AnalysisRequest<'_>, rng: &mut StdRng) -> WorkerResult<SceneAnalysis> {
        let scenes = self.generate(request.duration, request.profile, rng);
        let analysis = SceneAnalysis::from_scenes(scenes, request.duration);
        debug!(
            scenes = analysis.scenes.len(),
            coverage_ratio = analysis.coverage_ratio,
            "Synthetic scenes generated"
        );
        Ok(analysis)
    }
}
