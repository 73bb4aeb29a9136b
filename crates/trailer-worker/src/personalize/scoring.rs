//! Preference scoring.

use rand::rngs::StdRng;
use rand::Rng;
use trailer_models::{Profile, RankedScene, Scene};

const BASE_SCORE_MIN: f64 = 0.6;
const BASE_SCORE_MAX: f64 = 0.98;
const EMOTION_BOOST: f64 = 0.15;
const TAG_BOOST: f64 = 0.10;

/// Score every scene against `profile` and rank them best first.
///
/// Base scores are drawn in chronological order, so the scene order passed in
/// matters for reproducibility. Ties keep chronological order.
pub fn score_scenes(scenes: &[Scene], profile: &Profile, source_duration: f64, rng: &mut StdRng) -> Vec<RankedScene> {
    let mut chronological: Vec<&Scene> = scenes.iter().collect();
    chronological.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut ranked: Vec<RankedScene> = chronological
        .into_iter()
        .map(|scene| {
            let base = rng.random_range(BASE_SCORE_MIN..BASE_SCORE_MAX);
            rank_scene(scene, profile, base, source_duration)
        })
        .collect();

    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

fn rank_scene(scene: &Scene, profile: &Profile, base: f64, source_duration: f64) -> RankedScene {
    let matched_emotions: Vec<String> = scene
        .emotions
        .iter()
        .filter(|e| profile.prefers_emotion(e))
        .cloned()
        .collect();
    let matched_tags: Vec<String> = scene
        .labels
        .iter()
        .filter(|l| profile.prefers_tag(l))
        .cloned()
        .collect();

    let weight = 1.0 + EMOTION_BOOST * matched_emotions.len() as f64 + TAG_BOOST * matched_tags.len() as f64;
    let normalized_start = if source_duration > 0.0 {
        (scene.start / source_duration).clamp(0.0, 1.0)
    } else {
        0.0
    };

    RankedScene {
        scene: scene.clone(),
        score: (base * weight).clamp(0.0, 1.0),
        normalized_start,
        matched_emotions,
        matched_tags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::ProfileCatalog;
    use rand::SeedableRng;

    fn scenes() -> Vec<Scene> {
        vec![
            Scene::new("scene_001", 0.0, 10.0).with_emotions(vec!["calm".into(), "hope".into()]),
            Scene::new("scene_002", 10.0, 20.0)
                .with_emotions(vec!["Excitement".into(), "tension".into()])
                .with_labels(vec!["EXPLOSION".into(), "fight".into(), "city".into()]),
            Scene::new("scene_003", 20.0, 30.0).with_labels(vec!["stunt".into()]),
        ]
    }

    #[test]
    fn test_matches_are_case_insensitive() {
        let profile = ProfileCatalog::builtin().get("action_enthusiast").unwrap().clone();
        let ranked = score_scenes(&scenes(), &profile, 30.0, &mut StdRng::seed_from_u64(5));
        let hot = ranked.iter().find(|r| r.scene_id() == "scene_002").unwrap();
        assert_eq!(hot.matched_emotions, vec!["Excitement", "tension"]);
        assert_eq!(hot.matched_tags, vec!["EXPLOSION", "fight"]);
        let cold = ranked.iter().find(|r| r.scene_id() == "scene_001").unwrap();
        assert!(cold.matched_emotions.is_empty());
    }

    #[test]
    fn test_scores_bounded_and_sorted() {
        let profile = ProfileCatalog::builtin().get("action_enthusiast").unwrap().clone();
        for seed in 0..20 {
            let ranked = score_scenes(&scenes(), &profile, 30.0, &mut StdRng::seed_from_u64(seed));
            assert_eq!(ranked.len(), 3);
            for r in &ranked {
                assert!((0.0..=1.0).contains(&r.score));
            }
            for pair in ranked.windows(2) {
                assert!(pair[0].score >= pair[1].score);
            }
        }
    }

    #[test]
    fn test_weighted_score_formula() {
        let profile = ProfileCatalog::builtin().get("action_enthusiast").unwrap().clone();
        let scene = Scene::new("s", 60.0, 70.0)
            .with_emotions(vec!["triumph".into()])
            .with_labels(vec!["stunt".into()]);
        let ranked = rank_scene(&scene, &profile, 0.7, 120.0);
        assert!((ranked.score - 0.7 * 1.25).abs() < 1e-9);
        assert!((ranked.normalized_start - 0.5).abs() < 1e-9);

        let clamped = rank_scene(&scenes()[1], &profile, 0.9, 30.0);
        assert_eq!(clamped.score, 1.0);
    }

    #[test]
    fn test_ties_keep_chronological_order() {
        let profile = ProfileCatalog::builtin().get("romance_devotee").unwrap().clone();
        let ranked: Vec<RankedScene> = scenes()
            .iter()
            .map(|s| rank_scene(s, &profile, 0.8, 30.0))
            .collect();
        let mut sorted = ranked.clone();
        sorted.sort_by(|a, b| b.score.total_cmp(&a.score));
        let ids: Vec<&str> = sorted.iter().map(RankedScene::scene_id).collect();
        assert_eq!(ids, vec!["scene_001", "scene_002", "scene_003"]);
    }
}
