//! Machine-readable storyboard document.
//!
//! The document carries no wall-clock timestamps or job ids, and every float
//! is rounded to the millisecond, so two runs with the same seed produce the
//! same bytes.

use serde::Serialize;
use serde_json::{Number, Value};
use trailer_models::timestamp::round_ms;
use trailer_models::{Profile, RankedScene, SceneAnalysis, Timeline, Variant};

use crate::error::WorkerResult;

pub const STORYBOARD_KEY: &str = "storyboard.json";

#[derive(Debug, Serialize)]
struct Coverage {
    seconds: f64,
    ratio: f64,
    scenes: usize,
}

#[derive(Debug, Serialize)]
struct StoryboardVariant<'a> {
    number: usize,
    #[serde(flatten)]
    variant: &'a Variant,
    timeline: &'a Timeline,
}

#[derive(Debug, Serialize)]
struct Storyboard<'a> {
    profile: &'a Profile,
    seed: u64,
    target_duration: f64,
    source_duration: f64,
    duration_is_fallback: bool,
    coverage: Coverage,
    ranked_scenes: &'a [RankedScene],
    variants: Vec<StoryboardVariant<'a>>,
}

/// Inputs of a storyboard.
#[derive(Debug, Clone, Copy)]
pub struct StoryboardInput<'a> {
    pub profile: &'a Profile,
    pub seed: u64,
    pub target_duration: f64,
    pub duration_is_fallback: bool,
    pub analysis: &'a SceneAnalysis,
    pub ranked: &'a [RankedScene],
    pub variants: &'a [Variant],
    pub timelines: &'a [Timeline],
}

/// Round every float in `value` to millisecond precision.
pub fn round_floats(value: &mut Value) {
    match value {
        Value::Number(n) if n.is_f64() => {
            if let Some(rounded) = n.as_f64().map(round_ms).and_then(Number::from_f64) {
                *n = rounded;
            }
        }
        Value::Array(items) => items.iter_mut().for_each(round_floats),
        Value::Object(map) => map.values_mut().for_each(round_floats),
        _ => {}
    }
}

/// Storyboard as a JSON value.
pub fn build_storyboard(input: &StoryboardInput<'_>) -> WorkerResult<Value> {
    let storyboard = Storyboard {
        profile: input.profile,
        seed: input.seed,
        target_duration: input.target_duration,
        source_duration: input.analysis.source_duration,
        duration_is_fallback: input.duration_is_fallback,
        coverage: Coverage {
            seconds: input.analysis.coverage_seconds,
            ratio: input.analysis.coverage_ratio,
            scenes: input.analysis.scenes.len(),
        },
        ranked_scenes: input.ranked,
        variants: input
            .variants
            .iter()
            .zip(input.timelines)
            .enumerate()
            .map(|(i, (variant, timeline))| StoryboardVariant {
                number: i + 1,
                variant,
                timeline,
            })
            .collect(),
    };

    let mut value = serde_json::to_value(&storyboard)?;
    round_floats(&mut value);
    Ok(value)
}

/// Pretty-printed storyboard bytes.
pub fn storyboard_bytes(input: &StoryboardInput<'_>) -> WorkerResult<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(&build_storyboard(input)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SyntheticAnalyzer;
    use crate::personalize::personalize;
    use crate::profiles::ProfileCatalog;
    use crate::timeline::build_timeline;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn render(seed: u64) -> Vec<u8> {
        let profile = ProfileCatalog::builtin().get("romance_devotee").unwrap().clone();
        let mut rng = StdRng::seed_from_u64(seed);
        let scenes = SyntheticAnalyzer::default().generate(130.0, &profile, &mut rng);
        let analysis = SceneAnalysis::from_scenes(scenes, 130.0);
        let outcome = personalize(&analysis, &profile, 45.0, &mut rng);
        let p = outcome.personalization;
        let timelines: Vec<Timeline> = p
            .variants
            .iter()
            .map(|v| build_timeline(v, 130.0, 47.0, &profile.preferences.audio_style, &mut rng))
            .collect();

        storyboard_bytes(&StoryboardInput {
            profile: &profile,
            seed,
            target_duration: 45.0,
            duration_is_fallback: false,
            analysis: &analysis,
            ranked: &p.ranked,
            variants: &p.variants,
            timelines: &timelines,
        })
        .unwrap()
    }

    #[test]
    fn test_same_seed_same_bytes() {
        assert_eq!(render(77), render(77));
        assert_ne!(render(77), render(78));
    }

    #[test]
    fn test_contents() {
        let value: Value = serde_json::from_slice(&render(5)).unwrap();
        assert_eq!(value["profile"]["id"], "romance_devotee");
        assert_eq!(value["seed"], 5);
        assert_eq!(value["variants"][0]["number"], 1);
        assert_eq!(value["variants"][0]["name"], "Opening Act");
        assert!(value["variants"][0]["timeline"]["entries"].is_array());
        assert!(value.get("job_id").is_none());
        assert!(value.get("created_at").is_none());
    }

    #[test]
    fn test_round_floats() {
        let mut value = serde_json::json!({"a": 1.23456, "b": [2.0004, 7], "c": {"d": 0.1 + 0.2}});
        round_floats(&mut value);
        assert_eq!(value["a"], 1.235);
        assert_eq!(value["b"][0], 2.0);
        assert_eq!(value["b"][1], 7);
        assert_eq!(value["c"]["d"], 0.3);
    }
}
