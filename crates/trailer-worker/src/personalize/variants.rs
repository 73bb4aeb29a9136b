//! Multi-variant trailer cuts.

use std::collections::BTreeSet;

use tracing::{debug, warn};
use trailer_models::{RankedScene, Region, RegionWeights, Selection, Variant, DURATION_TOLERANCE};

use super::selection::{exhausted_selection, finish, region_candidates, search_window, select_scenes, Picker};

/// Scene ids already placed in an earlier variant of the same run.
pub type UsedScenes = BTreeSet<String>;

/// Variant presets: name, description, region weights.
pub const VARIANT_PRESETS: [(&str, &str, RegionWeights); 4] = [
    (
        "Opening Act",
        "Leans on the setup: most of the cut comes from the first third.",
        RegionWeights::new(0.60, 0.30, 0.10),
    ),
    (
        "Middle Climax",
        "Builds around the rising action in the middle third.",
        RegionWeights::new(0.20, 0.60, 0.20),
    ),
    (
        "Grand Finale",
        "Saves the weight for the final third.",
        RegionWeights::new(0.10, 0.30, 0.60),
    ),
    (
        "Balanced Mix",
        "Even coverage across the whole source.",
        RegionWeights::new(0.33, 0.34, 0.33),
    ),
];

const STRIDE: usize = 2;

/// Build the variant at `index` and return it with the updated used set.
///
/// Variant 0 is the plain budgeted selection. Later variants walk each
/// region's score-sorted list from `index` with a stride of two, skipping
/// scenes used by earlier variants, and fall back to the whole region list
/// (unused first) when striding leaves the quota short.
pub fn build_variant(ranked: &[RankedScene], used: UsedScenes, index: usize, target: f64) -> (Variant, UsedScenes) {
    let (name, description, weights) = VARIANT_PRESETS[index % VARIANT_PRESETS.len()];

    let selection = if index == 0 {
        select_scenes(ranked, weights, target)
    } else if let Some(selection) = exhausted_selection(ranked, target) {
        selection
    } else {
        let is_used = |scene: &RankedScene| used.contains(scene.scene_id());
        let mut picker = Picker::new(target);

        'regions: for region in Region::ALL {
            let quota = weights.quota(region, target);
            let candidates = region_candidates(ranked, region);
            let mut region_total = 0.0;

            for &scene in candidates.iter().skip(index).step_by(STRIDE) {
                if picker.is_full() {
                    break 'regions;
                }
                if is_used(scene) {
                    continue;
                }
                if let Some(d) = picker.offer_for_region(scene, region_total, quota) {
                    region_total += d;
                }
            }

            if region_total < quota {
                for scene in unused_first(&candidates, &is_used) {
                    if picker.is_full() {
                        break 'regions;
                    }
                    if let Some(d) = picker.offer_for_region(scene, region_total, quota) {
                        region_total += d;
                    }
                }
            }
        }

        let all: Vec<&RankedScene> = ranked.iter().collect();
        let preference = unused_first(&all, &is_used);
        finish(picker, &preference)
    };

    let mut used = used;
    used.extend(selection.scenes.iter().map(|s| s.scene_id().to_string()));
    (Variant::from_selection(name, description, weights, selection), used)
}

/// Keep the score order but move scenes `is_used` rejects to the back.
fn unused_first<'a>(scenes: &[&'a RankedScene], is_used: &impl Fn(&RankedScene) -> bool) -> Vec<&'a RankedScene> {
    let (fresh, reused): (Vec<&RankedScene>, Vec<&RankedScene>) = scenes.iter().partition(|s| !is_used(s));
    fresh.into_iter().chain(reused).collect()
}

/// Swap one scene so the cut differs from every id set in `taken`, keeping the
/// total inside the tolerance window. Best score gain wins.
fn diversify(ranked: &[RankedScene], variant: &Variant, target: f64, taken: &[Vec<&str>]) -> Option<Selection> {
    let selected = variant.scene_id_set();
    let low = target - DURATION_TOLERANCE;
    let high = target + DURATION_TOLERANCE;

    let mut best: Option<(f64, usize, &RankedScene)> = None;
    for (out_idx, out) in variant.selected_scenes.iter().enumerate() {
        for candidate in ranked.iter().filter(|c| !selected.contains(&c.scene_id())) {
            let total = variant.estimated_duration - out.duration() + candidate.duration();
            if total < low || total > high {
                continue;
            }
            let mut ids: Vec<&str> = selected.iter().copied().filter(|id| *id != out.scene_id()).collect();
            ids.push(candidate.scene_id());
            ids.sort_unstable();
            if taken.contains(&ids) {
                continue;
            }
            let gain = candidate.score - out.score;
            if best.map_or(true, |(g, _, _)| gain > g) {
                best = Some((gain, out_idx, candidate));
            }
        }
    }

    best.map(|(_, out_idx, candidate)| {
        let mut scenes = variant.selected_scenes.clone();
        scenes[out_idx] = candidate.clone();
        Selection::from_scenes(scenes, false)
    })
}

/// Any window-sized set not in `taken`, unused scenes first.
fn search_fresh(ranked: &[RankedScene], used: &UsedScenes, target: f64, taken: &[Vec<&str>]) -> Option<Selection> {
    let all: Vec<&RankedScene> = ranked.iter().collect();
    let preference = unused_first(&all, &|s: &RankedScene| used.contains(s.scene_id()));
    search_window(&preference, target, taken)
}

/// All four variants.
///
/// A variant that repeats an earlier scene set gets one diversifying swap,
/// then a window search over sets no earlier variant took. When both fail it
/// is dropped with a warning.
pub fn generate_variants(ranked: &[RankedScene], target: f64) -> (Vec<Variant>, Vec<String>) {
    let mut used = UsedScenes::new();
    let mut variants: Vec<Variant> = Vec::with_capacity(VARIANT_PRESETS.len());
    let mut warnings = Vec::new();

    for index in 0..VARIANT_PRESETS.len() {
        let earlier = used.clone();
        let (mut variant, next_used) = build_variant(ranked, used, index, target);
        used = next_used;

        if let Some(twin) = variants.iter().find(|v| v.scene_id_set() == variant.scene_id_set()) {
            let taken: Vec<Vec<&str>> = variants.iter().map(Variant::scene_id_set).collect();
            let repaired = if variant.underfilled {
                None
            } else {
                diversify(ranked, &variant, target, &taken)
                    .or_else(|| search_fresh(ranked, &earlier, target, &taken))
            };

            match repaired {
                Some(selection) => {
                    debug!(variant = %variant.name, twin = %twin.name, "Diversified duplicate variant");
                    used.extend(selection.scenes.iter().map(|s| s.scene_id().to_string()));
                    variant = Variant::from_selection(
                        variant.name.clone(),
                        variant.description.clone(),
                        variant.distribution,
                        selection,
                    );
                }
                None => {
                    warn!(variant = %variant.name, twin = %twin.name, "Dropping duplicate variant");
                    warnings.push(format!(
                        "variant '{}' duplicates '{}' and was dropped",
                        variant.name, twin.name
                    ));
                    continue;
                }
            }
        }
        variants.push(variant);
    }

    (variants, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use trailer_models::Scene;

    fn ranked(id: &str, start: f64, end: f64, score: f64) -> RankedScene {
        RankedScene {
            scene: Scene::new(id, start, end),
            score,
            normalized_start: start / 120.0,
            matched_emotions: vec![],
            matched_tags: vec![],
        }
    }

    /// Twelve 10s scenes over 120s with scores shuffled across regions.
    fn library() -> Vec<RankedScene> {
        let scores = [0.71, 0.93, 0.64, 0.88, 0.79, 0.97, 0.62, 0.84, 0.75, 0.91, 0.68, 0.81];
        let mut scenes: Vec<RankedScene> = scores
            .iter()
            .enumerate()
            .map(|(i, &score)| {
                let start = i as f64 * 10.0;
                ranked(&format!("scene_{:03}", i + 1), start, start + 10.0, score)
            })
            .collect();
        scenes.sort_by(|a, b| b.score.total_cmp(&a.score));
        scenes
    }

    #[test]
    fn test_four_distinct_variants_within_budget() {
        let (variants, warnings) = generate_variants(&library(), 60.0);
        assert_eq!(variants.len(), 4);
        assert!(warnings.is_empty());

        for v in &variants {
            assert!(v.estimated_duration > 0.0);
            assert!(v.estimated_duration <= 60.0 + DURATION_TOLERANCE);
            for pair in v.selected_scenes.windows(2) {
                assert!(pair[0].start() < pair[1].start());
            }
        }
        for (i, a) in variants.iter().enumerate() {
            for b in &variants[i + 1..] {
                assert!(a.jaccard(b) < 1.0, "{} vs {}", a.name, b.name);
            }
        }
    }

    #[test]
    fn test_used_set_threaded() {
        let ranked = library();
        let (first, used) = build_variant(&ranked, UsedScenes::new(), 0, 60.0);
        assert_eq!(used.len(), first.selected_scenes.len());

        let (second, used) = build_variant(&ranked, used, 1, 60.0);
        assert!(used.len() >= second.selected_scenes.len());
        assert_eq!(second.name, "Middle Climax");
        assert_eq!(second.distribution, RegionWeights::new(0.20, 0.60, 0.20));
    }

    #[test]
    fn test_short_source_collapses_to_one_variant() {
        let ranked: Vec<RankedScene> = library().into_iter().take(3).collect();
        let (variants, warnings) = generate_variants(&ranked, 60.0);
        assert_eq!(variants.len(), 1);
        assert!(variants[0].underfilled);
        assert_eq!(warnings.len(), 3);
        assert!(warnings[0].contains("Middle Climax"));
    }

    #[test]
    fn test_unused_first_keeps_score_order() {
        let scenes = library();
        let refs: Vec<&RankedScene> = scenes.iter().collect();
        let used: UsedScenes = [scenes[0].scene_id().to_string()].into_iter().collect();
        let order = unused_first(&refs, &|s: &RankedScene| used.contains(s.scene_id()));
        assert_eq!(order.last().map(|s| s.scene_id()), Some(scenes[0].scene_id()));
        assert_eq!(order[0].scene_id(), scenes[1].scene_id());
    }

    #[test]
    fn test_diversify_breaks_duplicate() {
        let ranked = library();
        let (first, _) = build_variant(&ranked, UsedScenes::new(), 0, 60.0);
        let taken = vec![first.scene_id_set()];
        let repaired = diversify(&ranked, &first, 60.0, &taken).unwrap();

        let mut ids = repaired.scene_ids();
        ids.sort_unstable();
        assert_ne!(ids, first.scene_id_set());
        assert!((repaired.estimated_duration - 60.0).abs() <= DURATION_TOLERANCE);
    }
}
