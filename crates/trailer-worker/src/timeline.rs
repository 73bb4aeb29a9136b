//! Edit timeline construction.

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use tracing::debug;
use trailer_models::{AudioCue, RankedScene, Timeline, TimelineEntry, Transition, Variant, MIN_CLIP_DURATION};

const MAX_PAD_BEFORE: f64 = 0.75;
const MAX_PAD_AFTER: f64 = 0.9;
const GAP_SHARE_AFTER: f64 = 0.45;

const TRANSITION_WEIGHTS: [(Transition, f64); 3] = [
    (Transition::Cut, 0.5),
    (Transition::Fade, 0.3),
    (Transition::Dip, 0.2),
];

const TRIM_STEPS: usize = 30;

/// Turn a variant's chronological scenes into a padded clip list.
///
/// Handles never reach into the previous clip's source window, every clip
/// is at least [`MIN_CLIP_DURATION`] long when the source allows it, and all
/// source windows stay inside `[0, source_duration]`. When full handles would
/// push the timeline past `max_duration`, every handle is shortened by the
/// same factor until it fits.
pub fn build_timeline(
    variant: &Variant,
    source_duration: f64,
    max_duration: f64,
    audio_style: &str,
    rng: &mut StdRng,
) -> Timeline {
    let cue_weights = cue_weights(audio_style);
    let scenes = &variant.selected_scenes;

    let mut windows = clip_windows(scenes, source_duration, 1.0);
    if padded_length(&windows) > max_duration {
        windows = clip_windows(scenes, source_duration, 0.0);
        let (mut low, mut high) = (0.0, 1.0);
        for _ in 0..TRIM_STEPS {
            let scale = (low + high) / 2.0;
            let candidate = clip_windows(scenes, source_duration, scale);
            if padded_length(&candidate) <= max_duration {
                windows = candidate;
                low = scale;
            } else {
                high = scale;
            }
        }
        debug!(
            variant = %variant.name,
            handle_scale = low,
            duration = padded_length(&windows),
            "Trimmed clip handles to fit the budget"
        );
    }

    let mut entries = Vec::with_capacity(scenes.len());
    let mut cursor = 0.0;
    for (i, (scene, (source_start, source_end))) in scenes.iter().zip(windows).enumerate() {
        let transition = if i == 0 {
            Transition::Cut
        } else {
            TRANSITION_WEIGHTS
                .choose_weighted(rng, |(_, w)| *w)
                .map(|(t, _)| *t)
                .unwrap_or(Transition::Cut)
        };
        let audio_cue = cue_weights
            .choose_weighted(rng, |(_, w)| *w)
            .map(|(c, _)| *c)
            .unwrap_or(AudioCue::Rise);

        let duration = source_end - source_start;
        entries.push(TimelineEntry {
            scene_id: scene.scene_id().to_string(),
            in_point: cursor,
            out_point: cursor + duration,
            source_start,
            source_end,
            transition,
            audio_cue,
        });
        cursor += duration;
    }

    Timeline::new(variant.name.clone(), entries, audio_style)
}

/// Source window per scene with handles multiplied by `scale`.
fn clip_windows(scenes: &[RankedScene], source_duration: f64, scale: f64) -> Vec<(f64, f64)> {
    let mut windows = Vec::with_capacity(scenes.len());
    let mut previous_source_end = 0.0;

    for (i, scene) in scenes.iter().enumerate() {
        let pad_before = (scene.start() - previous_source_end).max(0.0).min(MAX_PAD_BEFORE) * scale;
        let pad_after = match scenes.get(i + 1) {
            Some(next) => ((next.start() - scene.end()).max(0.0) * GAP_SHARE_AFTER).min(MAX_PAD_AFTER),
            None => MAX_PAD_AFTER,
        } * scale;

        let source_start = (scene.start() - pad_before)
            .max(0.0)
            .min(source_duration - MIN_CLIP_DURATION)
            .max(0.0);
        let mut source_end = (scene.end() + pad_after).min(source_duration);
        if source_end - source_start < MIN_CLIP_DURATION {
            source_end = (source_start + MIN_CLIP_DURATION).min(source_duration);
        }

        windows.push((source_start, source_end));
        previous_source_end = source_end;
    }
    windows
}

fn padded_length(windows: &[(f64, f64)]) -> f64 {
    windows.iter().map(|(start, end)| end - start).sum()
}

/// Equal cue weights, doubled for the family matching `audio_style`.
fn cue_weights(audio_style: &str) -> [(AudioCue, f64); 4] {
    let favored = AudioCue::for_audio_style(audio_style);
    AudioCue::ALL.map(|cue| (cue, if Some(cue) == favored { 2.0 } else { 1.0 }))
}
