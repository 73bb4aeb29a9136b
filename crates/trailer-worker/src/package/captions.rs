//! SRT caption tracks.

use std::fmt::Write as _;

use trailer_models::timestamp::format_srt_timestamp;
use trailer_models::{RankedScene, Timeline};

/// Caption wording for one language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phrases {
    pub code: &'static str,
    pub and: &'static str,
    pub mood: &'static str,
    pub setting: &'static str,
    pub nobody: &'static str,
}

const PHRASES: [Phrases; 4] = [
    Phrases {
        code: "en",
        and: "and",
        mood: "Mood",
        setting: "Setting",
        nobody: "No one on screen",
    },
    Phrases {
        code: "es",
        and: "y",
        mood: "Emoción",
        setting: "Escena",
        nobody: "Nadie en pantalla",
    },
    Phrases {
        code: "fr",
        and: "et",
        mood: "Émotion",
        setting: "Décor",
        nobody: "Personne à l'écran",
    },
    Phrases {
        code: "de",
        and: "und",
        mood: "Stimmung",
        setting: "Szene",
        nobody: "Niemand im Bild",
    },
];

/// Phrase table for `language`; unknown languages use English wording.
///
/// Matches on the primary subtag, so `fr-CA` uses French.
pub fn phrases_for(language: &str) -> &'static Phrases {
    let primary = language.split('-').next().unwrap_or(language);
    PHRASES
        .iter()
        .find(|p| p.code.eq_ignore_ascii_case(primary))
        .unwrap_or(&PHRASES[0])
}

/// Storage key of a caption track.
pub fn caption_key(variant: usize, language: &str) -> String {
    format!("captions_variant_{}_{}.srt", variant, language)
}

fn join_names(names: &[&str], and: &str) -> String {
    match names {
        [] => String::new(),
        [one] => one.to_string(),
        [init @ .., last] => format!("{} {} {}", init.join(", "), and, last),
    }
}

/// Text of the cue for one scene.
pub fn cue_text(scene: Option<&RankedScene>, phrases: &Phrases) -> String {
    let Some(scene) = scene else {
        return phrases.nobody.to_string();
    };

    let names: Vec<&str> = scene.scene.characters.iter().map(|c| c.name.as_str()).collect();
    let who = if names.is_empty() {
        phrases.nobody.to_string()
    } else {
        join_names(&names, phrases.and)
    };

    let mut details = Vec::new();
    if let Some(emotion) = scene.scene.dominant_emotion() {
        details.push(format!("{}: {}", phrases.mood, emotion));
    }
    if let Some(label) = scene.scene.labels.first() {
        details.push(format!("{}: {}", phrases.setting, label));
    }

    if details.is_empty() {
        who
    } else {
        format!("{}\n{}", who, details.join(" | "))
    }
}

/// SRT document whose cue boundaries are the timeline's in/out points.
pub fn build_srt(timeline: &Timeline, scenes: &[RankedScene], language: &str) -> String {
    let phrases = phrases_for(language);
    let mut srt = String::new();

    for (i, entry) in timeline.entries.iter().enumerate() {
        let scene = scenes.iter().find(|s| s.scene_id() == entry.scene_id);
        let _ = write!(
            srt,
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_srt_timestamp(entry.in_point),
            format_srt_timestamp(entry.out_point),
            cue_text(scene, phrases)
        );
    }

    srt
}
