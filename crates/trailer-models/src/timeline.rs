//! Edit timeline models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum length of a rendered clip in seconds.
pub const MIN_CLIP_DURATION: f64 = 1.5;

/// Transition into a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// Hard cut
    Cut,
    /// Fade in from black
    Fade,
    /// Dip to black on both ends
    Dip,
}

impl Transition {
    pub const ALL: [Transition; 3] = [Transition::Cut, Transition::Fade, Transition::Dip];

    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Cut => "cut",
            Transition::Fade => "fade",
            Transition::Dip => "dip",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Audio treatment for a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AudioCue {
    Rise,
    Drop,
    Sting,
    Motif,
}

impl AudioCue {
    pub const ALL: [AudioCue; 4] = [AudioCue::Rise, AudioCue::Drop, AudioCue::Sting, AudioCue::Motif];

    pub fn as_str(&self) -> &'static str {
        match self {
            AudioCue::Rise => "rise",
            AudioCue::Drop => "drop",
            AudioCue::Sting => "sting",
            AudioCue::Motif => "motif",
        }
    }

    /// Cue family favored by a profile audio style, if the style is recognized.
    pub fn for_audio_style(style: &str) -> Option<AudioCue> {
        let style = style.to_ascii_lowercase();
        if style.contains("orchestral") {
            Some(AudioCue::Motif)
        } else if style.contains("percussive") {
            Some(AudioCue::Sting)
        } else if style.contains("ambient") {
            Some(AudioCue::Drop)
        } else if ["pulse", "driving", "electronic"].iter().any(|k| style.contains(k)) {
            Some(AudioCue::Rise)
        } else {
            None
        }
    }
}

impl fmt::Display for AudioCue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One clip on the output timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TimelineEntry {
    pub scene_id: String,

    /// Output timeline in point (seconds)
    #[serde(rename = "in")]
    pub in_point: f64,

    /// Output timeline out point (seconds)
    #[serde(rename = "out")]
    pub out_point: f64,

    /// Source window start, including handles
    pub source_start: f64,

    /// Source window end, including handles
    pub source_end: f64,

    pub transition: Transition,

    pub audio_cue: AudioCue,
}

impl TimelineEntry {
    /// Length of the clip on the output timeline.
    pub fn duration(&self) -> f64 {
        self.out_point - self.in_point
    }

    pub fn source_duration(&self) -> f64 {
        self.source_end - self.source_start
    }
}

/// Ordered clip list for one variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Timeline {
    pub variant_name: String,

    pub entries: Vec<TimelineEntry>,

    /// `sum(out - in)` over entries
    pub estimated_duration: f64,

    #[serde(default)]
    pub audio_style: String,
}

impl Timeline {
    pub fn new(variant_name: impl Into<String>, entries: Vec<TimelineEntry>, audio_style: impl Into<String>) -> Self {
        let estimated_duration = entries.iter().map(TimelineEntry::duration).sum();
        Self {
            variant_name: variant_name.into(),
            entries,
            estimated_duration,
            audio_style: audio_style.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_style_families() {
        assert_eq!(AudioCue::for_audio_style("Orchestral swell"), Some(AudioCue::Motif));
        assert_eq!(AudioCue::for_audio_style("percussive"), Some(AudioCue::Sting));
        assert_eq!(AudioCue::for_audio_style("ambient"), Some(AudioCue::Drop));
        assert_eq!(AudioCue::for_audio_style("driving synth"), Some(AudioCue::Rise));
        assert_eq!(AudioCue::for_audio_style("jazz"), None);
    }

    #[test]
    fn test_entry_serializes_in_out() {
        let entry = TimelineEntry {
            scene_id: "scene_001".into(),
            in_point: 0.0,
            out_point: 7.5,
            source_start: 1.0,
            source_end: 8.5,
            transition: Transition::Cut,
            audio_cue: AudioCue::Sting,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["in"], 0.0);
        assert_eq!(json["out"], 7.5);
        assert_eq!(json["transition"], "cut");
        assert_eq!(json["audio_cue"], "sting");
    }

    #[test]
    fn test_timeline_duration_is_sum_of_entries() {
        let entries = vec![
            TimelineEntry {
                scene_id: "a".into(),
                in_point: 0.0,
                out_point: 5.0,
                source_start: 0.0,
                source_end: 5.0,
                transition: Transition::Cut,
                audio_cue: AudioCue::Rise,
            },
            TimelineEntry {
                scene_id: "b".into(),
                in_point: 5.0,
                out_point: 12.0,
                source_start: 20.0,
                source_end: 27.0,
                transition: Transition::Fade,
                audio_cue: AudioCue::Drop,
            },
        ];
        let timeline = Timeline::new("Opening Act", entries, "ambient");
        assert!((timeline.estimated_duration - 12.0).abs() < 1e-9);
    }
}
