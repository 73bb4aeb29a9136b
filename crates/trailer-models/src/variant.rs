//! Region weighting, selections and trailer variants.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::scene::RankedScene;

/// Slack allowed around the target duration, in seconds.
pub const DURATION_TOLERANCE: f64 = 2.0;

/// One chronological third of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Early,
    Middle,
    Late,
}

impl Region {
    /// All regions in chronological order.
    pub const ALL: [Region; 3] = [Region::Early, Region::Middle, Region::Late];

    /// Region for a normalized start position.
    pub fn from_normalized_start(normalized_start: f64) -> Self {
        if normalized_start < 1.0 / 3.0 {
            Region::Early
        } else if normalized_start < 2.0 / 3.0 {
            Region::Middle
        } else {
            Region::Late
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Early => "early",
            Region::Middle => "middle",
            Region::Late => "late",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Share of the duration budget given to each region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RegionWeights {
    pub early: f64,
    pub middle: f64,
    pub late: f64,
}

impl RegionWeights {
    /// Canonical 0.3/0.4/0.3 split.
    pub const CANONICAL: RegionWeights = RegionWeights::new(0.3, 0.4, 0.3);

    pub const fn new(early: f64, middle: f64, late: f64) -> Self {
        Self { early, middle, late }
    }

    pub fn weight(&self, region: Region) -> f64 {
        match region {
            Region::Early => self.early,
            Region::Middle => self.middle,
            Region::Late => self.late,
        }
    }

    /// Duration quota for `region` under a `target` budget.
    pub fn quota(&self, region: Region, target: f64) -> f64 {
        target * self.weight(region)
    }

    pub fn sum(&self) -> f64 {
        self.early + self.middle + self.late
    }
}

impl Default for RegionWeights {
    fn default() -> Self {
        Self::CANONICAL
    }
}

/// Output of one budgeted selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Selection {
    /// Selected scenes, chronological
    pub scenes: Vec<RankedScene>,

    /// Sum of selected scene durations
    pub estimated_duration: f64,

    /// True when the source did not hold enough footage to reach the target
    #[serde(default)]
    pub underfilled: bool,
}

impl Selection {
    /// Build a selection from scenes in any order.
    pub fn from_scenes(mut scenes: Vec<RankedScene>, underfilled: bool) -> Self {
        scenes.sort_by(|a, b| a.start().total_cmp(&b.start()));
        let estimated_duration = scenes.iter().map(RankedScene::duration).sum();
        Self {
            scenes,
            estimated_duration,
            underfilled,
        }
    }

    pub fn scene_ids(&self) -> Vec<&str> {
        self.scenes.iter().map(RankedScene::scene_id).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

/// One candidate trailer cut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Variant {
    /// Display name ("Opening Act", ...)
    pub name: String,

    /// Human-readable description of the weighting
    pub description: String,

    /// Region weights used for this cut (sum to 1.0)
    pub distribution: RegionWeights,

    /// Selected scenes, chronological
    pub selected_scenes: Vec<RankedScene>,

    /// Sum of selected scene durations
    pub estimated_duration: f64,

    /// True when the target could not be reached
    #[serde(default)]
    pub underfilled: bool,
}

impl Variant {
    pub fn from_selection(
        name: impl Into<String>,
        description: impl Into<String>,
        distribution: RegionWeights,
        selection: Selection,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            distribution,
            selected_scenes: selection.scenes,
            estimated_duration: selection.estimated_duration,
            underfilled: selection.underfilled,
        }
    }

    /// Selected scene ids, sorted, for set comparisons.
    pub fn scene_id_set(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.selected_scenes.iter().map(RankedScene::scene_id).collect();
        ids.sort_unstable();
        ids
    }

    /// Jaccard similarity of the two scene-id sets.
    pub fn jaccard(&self, other: &Variant) -> f64 {
        let a = self.scene_id_set();
        let b = other.scene_id_set();
        if a.is_empty() && b.is_empty() {
            return 1.0;
        }
        let intersection = a.iter().filter(|id| b.contains(id)).count();
        let union = a.len() + b.len() - intersection;
        intersection as f64 / union as f64
    }
}
