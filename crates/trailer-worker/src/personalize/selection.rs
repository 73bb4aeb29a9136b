//! Region-budgeted scene selection.
//!
//! A selection runs in three passes over a preference order:
//! 1. region pass: each chronological third is filled up to its quota,
//! 2. fill pass: any scene that keeps the total under `target + tolerance`,
//! 3. swap pass: single swaps that pull a short total into the window.
//!
//! When the passes still leave the total short, a bounded subset search over
//! the same preference order looks for any set that lands in the window.

use std::collections::HashSet;

use tracing::debug;
use trailer_models::{RankedScene, Region, RegionWeights, Selection, DURATION_TOLERANCE};

/// Scenes of one region, best score first.
pub fn region_candidates<'a>(ranked: &'a [RankedScene], region: Region) -> Vec<&'a RankedScene> {
    ranked
        .iter()
        .filter(|r| Region::from_normalized_start(r.normalized_start) == region)
        .collect()
}

/// Running selection under a duration budget.
#[derive(Debug, Clone)]
pub struct Picker<'a> {
    target: f64,
    picked: Vec<&'a RankedScene>,
    ids: HashSet<&'a str>,
    total: f64,
}

impl<'a> Picker<'a> {
    pub fn new(target: f64) -> Self {
        Self {
            target,
            picked: Vec::new(),
            ids: HashSet::new(),
            total: 0.0,
        }
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn contains(&self, scene: &RankedScene) -> bool {
        self.ids.contains(scene.scene_id())
    }

    /// Global budget reached.
    pub fn is_full(&self) -> bool {
        self.total >= self.target
    }

    fn fits(&self, scene: &RankedScene, limit: f64) -> bool {
        !self.contains(scene) && self.total + scene.duration() <= limit
    }

    fn admit(&mut self, scene: &'a RankedScene) {
        self.ids.insert(scene.scene_id());
        self.total += scene.duration();
        self.picked.push(scene);
    }

    /// Admit `scene` into a region currently holding `region_total` seconds.
    ///
    /// Returns the scene duration when admitted.
    pub fn offer_for_region(&mut self, scene: &'a RankedScene, region_total: f64, quota: f64) -> Option<f64> {
        if region_total < quota && self.fits(scene, self.target) {
            self.admit(scene);
            Some(scene.duration())
        } else {
            None
        }
    }

    /// Admit any scene that keeps the total within `target + tolerance`,
    /// stopping once the total is within tolerance of the target.
    pub fn fill(&mut self, preference: &[&'a RankedScene]) {
        let limit = self.target + DURATION_TOLERANCE;
        for &scene in preference {
            if self.total >= self.target - DURATION_TOLERANCE {
                break;
            }
            if self.fits(scene, limit) {
                self.admit(scene);
            }
        }
    }

    /// Swap one selected scene for an unselected one until the total lands in
    /// `[target - tolerance, target + tolerance]` or no swap gets closer.
    ///
    /// Each swap is followed by a fill pass. Swaps landing in the window win
    /// by score gain; otherwise the swap that grows the total the most is
    /// taken and the search repeats.
    pub fn swap(&mut self, preference: &[&'a RankedScene]) {
        let low = self.target - DURATION_TOLERANCE;
        let high = self.target + DURATION_TOLERANCE;

        for _ in 0..preference.len() {
            if self.total >= low {
                return;
            }

            let mut in_window: Option<(f64, Picker<'a>)> = None;
            let mut growing: Option<(f64, Picker<'a>)> = None;

            for (out_idx, out) in self.picked.iter().enumerate() {
                for &candidate in preference {
                    if self.contains(candidate) || self.total - out.duration() + candidate.duration() > high {
                        continue;
                    }
                    let mut trial = self.clone();
                    trial.replace(out_idx, candidate);
                    trial.fill(preference);
                    if trial.total <= self.total {
                        continue;
                    }

                    let gain = candidate.score - out.score;
                    if trial.total >= low {
                        if in_window.as_ref().map_or(true, |(best, _)| gain > *best) {
                            in_window = Some((gain, trial));
                        }
                    } else if growing.as_ref().map_or(true, |(best, _)| trial.total > *best) {
                        growing = Some((trial.total, trial));
                    }
                }
            }

            match in_window.or(growing) {
                Some((_, best)) => {
                    *self = best;
                    debug!(total = self.total(), target = self.target, "Swap pass adjusted selection");
                }
                None => return,
            }
        }
    }

    fn replace(&mut self, index: usize, scene: &'a RankedScene) {
        let out = self.picked.swap_remove(index);
        self.ids.remove(out.scene_id());
        self.total -= out.duration();
        self.admit(scene);
    }

    pub fn into_selection(self, underfilled: bool) -> Selection {
        Selection::from_scenes(self.picked.into_iter().cloned().collect(), underfilled)
    }
}

/// Nodes [`search_window`] may visit before giving up.
const SEARCH_BUDGET: usize = 50_000;

/// Depth-first search for a scene set whose total lands in
/// `[target - tolerance, target + tolerance]`.
///
/// Scenes are tried in `preference` order, taking a scene before skipping
/// it, so the first hit leans towards preferred scenes. Sorted id sets listed
/// in `taken` are passed over.
pub fn search_window(preference: &[&RankedScene], target: f64, taken: &[Vec<&str>]) -> Option<Selection> {
    let mut remaining = vec![0.0; preference.len() + 1];
    for i in (0..preference.len()).rev() {
        remaining[i] = remaining[i + 1] + preference[i].duration();
    }

    let mut search = WindowSearch {
        preference,
        taken,
        low: target - DURATION_TOLERANCE,
        high: target + DURATION_TOLERANCE,
        remaining,
        chosen: Vec::new(),
        visited: 0,
    };
    if !search.visit(0, 0.0) {
        return None;
    }
    debug!(visited = search.visited, scenes = search.chosen.len(), "Window search hit");
    Some(Selection::from_scenes(
        search.chosen.into_iter().cloned().collect(),
        false,
    ))
}

struct WindowSearch<'p, 'a, 't> {
    preference: &'p [&'a RankedScene],
    taken: &'t [Vec<&'t str>],
    low: f64,
    high: f64,
    /// Duration of `preference[i..]`
    remaining: Vec<f64>,
    chosen: Vec<&'a RankedScene>,
    visited: usize,
}

impl WindowSearch<'_, '_, '_> {
    fn visit(&mut self, index: usize, total: f64) -> bool {
        self.visited += 1;
        if self.visited > SEARCH_BUDGET {
            return false;
        }
        if total >= self.low && !self.chosen.is_empty() && !self.is_taken() {
            return true;
        }
        if index == self.preference.len() || total + self.remaining[index] < self.low {
            return false;
        }

        let scene = self.preference[index];
        if total + scene.duration() <= self.high {
            self.chosen.push(scene);
            if self.visit(index + 1, total + scene.duration()) {
                return true;
            }
            self.chosen.pop();
        }
        self.visit(index + 1, total)
    }

    fn is_taken(&self) -> bool {
        let mut ids: Vec<&str> = self.chosen.iter().map(|s| s.scene_id()).collect();
        ids.sort_unstable();
        self.taken.iter().any(|t| *t == ids)
    }
}

/// Every scene, flagged underfilled, when the footage cannot reach `target`.
pub fn exhausted_selection(ranked: &[RankedScene], target: f64) -> Option<Selection> {
    let available: f64 = ranked.iter().map(RankedScene::duration).sum();
    (available < target).then(|| Selection::from_scenes(ranked.to_vec(), true))
}

/// Budgeted selection honoring region `weights`.
pub fn select_scenes(ranked: &[RankedScene], weights: RegionWeights, target: f64) -> Selection {
    if let Some(selection) = exhausted_selection(ranked, target) {
        return selection;
    }

    let mut picker = Picker::new(target);
    'regions: for region in Region::ALL {
        let quota = weights.quota(region, target);
        let mut region_total = 0.0;
        for scene in region_candidates(ranked, region) {
            if picker.is_full() {
                break 'regions;
            }
            if let Some(d) = picker.offer_for_region(scene, region_total, quota) {
                region_total += d;
            }
        }
    }

    let preference: Vec<&RankedScene> = ranked.iter().collect();
    finish(picker, &preference)
}

/// Fill and swap passes, then the window search if the total is still short.
pub fn finish<'a>(mut picker: Picker<'a>, preference: &[&'a RankedScene]) -> Selection {
    picker.fill(preference);
    picker.swap(preference);
    if picker.total() < picker.target - DURATION_TOLERANCE {
        if let Some(selection) = search_window(preference, picker.target, &[]) {
            return selection;
        }
    }
    picker.into_selection(false)
}
