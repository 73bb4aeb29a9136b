//! Viewer profile catalogue.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::info;
use trailer_models::{Preferences, Profile};

use crate::error::{WorkerError, WorkerResult};

/// Profiles file layout: a bare array or `{ "profiles": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ProfilesFile {
    List(Vec<Profile>),
    Wrapped { profiles: Vec<Profile> },
}

/// Read-only set of profiles keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ProfileCatalog {
    profiles: BTreeMap<String, Profile>,
}

impl ProfileCatalog {
    pub fn new(profiles: impl IntoIterator<Item = Profile>) -> Self {
        Self {
            profiles: profiles.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }

    /// The four shipped profiles.
    pub fn builtin() -> Self {
        Self::new([
            profile(
                "action_enthusiast",
                "Action Enthusiast",
                "High-octane set pieces, chases and impact.",
                &["excitement", "tension", "triumph"],
                &["explosion", "car chase", "fight", "stunt"],
                "percussive",
            ),
            profile(
                "romance_devotee",
                "Romance Devotee",
                "Intimate moments, longing glances and grand gestures.",
                &["love", "joy", "longing"],
                &["couple", "sunset", "dance", "wedding"],
                "orchestral",
            ),
            profile(
                "thriller_seeker",
                "Thriller Seeker",
                "Slow-burn dread, secrets and pursuit.",
                &["suspense", "fear", "tension"],
                &["shadow", "chase", "night", "weapon"],
                "ambient",
            ),
            profile(
                "family_viewer",
                "Family Viewer",
                "Warm humor, wonder and adventures for all ages.",
                &["joy", "wonder", "humor"],
                &["family", "animal", "adventure", "friendship"],
                "pulse",
            ),
        ])
    }

    /// Load profiles from a JSON file.
    pub async fn load(path: &Path) -> WorkerResult<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            WorkerError::config_error(format!("cannot read profiles {}: {}", path.display(), e))
        })?;
        let catalog = Self::from_json(&bytes)?;
        info!(path = %path.display(), profiles = catalog.len(), "Loaded profiles");
        Ok(catalog)
    }

    pub fn from_json(bytes: &[u8]) -> WorkerResult<Self> {
        let profiles = match serde_json::from_slice::<ProfilesFile>(bytes)? {
            ProfilesFile::List(list) => list,
            ProfilesFile::Wrapped { profiles } => profiles,
        };
        if profiles.is_empty() {
            return Err(WorkerError::config_error("profiles file holds no profiles"));
        }
        Ok(Self::new(profiles))
    }

    /// Profiles file when configured, built-in catalogue otherwise.
    pub async fn load_or_builtin(path: Option<&Path>) -> WorkerResult<Self> {
        match path {
            Some(path) => Self::load(path).await,
            None => Ok(Self::builtin()),
        }
    }

    pub fn get(&self, id: &str) -> WorkerResult<&Profile> {
        self.profiles
            .get(id)
            .ok_or_else(|| WorkerError::UnknownProfile(id.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

fn profile(
    id: &str,
    label: &str,
    summary: &str,
    emotions: &[&str],
    tags: &[&str],
    audio_style: &str,
) -> Profile {
    Profile {
        id: id.to_string(),
        label: label.to_string(),
        summary: summary.to_string(),
        preferences: Preferences {
            dominant_emotions: emotions.iter().map(|s| s.to_string()).collect(),
            foreground_tags: tags.iter().map(|s| s.to_string()).collect(),
            audio_style: audio_style.to_string(),
        },
    }
}
