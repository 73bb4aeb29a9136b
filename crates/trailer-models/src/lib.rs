//! Shared data models for the trailer pipeline.
//!
//! Scenes, profiles, variants, timelines and jobs exchanged between the
//! media, vision, storage and worker crates.

pub mod encoding;
pub mod error;
pub mod job;
pub mod profile;
pub mod scene;
pub mod timeline;
pub mod timestamp;
pub mod variant;

pub use encoding::{EncodingConfig, OutputFormat};
pub use error::ModelError;
pub use job::{
    Assembly, AssemblyStatus, Deliverable, FailureKind, Job, JobConfig, JobFailure, JobId,
    JobRequest, JobState, Personalization, ProviderStatus, ProviderStatusKind, StageTiming,
};
pub use profile::{Preferences, Profile};
pub use scene::{Character, RankedScene, Scene, SceneAnalysis};
pub use timeline::{AudioCue, Timeline, TimelineEntry, Transition, MIN_CLIP_DURATION};
pub use variant::{Region, RegionWeights, Selection, Variant, DURATION_TOLERANCE};
