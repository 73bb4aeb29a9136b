//! Deliverable packaging: rendered trailers, caption tracks and storyboard.

pub mod captions;
pub mod storyboard;

use std::path::Path;

use tracing::info;
use trailer_models::{Deliverable, JobId, OutputFormat, RankedScene, Timeline};
use trailer_storage::ArtifactStore;

use crate::error::WorkerResult;
use crate::render::trailer_file_name;

pub use captions::{build_srt, caption_key, phrases_for};
pub use storyboard::{build_storyboard, storyboard_bytes, StoryboardInput, STORYBOARD_KEY};

const SRT_CONTENT_TYPE: &str = "application/x-subrip";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Upload a rendered trailer file.
pub async fn store_trailer(
    store: &dyn ArtifactStore,
    job_id: &JobId,
    variant: usize,
    path: &Path,
    format: OutputFormat,
) -> WorkerResult<Deliverable> {
    let key = trailer_file_name(variant, format);
    let stored = store.put_file(job_id, &key, path, format.content_type()).await?;
    info!(job_id = %job_id, variant = variant, key = %key, size = stored.size_bytes, "Trailer stored");
    Ok(Deliverable {
        key,
        content_type: format.content_type().to_string(),
        size_bytes: stored.size_bytes,
        variant: Some(variant),
    })
}

/// Write one SRT track per language for a variant.
pub async fn store_captions(
    store: &dyn ArtifactStore,
    job_id: &JobId,
    variant: usize,
    timeline: &Timeline,
    scenes: &[RankedScene],
    languages: &[String],
) -> WorkerResult<Vec<Deliverable>> {
    let mut deliverables = Vec::with_capacity(languages.len());
    for language in languages {
        let key = caption_key(variant, language);
        let srt = build_srt(timeline, scenes, language);
        let stored = store
            .put_bytes(job_id, &key, srt.into_bytes(), SRT_CONTENT_TYPE)
            .await?;
        deliverables.push(Deliverable {
            key,
            content_type: SRT_CONTENT_TYPE.to_string(),
            size_bytes: stored.size_bytes,
            variant: Some(variant),
        });
    }
    info!(job_id = %job_id, variant = variant, tracks = deliverables.len(), "Captions stored");
    Ok(deliverables)
}

/// Write the storyboard document.
pub async fn store_storyboard(
    store: &dyn ArtifactStore,
    job_id: &JobId,
    input: &StoryboardInput<'_>,
) -> WorkerResult<Deliverable> {
    let bytes = storyboard_bytes(input)?;
    let stored = store
        .put_bytes(job_id, STORYBOARD_KEY, bytes, JSON_CONTENT_TYPE)
        .await?;
    info!(job_id = %job_id, size = stored.size_bytes, "Storyboard stored");
    Ok(Deliverable {
        key: STORYBOARD_KEY.to_string(),
        content_type: JSON_CONTENT_TYPE.to_string(),
        size_bytes: stored.size_bytes,
        variant: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use trailer_models::{AudioCue, TimelineEntry, Transition};
    use trailer_storage::{LocalArtifactStore, StorageError};

    fn timeline() -> Timeline {
        Timeline::new(
            "Grand Finale",
            vec![TimelineEntry {
                scene_id: "scene_004".into(),
                in_point: 0.0,
                out_point: 6.0,
                source_start: 40.0,
                source_end: 46.0,
                transition: Transition::Cut,
                audio_cue: AudioCue::Drop,
            }],
            "ambient",
        )
    }

    #[tokio::test]
    async fn test_captions_per_language() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path());
        let job_id = JobId::from_string("job-1");
        let languages = vec!["en".to_string(), "fr".to_string()];

        let deliverables = store_captions(&store, &job_id, 3, &timeline(), &[], &languages)
            .await
            .unwrap();

        let keys: Vec<&str> = deliverables.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, vec!["captions_variant_3_en.srt", "captions_variant_3_fr.srt"]);
        let fr = store.get(&job_id, "captions_variant_3_fr.srt").await.unwrap();
        assert!(String::from_utf8(fr).unwrap().contains("00:00:06,000"));
    }

    #[tokio::test]
    async fn test_trailer_is_write_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalArtifactStore::new(dir.path().join("store"));
        let job_id = JobId::from_string("job-2");
        let file = dir.path().join("render.mp4");
        tokio::fs::write(&file, b"0123456789").await.unwrap();

        let d = store_trailer(&store, &job_id, 1, &file, OutputFormat::Mp4).await.unwrap();
        assert_eq!(d.key, "trailer_variant_1.mp4");
        assert_eq!(d.size_bytes, 10);
        assert_eq!(d.content_type, "video/mp4");

        let again = store_trailer(&store, &job_id, 1, &file, OutputFormat::Mp4).await;
        assert!(matches!(
            again,
            Err(crate::error::WorkerError::Storage(StorageError::AlreadyExists(_)))
        ));
    }
}
