//! Scene analysis through the visual-analysis service.
//!
//! Frames are sampled evenly over the source, analyzed one by one, then
//! merged into equal time buckets. Any provider failure fails the analysis;
//! there is no synthetic fallback.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use tracing::{debug, info};
use trailer_media::MediaResult;
use trailer_models::{Character, Scene, SceneAnalysis};
use trailer_vision::{FrameAnalysis, VisualAnalysisProvider};

use super::{AnalysisRequest, SceneAnalyzer};
use crate::error::{WorkerError, WorkerResult};

const MAX_LABELS_PER_SCENE: usize = 5;
const MAX_PERSONS_PER_SCENE: usize = 3;
const DEFAULT_EMOTION: &str = "neutral";

/// Produces JPEG frames from the source asset.
#[async_trait]
pub trait FrameSampler: Send + Sync {
    /// Extract `count` frames at `duration / count` spacing into `dir`.
    async fn sample(&self, asset: &Path, dir: &Path, duration: f64, count: usize) -> MediaResult<Vec<(f64, PathBuf)>>;
}

/// Frame sampler backed by ffmpeg.
#[derive(Debug, Clone, Default)]
pub struct FfmpegFrameSampler;

#[async_trait]
impl FrameSampler for FfmpegFrameSampler {
    async fn sample(&self, asset: &Path, dir: &Path, duration: f64, count: usize) -> MediaResult<Vec<(f64, PathBuf)>> {
        trailer_media::extract_frames(asset, dir, duration, count).await
    }
}

/// Analyzer that labels sampled frames with the vision provider.
pub struct VisionAnalyzer {
    provider: Arc<dyn VisualAnalysisProvider>,
    sampler: Arc<dyn FrameSampler>,
    frame_count: usize,
    bucket_count: usize,
    request_timeout: Duration,
}

impl VisionAnalyzer {
    pub fn new(
        provider: Arc<dyn VisualAnalysisProvider>,
        sampler: Arc<dyn FrameSampler>,
        frame_count: usize,
        bucket_count: usize,
        request_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            sampler,
            frame_count,
            bucket_count,
            request_timeout,
        }
    }

    async fn analyze_frame(&self, path: &Path, timestamp: f64) -> WorkerResult<FrameAnalysis> {
        let jpeg = tokio::fs::read(path).await.map_err(|e| {
            WorkerError::analysis_failed(format!("frame at {:.2}s unreadable: {}", timestamp, e))
        })?;

        match tokio::time::timeout(self.request_timeout, self.provider.analyze_frame(&jpeg, timestamp)).await {
            Ok(Ok(analysis)) => Ok(analysis),
            Ok(Err(e)) => Err(WorkerError::analysis_failed(format!(
                "{} provider failed at {:.2}s: {}",
                self.provider.name(),
                timestamp,
                e
            ))),
            Err(_) => Err(WorkerError::analysis_failed(format!(
                "{} provider timed out after {}s at {:.2}s",
                self.provider.name(),
                self.request_timeout.as_secs_f64(),
                timestamp
            ))),
        }
    }
}

#[async_trait]
impl SceneAnalyzer for VisionAnalyzer {
    fn mode(&self) -> &'static str {
        "vision"
    }

    async fn analyze(&self, request: &AnalysisRequest<'_>, _rng: &mut StdRng) -> WorkerResult<SceneAnalysis> {
        let frames_dir = request.work_dir.join("frames");
        tokio::fs::create_dir_all(&frames_dir).await?;

        let frames = self
            .sampler
            .sample(request.asset_path, &frames_dir, request.duration, self.frame_count)
            .await
            .map_err(|e| WorkerError::analysis_failed(format!("frame sampling failed: {}", e)))?;

        let mut analyzed = Vec::with_capacity(frames.len());
        for (timestamp, path) in &frames {
            let analysis = self.analyze_frame(path, *timestamp).await?;
            debug!(
                timestamp = timestamp,
                labels = analysis.labels.len(),
                faces = analysis.faces.len(),
                "Frame analyzed"
            );
            if analysis.is_empty() {
                return Err(WorkerError::analysis_failed(format!(
                    "{} provider returned no labels or faces at {:.2}s",
                    self.provider.name(),
                    timestamp
                )));
            }
            analyzed.push((*timestamp, analysis));
        }

        let scenes = aggregate_frames(&analyzed, request.duration, self.bucket_count);
        info!(frames = analyzed.len(), scenes = scenes.len(), "Vision analysis complete");
        Ok(SceneAnalysis::from_scenes(scenes, request.duration))
    }
}

/// Items ordered by frequency, ties by first appearance.
fn by_frequency(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for item in items {
        match index.get(&item) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(item.clone(), counts.len());
                counts.push((item, 1));
            }
        }
    }
    // stable sort keeps first-appearance order for ties
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().map(|(item, _)| item).collect()
}

/// Merge analyzed frames into `bucket_count` equal windows over `[0, duration)`.
pub fn aggregate_frames(frames: &[(f64, FrameAnalysis)], duration: f64, bucket_count: usize) -> Vec<Scene> {
    if duration <= 0.0 || bucket_count == 0 {
        return Vec::new();
    }
    let width = duration / bucket_count as f64;

    let mut buckets: Vec<Vec<&FrameAnalysis>> = vec![Vec::new(); bucket_count];
    for (timestamp, analysis) in frames {
        let i = ((timestamp / width).floor().max(0.0) as usize).min(bucket_count - 1);
        buckets[i].push(analysis);
    }

    buckets
        .iter()
        .enumerate()
        .map(|(i, frames)| {
            let start = i as f64 * width;
            let end = if i + 1 == bucket_count { duration } else { (i + 1) as f64 * width };

            let labels: Vec<String> = by_frequency(
                frames
                    .iter()
                    .flat_map(|f| f.labels.iter().map(|l| l.name.to_lowercase())),
            )
            .into_iter()
            .take(MAX_LABELS_PER_SCENE)
            .collect();

            let mut emotions = by_frequency(
                frames
                    .iter()
                    .flat_map(|f| f.faces.iter().map(|face| face.emotion.to_lowercase())),
            );
            if emotions.is_empty() {
                emotions.push(DEFAULT_EMOTION.to_string());
            }

            let characters = bucket_characters(frames, &emotions[0]);

            Scene::new(Scene::id_for_index(i), start, end)
                .with_emotions(emotions)
                .with_labels(labels)
                .with_characters(characters)
        })
        .collect()
}

/// Celebrity matches (best confidence per name) plus unnamed faces as `Person N`.
fn bucket_characters(frames: &[&FrameAnalysis], dominant_emotion: &str) -> Vec<Character> {
    let mut celebrities: Vec<Character> = Vec::new();
    for celeb in frames.iter().flat_map(|f| f.celebrities.iter()) {
        match celebrities.iter_mut().find(|c| c.name == celeb.name) {
            Some(existing) if existing.confidence < celeb.confidence => existing.confidence = celeb.confidence,
            Some(_) => {}
            None => celebrities.push(Character {
                name: celeb.name.clone(),
                confidence: celeb.confidence,
                emotion: dominant_emotion.to_string(),
            }),
        }
    }
    celebrities.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    // Faces not explained by a celebrity match in the same frame
    let unnamed = frames
        .iter()
        .map(|f| f.faces.len().saturating_sub(f.celebrities.len()))
        .max()
        .unwrap_or(0)
        .min(MAX_PERSONS_PER_SCENE);

    let mut persons: Vec<Character> = (0..unnamed)
        .map(|n| {
            let faces: Vec<_> = frames
                .iter()
                .filter_map(|f| {
                    let unmatched = f.faces.len().saturating_sub(f.celebrities.len());
                    (n < unmatched).then(|| &f.faces[f.celebrities.len() + n])
                })
                .collect();
            let confidence = faces.iter().map(|f| f.confidence).fold(0.0, f64::max);
            let emotion = faces
                .first()
                .map(|f| f.emotion.to_lowercase())
                .unwrap_or_else(|| dominant_emotion.to_string());
            Character {
                name: format!("Person {}", n + 1),
                confidence,
                emotion,
            }
        })
        .collect();

    celebrities.append(&mut persons);
    celebrities
}
