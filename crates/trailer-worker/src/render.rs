//! Variant rendering.
//!
//! Each timeline entry becomes its own re-encoded segment, then the segments
//! are concatenated and encoded for the requested container. Variants render
//! concurrently on a bounded pool, each in a scratch directory of its own.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{info, warn};
use trailer_media::{concat_segments, extract_segment, FfmpegRunner, SegmentEffects};
use trailer_models::{EncodingConfig, OutputFormat, Timeline};

use crate::error::{WorkerError, WorkerResult};
use crate::metrics;

/// One variant to render.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub asset_path: &'a Path,
    /// 1-based variant number
    pub variant: usize,
    pub timeline: &'a Timeline,
    pub format: OutputFormat,
    /// Scratch directory for segments, removed by the caller
    pub scratch_dir: &'a Path,
    /// Final file location
    pub output_path: &'a Path,
}

#[async_trait]
pub trait TrailerRenderer: Send + Sync {
    /// Mode reported in provider status.
    fn mode(&self) -> &'static str;

    /// Render `request.timeline` to `request.output_path`.
    async fn render(&self, request: &RenderRequest<'_>) -> WorkerResult<()>;
}

/// Renderer backed by ffmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegRenderer {
    runner: FfmpegRunner,
}

impl FfmpegRenderer {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            runner: FfmpegRunner::new().with_timeout(timeout_secs),
        }
    }
}

#[async_trait]
impl TrailerRenderer for FfmpegRenderer {
    fn mode(&self) -> &'static str {
        "ffmpeg"
    }

    async fn render(&self, request: &RenderRequest<'_>) -> WorkerResult<()> {
        if request.timeline.is_empty() {
            return Err(WorkerError::render_failed(format!(
                "variant {} has no clips",
                request.variant
            )));
        }

        // Segments always use the default H.264/AAC intermediate
        let encoding = EncodingConfig::default();
        let mut segments = Vec::with_capacity(request.timeline.entries.len());

        for (i, entry) in request.timeline.entries.iter().enumerate() {
            let segment = request.scratch_dir.join(format!("seg_{:04}.mp4", i));
            extract_segment(
                &self.runner,
                request.asset_path,
                &segment,
                entry.source_start,
                entry.source_end,
                SegmentEffects::new(entry.transition, entry.audio_cue),
                &encoding,
            )
            .await
            .map_err(|e| {
                let message = match e.stderr_tail() {
                    Some(tail) => format!("{}: {}", e, tail),
                    None => e.to_string(),
                };
                WorkerError::segment_failed(&entry.scene_id, message)
            })?;
            segments.push(segment);
        }

        concat_segments(&self.runner, &segments, request.output_path, request.format).await?;
        Ok(())
    }
}

/// Result of one variant render.
#[derive(Debug)]
pub struct RenderOutcome {
    /// 1-based variant number
    pub variant: usize,
    pub result: WorkerResult<PathBuf>,
}

/// Output file name for a rendered variant.
pub fn trailer_file_name(variant: usize, format: OutputFormat) -> String {
    format!("trailer_variant_{}.{}", variant, format.extension())
}

/// Render every timeline with at most `pool_size` renders in flight.
///
/// Failures are isolated per variant; outcomes come back in variant order.
pub async fn render_all(
    renderer: Arc<dyn TrailerRenderer>,
    asset_path: &Path,
    timelines: &[Timeline],
    format: OutputFormat,
    output_dir: &Path,
    pool_size: usize,
) -> Vec<RenderOutcome> {
    let semaphore = Arc::new(Semaphore::new(pool_size.max(1)));

    let futures = timelines.iter().enumerate().map(|(i, timeline)| {
        let renderer = Arc::clone(&renderer);
        let semaphore = Arc::clone(&semaphore);
        let variant = i + 1;

        async move {
            let result = render_one(renderer.as_ref(), &semaphore, asset_path, variant, timeline, format, output_dir).await;
            match &result {
                Ok(path) => {
                    metrics::record_render("ok");
                    info!(variant = variant, output = %path.display(), "Variant rendered");
                }
                Err(e) => {
                    metrics::record_render("failed");
                    warn!(variant = variant, "Variant render failed: {}", e);
                }
            }
            RenderOutcome { variant, result }
        }
    });

    join_all(futures).await
}

async fn render_one(
    renderer: &dyn TrailerRenderer,
    semaphore: &Semaphore,
    asset_path: &Path,
    variant: usize,
    timeline: &Timeline,
    format: OutputFormat,
    output_dir: &Path,
) -> WorkerResult<PathBuf> {
    let _permit = semaphore
        .acquire()
        .await
        .map_err(|e| WorkerError::render_failed(format!("render pool closed: {}", e)))?;

    let started = Instant::now();
    let scratch = tempfile::Builder::new()
        .prefix(&format!("variant_{}_", variant))
        .tempdir_in(output_dir)?;
    let output_path = output_dir.join(trailer_file_name(variant, format));

    let request = RenderRequest {
        asset_path,
        variant,
        timeline,
        format,
        scratch_dir: scratch.path(),
        output_path: &output_path,
    };
    renderer.render(&request).await?;

    let size = tokio::fs::metadata(&output_path).await.map(|m| m.len()).unwrap_or(0);
    if size == 0 {
        return Err(WorkerError::render_failed(format!(
            "variant {} produced no output at {}",
            variant,
            output_path.display()
        )));
    }

    metrics::record_stage("render_variant", started.elapsed().as_secs_f64());
    Ok(output_path)
}
