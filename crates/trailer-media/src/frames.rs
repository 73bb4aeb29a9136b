//! Still frame sampling.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Width frames are scaled to before upload.
pub const FRAME_SCALE_WIDTH: u32 = 640;

/// Evenly spaced sample timestamps: `count` frames at `duration / count`.
pub fn sample_timestamps(duration: f64, count: usize) -> Vec<f64> {
    if count == 0 || duration <= 0.0 {
        return Vec::new();
    }
    let interval = duration / count as f64;
    (0..count).map(|i| i as f64 * interval).collect()
}

/// Extract the frame at `timestamp` as a JPEG.
pub async fn extract_frame(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    timestamp: f64,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }

    let cmd = FfmpegCommand::new(input, output)
        .seek(timestamp)
        .single_frame()
        .video_filter(format!("scale={}:-2", FRAME_SCALE_WIDTH))
        .output_args(["-q:v", "3"]);

    FfmpegRunner::new().run(&cmd).await?;
    debug!(timestamp = timestamp, output = %output.display(), "Frame extracted");
    Ok(())
}

/// Extract `count` evenly spaced frames into `dir`.
///
/// Returns `(timestamp, path)` pairs in chronological order.
pub async fn extract_frames(
    input: impl AsRef<Path>,
    dir: impl AsRef<Path>,
    duration: f64,
    count: usize,
) -> MediaResult<Vec<(f64, PathBuf)>> {
    let input = input.as_ref();
    let dir = dir.as_ref();
    let mut frames = Vec::with_capacity(count);

    for (i, ts) in sample_timestamps(duration, count).into_iter().enumerate() {
        let path = dir.join(format!("frame_{:04}.jpg", i));
        extract_frame(input, &path, ts).await?;
        frames.push((ts, path));
    }

    Ok(frames)
}
