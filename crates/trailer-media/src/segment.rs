//! Segment extraction and concatenation.
//!
//! Every clip is cut from the source with a re-encode so cuts land on the
//! requested frame, then all clips of a trailer are joined through the concat
//! demuxer and encoded once more into the requested container.

use std::path::{Path, PathBuf};
use tracing::info;

use trailer_models::{AudioCue, EncodingConfig, OutputFormat, Transition};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Fade-from-black length for `fade` transitions.
pub const FADE_SECS: f64 = 0.5;
/// Fade length on each end of a `dip` transition.
pub const DIP_SECS: f64 = 0.25;
/// Upper bound for audio cue fades.
pub const AUDIO_FADE_SECS: f64 = 1.0;

/// Filters applied to one clip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentEffects {
    pub transition: Transition,
    pub audio_cue: AudioCue,
}

impl SegmentEffects {
    pub fn new(transition: Transition, audio_cue: AudioCue) -> Self {
        Self { transition, audio_cue }
    }

    /// Video filter chain for a clip of `duration` seconds.
    pub fn video_filter(&self, duration: f64) -> Option<String> {
        match self.transition {
            Transition::Cut => None,
            Transition::Fade => Some(format!("fade=t=in:st=0:d={:.3}", FADE_SECS.min(duration))),
            Transition::Dip => {
                let d = DIP_SECS.min(duration / 2.0);
                Some(format!(
                    "fade=t=in:st=0:d={:.3},fade=t=out:st={:.3}:d={:.3}",
                    d,
                    (duration - d).max(0.0),
                    d
                ))
            }
        }
    }

    /// Audio filter chain for a clip of `duration` seconds.
    pub fn audio_filter(&self, duration: f64) -> Option<String> {
        let d = AUDIO_FADE_SECS.min(duration / 2.0);
        match self.audio_cue {
            AudioCue::Rise => Some(format!("afade=t=in:st=0:d={:.3}", d)),
            AudioCue::Drop => Some(format!(
                "afade=t=out:st={:.3}:d={:.3}",
                (duration - d).max(0.0),
                d
            )),
            AudioCue::Sting | AudioCue::Motif => None,
        }
    }
}

/// Extract `[start, end)` of `input` into `output`, re-encoded with effects.
pub async fn extract_segment(
    runner: &FfmpegRunner,
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    start: f64,
    end: f64,
    effects: SegmentEffects,
    encoding: &EncodingConfig,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    if !(start >= 0.0 && end > start) {
        return Err(MediaError::InvalidWindow(format!("[{:.3}, {:.3})", start, end)));
    }
    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }

    let duration = end - start;
    let mut cmd = FfmpegCommand::new(input, output).seek(start).duration(duration);

    if let Some(vf) = effects.video_filter(duration) {
        cmd = cmd.video_filter(vf);
    }
    if let Some(af) = effects.audio_filter(duration) {
        cmd = cmd.audio_filter(af);
    }
    cmd = cmd.output_args(encoding.to_ffmpeg_args());

    runner.run(&cmd).await?;

    info!(
        output = %output.display(),
        start = start,
        duration = duration,
        transition = %effects.transition,
        audio_cue = %effects.audio_cue,
        "Segment extracted"
    );
    Ok(())
}

/// Concat demuxer list body for `segments`.
pub fn concat_list_content(segments: &[PathBuf]) -> String {
    segments
        .iter()
        .map(|p| format!("file '{}'\n", p.display().to_string().replace('\'', "'\\''")))
        .collect()
}

/// Join `segments` in order and encode the result for `format`.
///
/// The list file is written next to the first segment.
pub async fn concat_segments(
    runner: &FfmpegRunner,
    segments: &[PathBuf],
    output: impl AsRef<Path>,
    format: OutputFormat,
) -> MediaResult<()> {
    let output = output.as_ref();
    let first = segments
        .first()
        .ok_or_else(|| MediaError::InvalidWindow("no segments to concatenate".to_string()))?;

    let list_dir = first.parent().unwrap_or_else(|| Path::new("."));
    let concat_list = list_dir.join("concat.txt");
    tokio::fs::write(&concat_list, concat_list_content(segments)).await?;

    let mut cmd = FfmpegCommand::new(&concat_list, output)
        .concat_list()
        .output_args(EncodingConfig::for_format(format).to_ffmpeg_args());
    if format.supports_faststart() {
        cmd = cmd.faststart();
    }

    runner.run(&cmd).await?;

    info!(
        segments = segments.len(),
        output = %output.display(),
        format = %format,
        "Segments concatenated"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cut_has_no_video_filter() {
        let effects = SegmentEffects::new(Transition::Cut, AudioCue::Sting);
        assert!(effects.video_filter(5.0).is_none());
        assert!(effects.audio_filter(5.0).is_none());
    }

    #[test]
    fn test_fade_and_dip_filters() {
        let fade = SegmentEffects::new(Transition::Fade, AudioCue::Motif);
        assert_eq!(fade.video_filter(5.0).unwrap(), "fade=t=in:st=0:d=0.500");

        let dip = SegmentEffects::new(Transition::Dip, AudioCue::Motif);
        assert_eq!(
            dip.video_filter(4.0).unwrap(),
            "fade=t=in:st=0:d=0.250,fade=t=out:st=3.750:d=0.250"
        );
    }

    #[test]
    fn test_audio_cue_filters() {
        let rise = SegmentEffects::new(Transition::Cut, AudioCue::Rise);
        assert_eq!(rise.audio_filter(6.0).unwrap(), "afade=t=in:st=0:d=1.000");

        let drop = SegmentEffects::new(Transition::Cut, AudioCue::Drop);
        assert_eq!(drop.audio_filter(1.5).unwrap(), "afade=t=out:st=0.750:d=0.750");
    }

    #[test]
    fn test_concat_list_escapes_quotes() {
        let content = concat_list_content(&[PathBuf::from("/tmp/a.mp4"), PathBuf::from("/tmp/it's.mp4")]);
        assert_eq!(content, "file '/tmp/a.mp4'\nfile '/tmp/it'\\''s.mp4'\n");
    }

    #[tokio::test]
    async fn test_invalid_window_rejected() {
        let effects = SegmentEffects::new(Transition::Cut, AudioCue::Sting);
        let result = extract_segment(&FfmpegRunner::new(), "in.mp4", "out.mp4", 5.0, 5.0, effects, &EncodingConfig::default()).await;
        assert!(matches!(result, Err(MediaError::InvalidWindow(_))));
    }

    #[tokio::test]
    async fn test_concat_requires_segments() {
        let result = concat_segments(&FfmpegRunner::new(), &[], "out.mp4", OutputFormat::Mp4).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    #[ignore = "requires ffmpeg"]
    async fn test_extract_and_concat_with_ffmpeg() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.mp4");
        let generate = FfmpegCommand::new("testsrc=duration=6:size=320x240:rate=25", &source)
            .input_args(["-f", "lavfi"])
            .output_args(EncodingConfig::default().to_ffmpeg_args());
        FfmpegRunner::new().run(&generate).await.unwrap();

        let runner = FfmpegRunner::new().with_timeout(60);
        let encoding = EncodingConfig::default();
        let a = dir.path().join("seg_0000.mp4");
        let b = dir.path().join("seg_0001.mp4");
        extract_segment(&runner, &source, &a, 0.0, 2.0, SegmentEffects::new(Transition::Cut, AudioCue::Sting), &encoding)
            .await
            .unwrap();
        extract_segment(&runner, &source, &b, 3.0, 5.0, SegmentEffects::new(Transition::Dip, AudioCue::Motif), &encoding)
            .await
            .unwrap();

        let out = dir.path().join("trailer.mp4");
        concat_segments(&runner, &[a, b], &out, OutputFormat::Mp4).await.unwrap();
        let info = crate::probe::probe_video(&out).await.unwrap();
        assert!((info.duration - 4.0).abs() < 0.5);
    }
}
