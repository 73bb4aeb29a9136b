//! FFmpeg invocation: argument building and a supervised runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, trace, warn};

use crate::error::{MediaError, MediaResult};
use crate::progress::{is_progress_line, parse_progress_line, FfmpegProgress};

const STDERR_TAIL_LINES: usize = 20;

/// One ffmpeg invocation with a single input and a single output.
///
/// Arguments are split into two groups: those that qualify the input
/// (seek, length, demuxer) and those that shape the output (filters,
/// codecs, container flags).
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: PathBuf,
    before_input: Vec<String>,
    after_input: Vec<String>,
    /// Seconds of media the command is expected to write
    length: Option<f64>,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            before_input: Vec::new(),
            after_input: Vec::new(),
            length: None,
        }
    }

    pub fn input_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.before_input.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.after_input.extend(args.into_iter().map(Into::into));
        self
    }

    /// Input-side seek, in seconds.
    pub fn seek(self, seconds: f64) -> Self {
        self.input_args(["-ss".to_string(), format!("{:.3}", seconds)])
    }

    /// Read only `seconds` of the input.
    pub fn duration(mut self, seconds: f64) -> Self {
        self.length = Some(seconds);
        self.input_args(["-t".to_string(), format!("{:.3}", seconds)])
    }

    /// Treat the input as a concat-demuxer list.
    pub fn concat_list(self) -> Self {
        self.input_args(["-f", "concat", "-safe", "0"])
    }

    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_args(["-vf".to_string(), filter.into()])
    }

    pub fn audio_filter(self, filter: impl Into<String>) -> Self {
        self.output_args(["-af".to_string(), filter.into()])
    }

    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_args(["-c:v".to_string(), codec.into()])
    }

    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_args(["-c:a".to_string(), codec.into()])
    }

    pub fn crf(self, crf: u8) -> Self {
        self.output_args(["-crf".to_string(), crf.to_string()])
    }

    /// Put the MP4 index up front so players can start before the download ends.
    pub fn faststart(self) -> Self {
        self.output_args(["-movflags", "+faststart"])
    }

    /// Write exactly one video frame.
    pub fn single_frame(self) -> Self {
        self.output_args(["-frames:v", "1"])
    }

    /// Full argument vector, overwriting the output and reporting progress on stderr.
    pub fn build_args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["-y", "-v", "error", "-progress", "pipe:2"]
            .into_iter()
            .map(String::from)
            .collect();
        args.extend(self.before_input.iter().cloned());
        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().into_owned());
        args.extend(self.after_input.iter().cloned());
        args.push(self.output.to_string_lossy().into_owned());
        args
    }
}

/// Spawns ffmpeg, follows its progress and enforces an optional deadline.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    timeout_secs: Option<u64>,
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill ffmpeg once it has run for `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Run `cmd` to completion.
    ///
    /// Succeeds only when ffmpeg exits cleanly and left a non-empty output
    /// file behind. On failure the last stderr lines are attached to the error.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        check_ffmpeg()?;

        let args = cmd.build_args();
        debug!(output = %cmd.output.display(), "ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("ffmpeg stderr was not piped"))?;
        let expected_ms = cmd.length.map(|s| (s * 1000.0) as i64).unwrap_or(0);
        let output = cmd.output.clone();

        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut progress = FfmpegProgress::default();
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);

            while let Ok(Some(line)) = lines.next_line().await {
                if is_progress_line(&line) {
                    if let Some(snapshot) = parse_progress_line(&line, &mut progress) {
                        trace!(
                            output = %output.display(),
                            percent = snapshot.percentage(expected_ms),
                            speed = snapshot.speed,
                            "ffmpeg progress"
                        );
                    }
                    continue;
                }
                if line.trim().is_empty() {
                    continue;
                }
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }

            Vec::from(tail).join("\n")
        });

        let status = self.wait(&mut child).await;
        let tail = reader.await.unwrap_or_default();
        let status = status?;

        if !status.success() {
            return Err(MediaError::ffmpeg_failed(
                format!("ffmpeg exited with {}", status),
                Some(tail).filter(|s| !s.is_empty()),
                status.code(),
            ));
        }

        ensure_output(&cmd.output).await
    }

    async fn wait(&self, child: &mut Child) -> MediaResult<ExitStatus> {
        let Some(secs) = self.timeout_secs else {
            return Ok(child.wait().await?);
        };

        match tokio::time::timeout(Duration::from_secs(secs), child.wait()).await {
            Ok(status) => Ok(status?),
            Err(_) => {
                warn!(timeout_secs = secs, "ffmpeg exceeded its deadline, killing");
                let _ = child.kill().await;
                Err(MediaError::Timeout(secs))
            }
        }
    }
}

async fn ensure_output(path: &Path) -> MediaResult<()> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.len() > 0 => Ok(()),
        _ => Err(MediaError::MissingOutput(path.to_path_buf())),
    }
}

pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_order() {
        let args = FfmpegCommand::new("feature.mp4", "seg_0001.mp4")
            .seek(12.5)
            .duration(6.0)
            .video_codec("libx264")
            .crf(20)
            .build_args();

        assert_eq!(&args[..5], &["-y", "-v", "error", "-progress", "pipe:2"]);
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        let codec = args.iter().position(|a| a == "-c:v").unwrap();
        assert!(ss < input && input < codec);
        assert_eq!(args[ss + 1], "12.500");
        assert_eq!(args.last().map(String::as_str), Some("seg_0001.mp4"));
    }

    #[test]
    fn test_concat_list_is_input_side() {
        let cmd = FfmpegCommand::new("list.txt", "out.mp4").concat_list();
        assert!(cmd.length.is_none());
        let args = cmd.build_args();
        let concat = args.iter().position(|a| a == "concat").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(concat < input);
        assert!(args.contains(&"-safe".to_string()));
    }

    #[test]
    fn test_duration_is_remembered() {
        let cmd = FfmpegCommand::new("a.mp4", "b.mp4").duration(7.25);
        assert_eq!(cmd.length, Some(7.25));
    }

    #[tokio::test]
    async fn test_empty_output_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trailer.mp4");
        assert!(matches!(ensure_output(&path).await, Err(MediaError::MissingOutput(_))));

        tokio::fs::write(&path, b"").await.unwrap();
        assert!(ensure_output(&path).await.is_err());

        tokio::fs::write(&path, b"moov").await.unwrap();
        assert!(ensure_output(&path).await.is_ok());
    }
}
