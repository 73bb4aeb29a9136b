//! Source inspection through ffprobe.

use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

/// What the trailer pipeline needs to know about a source asset.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    /// Seconds; 0.0 when ffprobe reports nothing usable
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub has_audio: bool,
}

#[derive(Debug, Deserialize)]
struct ProbeDoc {
    #[serde(default)]
    format: ProbeFormat,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

/// Run ffprobe on `path`.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }
    check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args(["-v", "error", "-of", "json"])
        .args(["-show_entries", "format=duration:stream=codec_type,width,height,duration"])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: format!("ffprobe exited with {}", output.status),
            stderr: Some(String::from_utf8_lossy(&output.stderr).into_owned()),
        });
    }

    parse_probe_output(&output.stdout)
}

/// Duration of `path` in seconds.
pub async fn get_duration(path: impl AsRef<Path>) -> MediaResult<f64> {
    Ok(probe_video(path).await?.duration)
}

fn seconds(raw: Option<&str>) -> Option<f64> {
    raw?.trim().parse::<f64>().ok().filter(|d| d.is_finite() && *d > 0.0)
}

fn parse_probe_output(stdout: &[u8]) -> MediaResult<VideoInfo> {
    let doc: ProbeDoc = serde_json::from_slice(stdout)?;

    let video = doc
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::InvalidVideo("no video stream".to_string()))?;

    // The container value wins; some muxers only set it per stream
    let duration = seconds(doc.format.duration.as_deref())
        .or_else(|| seconds(video.duration.as_deref()))
        .unwrap_or(0.0);

    Ok(VideoInfo {
        duration,
        width: video.width.unwrap_or(0),
        height: video.height.unwrap_or(0),
        has_audio: doc.streams.iter().any(|s| s.codec_type == "audio"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_duration() {
        let json = br#"{
            "format": {"duration": "121.480000"},
            "streams": [
                {"codec_type": "video", "width": 1920, "height": 800, "duration": "121.400000"},
                {"codec_type": "audio"}
            ]
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert!((info.duration - 121.48).abs() < 1e-9);
        assert_eq!((info.width, info.height), (1920, 800));
        assert!(info.has_audio);
    }

    #[test]
    fn test_stream_duration_fallback() {
        let json = br#"{"format": {}, "streams": [{"codec_type": "video", "duration": "95.5"}]}"#;
        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.duration, 95.5);
        assert!(!info.has_audio);
    }

    #[test]
    fn test_unusable_duration_reads_as_zero() {
        for raw in ["N/A", "-3", "nan"] {
            let json = format!(r#"{{"format": {{"duration": "{}"}}, "streams": [{{"codec_type": "video"}}]}}"#, raw);
            assert_eq!(parse_probe_output(json.as_bytes()).unwrap().duration, 0.0, "{}", raw);
        }
    }

    #[test]
    fn test_audio_only_is_rejected() {
        let json = br#"{"streams": [{"codec_type": "audio"}]}"#;
        assert!(matches!(parse_probe_output(json), Err(MediaError::InvalidVideo(_))));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = probe_video("/nonexistent/feature.mp4").await;
        assert!(matches!(result, Err(MediaError::FileNotFound(_))));
    }
}
