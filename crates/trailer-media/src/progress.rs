//! Parsing of ffmpeg's `-progress pipe:2` key/value stream.

use serde::Serialize;

/// Snapshot taken at the end of each progress block.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FfmpegProgress {
    pub frame: u64,
    /// Media time written so far, in milliseconds
    pub out_time_ms: i64,
    /// Multiple of realtime; 0.0 until ffmpeg reports one
    pub speed: f64,
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Share of `expected_ms` already written, in percent and capped at 100.
    pub fn percentage(&self, expected_ms: i64) -> f64 {
        if expected_ms <= 0 {
            return 0.0;
        }
        (self.out_time_ms as f64 * 100.0 / expected_ms as f64).min(100.0)
    }
}

const KEYS: &[&str] = &[
    "frame",
    "fps",
    "bitrate",
    "total_size",
    "out_time_us",
    "out_time_ms",
    "out_time",
    "dup_frames",
    "drop_frames",
    "speed",
    "progress",
];

/// Whether `line` is part of the progress stream rather than a diagnostic.
pub(crate) fn is_progress_line(line: &str) -> bool {
    line.trim()
        .split_once('=')
        .is_some_and(|(key, _)| KEYS.contains(&key) || key.starts_with("stream_"))
}

/// Fold one `key=value` line into `current`.
///
/// Returns a copy when the line closes a block (`progress=continue|end`).
pub(crate) fn parse_progress_line(line: &str, current: &mut FfmpegProgress) -> Option<FfmpegProgress> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        // out_time_ms is misnamed upstream and also carries microseconds
        "out_time_us" | "out_time_ms" => {
            if let Ok(us) = value.parse::<i64>() {
                current.out_time_ms = us / 1000;
            }
        }
        "frame" => current.frame = value.parse().unwrap_or(current.frame),
        "speed" => {
            if let Some(speed) = value.strip_suffix('x').and_then(|s| s.trim().parse().ok()) {
                current.speed = speed;
            }
        }
        "progress" => {
            current.is_complete = value == "end";
            return Some(current.clone());
        }
        _ => {}
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage() {
        let p = FfmpegProgress {
            out_time_ms: 3_000,
            ..Default::default()
        };
        assert!((p.percentage(12_000) - 25.0).abs() < 1e-9);
        assert_eq!(p.percentage(1_000), 100.0);
        assert_eq!(p.percentage(0), 0.0);
    }

    #[test]
    fn test_block_parsing() {
        let mut current = FfmpegProgress::default();
        let block = ["frame=144", "out_time_us=6000000", "speed=2.4x", "speed=N/A"];
        for line in block {
            assert!(parse_progress_line(line, &mut current).is_none());
        }
        assert_eq!(current.frame, 144);
        assert_eq!(current.out_time_ms, 6_000);
        assert!((current.speed - 2.4).abs() < 1e-9);

        let mid = parse_progress_line("progress=continue", &mut current).unwrap();
        assert!(!mid.is_complete);
        let last = parse_progress_line("progress=end", &mut current).unwrap();
        assert!(last.is_complete);
    }

    #[test]
    fn test_diagnostics_are_not_progress() {
        assert!(is_progress_line("out_time=00:00:06.000000"));
        assert!(is_progress_line("stream_0_0_q=23.0"));
        assert!(!is_progress_line("[concat @ 0x7f] Impossible to open 'seg_0003.mp4'"));
        assert!(!is_progress_line("Error while decoding stream: a=1"));
    }
}
