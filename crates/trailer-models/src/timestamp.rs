//! Timestamp formatting utilities.
//!
//! SRT cue timestamps and millisecond rounding for serialized documents.

/// Round seconds to millisecond precision.
pub fn round_ms(secs: f64) -> f64 {
    (secs * 1000.0).round() / 1000.0
}

/// Whole milliseconds for a position in seconds (negative clamps to 0).
pub fn to_millis(secs: f64) -> u64 {
    if secs <= 0.0 {
        0
    } else {
        (secs * 1000.0).round() as u64
    }
}

/// Format seconds as an SRT timestamp (`HH:MM:SS,mmm`).
///
/// # Examples
/// ```
/// use trailer_models::timestamp::format_srt_timestamp;
/// assert_eq!(format_srt_timestamp(0.0), "00:00:00,000");
/// assert_eq!(format_srt_timestamp(3725.5), "01:02:05,500");
/// ```
pub fn format_srt_timestamp(secs: f64) -> String {
    let total_ms = to_millis(secs);
    let hours = total_ms / 3_600_000;
    let mins = (total_ms % 3_600_000) / 60_000;
    let s = (total_ms % 60_000) / 1000;
    let ms = total_ms % 1000;
    format!("{:02}:{:02}:{:02},{:03}", hours, mins, s, ms)
}

/// Format seconds into `HH:MM:SS.mmm` for ffmpeg arguments and logs.
pub fn format_seconds(secs: f64) -> String {
    format_srt_timestamp(secs).replace(',', ".")
}
