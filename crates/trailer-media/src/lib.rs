//! FFmpeg CLI wrapper for trailer assembly.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - Duration probing through ffprobe
//! - Segment extraction with transition filters and concat-demuxer joins
//! - JPEG frame sampling for visual analysis

pub mod command;
pub mod error;
pub mod frames;
pub mod probe;
pub mod progress;
pub mod segment;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use frames::{extract_frame, extract_frames, sample_timestamps};
pub use probe::{get_duration, probe_video, VideoInfo};
pub use progress::FfmpegProgress;
pub use segment::{concat_list_content, concat_segments, extract_segment, SegmentEffects};
