//! Video decode capability.
//!
//! The synchronizer only needs random access by millisecond offset: open a
//! file, seek, read one frame. A read that finds no frame at the requested
//! offset returns `Ok(None)`.

use std::path::Path;

use image::DynamicImage;

use crate::error::{FrameSyncError, Result};

pub trait VideoDecoder {
    fn seek(&mut self, time_ms: i64) -> Result<()>;
    fn read_frame(&mut self) -> Result<Option<DynamicImage>>;
}

pub trait VideoOpener {
    type Decoder: VideoDecoder + Send;

    fn open(&self, path: &Path) -> Result<Self::Decoder>;
}

/// Maps millisecond offsets onto a stream's timestamps.
///
/// Offsets count from the stream's first timestamp, not from zero: telemetry
/// time 0 is the first frame of the recording, while containers may start
/// their timeline at a positive `start_time`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamClock {
    /// first presentation timestamp, in `time_base` units
    pub start_pts: i64,
    /// seconds per timestamp unit
    pub time_base: f64,
}

impl StreamClock {
    /// A missing (`i64::MIN`, FFmpeg's no-PTS marker) or negative start is
    /// treated as 0.
    pub fn new(start_pts: i64, time_base: f64) -> Self {
        Self {
            start_pts: start_pts.max(0),
            time_base,
        }
    }

    /// Stream timestamp of the frame at `time_ms`, or `None` for an unusable
    /// time base.
    pub fn pts_at(&self, time_ms: i64) -> Option<i64> {
        if self.time_base <= 0.0 || !self.time_base.is_finite() {
            return None;
        }
        let offset = (time_ms as f64 / 1000.0 / self.time_base).floor() as i64;
        Some(self.start_pts.saturating_add(offset))
    }

    /// Container seek position in microseconds (FFmpeg's `AV_TIME_BASE`).
    pub fn seek_micros(&self, time_ms: i64) -> i64 {
        let start_us = if self.time_base > 0.0 && self.time_base.is_finite() {
            (self.start_pts as f64 * self.time_base * 1e6).round() as i64
        } else {
            0
        };
        start_us.saturating_add(time_ms.saturating_mul(1000))
    }
}

/// Opens local video files with the compiled-in decoder backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileVideoOpener;

#[cfg(feature = "video-ffmpeg")]
pub type FileVideo = super::ffmpeg::FfmpegVideo;

#[cfg(feature = "video-ffmpeg")]
impl VideoOpener for FileVideoOpener {
    type Decoder = FileVideo;

    fn open(&self, path: &Path) -> Result<FileVideo> {
        FileVideo::open(path)
    }
}

/// Placeholder decoder for builds without a video backend; it cannot be opened.
#[cfg(not(feature = "video-ffmpeg"))]
pub struct FileVideo {
    _private: (),
}

#[cfg(not(feature = "video-ffmpeg"))]
impl VideoDecoder for FileVideo {
    fn seek(&mut self, _time_ms: i64) -> Result<()> {
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<DynamicImage>> {
        Ok(None)
    }
}

#[cfg(not(feature = "video-ffmpeg"))]
impl VideoOpener for FileVideoOpener {
    type Decoder = FileVideo;

    fn open(&self, path: &Path) -> Result<FileVideo> {
        Err(video_error(
            path,
            "video decoding requires the video-ffmpeg feature",
        ))
    }
}

pub(crate) fn video_error(path: &Path, message: impl Into<String>) -> FrameSyncError {
    FrameSyncError::Video {
        path: path.to_path_buf(),
        message: message.into(),
    }
}
