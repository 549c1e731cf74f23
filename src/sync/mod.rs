#[cfg(feature = "video-ffmpeg")]
pub mod ffmpeg;
pub mod selector;
pub mod synchronizer;
pub mod video;

pub use selector::{AllFrames, FacingDown, FrameSelector, Selection, NADIR_PITCH_WINDOW};
pub use synchronizer::FrameSynchronizer;
pub use video::{FileVideo, FileVideoOpener, StreamClock, VideoDecoder, VideoOpener};

use std::path::PathBuf;

use crate::config::CameraProfile;
use crate::telemetry::VideoSegment;

/// Builds the frame sequence for `videos` paired positionally with `segments`.
pub fn synchronize<O: VideoOpener>(
    opener: O,
    videos: Vec<PathBuf>,
    segments: Vec<VideoSegment>,
    camera: CameraProfile,
    selector: Option<Box<dyn FrameSelector>>,
    min_time_gap_ms: i64,
) -> FrameSynchronizer<O> {
    let synchronizer =
        FrameSynchronizer::new(opener, videos, segments, camera).with_min_time_gap_ms(min_time_gap_ms);
    match selector {
        Some(selector) => synchronizer.with_selector(selector),
        None => synchronizer,
    }
}
