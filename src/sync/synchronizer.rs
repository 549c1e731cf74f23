use std::path::PathBuf;

use super::selector::FrameSelector;
use super::video::{VideoDecoder, VideoOpener};
use crate::config::CameraProfile;
use crate::error::Result;
use crate::telemetry::{TelemetryRow, VideoSegment};
use crate::types::{Camera, Frame, Geoposition, Gimbal};

/// Lazily pairs telemetry rows with decoded video frames.
///
/// Videos are visited in the given order, each with the segment at the same
/// position; rows are visited in segment order. A candidate is dropped when
/// the selector rejects it, when it comes less than `min_time_gap_ms` after
/// the previous emitted frame of the same video, or when the decoder has no
/// frame at its offset. Selection and debounce run before any decode.
///
/// The iterator is single-pass: build a new one to start over. After an error
/// it is fused.
pub struct FrameSynchronizer<O: VideoOpener> {
    opener: O,
    videos: Vec<PathBuf>,
    segments: Vec<VideoSegment>,
    camera: CameraProfile,
    selector: Option<Box<dyn FrameSelector>>,
    min_time_gap_ms: i64,

    video_idx: usize,
    row_idx: usize,
    decoder: Option<O::Decoder>,
    /// (video index, time_ms) of the last emitted frame
    last_emitted: Option<(usize, i64)>,
    decode_misses: usize,
}

impl<O: VideoOpener> FrameSynchronizer<O> {
    pub fn new(
        opener: O,
        videos: Vec<PathBuf>,
        segments: Vec<VideoSegment>,
        camera: CameraProfile,
    ) -> Self {
        if videos.len() != segments.len() {
            log::warn!(
                "{} videos but {} telemetry segments; only {} pairs are synchronized",
                videos.len(),
                segments.len(),
                videos.len().min(segments.len())
            );
        }
        Self {
            opener,
            videos,
            segments,
            camera,
            selector: None,
            min_time_gap_ms: 0,
            video_idx: 0,
            row_idx: 0,
            decoder: None,
            last_emitted: None,
            decode_misses: 0,
        }
    }

    pub fn with_selector(mut self, selector: Box<dyn FrameSelector>) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn with_min_time_gap_ms(mut self, min_time_gap_ms: i64) -> Self {
        self.min_time_gap_ms = min_time_gap_ms;
        self
    }

    /// Candidates dropped so far because the decoder returned no frame.
    pub fn decode_misses(&self) -> usize {
        self.decode_misses
    }

    fn pair_count(&self) -> usize {
        self.videos.len().min(self.segments.len())
    }

    fn fuse(&mut self) {
        self.video_idx = self.pair_count();
        self.decoder = None;
    }

    fn debounced(&self, time_ms: i64) -> bool {
        match self.last_emitted {
            Some((video, last_time)) if video == self.video_idx => {
                time_ms - last_time < self.min_time_gap_ms
            }
            _ => false,
        }
    }
}

fn candidate(video: &str, row: &TelemetryRow, camera: &CameraProfile) -> Frame {
    Frame {
        video_filename: video.to_string(),
        time_ms: row.time_ms,
        datetime_utc: row.datetime_utc.clone(),
        geoposition: Geoposition {
            latitude: row.latitude,
            longitude: row.longitude,
            ground_level_altitude: row.ground_level_altitude_m,
            sea_level_altitude: row.sea_level_altitude_m,
        },
        camera: Camera {
            model: camera.model.clone(),
            focal_length: camera.focal_length_mm,
            sensor_width: camera.sensor_width_mm,
            sensor_height: camera.sensor_height_mm,
            gimbal: Gimbal {
                pitch: row.gimbal_pitch_deg,
                roll: row.gimbal_roll_deg,
                yaw: row.gimbal_yaw_deg,
            },
        },
        array: None,
    }
}

impl<O: VideoOpener> Iterator for FrameSynchronizer<O> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.video_idx < self.pair_count() {
            let rows = &self.segments[self.video_idx].rows;
            if self.row_idx >= rows.len() {
                log::debug!("finished {}", self.videos[self.video_idx].display());
                self.video_idx += 1;
                self.row_idx = 0;
                self.decoder = None;
                continue;
            }
            let video_name = self.videos[self.video_idx].to_string_lossy();
            let mut frame = candidate(&video_name, &rows[self.row_idx], &self.camera);
            self.row_idx += 1;

            if let Some(selector) = &self.selector {
                if !selector.select(&frame) {
                    continue;
                }
            }
            if self.debounced(frame.time_ms) {
                continue;
            }

            if self.decoder.is_none() {
                match self.opener.open(&self.videos[self.video_idx]) {
                    Ok(decoder) => self.decoder = Some(decoder),
                    Err(e) => {
                        self.fuse();
                        return Some(Err(e));
                    }
                }
            }
            let Some(decoder) = self.decoder.as_mut() else {
                continue;
            };
            let decoded = decoder
                .seek(frame.time_ms)
                .and_then(|_| decoder.read_frame());
            match decoded {
                Ok(Some(image)) => {
                    frame.array = Some(image);
                    self.last_emitted = Some((self.video_idx, frame.time_ms));
                    return Some(Ok(frame));
                }
                Ok(None) => {
                    self.decode_misses += 1;
                    log::warn!(
                        "no frame at {} ms in {}, skipping",
                        frame.time_ms,
                        frame.video_filename
                    );
                }
                Err(e) => {
                    self.fuse();
                    return Some(Err(e));
                }
            }
        }
        None
    }
}
