#![allow(dead_code)]

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use geoframes::error::{FrameSyncError, Result};
use geoframes::sync::{VideoDecoder, VideoOpener};
use geoframes::telemetry::TelemetryRow;
use image::{DynamicImage, Rgb, RgbImage};

pub const FRAME_W: u32 = 32;
pub const FRAME_H: u32 = 24;

pub fn row(time_ms: i64, is_video: bool) -> TelemetryRow {
    TelemetryRow {
        is_video,
        time_ms,
        datetime_utc: format!("2023-06-01 12:00:{:02}", (time_ms / 1000) % 60),
        latitude: 45.0 + time_ms as f64 * 1e-7,
        longitude: 7.0,
        ground_level_altitude_m: 60.0,
        sea_level_altitude_m: 310.0,
        gimbal_pitch_deg: -90.0,
        gimbal_roll_deg: 0.0,
        gimbal_yaw_deg: 15.0,
    }
}

#[derive(Clone, Default)]
pub struct CallCounters {
    pub opens: Arc<AtomicUsize>,
    pub seeks: Arc<AtomicUsize>,
    pub reads: Arc<AtomicUsize>,
}

impl CallCounters {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn seeks(&self) -> usize {
        self.seeks.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

/// In-memory video source. Every offset decodes to a solid frame except the
/// ones listed in `missing_ms`; paths containing "broken" fail to open.
#[derive(Clone, Default)]
pub struct MockOpener {
    pub counters: CallCounters,
    pub missing_ms: HashSet<i64>,
}

pub struct MockDecoder {
    counters: CallCounters,
    missing_ms: HashSet<i64>,
    position_ms: i64,
}

impl VideoOpener for MockOpener {
    type Decoder = MockDecoder;

    fn open(&self, path: &Path) -> Result<MockDecoder> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        if path.to_string_lossy().contains("broken") {
            return Err(FrameSyncError::Video {
                path: path.to_path_buf(),
                message: "cannot open".to_string(),
            });
        }
        Ok(MockDecoder {
            counters: self.counters.clone(),
            missing_ms: self.missing_ms.clone(),
            position_ms: 0,
        })
    }
}

impl VideoDecoder for MockDecoder {
    fn seek(&mut self, time_ms: i64) -> Result<()> {
        self.counters.seeks.fetch_add(1, Ordering::SeqCst);
        self.position_ms = time_ms;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<DynamicImage>> {
        self.counters.reads.fetch_add(1, Ordering::SeqCst);
        if self.missing_ms.contains(&self.position_ms) {
            return Ok(None);
        }
        let shade = (self.position_ms / 10 % 256) as u8;
        Ok(Some(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            FRAME_W,
            FRAME_H,
            Rgb([shade, 128, 255 - shade]),
        ))))
    }
}
