use image::DynamicImage;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geoposition {
    /// degrees
    pub latitude: f64,
    /// degrees
    pub longitude: f64,
    /// meters above the takeoff point
    pub ground_level_altitude: f64,
    /// meters above sea level
    pub sea_level_altitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gimbal {
    pub pitch: f64,
    pub roll: f64,
    pub yaw: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub model: String,
    /// millimeters
    pub focal_length: f64,
    pub sensor_width: f64,
    pub sensor_height: f64,
    pub gimbal: Gimbal,
}

/// One telemetry sample paired with the video frame decoded at its offset.
///
/// `array` is `None` until the synchronizer has decoded the frame. Frames that
/// leave the synchronizer always carry an image.
#[derive(Debug, Clone)]
pub struct Frame {
    pub video_filename: String,
    /// seek offset inside the video, in milliseconds
    pub time_ms: i64,
    pub datetime_utc: String,
    pub geoposition: Geoposition,
    pub camera: Camera,
    pub array: Option<DynamicImage>,
}

impl Frame {
    pub fn to_record(&self, filename: String) -> SyncedFrameRecord {
        SyncedFrameRecord {
            filename,
            video_filename: self.video_filename.clone(),
            time: self.time_ms,
            datetime: self.datetime_utc.clone(),
            latitude: self.geoposition.latitude,
            longitude: self.geoposition.longitude,
            ground_level_altitude: self.geoposition.ground_level_altitude,
            sea_level_altitude: self.geoposition.sea_level_altitude,
            gimbal_pitch: self.camera.gimbal.pitch,
            gimbal_roll: self.camera.gimbal.roll,
            gimbal_yaw: self.camera.gimbal.yaw,
        }
    }
}

/// Row of the synced-frame table. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncedFrameRecord {
    pub filename: String,
    pub video_filename: String,
    pub time: i64,
    pub datetime: String,
    pub latitude: f64,
    pub longitude: f64,
    pub ground_level_altitude: f64,
    pub sea_level_altitude: f64,
    pub gimbal_pitch: f64,
    pub gimbal_roll: f64,
    pub gimbal_yaw: f64,
}
