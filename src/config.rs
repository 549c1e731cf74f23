use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FrameSyncError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraProfile {
    pub model: String,
    pub focal_length_mm: f64,
    pub sensor_width_mm: f64,
    pub sensor_height_mm: f64,
}

impl Default for CameraProfile {
    fn default() -> Self {
        Self {
            model: "M30T wide".to_string(),
            focal_length_mm: 4.5,
            sensor_width_mm: 6.4,
            sensor_height_mm: 4.8,
        }
    }
}

impl CameraProfile {
    /// Angle subtended by the sensor diagonal, in degrees.
    pub fn diagonal_fov_deg(&self) -> f64 {
        let diagonal = self.sensor_width_mm.hypot(self.sensor_height_mm);
        2.0 * (diagonal / (2.0 * self.focal_length_mm)).atan().to_degrees()
    }
}

/// Pixel rectangle, parsed from `x,y,width,height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FromStr for CropBox {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|v| v.trim().parse::<u32>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| format!("crop box '{}': {}", s, e))?;
        match values.as_slice() {
            &[x, y, width, height] if width > 0 && height > 0 => Ok(CropBox {
                x,
                y,
                width,
                height,
            }),
            &[_, _, _, _] => Err(format!("crop box '{}' has an empty area", s)),
            _ => Err(format!("crop box '{}' must be x,y,width,height", s)),
        }
    }
}

/// Geometric transforms applied to every persisted frame, in field order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOptions {
    pub crop: Option<CropBox>,
    pub channels: u8,
    pub size: Option<(u32, u32)>,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            crop: None,
            channels: 3,
            size: None,
        }
    }
}

impl TransformOptions {
    pub fn validate(&self) -> Result<()> {
        if self.channels != 1 && self.channels != 3 {
            return Err(FrameSyncError::InvalidOption(format!(
                "channels must be 1 or 3, got {}",
                self.channels
            )));
        }
        if let Some((w, h)) = self.size {
            if w == 0 || h == 0 {
                return Err(FrameSyncError::InvalidOption(format!(
                    "target size {}x{} is empty",
                    w, h
                )));
            }
        }
        Ok(())
    }
}
