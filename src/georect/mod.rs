//! Georectification of nadir frames.
//!
//! Assumes flat ground, no lens distortion and a camera pointing straight
//! down: the four image corners are projected to the ground with the
//! geodesic direct problem and an affine transform is fitted through them.

pub mod gcp;
pub mod geodesy;
pub mod geotiff;

pub use gcp::{corner_control_points, GeoTransform, GroundControlPoint};
pub use geotiff::{write_geotiff, RasterTags};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indicatif::ParallelProgressIterator;
use rayon::prelude::*;

use crate::error::{FrameSyncError, Result};
use crate::sync::NADIR_PITCH_WINDOW;
use crate::types::SyncedFrameRecord;

/// Position and attitude of the camera when the frame was captured.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturePose {
    pub latitude: f64,
    pub longitude: f64,
    pub ground_level_altitude: f64,
    pub gimbal_pitch: f64,
    pub gimbal_yaw: f64,
    pub datetime: String,
}

impl From<&SyncedFrameRecord> for CapturePose {
    fn from(record: &SyncedFrameRecord) -> Self {
        CapturePose {
            latitude: record.latitude,
            longitude: record.longitude,
            ground_level_altitude: record.ground_level_altitude,
            gimbal_pitch: record.gimbal_pitch,
            gimbal_yaw: record.gimbal_yaw,
            datetime: record.datetime.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RectifyOutcome {
    Written(PathBuf),
    /// Pose outside the nadir window; nothing was written.
    Skipped { gimbal_pitch: f64 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RectifySummary {
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
}

pub fn is_nadir(gimbal_pitch: f64) -> bool {
    NADIR_PITCH_WINDOW.contains(&gimbal_pitch)
}

/// `<output_dir>/<image stem>.tif`
pub fn geotiff_path(image_path: &Path, output_dir: &Path) -> PathBuf {
    let stem = image_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frame".to_string());
    output_dir.join(format!("{}.tif", stem))
}

pub fn rectify(
    image_path: &Path,
    output_dir: &Path,
    diagonal_fov_deg: f64,
    pose: &CapturePose,
) -> Result<RectifyOutcome> {
    if !is_nadir(pose.gimbal_pitch) {
        log::info!(
            "skipping {}: gimbal pitch {}° is not nadir",
            image_path.display(),
            pose.gimbal_pitch
        );
        return Ok(RectifyOutcome::Skipped {
            gimbal_pitch: pose.gimbal_pitch,
        });
    }

    let image = image::open(image_path).map_err(|e| FrameSyncError::image(image_path, e))?;
    let gcps = corner_control_points(
        pose.latitude,
        pose.longitude,
        pose.ground_level_altitude,
        pose.gimbal_yaw,
        diagonal_fov_deg,
        image.width(),
        image.height(),
    );
    let transform =
        GeoTransform::from_gcps(&gcps).map_err(|message| FrameSyncError::Georeference {
            path: image_path.to_path_buf(),
            message,
        })?;

    std::fs::create_dir_all(output_dir).map_err(|e| FrameSyncError::io(output_dir, e))?;
    let output = geotiff_path(image_path, output_dir);
    let tags = RasterTags {
        datetime: pose.datetime.clone(),
        provenance: format!(
            "{} {} from {}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            image_path.display()
        ),
    };
    write_geotiff(&output, &image, &transform, &tags).map_err(|source| FrameSyncError::Tiff {
        path: output.clone(),
        source,
    })?;
    log::debug!("wrote {}", output.display());
    Ok(RectifyOutcome::Written(output))
}

/// Marks the nadir rows whose output raster was already claimed by an
/// earlier row. Outputs are named by image stem, so frames from different
/// directories can collide.
fn colliding_outputs(
    image_paths: &[PathBuf],
    records: &[SyncedFrameRecord],
    output_dir: &Path,
) -> Vec<bool> {
    let mut claimed: HashMap<PathBuf, usize> = HashMap::new();
    image_paths
        .iter()
        .zip(records)
        .enumerate()
        .map(|(row, (image_path, record))| {
            if !is_nadir(record.gimbal_pitch) {
                return false;
            }
            let output = geotiff_path(image_path, output_dir);
            match claimed.get(&output) {
                Some(first) => {
                    log::error!(
                        "row {} ({}) would overwrite {} written for row {}",
                        row,
                        image_path.display(),
                        output.display(),
                        first
                    );
                    true
                }
                None => {
                    claimed.insert(output, row);
                    false
                }
            }
        })
        .collect()
}

/// Rectifies every row of a synced-frame table. Rows are independent: a
/// failing row is logged and counted, and the rest of the batch continues.
/// A nadir row whose raster name was taken by an earlier row counts as failed.
pub fn rectify_batch(
    records: &[SyncedFrameRecord],
    output_dir: &Path,
    diagonal_fov_deg: f64,
    images_root: Option<&Path>,
) -> Result<RectifySummary> {
    std::fs::create_dir_all(output_dir).map_err(|e| FrameSyncError::io(output_dir, e))?;

    let image_paths: Vec<PathBuf> = records
        .iter()
        .map(|record| match images_root {
            Some(root) => root.join(&record.filename),
            None => PathBuf::from(&record.filename),
        })
        .collect();
    let collisions = colliding_outputs(&image_paths, records, output_dir);

    let outcomes: Vec<Option<RectifyOutcome>> = records
        .par_iter()
        .zip(image_paths.par_iter())
        .zip(collisions.par_iter())
        .progress_count(records.len() as u64)
        .map(|((record, image_path), &collides)| {
            if collides {
                return None;
            }
            let pose = CapturePose::from(record);
            match rectify(image_path, output_dir, diagonal_fov_deg, &pose) {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    log::error!("{}", e);
                    None
                }
            }
        })
        .collect();

    let mut summary = RectifySummary::default();
    for outcome in outcomes {
        match outcome {
            Some(RectifyOutcome::Written(_)) => summary.written += 1,
            Some(RectifyOutcome::Skipped { .. }) => summary.skipped += 1,
            None => summary.failed += 1,
        }
    }
    log::info!(
        "{} rasters written, {} skipped, {} failed",
        summary.written,
        summary.skipped,
        summary.failed
    );
    Ok(summary)
}
