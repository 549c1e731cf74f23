use std::fs::{self, File};
use std::path::Path;

use geoframes::error::FrameSyncError;
use geoframes::georect::geodesy::{corner_bearings, corner_ground_distance, direct, inverse};
use geoframes::georect::geotiff::tiff_datetime;
use geoframes::georect::{
    corner_control_points, is_nadir, rectify, rectify_batch, CapturePose, GeoTransform,
    GroundControlPoint, RectifyOutcome,
};
use geoframes::types::SyncedFrameRecord;
use image::{GrayImage, Luma, Rgb, RgbImage};
use tempfile::TempDir;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

fn pose(gimbal_pitch: f64) -> CapturePose {
    CapturePose {
        latitude: 46.5,
        longitude: 8.0,
        ground_level_altitude: 80.0,
        gimbal_pitch,
        gimbal_yaw: 30.0,
        datetime: "2023-06-01 12:00:05".to_string(),
    }
}

fn write_test_image(path: &Path) {
    let img = RgbImage::from_fn(40, 30, |x, y| Rgb([(x * 6) as u8, (y * 8) as u8, 90]));
    img.save(path).unwrap();
}

fn record(filename: &str, gimbal_pitch: f64) -> SyncedFrameRecord {
    SyncedFrameRecord {
        filename: filename.to_string(),
        video_filename: "DJI_0001.MP4".to_string(),
        time: 0,
        datetime: "2023-06-01 12:00:05".to_string(),
        latitude: 46.5,
        longitude: 8.0,
        ground_level_altitude: 80.0,
        sea_level_altitude: 500.0,
        gimbal_pitch,
        gimbal_roll: 0.0,
        gimbal_yaw: 0.0,
    }
}

#[test]
fn test_nadir_window_boundaries() {
    for pitch in [-89.0, -90.0, -91.0, -89.001, -90.999] {
        assert!(is_nadir(pitch), "{} should be nadir", pitch);
    }
    for pitch in [-91.001, -88.999, -80.0, 0.0, 90.0] {
        assert!(!is_nadir(pitch), "{} should not be nadir", pitch);
    }
}

#[test]
fn test_direct_inverse_agree() {
    let (lat, lon) = direct(46.5, 8.0, 37.0, 250.0);
    let (distance, azimuth) = inverse(46.5, 8.0, lat, lon);
    assert!((distance - 250.0).abs() < 1e-6);
    assert!((azimuth - 37.0).abs() < 1e-6);
}

#[test]
fn test_corner_distance() {
    // 90 degree diagonal field of view: the corner is as far as the camera is high
    assert!((corner_ground_distance(100.0, 90.0) - 100.0).abs() < 1e-9);
    assert_eq!(corner_ground_distance(0.0, 84.0), 0.0);
}

#[test]
fn test_corner_bearings_follow_yaw() {
    let b = corner_bearings(0.0, 4, 3);
    let theta = (4.0f64 / 3.0).atan().to_degrees();
    assert!((b.top_right - theta).abs() < 1e-9);
    assert!((b.top_left + theta).abs() < 1e-9);
    assert!((b.bottom_right - (180.0 - theta)).abs() < 1e-9);
    assert!((b.bottom_left - (180.0 + theta)).abs() < 1e-9);

    let rotated = corner_bearings(90.0, 4, 3);
    assert!((rotated.top_right - (90.0 + theta)).abs() < 1e-9);
}

#[test]
fn test_corner_control_points_order() {
    let (lat, lon) = (46.5, 8.0);
    let gcps = corner_control_points(lat, lon, 100.0, 0.0, 84.0, 4000, 3000);

    let pixels: Vec<(f64, f64)> = gcps.iter().map(|g| (g.pixel_x, g.pixel_y)).collect();
    assert_eq!(
        pixels,
        vec![(0.0, 0.0), (4000.0, 0.0), (4000.0, 3000.0), (0.0, 3000.0)]
    );

    // north-up: top corners north of the camera, left corners west of it
    let [tl, tr, br, bl] = gcps;
    assert!(tl.latitude > lat && tl.longitude < lon);
    assert!(tr.latitude > lat && tr.longitude > lon);
    assert!(br.latitude < lat && br.longitude > lon);
    assert!(bl.latitude < lat && bl.longitude < lon);

    let expected = corner_ground_distance(100.0, 84.0);
    for g in &gcps {
        let (distance, _) = inverse(lat, lon, g.latitude, g.longitude);
        assert!((distance - expected).abs() < 1e-6);
    }
}

#[test]
fn test_geotransform_recovers_affine() {
    let truth = [8.0, 1e-6, 2e-7, 46.5, -3e-7, -1e-6];
    let gcps: Vec<GroundControlPoint> = [(0.0, 0.0), (640.0, 0.0), (640.0, 480.0), (0.0, 480.0)]
        .iter()
        .map(|&(x, y)| GroundControlPoint {
            pixel_x: x,
            pixel_y: y,
            longitude: truth[0] + x * truth[1] + y * truth[2],
            latitude: truth[3] + x * truth[4] + y * truth[5],
        })
        .collect();

    let transform = GeoTransform::from_gcps(&gcps).unwrap();
    for (fitted, expected) in transform.0.iter().zip(truth.iter()) {
        assert!((fitted - expected).abs() < 1e-10);
    }
    let (lon, lat) = transform.apply(320.0, 240.0);
    assert!((lon - (8.0 + 320.0 * 1e-6 + 240.0 * 2e-7)).abs() < 1e-10);
    assert!((lat - (46.5 - 320.0 * 3e-7 - 240.0 * 1e-6)).abs() < 1e-10);

    let m = transform.model_transformation();
    assert_eq!(m[3], transform.0[0]);
    assert_eq!(m[7], transform.0[3]);
    assert_eq!(m[15], 1.0);
}

#[test]
fn test_geotransform_fits_corner_points() {
    let gcps = corner_control_points(46.5, 8.0, 80.0, 30.0, 84.0, 4000, 3000);
    let transform = GeoTransform::from_gcps(&gcps).unwrap();
    for g in &gcps {
        let (lon, lat) = transform.apply(g.pixel_x, g.pixel_y);
        assert!((lon - g.longitude).abs() < 1e-7);
        assert!((lat - g.latitude).abs() < 1e-7);
    }
}

#[test]
fn test_degenerate_control_points() {
    let gcps = corner_control_points(46.5, 8.0, 0.0, 0.0, 84.0, 4000, 3000);
    assert!(GeoTransform::from_gcps(&gcps).is_err());
    assert!(GeoTransform::from_gcps(&gcps[..2]).is_err());
}

#[test]
fn test_tiff_datetime() {
    assert_eq!(
        tiff_datetime("2023-06-01 12:00:05").as_deref(),
        Some("2023:06:01 12:00:05")
    );
    assert_eq!(
        tiff_datetime("2023-06-01T12:00:05Z").as_deref(),
        Some("2023:06:01 12:00:05")
    );
    assert_eq!(tiff_datetime("yesterday"), None);
}

#[test]
fn test_rectify_writes_georeferenced_tiff() {
    let dir = TempDir::new().unwrap();
    let image_path = dir.path().join("0000000.jpg");
    write_test_image(&image_path);
    let out_dir = dir.path().join("tiles");

    let outcome = rectify(&image_path, &out_dir, 84.0, &pose(-90.0)).unwrap();
    let RectifyOutcome::Written(tif) = outcome else {
        panic!("nadir frame was skipped");
    };
    assert_eq!(tif, out_dir.join("0000000.tif"));

    let mut decoder = Decoder::new(File::open(&tif).unwrap()).unwrap();
    assert_eq!(decoder.dimensions().unwrap(), (40, 30));
    assert_eq!(decoder.colortype().unwrap(), tiff::ColorType::RGBA(8));
    let matrix = decoder.get_tag_f64_vec(Tag::Unknown(34264)).unwrap();
    assert_eq!(matrix.len(), 16);
    // origin is the top-left corner, north-west of the camera
    assert!(matrix[3] < 8.0);
    assert!(matrix[7] > 46.5);
    let geokeys = decoder.get_tag_u16_vec(Tag::Unknown(34735)).unwrap();
    assert_eq!(geokeys.last(), Some(&4326));
    assert_eq!(
        decoder.get_tag_ascii_string(Tag::DateTime).unwrap(),
        "2023:06:01 12:00:05"
    );
}

#[test]
fn test_rectify_skips_oblique_frames() {
    let dir = TempDir::new().unwrap();
    let image_path = dir.path().join("0000000.jpg");
    write_test_image(&image_path);
    let out_dir = dir.path().join("tiles");

    for pitch in [-80.0, -91.001] {
        let outcome = rectify(&image_path, &out_dir, 84.0, &pose(pitch)).unwrap();
        assert_eq!(outcome, RectifyOutcome::Skipped { gimbal_pitch: pitch });
    }
    assert!(!out_dir.join("0000000.tif").exists());
}

#[test]
fn test_rectify_zero_altitude_fails() {
    let dir = TempDir::new().unwrap();
    let image_path = dir.path().join("0000000.jpg");
    write_test_image(&image_path);

    let grounded = CapturePose {
        ground_level_altitude: 0.0,
        ..pose(-90.0)
    };
    let err = rectify(&image_path, dir.path(), 84.0, &grounded).unwrap_err();
    assert!(matches!(err, FrameSyncError::Georeference { .. }));
}

#[test]
fn test_rectify_batch_counts_outcomes() {
    let dir = TempDir::new().unwrap();
    write_test_image(&dir.path().join("0000000.jpg"));
    write_test_image(&dir.path().join("0000001.jpg"));
    let out_dir = dir.path().join("tiles");

    let records = vec![
        record("0000000.jpg", -90.0),
        record("0000001.jpg", -30.0),
        record("0000002.jpg", -90.0),
    ];
    let summary = rectify_batch(&records, &out_dir, 84.0, Some(dir.path())).unwrap();
    assert_eq!(summary.written, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 1);
    assert!(out_dir.join("0000000.tif").exists());
}

#[test]
fn test_gray_frame_keeps_single_band() {
    let dir = TempDir::new().unwrap();
    let image_path = dir.path().join("0000000.png");
    GrayImage::from_fn(40, 30, |x, y| Luma([(x + y) as u8]))
        .save(&image_path)
        .unwrap();

    let outcome = rectify(&image_path, dir.path(), 84.0, &pose(-90.0)).unwrap();
    let RectifyOutcome::Written(tif) = outcome else {
        panic!("nadir frame was skipped");
    };

    let mut decoder = Decoder::new(File::open(&tif).unwrap()).unwrap();
    assert_eq!(decoder.colortype().unwrap(), tiff::ColorType::GrayA(8));
    let DecodingResult::U8(samples) = decoder.read_image().unwrap() else {
        panic!("expected 8-bit samples");
    };
    assert_eq!(samples.len(), 40 * 30 * 2);
    // gray value then opaque alpha
    assert_eq!(&samples[..4], &[0, 255, 1, 255]);
    assert!(samples.chunks_exact(2).all(|p| p[1] == 255));
}

#[test]
fn test_batch_refuses_colliding_outputs() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("a")).unwrap();
    fs::create_dir_all(dir.path().join("b")).unwrap();
    write_test_image(&dir.path().join("a/0000000.jpg"));
    write_test_image(&dir.path().join("b/0000000.jpg"));
    let out_dir = dir.path().join("tiles");

    let records = vec![
        record("a/0000000.jpg", -90.0),
        record("b/0000000.jpg", -90.0),
    ];
    let summary = rectify_batch(&records, &out_dir, 84.0, Some(dir.path())).unwrap();
    assert_eq!(summary.written, 1);
    assert_eq!(summary.failed, 1);
    assert!(out_dir.join("0000000.tif").exists());
}
