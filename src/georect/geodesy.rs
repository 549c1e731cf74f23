use std::f64::consts::FRAC_PI_2;
use std::sync::LazyLock;

use geographiclib_rs::{DirectGeodesic, Geodesic, InverseGeodesic};

/// WGS84 ellipsoid, read-only for the whole process.
pub static WGS84: LazyLock<Geodesic> = LazyLock::new(Geodesic::wgs84);

/// Destination `(latitude, longitude)` after travelling `distance_m` from the
/// origin along `azimuth_deg` (clockwise from north).
pub fn direct(latitude: f64, longitude: f64, azimuth_deg: f64, distance_m: f64) -> (f64, f64) {
    WGS84.direct(latitude, longitude, azimuth_deg, distance_m)
}

/// `(distance_m, azimuth_deg)` from the first point to the second.
pub fn inverse(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> (f64, f64) {
    let (s12, azi1, _azi2, _a12): (f64, f64, f64, f64) = WGS84.inverse(lat1, lon1, lat2, lon2);
    (s12, azi1)
}

/// Ground distance from the image center to an image corner for a nadir
/// camera at `altitude_m` over flat ground.
pub fn corner_ground_distance(altitude_m: f64, diagonal_fov_deg: f64) -> f64 {
    let half_fov = (diagonal_fov_deg / 2.0).to_radians();
    altitude_m * half_fov.sin() / (FRAC_PI_2 - half_fov).sin()
}

/// Azimuths, in degrees, from the image center to each corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CornerBearings {
    pub top_left: f64,
    pub top_right: f64,
    pub bottom_right: f64,
    pub bottom_left: f64,
}

/// The top edge of the image faces `yaw_deg`.
pub fn corner_bearings(yaw_deg: f64, width: u32, height: u32) -> CornerBearings {
    let yaw = yaw_deg.to_radians();
    let theta = (width as f64 / height as f64).atan();
    CornerBearings {
        top_right: (yaw + theta).to_degrees(),
        top_left: (yaw - theta).to_degrees(),
        bottom_right: (yaw + std::f64::consts::PI - theta).to_degrees(),
        bottom_left: (yaw + std::f64::consts::PI + theta).to_degrees(),
    }
}
