use nalgebra as na;

use super::geodesy::{corner_bearings, corner_ground_distance, direct};

/// Pixel to geographic correspondence. `x`/`y` are pixel column/row,
/// `longitude`/`latitude` are degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundControlPoint {
    pub pixel_x: f64,
    pub pixel_y: f64,
    pub longitude: f64,
    pub latitude: f64,
}

/// Corners of a nadir frame taken at (`latitude`, `longitude`), ordered
/// top-left, top-right, bottom-right, bottom-left.
pub fn corner_control_points(
    latitude: f64,
    longitude: f64,
    altitude_m: f64,
    yaw_deg: f64,
    diagonal_fov_deg: f64,
    width: u32,
    height: u32,
) -> [GroundControlPoint; 4] {
    let distance = corner_ground_distance(altitude_m, diagonal_fov_deg);
    let bearings = corner_bearings(yaw_deg, width, height);
    let (w, h) = (width as f64, height as f64);

    let gcp = |pixel_x: f64, pixel_y: f64, bearing: f64| {
        let (lat, lon) = direct(latitude, longitude, bearing, distance);
        GroundControlPoint {
            pixel_x,
            pixel_y,
            longitude: lon,
            latitude: lat,
        }
    };
    [
        gcp(0.0, 0.0, bearings.top_left),
        gcp(w, 0.0, bearings.top_right),
        gcp(w, h, bearings.bottom_right),
        gcp(0.0, h, bearings.bottom_left),
    ]
}

/// Affine pixel to geographic transform in GDAL order:
/// `lon = c[0] + x*c[1] + y*c[2]`, `lat = c[3] + x*c[4] + y*c[5]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform(pub [f64; 6]);

impl GeoTransform {
    /// Least-squares fit over the control points. Fails when the points are
    /// collinear or coincident.
    pub fn from_gcps(gcps: &[GroundControlPoint]) -> Result<GeoTransform, String> {
        if gcps.len() < 3 {
            return Err(format!("need at least 3 control points, got {}", gcps.len()));
        }
        let n = gcps.len();
        let a = na::DMatrix::from_fn(n, 3, |r, c| match c {
            0 => 1.0,
            1 => gcps[r].pixel_x,
            _ => gcps[r].pixel_y,
        });
        let lon = na::DVector::from_iterator(n, gcps.iter().map(|g| g.longitude));
        let lat = na::DVector::from_iterator(n, gcps.iter().map(|g| g.latitude));

        // the geographic side must span an area, otherwise the fit is singular
        // in the inverse direction
        let geo = na::DMatrix::from_fn(n, 3, |r, c| match c {
            0 => 1.0,
            1 => gcps[r].longitude,
            _ => gcps[r].latitude,
        });
        let rank_eps = 1e-12;
        if a.rank(rank_eps) < 3 || geo.rank(rank_eps) < 3 {
            return Err("control points are degenerate".to_string());
        }

        let svd = a.svd(true, true);
        let lon_coeff = svd.solve(&lon, rank_eps)?;
        let lat_coeff = svd.solve(&lat, rank_eps)?;
        Ok(GeoTransform([
            lon_coeff[0],
            lon_coeff[1],
            lon_coeff[2],
            lat_coeff[0],
            lat_coeff[1],
            lat_coeff[2],
        ]))
    }

    pub fn apply(&self, pixel_x: f64, pixel_y: f64) -> (f64, f64) {
        let c = &self.0;
        (
            c[0] + pixel_x * c[1] + pixel_y * c[2],
            c[3] + pixel_x * c[4] + pixel_y * c[5],
        )
    }

    /// 4x4 row-major matrix for the GeoTIFF ModelTransformationTag.
    pub fn model_transformation(&self) -> [f64; 16] {
        let c = &self.0;
        [
            c[1], c[2], 0.0, c[0], //
            c[4], c[5], 0.0, c[3], //
            0.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ]
    }
}
