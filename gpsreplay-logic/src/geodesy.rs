use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{PlaybackError, PlaybackResult};

/// Semi-major axis of the WGS84 ellipsoid in meters
pub const WGS84_A: f64 = 6_378_137.0;
/// Semi-minor axis of the WGS84 ellipsoid in meters
pub const WGS84_B: f64 = 6_356_752.3142;
/// Flattening of the WGS84 ellipsoid
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// Difference between two iterations (in radians) at which the Vincenty solvers stop
pub const CONVERGENCE_THRESHOLD: f64 = 1e-12;
/// Upper bound on Vincenty iterations before giving up
pub const MAX_ITERATIONS: usize = 1000;

/// Longest distance [destination] will travel, half of the equator
pub const MAX_DIRECT_DISTANCE: f64 = PI * WGS84_A;

const FULL_TURN: f64 = 2.0 * PI;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// A point on the ellipsoid, both components in degrees
pub struct GeoPoint {
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lon: f64,
}

impl GeoPoint {
    /// Create a point, rejecting coordinates that are not finite or out of range
    pub fn new(lat: f64, lon: f64) -> PlaybackResult<Self> {
        let point = Self { lat, lon };
        point.validate()?;
        Ok(point)
    }

    pub fn validate(&self) -> PlaybackResult<()> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            Err(PlaybackError::InvalidArgument(format!(
                "Latitude {} is outside of [-90, 90]",
                self.lat
            )))
        } else if !self.lon.is_finite() || !(-180.0..=180.0).contains(&self.lon) {
            Err(PlaybackError::InvalidArgument(format!(
                "Longitude {} is outside of [-180, 180]",
                self.lon
            )))
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

pub fn degrees_to_radians(degrees: f64) -> f64 {
    degrees.to_radians()
}

pub fn radians_to_degrees(radians: f64) -> f64 {
    radians.to_degrees()
}

/// Wrap a longitude in degrees into [-180, 180)
fn normalize_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Wrap an angle in radians into [-PI, PI)
fn normalize_angle(angle: f64) -> f64 {
    (angle + PI).rem_euclid(FULL_TURN) - PI
}

/// Initial bearing in radians from `from` towards `to`, on a sphere.
///
/// A full turn is added to the raw `atan2` result and taken away again only when the sum is
/// strictly greater than a full turn, so a bearing of due north comes back as `2 * PI` rather
/// than `0`. Callers comparing bearings should compare them modulo a full turn.
pub fn initial_bearing(from: &GeoPoint, to: &GeoPoint) -> f64 {
    let lat1 = degrees_to_radians(from.lat);
    let lon1 = degrees_to_radians(from.lon);
    let lat2 = degrees_to_radians(to.lat);
    let lon2 = degrees_to_radians(to.lon);

    let d_lon = lon2 - lon1;
    let y = d_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();

    let bearing = y.atan2(x) + FULL_TURN;
    if bearing > FULL_TURN {
        bearing - FULL_TURN
    } else {
        bearing
    }
}

/// Series coefficients `A` and `B` of the Vincenty formulae for a given `u²`
fn series_coefficients(u_sq: f64) -> (f64, f64) {
    let a = 1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
    let b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
    (a, b)
}

fn delta_sigma(b: f64, sin_sigma: f64, cos_sigma: f64, cos_2_sigma_m: f64) -> f64 {
    let cos_sq_2_sigma_m = cos_2_sigma_m * cos_2_sigma_m;
    b * sin_sigma
        * (cos_2_sigma_m
            + b / 4.0
                * (cos_sigma * (-1.0 + 2.0 * cos_sq_2_sigma_m)
                    - b / 6.0
                        * cos_2_sigma_m
                        * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                        * (-3.0 + 4.0 * cos_sq_2_sigma_m)))
}

/// Reduced latitude of a geodetic latitude (radians), as `(tan U, sin U, cos U)`
fn reduced_latitude(lat: f64) -> (f64, f64, f64) {
    let tan_u = (1.0 - WGS84_F) * lat.tan();
    let cos_u = 1.0 / (1.0 + tan_u * tan_u).sqrt();
    let sin_u = tan_u * cos_u;
    (tan_u, sin_u, cos_u)
}

/// Point reached by travelling `distance` meters from `from` with an initial bearing of
/// `bearing` radians, solving Vincenty's direct problem on the WGS84 ellipsoid.
pub fn destination(from: &GeoPoint, distance: f64, bearing: f64) -> PlaybackResult<GeoPoint> {
    from.validate()?;
    if !distance.is_finite() || distance < 0.0 {
        return Err(PlaybackError::InvalidArgument(format!(
            "Distance must be a non-negative number of meters, got {distance}"
        )));
    }
    if !bearing.is_finite() {
        return Err(PlaybackError::InvalidArgument(format!(
            "Bearing must be finite, got {bearing}"
        )));
    }
    if distance == 0.0 {
        return Ok(*from);
    }
    if distance > MAX_DIRECT_DISTANCE {
        return Err(PlaybackError::ComputationError(format!(
            "Distance of {distance} m is longer than half the ellipsoid circumference"
        )));
    }

    let lat1 = degrees_to_radians(from.lat);
    let lon1 = degrees_to_radians(from.lon);

    let sin_alpha1 = bearing.sin();
    let cos_alpha1 = bearing.cos();

    let (tan_u1, sin_u1, cos_u1) = reduced_latitude(lat1);
    let sigma1 = tan_u1.atan2(cos_alpha1);
    let sin_alpha = cos_u1 * sin_alpha1;
    let cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
    let u_sq = cos_sq_alpha * (WGS84_A * WGS84_A - WGS84_B * WGS84_B) / (WGS84_B * WGS84_B);
    let (big_a, big_b) = series_coefficients(u_sq);

    let first_sigma = distance / (WGS84_B * big_a);
    let mut sigma = first_sigma;
    let mut sigma_prev = FULL_TURN;
    let mut cos_2_sigma_m = (2.0 * sigma1 + sigma).cos();
    let mut sin_sigma = sigma.sin();
    let mut cos_sigma = sigma.cos();
    let mut iterations = 0;

    while (sigma - sigma_prev).abs() > CONVERGENCE_THRESHOLD {
        if iterations >= MAX_ITERATIONS {
            return Err(PlaybackError::ComputationError(format!(
                "Direct solution from {from} did not converge after {MAX_ITERATIONS} iterations"
            )));
        }
        iterations += 1;

        cos_2_sigma_m = (2.0 * sigma1 + sigma).cos();
        sin_sigma = sigma.sin();
        cos_sigma = sigma.cos();
        sigma_prev = sigma;
        sigma = first_sigma + delta_sigma(big_b, sin_sigma, cos_sigma, cos_2_sigma_m);
    }

    let tmp = sin_u1 * sin_sigma - cos_u1 * cos_sigma * cos_alpha1;
    let lat2 = (sin_u1 * cos_sigma + cos_u1 * sin_sigma * cos_alpha1)
        .atan2((1.0 - WGS84_F) * (sin_alpha * sin_alpha + tmp * tmp).sqrt());
    let lambda =
        (sin_sigma * sin_alpha1).atan2(cos_u1 * cos_sigma - sin_u1 * sin_sigma * cos_alpha1);
    let c = WGS84_F / 16.0 * cos_sq_alpha * (4.0 + WGS84_F * (4.0 - 3.0 * cos_sq_alpha));
    let l = lambda
        - (1.0 - c)
            * WGS84_F
            * sin_alpha
            * (sigma
                + c * sin_sigma
                    * (cos_2_sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos_2_sigma_m * cos_2_sigma_m)));

    Ok(GeoPoint {
        lat: radians_to_degrees(lat2),
        lon: normalize_longitude(radians_to_degrees(lon1 + l)),
    })
}

/// Point reached by travelling `distance` meters from `from` along the initial bearing towards
/// `towards`.
pub fn destination_towards(
    from: &GeoPoint,
    distance: f64,
    towards: &GeoPoint,
) -> PlaybackResult<GeoPoint> {
    destination(from, distance, initial_bearing(from, towards))
}

/// Length in meters of the geodesic between two points, solving Vincenty's inverse problem on
/// the WGS84 ellipsoid.
///
/// Nearly antipodal points may not converge, those fail with
/// [PlaybackError::ComputationError].
pub fn geodesic_distance(from: &GeoPoint, to: &GeoPoint) -> PlaybackResult<f64> {
    from.validate()?;
    to.validate()?;

    let lat1 = degrees_to_radians(from.lat);
    let lat2 = degrees_to_radians(to.lat);
    let l = normalize_angle(degrees_to_radians(to.lon - from.lon));

    let (_, sin_u1, cos_u1) = reduced_latitude(lat1);
    let (_, sin_u2, cos_u2) = reduced_latitude(lat2);

    let mut lambda = l;
    let mut iterations = 0;

    let (sin_sigma, cos_sigma, sigma, cos_sq_alpha, cos_2_sigma_m) = loop {
        if iterations >= MAX_ITERATIONS {
            return Err(PlaybackError::ComputationError(format!(
                "Inverse solution between {from} and {to} did not converge after {MAX_ITERATIONS} iterations"
            )));
        }
        iterations += 1;

        let sin_lambda = lambda.sin();
        let cos_lambda = lambda.cos();
        let cross = cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda;
        let sin_sq_sigma = (cos_u2 * sin_lambda).powi(2) + cross * cross;

        if sin_sq_sigma == 0.0 {
            // Coincident
            return Ok(0.0);
        }

        let sin_sigma = sin_sq_sigma.sqrt();
        let cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
        let sigma = sin_sigma.atan2(cos_sigma);
        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        let cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
        // Equatorial lines have cos²α = 0
        let cos_2_sigma_m = if cos_sq_alpha != 0.0 {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
        } else {
            0.0
        };
        let c = WGS84_F / 16.0 * cos_sq_alpha * (4.0 + WGS84_F * (4.0 - 3.0 * cos_sq_alpha));

        let lambda_prev = lambda;
        lambda = l
            + (1.0 - c)
                * WGS84_F
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2_sigma_m
                            + c * cos_sigma * (-1.0 + 2.0 * cos_2_sigma_m * cos_2_sigma_m)));

        if lambda.abs() > PI {
            return Err(PlaybackError::ComputationError(format!(
                "Inverse solution between {from} and {to} diverged, points are nearly antipodal"
            )));
        }

        if (lambda - lambda_prev).abs() <= CONVERGENCE_THRESHOLD {
            break (sin_sigma, cos_sigma, sigma, cos_sq_alpha, cos_2_sigma_m);
        }
    };

    let u_sq = cos_sq_alpha * (WGS84_A * WGS84_A - WGS84_B * WGS84_B) / (WGS84_B * WGS84_B);
    let (big_a, big_b) = series_coefficients(u_sq);
    let d_sigma = delta_sigma(big_b, sin_sigma, cos_sigma, cos_2_sigma_m);

    Ok(WGS84_B * big_a * (sigma - d_sigma))
}
