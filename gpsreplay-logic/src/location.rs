use serde::{Deserialize, Serialize};

use crate::{UtcDT, geodesy::GeoPoint, settings::ReplaySettings};

/// Altitude reported on every fix, routes carry no elevation
pub const FIX_ALTITUDE: f64 = 0.0;
/// Speed reported on every fix
pub const FIX_SPEED: f64 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// A simulated position fix as handed to the consumer
pub struct Fix {
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lon: f64,
    pub altitude: f64,
    pub horizontal_accuracy: f64,
    pub vertical_accuracy: f64,
    /// Course over ground in degrees, 0 to 360 clockwise from north
    pub course: f64,
    pub speed: f64,
    pub timestamp: UtcDT,
}

impl Fix {
    pub fn new(position: GeoPoint, course: f64, settings: &ReplaySettings, now: UtcDT) -> Self {
        Self {
            lat: position.lat,
            lon: position.lon,
            altitude: FIX_ALTITUDE,
            horizontal_accuracy: settings.horizontal_accuracy,
            vertical_accuracy: settings.vertical_accuracy,
            course: course.rem_euclid(360.0),
            speed: FIX_SPEED,
            timestamp: now,
        }
    }

    pub fn position(&self) -> GeoPoint {
        GeoPoint {
            lat: self.lat,
            lon: self.lon,
        }
    }
}
