use std::sync::{Arc, Mutex};

use chrono::{TimeDelta, TimeZone, Utc};

use crate::{
    FixSender, UtcDT,
    geodesy::GeoPoint,
    location::Fix,
    route::{Route, Waypoint},
};

/// Fixed starting time shared by tests
pub fn t0() -> UtcDT {
    Utc.with_ymd_and_hms(2015, 9, 15, 12, 0, 0)
        .single()
        .expect("Invalid test time")
}

pub fn secs(s: i64) -> TimeDelta {
    TimeDelta::seconds(s)
}

/// Build a route from `(lat, lon, seconds after t0)` triples
pub fn mk_route(points: &[(f64, f64, i64)]) -> Route {
    points
        .iter()
        .map(|&(lat, lon, offset)| {
            let position = GeoPoint::new(lat, lon).expect("Test waypoint out of range");
            Waypoint::new(position, t0() + secs(offset))
        })
        .collect()
}

#[derive(Clone, Default)]
pub struct CollectingSender {
    fixes: Arc<Mutex<Vec<Fix>>>,
}

impl CollectingSender {
    pub fn fixes(&self) -> Vec<Fix> {
        self.fixes.lock().expect("Sender lock poisoned").clone()
    }
}

impl FixSender for CollectingSender {
    fn send_fix(&self, fix: Fix) {
        self.fixes.lock().expect("Sender lock poisoned").push(fix);
    }
}
