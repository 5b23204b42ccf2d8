use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::{
    UtcDT,
    error::{PlaybackError, PlaybackResult},
    geodesy::GeoPoint,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// A recorded position and the time the receiver was there
pub struct Waypoint {
    pub position: GeoPoint,
    pub timestamp: UtcDT,
}

impl Waypoint {
    pub fn new(position: GeoPoint, timestamp: UtcDT) -> Self {
        Self {
            position,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
/// The leg between waypoint `index` and the one after it
pub struct Segment {
    pub index: usize,
    pub next: usize,
    pub from: Waypoint,
    pub to: Waypoint,
    /// Recorded travel time, negative when timestamps go backwards (i.e. the leg that closes the
    /// loop back to the first waypoint)
    pub duration: TimeDelta,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Ordered list of waypoints, indexing wraps around so the route loops forever
pub struct Route {
    waypoints: Vec<Waypoint>,
}

impl Route {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a waypoint, no ordering checks are done on the timestamp
    pub fn push(&mut self, waypoint: Waypoint) {
        self.waypoints.push(waypoint);
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn count(&self) -> usize {
        self.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints.iter()
    }

    /// Get the waypoint at `index`, wrapping around the end of the route
    pub fn get(&self, index: usize) -> PlaybackResult<&Waypoint> {
        if self.is_empty() {
            Err(PlaybackError::OutOfRange(index))
        } else {
            Ok(&self.waypoints[index % self.len()])
        }
    }

    /// Get the waypoint `offset` places away from `index`, wrapping in both directions
    pub fn get_offset(&self, index: usize, offset: isize) -> PlaybackResult<&Waypoint> {
        if self.is_empty() {
            return Err(PlaybackError::OutOfRange(index));
        }
        let len = self.len() as isize;
        let base = (index % self.len()) as isize;
        let wrapped = (base + offset).rem_euclid(len) as usize;
        Ok(&self.waypoints[wrapped])
    }

    pub fn segment(&self, index: usize) -> PlaybackResult<Segment> {
        let index = index % self.len().max(1);
        let from = *self.get(index)?;
        let next = (index + 1) % self.len();
        let to = *self.get(next)?;

        Ok(Segment {
            index,
            next,
            from,
            to,
            duration: to.timestamp - from.timestamp,
        })
    }

    /// Every segment of one lap, including the one closing the loop
    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        (0..self.len()).filter_map(|i| self.segment(i).ok())
    }

    /// Time spent travelling one full lap, segments with a non-positive duration count as zero
    pub fn cycle_duration(&self) -> TimeDelta {
        self.segments()
            .map(|s| s.duration.max(TimeDelta::zero()))
            .fold(TimeDelta::zero(), |acc, d| acc + d)
    }
}

impl FromIterator<Waypoint> for Route {
    fn from_iter<I: IntoIterator<Item = Waypoint>>(iter: I) -> Self {
        Self {
            waypoints: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<Waypoint>> for Route {
    fn from(waypoints: Vec<Waypoint>) -> Self {
        Self { waypoints }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::mk_route;

    #[test]
    fn test_cyclic_indexing() {
        let route = mk_route(&[(0.0, 0.0, 0), (1.0, 1.0, 10), (2.0, 2.0, 20)]);

        assert_eq!(route.count(), 3);
        assert_eq!(route.get(3).unwrap(), route.get(0).unwrap());
        assert_eq!(route.get(7).unwrap(), route.get(1).unwrap());
        assert_eq!(
            route.get_offset(0, -1).unwrap(),
            route.get(2).unwrap(),
            "-1 should wrap to the last waypoint"
        );
        assert_eq!(route.get_offset(2, 1).unwrap(), route.get(0).unwrap());
        assert_eq!(route.get_offset(1, -7).unwrap(), route.get(0).unwrap());
    }

    #[test]
    fn test_empty_route() {
        let route = Route::new();
        assert_eq!(route.count(), 0);
        assert_eq!(route.get(0), Err(PlaybackError::OutOfRange(0)));
        assert!(route.get_offset(0, -1).is_err());
        assert!(route.segment(0).is_err());
        assert_eq!(route.segments().count(), 0);
        assert_eq!(route.cycle_duration(), TimeDelta::zero());
    }

    #[test]
    fn test_push_keeps_order() {
        let mut route = Route::new();
        let source = mk_route(&[(5.0, 5.0, 50), (1.0, 1.0, 10)]);
        for wp in source.iter() {
            route.push(*wp);
        }

        assert_eq!(route, source, "Push should keep insertion order");
        assert_eq!(route.get(0).unwrap().position.lat, 5.0);
    }

    #[test]
    fn test_segments_wrap() {
        let route = mk_route(&[(0.0, 0.0, 0), (0.0, 1.0, 100), (0.0, 2.0, 250)]);

        let segments = route.segments().collect::<Vec<_>>();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[1].duration, TimeDelta::seconds(150));
        assert_eq!(segments[2].next, 0, "Last segment loops to the start");
        assert_eq!(segments[2].duration, TimeDelta::seconds(-250));

        assert_eq!(route.cycle_duration(), TimeDelta::seconds(250));
    }
}
