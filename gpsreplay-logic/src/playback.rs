use chrono::TimeDelta;
use log::debug;

use crate::{
    UtcDT,
    error::{PlaybackError, PlaybackResult},
    geodesy::{GeoPoint, destination, geodesic_distance, initial_bearing, radians_to_degrees},
    location::Fix,
    route::{Route, Segment},
    settings::{AdvanceMode, CourseMode, ReplaySettings},
};

/// Where the engine is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    /// No tick has happened since the route was loaded
    Uninitialized,
    /// Travelling along the segment leaving the given waypoint
    Traveling(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    /// Waypoint the receiver last departed from
    pub current_index: usize,
    /// Wall-clock time travel along the current segment began
    pub segment_start: UtcDT,
    /// Position the receiver departed from on this segment, progress is measured from here
    pub anchor: GeoPoint,
    /// Most recently emitted fix
    pub last_fix: Option<Fix>,
}

impl PlaybackState {
    fn start(route: &Route, now: UtcDT) -> PlaybackResult<Self> {
        let first = route.get(0)?;
        Ok(Self {
            current_index: 0,
            segment_start: now,
            anchor: first.position,
            last_fix: None,
        })
    }

    fn advance(&mut self, segment: &Segment, segment_start: UtcDT) {
        debug!("Reached waypoint {} at {}", segment.next, segment.to.position);
        self.current_index = segment.next;
        self.segment_start = segment_start;
        self.anchor = segment.to.position;
    }
}

/// Seconds in a [TimeDelta] as a float, with microsecond resolution
fn as_seconds(delta: TimeDelta) -> f64 {
    delta
        .num_microseconds()
        .map(|us| us as f64 / 1_000_000.0)
        .unwrap_or_else(|| delta.num_milliseconds() as f64 / 1_000.0)
}

/// Replays a [Route], producing a [Fix] for any given moment in time.
///
/// The engine has no clock of its own, whoever drives it passes the current time into
/// [PlaybackEngine::tick]. Ticks must not overlap, see [crate::Simulator] for a driver that
/// guarantees this.
#[derive(Debug, Clone, Default)]
pub struct PlaybackEngine {
    route: Route,
    settings: ReplaySettings,
    state: Option<PlaybackState>,
}

impl PlaybackEngine {
    pub fn new(route: Route, settings: ReplaySettings) -> Self {
        Self {
            route,
            settings,
            state: None,
        }
    }

    /// Replace the route, playback restarts from the first waypoint on the next tick
    pub fn load(&mut self, route: Route) {
        debug!("Loaded route with {} waypoints", route.count());
        self.route = route;
        self.state = None;
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn settings(&self) -> &ReplaySettings {
        &self.settings
    }

    pub fn state(&self) -> Option<&PlaybackState> {
        self.state.as_ref()
    }

    pub fn phase(&self) -> PlaybackPhase {
        match &self.state {
            Some(state) => PlaybackPhase::Traveling(state.current_index),
            None => PlaybackPhase::Uninitialized,
        }
    }

    pub fn last_fix(&self) -> Option<&Fix> {
        self.state.as_ref().and_then(|s| s.last_fix.as_ref())
    }

    /// Compute the fix for `now`.
    ///
    /// Returns `Ok(None)` when the tick was spent crossing a waypoint. A failed tick keeps the
    /// state from before it, only the anchoring done by the very first tick is kept. Otherwise a
    /// zero length first segment would fail on every tick and never start.
    pub fn tick(&mut self, now: UtcDT) -> PlaybackResult<Option<Fix>> {
        if self.route.is_empty() {
            return Err(PlaybackError::EmptyRoute);
        }

        // Anchoring the first segment sticks even if the rest of this tick fails
        let mut state = match &self.state {
            Some(state) => state.clone(),
            None => {
                let state = PlaybackState::start(&self.route, now)?;
                self.state = Some(state.clone());
                state
            }
        };

        let fix = if self.route.count() == 1 {
            Some(Fix::new(state.anchor, 0.0, &self.settings, now))
        } else {
            match self.settings.advance {
                AdvanceMode::SingleBoundary => self.step_single(&mut state, now)?,
                AdvanceMode::CatchUp => Some(self.step_catch_up(&mut state, now)?),
            }
        };

        if fix.is_some() {
            state.last_fix = fix;
        }
        self.state = Some(state);

        Ok(fix)
    }

    fn step_single(&self, state: &mut PlaybackState, now: UtcDT) -> PlaybackResult<Option<Fix>> {
        let segment = self.route.segment(state.current_index)?;
        let elapsed = (now - state.segment_start).max(TimeDelta::zero());

        if elapsed > segment.duration {
            state.advance(&segment, now);
            Ok(None)
        } else {
            self.interpolate(state, &segment, elapsed, now).map(Some)
        }
    }

    fn step_catch_up(&self, state: &mut PlaybackState, now: UtcDT) -> PlaybackResult<Fix> {
        let cycle = self.route.cycle_duration();
        if cycle <= TimeDelta::zero() {
            return Err(PlaybackError::DegenerateSegment {
                index: state.current_index,
            });
        }

        let mut elapsed = (now - state.segment_start).max(TimeDelta::zero());

        // Skip whole laps, they end where they started
        if let (Some(elapsed_us), Some(cycle_us)) =
            (elapsed.num_microseconds(), cycle.num_microseconds())
        {
            let laps = elapsed_us / cycle_us;
            if laps > 0 {
                let skipped = TimeDelta::microseconds(laps * cycle_us);
                elapsed -= skipped;
                state.segment_start += skipped;
            }
        }

        let mut segment = self.route.segment(state.current_index)?;
        for _ in 0..=self.route.count() {
            if elapsed <= segment.duration {
                break;
            }
            let spent = segment.duration.max(TimeDelta::zero());
            elapsed -= spent;
            let start = state.segment_start + spent;
            state.advance(&segment, start);
            segment = self.route.segment(state.current_index)?;
        }

        self.interpolate(state, &segment, elapsed.min(segment.duration), now)
    }

    fn interpolate(
        &self,
        state: &PlaybackState,
        segment: &Segment,
        elapsed: TimeDelta,
        now: UtcDT,
    ) -> PlaybackResult<Fix> {
        let duration = as_seconds(segment.duration);
        if duration <= 0.0 {
            return Err(PlaybackError::DegenerateSegment {
                index: segment.index,
            });
        }

        let progress = as_seconds(elapsed) / duration;
        let total_distance = geodesic_distance(&segment.from.position, &segment.to.position)?;
        let bearing = initial_bearing(&state.anchor, &segment.to.position);
        let position = destination(&state.anchor, progress * total_distance, bearing)?;

        let course = match self.settings.course {
            CourseMode::TowardNextWaypoint => radians_to_degrees(bearing),
            CourseMode::LegacySelfBearing => {
                radians_to_degrees(initial_bearing(&state.anchor, &state.anchor))
            }
        };

        Ok(Fix::new(position, course, &self.settings, now))
    }
}
