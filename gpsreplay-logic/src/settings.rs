use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PlaybackError, PlaybackResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
/// What to report as the course of an emitted fix
pub enum CourseMode {
    /// Bearing from the segment's departure point towards the next waypoint
    #[default]
    TowardNextWaypoint,
    /// Bearing from the departure point to itself, which is always 0 degrees. Kept for
    /// consumers that were tuned against recordings made this way.
    LegacySelfBearing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
/// How the engine behaves once the simulated receiver runs past the next waypoint
pub enum AdvanceMode {
    /// Cross one waypoint per tick, restart the segment clock and emit nothing for that tick
    #[default]
    SingleBoundary,
    /// Cross as many waypoints as the elapsed time covers, carrying the overshoot into the
    /// segment reached, and emit a fix on every tick
    CatchUp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Settings for a replay
pub struct ReplaySettings {
    /// Milliseconds between two ticks of the update loop
    pub tick_interval_ms: u64,
    /// Horizontal accuracy reported on every fix, in meters
    pub horizontal_accuracy: f64,
    /// Vertical accuracy reported on every fix, in meters
    pub vertical_accuracy: f64,
    pub course: CourseMode,
    pub advance: AdvanceMode,
}

impl ReplaySettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn validate(&self) -> PlaybackResult<()> {
        if self.tick_interval_ms == 0 {
            return Err(PlaybackError::InvalidArgument(
                "Tick interval must be at least 1 ms".to_string(),
            ));
        }

        for (name, value) in [
            ("Horizontal accuracy", self.horizontal_accuracy),
            ("Vertical accuracy", self.vertical_accuracy),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PlaybackError::InvalidArgument(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }

        Ok(())
    }
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            horizontal_accuracy: 50.0,
            vertical_accuracy: 50.0,
            course: CourseMode::default(),
            advance: AdvanceMode::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ReplaySettings::default();
        assert_eq!(settings.tick_interval(), Duration::from_millis(100));
        assert_eq!(settings.horizontal_accuracy, 50.0);
        assert_eq!(settings.vertical_accuracy, 50.0);
        assert_eq!(settings.course, CourseMode::TowardNextWaypoint);
        assert_eq!(settings.advance, AdvanceMode::SingleBoundary);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings: ReplaySettings =
            serde_json::from_str(r#"{ "tick_interval_ms": 250, "advance": "CatchUp" }"#)
                .expect("Failed to parse settings");

        assert_eq!(settings.tick_interval_ms, 250);
        assert_eq!(settings.advance, AdvanceMode::CatchUp);
        assert_eq!(settings.horizontal_accuracy, 50.0);
        assert_eq!(settings.course, CourseMode::TowardNextWaypoint);
    }

    #[test]
    fn test_validation() {
        let settings = ReplaySettings {
            tick_interval_ms: 0,
            ..Default::default()
        };
        assert!(settings.validate().is_err(), "Zero interval accepted");

        let settings = ReplaySettings {
            vertical_accuracy: -1.0,
            ..Default::default()
        };
        assert!(settings.validate().is_err(), "Negative accuracy accepted");

        let settings = ReplaySettings {
            horizontal_accuracy: f64::INFINITY,
            ..Default::default()
        };
        assert!(settings.validate().is_err(), "Infinite accuracy accepted");
    }
}
