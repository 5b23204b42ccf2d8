mod error;
pub mod geodesy;
mod location;
mod playback;
mod route;
mod settings;
mod simulator;
#[cfg(test)]
mod tests;

use chrono::{DateTime, Utc};

pub use error::{PlaybackError, PlaybackResult};
pub use geodesy::GeoPoint;
pub use location::{FIX_ALTITUDE, FIX_SPEED, Fix};
pub use playback::{PlaybackEngine, PlaybackPhase, PlaybackState};
pub use route::{Route, Segment, Waypoint};
pub use settings::{AdvanceMode, CourseMode, ReplaySettings};
pub use simulator::{FixSender, PlaybackSummary, Simulator};

/// Convenience alias for UTC DT
pub type UtcDT = DateTime<Utc>;

pub mod prelude {
    use anyhow::Error as AnyhowError;
    use std::result::Result as StdResult;
    pub type Result<T = (), E = AnyhowError> = StdResult<T, E>;
    pub use anyhow::Context;
}
