use thiserror::Error;

/// Failures raised by the geodesy functions, the route store and the playback engine.
///
/// None of these are fatal, a failed tick leaves the engine exactly as it was so the next tick
/// can retry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlaybackError {
    /// A distance, bearing or coordinate was outside of its valid domain
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The engine was ticked without any waypoints loaded
    #[error("Route has no waypoints")]
    EmptyRoute,

    /// A waypoint was requested from an empty route
    #[error("Waypoint index {0} is out of range, the route is empty")]
    OutOfRange(usize),

    /// The segment leaving `index` has a zero duration, so progress along it is undefined
    #[error("Segment leaving waypoint {index} has a zero duration")]
    DegenerateSegment { index: usize },

    /// A geodesic solver failed to produce a solution
    #[error("Geodesic computation failed: {0}")]
    ComputationError(String),
}

pub type PlaybackResult<T> = std::result::Result<T, PlaybackError>;
