use gpsreplay_logic::PlaybackError;
use thiserror::Error;

/// Errors that fail a route load
#[derive(Debug, Error)]
pub enum GpxError {
    /// The file could not be read
    #[error("Failed to read route file: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not well-formed XML
    #[error("Failed to parse GPX document: {0}")]
    Xml(#[from] roxmltree::Error),

    /// The root element isn't `<gpx>`
    #[error("Not a GPX document, root element is <{0}>")]
    NotGpx(String),

    /// A point element lacks a required attribute
    #[error("<{element}> number {index} has no `{attribute}` attribute")]
    MissingAttribute {
        element: String,
        index: usize,
        attribute: &'static str,
    },

    /// An attribute is not a number
    #[error("<{element}> number {index} has a non-numeric `{attribute}`: {value:?}")]
    InvalidNumber {
        element: String,
        index: usize,
        attribute: &'static str,
        value: String,
    },

    /// A point element has no `<time>` child
    #[error("<{element}> number {index} has no <time>")]
    MissingTime { element: String, index: usize },

    /// The `<time>` text isn't a timestamp we understand
    #[error("<{element}> number {index} has an unparsable time: {value:?}")]
    InvalidTime {
        element: String,
        index: usize,
        value: String,
    },

    /// Coordinates out of range
    #[error("<{element}> number {index} is not a valid position: {source}")]
    InvalidCoordinate {
        element: String,
        index: usize,
        source: PlaybackError,
    },

    /// The document has no points at all
    #[error("GPX document contains no waypoints")]
    NoWaypoints,
}

pub type GpxResult<T> = std::result::Result<T, GpxError>;
