//! Loads GPX recordings into a [gpsreplay_logic::Route].

mod error;
mod parser;

pub use error::{GpxError, GpxResult};
pub use parser::{POINT_ELEMENTS, TIME_FORMAT, load_route, parse_route, parse_time};
