use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use gpsreplay_logic::{GeoPoint, Route, UtcDT, Waypoint};
use log::debug;
use roxmltree::Node;

use crate::error::{GpxError, GpxResult};

/// Elements treated as route points, in any mix and in document order
pub const POINT_ELEMENTS: [&str; 3] = ["wpt", "rtept", "trkpt"];

/// Format of `<time>` written by most recorders, always UTC
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Parse a GPX timestamp, RFC 3339 with fractional seconds or an offset is accepted too
pub fn parse_time(raw: &str) -> Option<UtcDT> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc)))
        .ok()
}

fn coordinate(node: &Node, index: usize, attribute: &'static str) -> GpxResult<f64> {
    let element = node.tag_name().name();
    let raw = node
        .attribute(attribute)
        .ok_or_else(|| GpxError::MissingAttribute {
            element: element.to_string(),
            index,
            attribute,
        })?;

    raw.trim().parse::<f64>().map_err(|_| GpxError::InvalidNumber {
        element: element.to_string(),
        index,
        attribute,
        value: raw.to_string(),
    })
}

fn waypoint(node: &Node, index: usize) -> GpxResult<Waypoint> {
    let element = node.tag_name().name().to_string();

    let lat = coordinate(node, index, "lat")?;
    let lon = coordinate(node, index, "lon")?;
    let position = GeoPoint::new(lat, lon).map_err(|source| GpxError::InvalidCoordinate {
        element: element.clone(),
        index,
        source,
    })?;

    let raw_time = node
        .children()
        .find(|c| c.is_element() && c.tag_name().name() == "time")
        .map(|c| c.text().unwrap_or_default())
        .ok_or_else(|| GpxError::MissingTime {
            element: element.clone(),
            index,
        })?;

    let timestamp = parse_time(raw_time).ok_or_else(|| GpxError::InvalidTime {
        element,
        index,
        value: raw_time.to_string(),
    })?;

    Ok(Waypoint::new(position, timestamp))
}

/// Parse a GPX document into a [Route].
///
/// Every point element must have `lat`, `lon` and a `<time>`, the first one that doesn't fails
/// the whole load. Points are numbered from 1 in error messages.
pub fn parse_route(content: &str) -> GpxResult<Route> {
    let doc = roxmltree::Document::parse(content)?;

    let root = doc.root_element();
    if root.tag_name().name() != "gpx" {
        return Err(GpxError::NotGpx(root.tag_name().name().to_string()));
    }

    let route = root
        .descendants()
        .filter(|n| n.is_element() && POINT_ELEMENTS.contains(&n.tag_name().name()))
        .enumerate()
        .map(|(i, node)| waypoint(&node, i + 1))
        .collect::<GpxResult<Route>>()?;

    if route.is_empty() {
        return Err(GpxError::NoWaypoints);
    }

    debug!("Parsed {} waypoints", route.count());

    Ok(route)
}

/// Read and parse a GPX file
pub fn load_route(path: impl AsRef<Path>) -> GpxResult<Route> {
    let content = std::fs::read_to_string(path.as_ref())?;
    parse_route(&content)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    const SAMPLE_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <metadata><time>2015-09-15T00:00:00Z</time></metadata>
  <wpt lat="37.331705" lon="-122.030237">
    <name>Start</name>
    <time>2015-09-15T12:00:00Z</time>
  </wpt>
  <wpt lat="37.332" lon="-122.031">
    <time>2015-09-15T12:00:30Z</time>
  </wpt>
  <wpt lat="37.333" lon="-122.032">
    <time>2015-09-15T12:01:00Z</time>
  </wpt>
</gpx>"#;

    fn expect_err(content: &str) -> GpxError {
        match parse_route(content) {
            Ok(route) => panic!("Expected an error, parsed {} waypoints", route.count()),
            Err(why) => why,
        }
    }

    #[test]
    fn test_parse_waypoints() {
        let route = parse_route(SAMPLE_GPX).expect("Failed to parse");

        assert_eq!(route.count(), 3);

        let first = route.get(0).unwrap();
        assert_eq!(first.position.lat, 37.331705);
        assert_eq!(first.position.lon, -122.030237);
        assert_eq!(
            first.timestamp,
            Utc.with_ymd_and_hms(2015, 9, 15, 12, 0, 0).unwrap()
        );

        let last = route.get(2).unwrap();
        assert_eq!(
            last.timestamp,
            Utc.with_ymd_and_hms(2015, 9, 15, 12, 1, 0).unwrap()
        );
    }

    #[test]
    fn test_track_points_in_document_order() {
        let gpx = r#"<gpx>
  <trk><trkseg>
    <trkpt lat="1" lon="1"><time>2020-01-01T00:00:10Z</time></trkpt>
    <trkpt lat="2" lon="2"><time>2020-01-01T00:00:20Z</time></trkpt>
  </trkseg></trk>
  <wpt lat="3" lon="3"><time>2020-01-01T00:00:30Z</time></wpt>
</gpx>"#;

        let route = parse_route(gpx).expect("Failed to parse");
        let lats = route.iter().map(|w| w.position.lat).collect::<Vec<_>>();
        assert_eq!(lats, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_time_formats() {
        let expected = Utc.with_ymd_and_hms(2015, 9, 15, 12, 0, 0).unwrap();
        assert_eq!(parse_time("2015-09-15T12:00:00Z"), Some(expected));
        assert_eq!(parse_time(" 2015-09-15T12:00:00Z\n"), Some(expected));
        assert_eq!(parse_time("2015-09-15T14:00:00+02:00"), Some(expected));
        assert!(parse_time("2015-09-15T12:00:00.250Z").is_some());
        assert_eq!(parse_time("15/09/2015 12:00"), None);
        assert_eq!(parse_time(""), None);
    }

    #[test]
    fn test_missing_attribute() {
        let err = expect_err(r#"<gpx><wpt lat="1"><time>2020-01-01T00:00:00Z</time></wpt></gpx>"#);
        assert!(
            matches!(
                err,
                GpxError::MissingAttribute {
                    attribute: "lon",
                    index: 1,
                    ..
                }
            ),
            "Got {err:?}"
        );
    }

    #[test]
    fn test_invalid_number() {
        let err = expect_err(
            r#"<gpx><wpt lat="north" lon="1"><time>2020-01-01T00:00:00Z</time></wpt></gpx>"#,
        );
        assert!(
            matches!(err, GpxError::InvalidNumber { attribute: "lat", .. }),
            "Got {err:?}"
        );
    }

    #[test]
    fn test_missing_and_invalid_time() {
        let err = expect_err(
            r#"<gpx>
  <wpt lat="1" lon="1"><time>2020-01-01T00:00:00Z</time></wpt>
  <wpt lat="1" lon="2"></wpt>
</gpx>"#,
        );
        assert!(
            matches!(err, GpxError::MissingTime { index: 2, .. }),
            "Got {err:?}"
        );

        let err = expect_err(r#"<gpx><wpt lat="1" lon="1"><time>yesterday</time></wpt></gpx>"#);
        assert!(
            matches!(err, GpxError::InvalidTime { ref value, .. } if value == "yesterday"),
            "Got {err:?}"
        );
    }

    #[test]
    fn test_out_of_range_coordinate() {
        let err = expect_err(
            r#"<gpx><wpt lat="91" lon="1"><time>2020-01-01T00:00:00Z</time></wpt></gpx>"#,
        );
        assert!(
            matches!(err, GpxError::InvalidCoordinate { .. }),
            "Got {err:?}"
        );
    }

    #[test]
    fn test_document_errors() {
        assert!(matches!(expect_err("<gpx><wpt"), GpxError::Xml(_)));
        assert!(matches!(
            expect_err("<kml></kml>"),
            GpxError::NotGpx(ref name) if name == "kml"
        ));
        assert!(matches!(
            expect_err("<gpx><metadata/></gpx>"),
            GpxError::NoWaypoints
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let res = load_route("/nonexistent/route.gpx");
        assert!(matches!(res, Err(GpxError::Io(_))));
    }
}
