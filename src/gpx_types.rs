use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

pub const GPX_NAMESPACE_BASE: &str = "http://www.topografix.com/GPX/";
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// GPX namespace URI for a version string: "1.1" maps to
/// `http://www.topografix.com/GPX/1/1`.
pub fn namespace_uri(version: &str) -> String {
    format!("{GPX_NAMESPACE_BASE}{}", version.replace('.', "/"))
}

/// Timestamp as carried by the model. `None` means "no time", which is not
/// the same instant as the Unix epoch.
pub type Timestamp = Option<DateTime<Utc>>;

/// Root `<gpx>` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Document {
    pub version: String,
    pub creator: String,
    pub metadata: Option<Metadata>,
    pub waypoints: Vec<Waypoint>,
    pub routes: Vec<Route>,
    pub tracks: Vec<Track>,
    pub extensions: Option<Extensions>,
    /// Extra namespace declarations keyed by attribute name, e.g.
    /// `xmlns:gpxtpx`. `xmlns` and `xmlns:xsi` are derived and never stored.
    pub namespaces: BTreeMap<String, String>,
    /// Schema-location tokens written after the GPX namespace and its XSD.
    pub schema_locations: Vec<String>,
}

impl Document {
    /// The document's GPX namespace, derived from its version.
    pub fn namespace(&self) -> String {
        namespace_uri(&self.version)
    }
}

/// `<metadata>` (GPX 1.1).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metadata {
    pub name: String,
    pub desc: String,
    pub author: Option<Person>,
    pub copyright: Option<Copyright>,
    pub links: Vec<Link>,
    pub time: Timestamp,
    pub keywords: String,
    pub bounds: Option<Bounds>,
    pub extensions: Option<Extensions>,
}

/// A single GPX point, used for `wpt`, `rtept` and `trkpt`.
///
/// Apart from `lat`/`lon`, a field holding its type's zero value is treated
/// as absent and is not written.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Waypoint {
    pub lat: f64,
    pub lon: f64,
    pub ele: f64,
    pub speed: f64,
    pub course: f64,
    pub time: Timestamp,
    pub magvar: f64,
    pub geoid_height: f64,
    pub name: String,
    pub cmt: String,
    pub desc: String,
    pub src: String,
    pub links: Vec<Link>,
    pub sym: String,
    #[serde(rename = "type")]
    pub point_type: String,
    pub fix: String,
    pub sat: i32,
    pub hdop: f64,
    pub vdop: f64,
    pub pdop: f64,
    pub age_of_dgps_data: f64,
    pub dgps_ids: Vec<i32>,
    pub extensions: Option<Extensions>,
}

impl Waypoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            ..Self::default()
        }
    }
}

/// A link element.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Link {
    pub href: String,
    pub text: String,
    #[serde(rename = "type")]
    pub link_type: String,
}

impl Link {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Person {
    pub name: String,
    pub email: String,
    pub link: Option<Link>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Copyright {
    pub author: String,
    /// Zero when the document carries no `<year>`.
    pub year: i32,
    pub license: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

/// A GPX route (`<rte>`).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Route {
    pub name: String,
    pub cmt: String,
    pub desc: String,
    pub src: String,
    pub links: Vec<Link>,
    pub number: i32,
    #[serde(rename = "type")]
    pub route_type: String,
    pub extensions: Option<Extensions>,
    pub points: Vec<Waypoint>,
}

/// A GPX track (`<trk>`).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Track {
    pub name: String,
    pub cmt: String,
    pub desc: String,
    pub src: String,
    pub links: Vec<Link>,
    pub number: i32,
    #[serde(rename = "type")]
    pub track_type: String,
    pub extensions: Option<Extensions>,
    pub segments: Vec<TrackSegment>,
}

/// A GPX track segment (`<trkseg>`).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrackSegment {
    pub points: Vec<Waypoint>,
    pub extensions: Option<Extensions>,
}

/// Raw inner XML of an `<extensions>` element, kept byte for byte.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extensions(pub Vec<u8>);

impl Extensions {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for Extensions {
    fn from(raw: &str) -> Self {
        Self(raw.as_bytes().to_vec())
    }
}

impl Serialize for Extensions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(&self.0))
    }
}
