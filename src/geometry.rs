//! Conversions between GPX points and layout-driven geometries.
//!
//! Longitude is always X and latitude Y. Elevation fills Z and the point's
//! time, as seconds since the epoch, fills M.

use crate::geom::{Layout, LineString, MultiLineString, Point};
use crate::gpx_types::{Route, Track, TrackSegment, Waypoint};
use crate::time::{measure_to_time, time_to_measure};

impl Waypoint {
    /// Append this point's coordinate tuple under `layout`.
    pub fn append_flat_coords(&self, flat_coords: &mut Vec<f64>, layout: Layout) {
        match layout {
            Layout::NoLayout => {}
            Layout::XY => flat_coords.extend([self.lon, self.lat]),
            Layout::XYZ => flat_coords.extend([self.lon, self.lat, self.ele]),
            Layout::XYM => flat_coords.extend([self.lon, self.lat, time_to_measure(self.time)]),
            Layout::XYZM | Layout::Extended(_) => {
                flat_coords.extend([self.lon, self.lat, self.ele, time_to_measure(self.time)]);
                let padding = layout.stride() - 4;
                flat_coords.extend(std::iter::repeat_n(0.0, padding));
            }
        }
    }

    pub fn geom(&self, layout: Layout) -> Point {
        let mut flat_coords = Vec::with_capacity(layout.stride());
        self.append_flat_coords(&mut flat_coords, layout);
        Point::from_parts(layout, flat_coords)
    }

    /// Read a point from one coordinate tuple. Elevation and time are only
    /// taken when the layout has a Z or M axis.
    pub fn from_coords(layout: Layout, coord: &[f64]) -> Self {
        let axis = |index: Option<usize>| index.and_then(|i| coord.get(i)).copied();
        Self {
            lon: coord.first().copied().unwrap_or_default(),
            lat: coord.get(1).copied().unwrap_or_default(),
            ele: axis(layout.z_index()).unwrap_or_default(),
            time: axis(layout.m_index()).and_then(measure_to_time),
            ..Self::default()
        }
    }

    pub fn from_point(point: &Point) -> Self {
        Self::from_coords(point.layout(), point.flat_coords())
    }
}

fn points_geom(points: &[Waypoint], layout: Layout) -> Vec<f64> {
    let mut flat_coords = Vec::with_capacity(points.len() * layout.stride());
    for point in points {
        point.append_flat_coords(&mut flat_coords, layout);
    }
    flat_coords
}

fn points_from_line(line: &LineString) -> Vec<Waypoint> {
    line.coords()
        .map(|coord| Waypoint::from_coords(line.layout(), coord))
        .collect()
}

impl Route {
    pub fn geom(&self, layout: Layout) -> LineString {
        LineString::from_parts(layout, points_geom(&self.points, layout))
    }

    /// One route point per coordinate, in order.
    pub fn from_line_string(line: &LineString) -> Self {
        Self {
            points: points_from_line(line),
            ..Self::default()
        }
    }
}

impl TrackSegment {
    pub fn geom(&self, layout: Layout) -> LineString {
        LineString::from_parts(layout, points_geom(&self.points, layout))
    }

    pub fn from_line_string(line: &LineString) -> Self {
        Self {
            points: points_from_line(line),
            extensions: None,
        }
    }
}

impl Track {
    pub fn geom(&self, layout: Layout) -> MultiLineString {
        let mut flat_coords = Vec::new();
        let mut ends = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            for point in &segment.points {
                point.append_flat_coords(&mut flat_coords, layout);
            }
            ends.push(flat_coords.len());
        }
        MultiLineString::from_parts(layout, flat_coords, ends)
    }

    /// One segment per component line, preserving line and point order.
    pub fn from_multi_line_string(mls: &MultiLineString) -> Self {
        let layout = mls.layout();
        let segments = mls
            .line_coords()
            .map(|line| TrackSegment {
                points: line
                    .chunks(layout.stride().max(1))
                    .map(|coord| Waypoint::from_coords(layout, coord))
                    .collect(),
                extensions: None,
            })
            .collect();
        Self {
            segments,
            ..Self::default()
        }
    }
}
