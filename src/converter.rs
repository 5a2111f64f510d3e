use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde_json::{Map, Value as JsonValue};

use crate::error::Result;
use crate::geom::{Layout, LineString, MultiLineString};
use crate::gpx_types::*;
use crate::options::{ConvertOptions, GpxElementType};
use crate::time::format_time;

/// Convert a parsed GPX document to a GeoJSON FeatureCollection.
pub fn to_feature_collection(doc: &Document, opts: &ConvertOptions) -> Result<FeatureCollection> {
    let mut features = Vec::new();

    if opts.should_include(GpxElementType::Waypoint) {
        for wpt in &doc.waypoints {
            features.push(single_point_feature(wpt, "waypoint", opts));
        }
    }

    if opts.should_include(GpxElementType::Route) {
        for rte in &doc.routes {
            if rte.points.len() >= 2 {
                features.push(route_to_feature(rte, opts));
            } else if let [pt] = rte.points.as_slice() {
                features.push(single_point_feature(pt, "route", opts));
            }
        }
    }

    if opts.should_include(GpxElementType::Track) {
        for trk in &doc.tracks {
            features.extend(track_to_features(trk, opts)?);
        }
    }

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

/// XYZ when elevation is wanted and at least one point carries it.
fn layout_for<'a>(points: impl IntoIterator<Item = &'a Waypoint>, opts: &ConvertOptions) -> Layout {
    if opts.include_elevation && points.into_iter().any(|pt| pt.ele != 0.0) {
        Layout::XYZ
    } else {
        Layout::XY
    }
}

fn feature(value: Value, props: Map<String, JsonValue>) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(props),
        foreign_members: None,
    }
}

fn route_to_feature(rte: &Route, opts: &ConvertOptions) -> Feature {
    let layout = layout_for(&rte.points, opts);

    let mut props = Map::new();
    props.insert(
        "gpxType".to_string(),
        JsonValue::String("route".to_string()),
    );

    if opts.include_metadata {
        insert_descriptive(&mut props, &rte.name, &rte.cmt, &rte.desc, &rte.src, &rte.route_type);
        insert_number(&mut props, rte.number);
        insert_links(&mut props, &rte.links);
    }

    if opts.include_time {
        insert_coordinate_times(&mut props, times(&rte.points));
    }

    feature(rte.geom(layout).to_geojson(), props)
}

fn track_to_features(trk: &Track, opts: &ConvertOptions) -> Result<Vec<Feature>> {
    let non_empty_segments: Vec<&TrackSegment> =
        trk.segments.iter().filter(|s| !s.points.is_empty()).collect();

    if non_empty_segments.is_empty() {
        return Ok(Vec::new());
    }

    // Single point across all segments → Point Feature
    let total_points: usize = non_empty_segments.iter().map(|s| s.points.len()).sum();
    if total_points == 1 {
        let pt = &non_empty_segments[0].points[0];
        return Ok(vec![single_point_feature(pt, "track", opts)]);
    }

    let lines: Vec<&TrackSegment> = non_empty_segments
        .into_iter()
        .filter(|s| s.points.len() >= 2)
        .collect();
    let layout = layout_for(lines.iter().flat_map(|s| &s.points), opts);

    if opts.join_track_segments && lines.len() > 1 {
        let line_strings: Vec<LineString> = lines.iter().map(|seg| seg.geom(layout)).collect();
        let mls = MultiLineString::from_line_strings(layout, &line_strings)?;

        let mut props = build_track_props(trk, opts);
        if opts.include_time {
            let all_times: Vec<JsonValue> = lines
                .iter()
                .map(|seg| JsonValue::Array(times(&seg.points)))
                .collect();
            let any_time = lines.iter().flat_map(|s| &s.points).any(|pt| pt.time.is_some());
            if any_time {
                insert_times_value(&mut props, JsonValue::Array(all_times));
            }
        }
        return Ok(vec![feature(mls.to_geojson(), props)]);
    }

    // Each segment as a separate Feature
    Ok(lines
        .iter()
        .map(|seg| {
            let mut props = build_track_props(trk, opts);
            if opts.include_time {
                insert_coordinate_times(&mut props, times(&seg.points));
            }
            feature(seg.geom(layout).to_geojson(), props)
        })
        .collect())
}

fn single_point_feature(pt: &Waypoint, gpx_type: &str, opts: &ConvertOptions) -> Feature {
    let layout = layout_for([pt], opts);

    let mut props = Map::new();
    props.insert(
        "gpxType".to_string(),
        JsonValue::String(gpx_type.to_string()),
    );

    if opts.include_metadata {
        insert_point_metadata(&mut props, pt);
    }

    feature(pt.geom(layout).to_geojson(), props)
}

fn build_track_props(trk: &Track, opts: &ConvertOptions) -> Map<String, JsonValue> {
    let mut props = Map::new();
    props.insert(
        "gpxType".to_string(),
        JsonValue::String("track".to_string()),
    );

    if opts.include_metadata {
        insert_descriptive(&mut props, &trk.name, &trk.cmt, &trk.desc, &trk.src, &trk.track_type);
        insert_number(&mut props, trk.number);
        insert_links(&mut props, &trk.links);
    }

    props
}

fn insert_point_metadata(props: &mut Map<String, JsonValue>, pt: &Waypoint) {
    insert_descriptive(props, &pt.name, &pt.cmt, &pt.desc, &pt.src, &pt.point_type);
    insert_string(props, "sym", &pt.sym);
    if pt.ele != 0.0 {
        if let Some(ele) = serde_json::Number::from_f64(pt.ele) {
            props.insert("ele".to_string(), JsonValue::Number(ele));
        }
    }
    if let Some(time) = &pt.time {
        props.insert("time".to_string(), JsonValue::String(format_time(time)));
    }
    insert_links(props, &pt.links);
}

fn insert_descriptive(
    props: &mut Map<String, JsonValue>,
    name: &str,
    cmt: &str,
    desc: &str,
    src: &str,
    kind: &str,
) {
    insert_string(props, "name", name);
    insert_string(props, "cmt", cmt);
    insert_string(props, "desc", desc);
    insert_string(props, "src", src);
    insert_string(props, "type", kind);
}

fn insert_string(props: &mut Map<String, JsonValue>, key: &str, value: &str) {
    if !value.is_empty() {
        props.insert(key.to_string(), JsonValue::String(value.to_string()));
    }
}

fn insert_number(props: &mut Map<String, JsonValue>, number: i32) {
    if number != 0 {
        props.insert("number".to_string(), JsonValue::Number(number.into()));
    }
}

fn insert_links(props: &mut Map<String, JsonValue>, links: &[Link]) {
    if links.is_empty() {
        return;
    }
    let links = links
        .iter()
        .map(|link| {
            let mut link_obj = Map::new();
            link_obj.insert("href".to_string(), JsonValue::String(link.href.clone()));
            insert_string(&mut link_obj, "text", &link.text);
            insert_string(&mut link_obj, "type", &link.link_type);
            JsonValue::Object(link_obj)
        })
        .collect();
    props.insert("links".to_string(), JsonValue::Array(links));
}

fn times(points: &[Waypoint]) -> Vec<JsonValue> {
    points
        .iter()
        .map(|pt| match &pt.time {
            Some(t) => JsonValue::String(format_time(t)),
            None => JsonValue::Null,
        })
        .collect()
}

fn insert_coordinate_times(props: &mut Map<String, JsonValue>, times: Vec<JsonValue>) {
    // Only include if at least one time is present
    if times.iter().any(|t| !t.is_null()) {
        insert_times_value(props, JsonValue::Array(times));
    }
}

fn insert_times_value(props: &mut Map<String, JsonValue>, times: JsonValue) {
    let mut coord_props = Map::new();
    coord_props.insert("times".to_string(), times);
    props.insert(
        "coordinateProperties".to_string(),
        JsonValue::Object(coord_props),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_gpx;
    use approx::assert_relative_eq;

    fn convert(xml: &str, opts: &ConvertOptions) -> FeatureCollection {
        to_feature_collection(&parse_gpx(xml).unwrap(), opts).unwrap()
    }

    #[test]
    fn test_waypoint_conversion() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <wpt lat="35.6762" lon="139.6503">
    <ele>40.5</ele>
    <name>Tokyo</name>
    <link href="https://example.com"><text>Home</text></link>
  </wpt>
</gpx>"#;
        let fc = convert(xml, &ConvertOptions::default());

        assert_eq!(fc.features.len(), 1);
        let f = &fc.features[0];
        let geom = f.geometry.as_ref().unwrap();

        // Check [lon, lat, ele] order
        if let Value::Point(coords) = &geom.value {
            assert_relative_eq!(coords[0], 139.6503); // lon
            assert_relative_eq!(coords[1], 35.6762); // lat
            assert_relative_eq!(coords[2], 40.5); // ele
        } else {
            panic!("Expected Point geometry");
        }

        let props = f.properties.as_ref().unwrap();
        assert_eq!(props["gpxType"], "waypoint");
        assert_eq!(props["name"], "Tokyo");
        assert_eq!(props["ele"], 40.5);
        assert_eq!(props["links"][0]["href"], "https://example.com");
        assert_eq!(props["links"][0]["text"], "Home");
    }

    #[test]
    fn test_track_with_times() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <trk>
    <name>Run</name>
    <trkseg>
      <trkpt lat="35.0" lon="139.0"><time>2025-01-01T00:00:00Z</time></trkpt>
      <trkpt lat="35.001" lon="139.001"></trkpt>
    </trkseg>
  </trk>
</gpx>"#;
        let fc = convert(xml, &ConvertOptions::default());

        assert_eq!(fc.features.len(), 1);
        let props = fc.features[0].properties.as_ref().unwrap();
        assert_eq!(props["gpxType"], "track");
        assert_eq!(props["name"], "Run");

        let times = props["coordinateProperties"]["times"].as_array().unwrap();
        assert_eq!(times.len(), 2);
        assert_eq!(times[0], "2025-01-01T00:00:00Z");
        assert!(times[1].is_null());
    }

    #[test]
    fn test_multi_segment_join() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <trk>
    <trkseg>
      <trkpt lat="35.0" lon="139.0"><time>2025-01-01T00:00:00Z</time></trkpt>
      <trkpt lat="35.001" lon="139.001"/>
    </trkseg>
    <trkseg>
      <trkpt lat="36.0" lon="140.0"/>
      <trkpt lat="36.001" lon="140.001"/>
      <trkpt lat="36.002" lon="140.002"/>
    </trkseg>
  </trk>
</gpx>"#;
        let opts = ConvertOptions {
            join_track_segments: true,
            ..Default::default()
        };
        let fc = convert(xml, &opts);

        assert_eq!(fc.features.len(), 1);
        let geom = fc.features[0].geometry.as_ref().unwrap();
        match &geom.value {
            Value::MultiLineString(lines) => {
                assert_eq!(lines.len(), 2);
                assert_eq!(lines[1].len(), 3);
                assert_eq!(lines[0][1], vec![139.001, 35.001]);
            }
            _ => panic!("Expected MultiLineString"),
        }
        let props = fc.features[0].properties.as_ref().unwrap();
        let times = props["coordinateProperties"]["times"].as_array().unwrap();
        assert_eq!(times.len(), 2);
        assert_eq!(times[1].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_multi_segment_separate() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <trk>
    <name>Trail</name>
    <trkseg>
      <trkpt lat="35.0" lon="139.0"/>
      <trkpt lat="35.001" lon="139.001"/>
    </trkseg>
    <trkseg>
      <trkpt lat="36.0" lon="140.0"/>
      <trkpt lat="36.001" lon="140.001"/>
    </trkseg>
  </trk>
</gpx>"#;
        let fc = convert(xml, &ConvertOptions::default());

        // Each segment is a separate Feature
        assert_eq!(fc.features.len(), 2);
        for f in &fc.features {
            let props = f.properties.as_ref().unwrap();
            assert_eq!(props["gpxType"], "track");
            assert_eq!(props["name"], "Trail");
            assert!(props.get("coordinateProperties").is_none());
        }
    }

    #[test]
    fn test_single_point_track() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <trk>
    <name>Single</name>
    <trkseg>
      <trkpt lat="35.0" lon="139.0"/>
    </trkseg>
  </trk>
</gpx>"#;
        let fc = convert(xml, &ConvertOptions::default());

        assert_eq!(fc.features.len(), 1);
        let geom = fc.features[0].geometry.as_ref().unwrap();
        match &geom.value {
            Value::Point(_) => {} // Expected: 1 point → Point Feature
            _ => panic!("Expected Point geometry for single-point track"),
        }
    }

    #[test]
    fn test_empty_gpx_conversion() {
        let xml = r#"<?xml version="1.0"?><gpx version="1.1"></gpx>"#;
        let fc = convert(xml, &ConvertOptions::default());
        assert!(fc.features.is_empty());
    }

    #[test]
    fn test_no_elevation() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <wpt lat="35.0" lon="139.0"><ele>100.0</ele></wpt>
  <wpt lat="36.0" lon="140.0"/>
</gpx>"#;
        let opts = ConvertOptions {
            include_elevation: false,
            ..Default::default()
        };
        let fc = convert(xml, &opts);

        let geom = fc.features[0].geometry.as_ref().unwrap();
        assert_eq!(geom.value, Value::Point(vec![139.0, 35.0]));

        // Without an elevation the position stays 2D even when requested.
        let fc = convert(xml, &ConvertOptions::default());
        let geom = fc.features[1].geometry.as_ref().unwrap();
        assert_eq!(geom.value, Value::Point(vec![140.0, 36.0]));
    }

    #[test]
    fn test_type_filter() {
        let xml = r#"<?xml version="1.0"?>
<gpx version="1.1">
  <wpt lat="35.0" lon="139.0"/>
  <rte><number>3</number><rtept lat="35.0" lon="139.0"/><rtept lat="36.0" lon="140.0"/></rte>
  <trk><trkseg><trkpt lat="35.0" lon="139.0"/><trkpt lat="36.0" lon="140.0"/></trkseg></trk>
</gpx>"#;
        let opts = ConvertOptions {
            types: Some(vec![GpxElementType::Waypoint]),
            ..Default::default()
        };
        let fc = convert(xml, &opts);

        assert_eq!(fc.features.len(), 1);
        let props = fc.features[0].properties.as_ref().unwrap();
        assert_eq!(props["gpxType"], "waypoint");

        let opts = ConvertOptions {
            types: Some(vec![GpxElementType::Route]),
            ..Default::default()
        };
        let fc = convert(xml, &opts);
        let props = fc.features[0].properties.as_ref().unwrap();
        assert_eq!(props["gpxType"], "route");
        assert_eq!(props["number"], 3);
    }
}
