use approx::assert_relative_eq;
use chrono::{TimeZone, Utc};
use geojson::{FeatureCollection, Value};
use gpx_codec::converter::to_feature_collection;
use gpx_codec::options::{ConvertOptions, DecodeOptions};
use gpx_codec::{Document, GpxError, Layout, XML_HEADER, parse_gpx, read, time_to_measure};

fn load_fixture(path: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{path}")).unwrap()
}

fn convert(gpx: &str) -> FeatureCollection {
    let doc = parse_gpx(gpx).unwrap();
    to_feature_collection(&doc, &ConvertOptions::default()).unwrap()
}

// ---- read ----

#[test]
fn test_fells_loop_gpx10() {
    let doc = read(load_fixture("fells_loop.gpx").as_bytes()).unwrap();

    assert_eq!(doc.version, "1.0");
    assert_eq!(doc.creator, "ExpertGPS 1.1 - http://www.topografix.com");
    // GPX 1.0 root-level <time> and <bounds> have no place in the model.
    assert!(doc.metadata.is_none());
    assert!(doc.namespaces.is_empty());
    assert!(doc.schema_locations.is_empty());

    assert_eq!(doc.waypoints.len(), 3);
    let first = &doc.waypoints[0];
    assert_eq!(first.lat, 42.438878);
    assert_eq!(first.lon, -71.119277);
    assert_eq!(first.ele, 44.586548);
    assert_eq!(
        first.time,
        Some(Utc.with_ymd_and_hms(2001, 11, 28, 21, 5, 28).unwrap())
    );
    assert_eq!(first.desc, "5066");
    assert_eq!(first.point_type, "Crossing");

    let pond = &doc.waypoints[2];
    assert_eq!(pond.ele, 0.0);
    assert!(pond.time.is_none());
    assert_eq!(pond.sym, "Fishing Area");

    let route = &doc.routes[0];
    assert_eq!(route.name, "BELLEVUE");
    assert_eq!(route.desc, "Bike Loop Bellevue");
    assert_eq!(route.number, 1);
    assert_eq!(route.points.len(), 3);
    assert_eq!(route.points[2].name, "PANTHRCAVE");
}

#[test]
fn test_read_from_reader_matches_str() {
    let xml = load_fixture("fells_loop.gpx");
    let from_reader = read(std::io::Cursor::new(xml.clone().into_bytes())).unwrap();
    assert_eq!(from_reader, parse_gpx(&xml).unwrap());
}

#[test]
fn test_semantic_vs_syntax_errors() {
    let bad_time = r#"<gpx version="1.1"><wpt lat="1" lon="2"><time>yesterday</time></wpt></gpx>"#;
    assert!(parse_gpx(bad_time).unwrap_err().is_semantic());

    let mismatched = r#"<gpx version="1.1"><wpt lat="1" lon="2"></trk></gpx>"#;
    let err = parse_gpx(mismatched).unwrap_err();
    assert!(!err.is_semantic());

    let truncated = r#"<gpx version="1.1"><trk><trkseg>"#;
    assert!(matches!(
        parse_gpx(truncated),
        Err(GpxError::UnexpectedEof { .. } | GpxError::XmlParse(_))
    ));
}

#[test]
fn test_decode_options_passed_explicitly() {
    let xml = r#"<gpx version="1.1"><metadata><time>2019-04-01</time></metadata></gpx>"#;
    assert!(parse_gpx(xml).is_err());

    let opts = DecodeOptions::default().with_time_layouts(vec![
        gpx_codec::TimeLayout::Rfc3339,
        gpx_codec::TimeLayout::Format("%Y-%m-%d".to_string()),
    ]);
    let doc = gpx_codec::parse_gpx_with_options(xml, &opts).unwrap();
    assert_eq!(
        doc.metadata.unwrap().time,
        Some(Utc.with_ymd_and_hms(2019, 4, 1, 0, 0, 0).unwrap())
    );

    // Options do not leak into later default reads.
    assert!(parse_gpx(xml).is_err());
}

// ---- write ----

#[test]
fn test_canonical_document_round_trip() {
    let xml = load_fixture("canonical_11.gpx");
    let doc = parse_gpx(&xml).unwrap();

    assert_eq!(doc.tracks[0].segments.len(), 2);
    assert_eq!(doc.waypoints[0].dgps_ids, vec![0]);
    assert_eq!(
        doc.metadata.as_ref().unwrap().copyright.as_ref().unwrap().year,
        2019
    );

    let written = doc.to_xml_string("", "  ").unwrap();
    assert_eq!(written, xml.trim_end());
    assert_eq!(parse_gpx(&written).unwrap(), doc);
}

#[test]
fn test_write_to_stream_with_header() {
    let doc = read(load_fixture("fells_loop.gpx").as_bytes()).unwrap();

    let mut out = Vec::new();
    out.extend_from_slice(XML_HEADER.as_bytes());
    doc.write_indent(&mut out, "", "\t").unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<gpx version=\"1.0\""));
    assert!(text.contains(
        "\n\t<wpt lat=\"42.438878\" lon=\"-71.119277\">\n\t\t<ele>44.586548</ele>\n\t\t<time>2001-11-28T21:05:28Z</time>\n"
    ));
    assert!(text.ends_with("\t</rte>\n</gpx>"));
    assert_eq!(parse_gpx(&text).unwrap(), doc);
}

#[test]
fn test_compact_write_has_no_whitespace() {
    let doc = parse_gpx(&load_fixture("canonical_11.gpx")).unwrap();
    let mut out = Vec::new();
    doc.write(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(!text.contains('\n'));
    assert!(text.contains("<trkseg><trkpt lat=\"47.644548\" lon=\"-122.326897\"><ele>4.46</ele>"));
}

// ---- geometry ----

#[test]
fn test_track_geometry_from_fixture() {
    let doc = parse_gpx(&load_fixture("canonical_11.gpx")).unwrap();
    let mls = doc.tracks[0].geom(Layout::XYZM);

    assert_eq!(mls.num_line_strings(), 2);
    assert_eq!(mls.ends(), &[8, 12]);
    let coords = mls.flat_coords();
    assert_relative_eq!(coords[0], -122.326897);
    assert_relative_eq!(coords[1], 47.644548);
    assert_relative_eq!(coords[2], 4.46);
    assert_relative_eq!(coords[7], coords[3] + 5.5);
    assert_relative_eq!(coords[3], time_to_measure(doc.tracks[0].segments[0].points[0].time));

    let back = gpx_codec::Track::from_multi_line_string(&mls);
    assert_eq!(back.segments[0].points[1].time, doc.tracks[0].segments[0].points[1].time);
    assert_eq!(back.segments[1].points[0].ele, 6.87);
}

#[test]
fn test_route_geometry_from_fixture() {
    let doc = read(load_fixture("fells_loop.gpx").as_bytes()).unwrap();
    let line = doc.routes[0].geom(Layout::XY);
    assert_eq!(line.num_coords(), 3);
    assert_eq!(&line.flat_coords()[..2], &[-71.107628, 42.430950]);
}

// ---- GeoJSON ----

#[test]
fn test_fells_loop_to_geojson() {
    let fc = convert(&load_fixture("fells_loop.gpx"));
    // 3 waypoints + 1 route
    assert_eq!(fc.features.len(), 4);

    let route = &fc.features[3];
    let props = route.properties.as_ref().unwrap();
    assert_eq!(props["gpxType"], "route");
    assert_eq!(props["name"], "BELLEVUE");
    assert_eq!(props["number"], 1);
    let times = props["coordinateProperties"]["times"].as_array().unwrap();
    assert_eq!(times[0], "2001-06-02T00:18:15Z");

    match &route.geometry.as_ref().unwrap().value {
        Value::LineString(coords) => {
            assert_eq!(coords.len(), 3);
            assert_eq!(coords[0], vec![-71.107628, 42.43095, 23.4696]);
        }
        other => panic!("Expected LineString, got {other:?}"),
    }
}

#[test]
fn test_canonical_track_features() {
    let fc = convert(&load_fixture("canonical_11.gpx"));
    // 1 waypoint + first segment as LineString (second segment has a single point)
    assert_eq!(fc.features.len(), 2);

    let track = &fc.features[1];
    let props = track.properties.as_ref().unwrap();
    assert_eq!(props["gpxType"], "track");
    assert_eq!(props["type"], "cycling");
    let times = props["coordinateProperties"]["times"].as_array().unwrap();
    assert_eq!(times[1], "2019-04-01T06:30:05.5Z");
}

#[test]
fn test_geojson_serializes() {
    let fc = convert(&load_fixture("canonical_11.gpx"));
    let json = serde_json::to_value(&fc).unwrap();
    assert_eq!(json["type"], "FeatureCollection");
    assert_eq!(json["features"][0]["geometry"]["type"], "Point");
    assert_eq!(json["features"][0]["properties"]["name"], "Start");
}

#[test]
fn test_document_serializes_for_js() {
    let doc: Document = parse_gpx(&load_fixture("canonical_11.gpx")).unwrap();
    let json = serde_json::to_value(&doc).unwrap();
    assert_eq!(json["metadata"]["keywords"], "cycling, commute");
    assert_eq!(json["tracks"][0]["segments"][0]["points"][0]["time"], "2019-04-01T06:30:00Z");
    assert_eq!(
        json["tracks"][0]["segments"][0]["points"][0]["extensions"],
        "<gpxtpx:TrackPointExtension><gpxtpx:hr>120</gpxtpx:hr></gpxtpx:TrackPointExtension>"
    );
}
