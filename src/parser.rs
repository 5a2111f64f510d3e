use std::io::Read;
use std::str::FromStr;

use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};

use crate::charset::decode_to_utf8;
use crate::error::{GpxError, Result};
use crate::gpx_types::*;
use crate::options::DecodeOptions;
use crate::time::{parse_time, parse_year};

type XmlReader<'a> = Reader<&'a [u8]>;

/// Read a whole GPX document from a byte stream.
pub fn read<R: Read>(input: R) -> Result<Document> {
    read_with_options(input, &DecodeOptions::default())
}

pub fn read_with_options<R: Read>(mut input: R, opts: &DecodeOptions) -> Result<Document> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;
    parse_bytes_with_options(&bytes, opts)
}

/// Parse raw bytes in any encoding the document declares.
pub fn parse_bytes_with_options(bytes: &[u8], opts: &DecodeOptions) -> Result<Document> {
    let text = decode_to_utf8(bytes)?;
    parse_gpx_with_options(&text, opts)
}

/// Parse a GPX XML string into a Document.
pub fn parse_gpx(xml: &str) -> Result<Document> {
    parse_gpx_with_options(xml, &DecodeOptions::default())
}

pub fn parse_gpx_with_options(xml: &str, opts: &DecodeOptions) -> Result<Document> {
    let mut reader = Reader::from_str(xml);

    loop {
        match reader.read_event()? {
            Event::Start(e) => return parse_root(&mut reader, &e, false, opts),
            Event::Empty(e) => return parse_root(&mut reader, &e, true, opts),
            Event::Eof => return Err(GpxError::MissingRoot),
            _ => {}
        }
    }
}

fn element_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|_| GpxError::MalformedEncoding { encoding: "UTF-8" })
}

/// Visit each child element of the element just opened, up to its end tag.
///
/// `visit` gets the child's start tag and whether it was self-closing. It
/// returns `false` for children it does not handle; those are skipped whole.
/// A child it does handle must be consumed through its end tag.
fn for_each_child<'a>(
    reader: &mut XmlReader<'a>,
    parent: &BytesStart<'a>,
    mut visit: impl FnMut(&mut XmlReader<'a>, &BytesStart<'a>, bool) -> Result<bool>,
) -> Result<()> {
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if !visit(reader, &e, false)? {
                    log::trace!("skipping <{}>", element_name(&e));
                    reader.read_to_end(e.name())?;
                }
            }
            Event::Empty(e) => {
                visit(reader, &e, true)?;
            }
            Event::End(_) => return Ok(()),
            Event::Eof => {
                return Err(GpxError::UnexpectedEof {
                    element: element_name(parent),
                });
            }
            _ => {}
        }
    }
}

/// Look up an attribute by its qualified name and unescape its value.
fn attribute(start: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in start.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(unescape(utf8(&attr.value)?)?.into_owned()));
        }
    }
    Ok(None)
}

fn required_float(start: &BytesStart<'_>, key: &'static str) -> Result<f64> {
    let value = attribute(start, key.as_bytes())?.ok_or_else(|| GpxError::MissingAttribute {
        element: element_name(start),
        attribute: key,
    })?;
    value.trim().parse().map_err(|_| GpxError::InvalidAttribute {
        element: element_name(start),
        attribute: key,
        value,
    })
}

fn parse_root<'a>(
    reader: &mut XmlReader<'a>,
    start: &BytesStart<'a>,
    empty: bool,
    opts: &DecodeOptions,
) -> Result<Document> {
    if start.local_name().as_ref() != b"gpx" {
        return Err(GpxError::UnexpectedRoot {
            name: element_name(start),
        });
    }

    let mut doc = Document {
        version: attribute(start, b"version")?.unwrap_or_default(),
        creator: attribute(start, b"creator")?.unwrap_or_default(),
        ..Document::default()
    };

    let mut schema_location = None;
    for attr in start.attributes() {
        let attr = attr?;
        let key = utf8(attr.key.as_ref())?;
        let value = || -> Result<String> { Ok(unescape(utf8(&attr.value)?)?.into_owned()) };
        if attr.key.local_name().as_ref() == b"schemaLocation" {
            schema_location = Some(value()?);
        } else if key.starts_with("xmlns:") && key != "xmlns:xsi" {
            doc.namespaces.insert(key.to_string(), value()?);
        }
    }
    if let Some(locations) = schema_location {
        let namespace = namespace_uri(&doc.version);
        let tokens: Vec<&str> = locations.split_whitespace().collect();
        // Drop the "<namespace> <namespace>/gpx.xsd" pair written for every document.
        let skip = if tokens.first() == Some(&namespace.as_str()) { 2 } else { 0 };
        doc.schema_locations = tokens.iter().skip(skip).map(|t| t.to_string()).collect();
    }

    if empty {
        return Ok(doc);
    }

    for_each_child(reader, start, |reader, e, empty| {
        match e.local_name().as_ref() {
            b"metadata" => doc.metadata = Some(parse_metadata(reader, e, empty, opts)?),
            b"wpt" => doc.waypoints.push(parse_waypoint(reader, e, empty, opts)?),
            b"rte" => doc.routes.push(parse_route(reader, e, empty, opts)?),
            b"trk" => doc.tracks.push(parse_track(reader, e, empty, opts)?),
            b"extensions" => doc.extensions = Some(parse_extensions(reader, e, empty)?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    Ok(doc)
}

fn parse_metadata<'a>(
    reader: &mut XmlReader<'a>,
    start: &BytesStart<'a>,
    empty: bool,
    opts: &DecodeOptions,
) -> Result<Metadata> {
    let mut metadata = Metadata::default();
    if empty {
        return Ok(metadata);
    }

    for_each_child(reader, start, |reader, e, empty| {
        match e.local_name().as_ref() {
            b"name" => metadata.name = read_text_owned(reader, empty)?,
            b"desc" => metadata.desc = read_text_owned(reader, empty)?,
            b"author" => metadata.author = Some(parse_person(reader, e, empty)?),
            b"copyright" => metadata.copyright = Some(parse_copyright(reader, e, empty)?),
            b"link" => metadata.links.push(parse_link(reader, e, empty)?),
            b"time" => metadata.time = read_time(reader, empty, opts)?,
            b"keywords" => metadata.keywords = read_text_owned(reader, empty)?,
            b"bounds" => metadata.bounds = Some(parse_bounds(reader, e, empty)?),
            b"extensions" => metadata.extensions = Some(parse_extensions(reader, e, empty)?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    Ok(metadata)
}

/// Parse a point element (wpt, rtept, trkpt) and its children.
fn parse_waypoint<'a>(
    reader: &mut XmlReader<'a>,
    start: &BytesStart<'a>,
    empty: bool,
    opts: &DecodeOptions,
) -> Result<Waypoint> {
    let mut point = Waypoint::new(required_float(start, "lat")?, required_float(start, "lon")?);
    if empty {
        return Ok(point);
    }

    for_each_child(reader, start, |reader, e, empty| {
        match e.local_name().as_ref() {
            b"ele" => point.ele = read_number(reader, empty, "ele")?,
            b"speed" => point.speed = read_number(reader, empty, "speed")?,
            b"course" => point.course = read_number(reader, empty, "course")?,
            b"time" => point.time = read_time(reader, empty, opts)?,
            b"magvar" => point.magvar = read_number(reader, empty, "magvar")?,
            b"geoidheight" => point.geoid_height = read_number(reader, empty, "geoidheight")?,
            b"name" => point.name = read_text_owned(reader, empty)?,
            b"cmt" => point.cmt = read_text_owned(reader, empty)?,
            b"desc" => point.desc = read_text_owned(reader, empty)?,
            b"src" => point.src = read_text_owned(reader, empty)?,
            b"link" => point.links.push(parse_link(reader, e, empty)?),
            b"sym" => point.sym = read_text_owned(reader, empty)?,
            b"type" => point.point_type = read_text_owned(reader, empty)?,
            b"fix" => point.fix = read_text_owned(reader, empty)?,
            b"sat" => point.sat = read_number(reader, empty, "sat")?,
            b"hdop" => point.hdop = read_number(reader, empty, "hdop")?,
            b"vdop" => point.vdop = read_number(reader, empty, "vdop")?,
            b"pdop" => point.pdop = read_number(reader, empty, "pdop")?,
            // Some writers emit the misspelt "ageofgpsdata".
            b"ageofdgpsdata" | b"ageofgpsdata" => {
                point.age_of_dgps_data = read_number(reader, empty, "ageofdgpsdata")?
            }
            b"dgpsid" => point.dgps_ids.push(read_number(reader, empty, "dgpsid")?),
            b"extensions" => point.extensions = Some(parse_extensions(reader, e, empty)?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    Ok(point)
}

/// Parse a <link> element.
fn parse_link<'a>(
    reader: &mut XmlReader<'a>,
    start: &BytesStart<'a>,
    empty: bool,
) -> Result<Link> {
    let href = attribute(start, b"href")?.ok_or_else(|| GpxError::MissingAttribute {
        element: element_name(start),
        attribute: "href",
    })?;
    let mut link = Link::new(href);
    if empty {
        return Ok(link);
    }

    for_each_child(reader, start, |reader, e, empty| {
        match e.local_name().as_ref() {
            b"text" => link.text = read_text_owned(reader, empty)?,
            b"type" => link.link_type = read_text_owned(reader, empty)?,
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    Ok(link)
}

fn parse_person<'a>(
    reader: &mut XmlReader<'a>,
    start: &BytesStart<'a>,
    empty: bool,
) -> Result<Person> {
    let mut person = Person::default();
    if empty {
        return Ok(person);
    }

    for_each_child(reader, start, |reader, e, empty| {
        match e.local_name().as_ref() {
            b"name" => person.name = read_text_owned(reader, empty)?,
            b"email" => person.email = read_text_owned(reader, empty)?,
            b"link" => person.link = Some(parse_link(reader, e, empty)?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    Ok(person)
}

/// A missing `<year>` leaves the year at zero; a present one must parse.
fn parse_copyright<'a>(
    reader: &mut XmlReader<'a>,
    start: &BytesStart<'a>,
    empty: bool,
) -> Result<Copyright> {
    let mut copyright = Copyright {
        author: attribute(start, b"author")?.unwrap_or_default(),
        ..Copyright::default()
    };
    if empty {
        return Ok(copyright);
    }

    for_each_child(reader, start, |reader, e, empty| {
        match e.local_name().as_ref() {
            b"year" => copyright.year = parse_year(&read_text_owned(reader, empty)?)?,
            b"license" => copyright.license = read_text_owned(reader, empty)?,
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    Ok(copyright)
}

fn parse_bounds<'a>(
    reader: &mut XmlReader<'a>,
    start: &BytesStart<'a>,
    empty: bool,
) -> Result<Bounds> {
    let bounds = Bounds {
        min_lat: required_float(start, "minlat")?,
        min_lon: required_float(start, "minlon")?,
        max_lat: required_float(start, "maxlat")?,
        max_lon: required_float(start, "maxlon")?,
    };
    if !empty {
        reader.read_to_end(start.name())?;
    }
    Ok(bounds)
}

/// Parse a <rte> element.
fn parse_route<'a>(
    reader: &mut XmlReader<'a>,
    start: &BytesStart<'a>,
    empty: bool,
    opts: &DecodeOptions,
) -> Result<Route> {
    let mut route = Route::default();
    if empty {
        return Ok(route);
    }

    for_each_child(reader, start, |reader, e, empty| {
        match e.local_name().as_ref() {
            b"name" => route.name = read_text_owned(reader, empty)?,
            b"cmt" => route.cmt = read_text_owned(reader, empty)?,
            b"desc" => route.desc = read_text_owned(reader, empty)?,
            b"src" => route.src = read_text_owned(reader, empty)?,
            b"link" => route.links.push(parse_link(reader, e, empty)?),
            b"number" => route.number = read_number(reader, empty, "number")?,
            b"type" => route.route_type = read_text_owned(reader, empty)?,
            b"extensions" => route.extensions = Some(parse_extensions(reader, e, empty)?),
            b"rtept" => route.points.push(parse_waypoint(reader, e, empty, opts)?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    Ok(route)
}

/// Parse a <trk> element.
fn parse_track<'a>(
    reader: &mut XmlReader<'a>,
    start: &BytesStart<'a>,
    empty: bool,
    opts: &DecodeOptions,
) -> Result<Track> {
    let mut track = Track::default();
    if empty {
        return Ok(track);
    }

    for_each_child(reader, start, |reader, e, empty| {
        match e.local_name().as_ref() {
            b"name" => track.name = read_text_owned(reader, empty)?,
            b"cmt" => track.cmt = read_text_owned(reader, empty)?,
            b"desc" => track.desc = read_text_owned(reader, empty)?,
            b"src" => track.src = read_text_owned(reader, empty)?,
            b"link" => track.links.push(parse_link(reader, e, empty)?),
            b"number" => track.number = read_number(reader, empty, "number")?,
            b"type" => track.track_type = read_text_owned(reader, empty)?,
            b"extensions" => track.extensions = Some(parse_extensions(reader, e, empty)?),
            b"trkseg" => track.segments.push(parse_segment(reader, e, empty, opts)?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    Ok(track)
}

/// Parse a <trkseg> element. Empty segments are kept.
fn parse_segment<'a>(
    reader: &mut XmlReader<'a>,
    start: &BytesStart<'a>,
    empty: bool,
    opts: &DecodeOptions,
) -> Result<TrackSegment> {
    let mut segment = TrackSegment::default();
    if empty {
        return Ok(segment);
    }

    for_each_child(reader, start, |reader, e, empty| {
        match e.local_name().as_ref() {
            b"trkpt" => segment.points.push(parse_waypoint(reader, e, empty, opts)?),
            b"extensions" => segment.extensions = Some(parse_extensions(reader, e, empty)?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    Ok(segment)
}

/// Capture the inner XML of <extensions> without interpreting it.
fn parse_extensions<'a>(
    reader: &mut XmlReader<'a>,
    start: &BytesStart<'a>,
    empty: bool,
) -> Result<Extensions> {
    if empty {
        return Ok(Extensions::default());
    }
    let raw = reader.read_text(start.name())?;
    Ok(Extensions(raw.as_bytes().to_vec()))
}

fn read_number<T>(reader: &mut XmlReader<'_>, empty: bool, element: &'static str) -> Result<T>
where
    T: FromStr + Default,
{
    let text = read_text_owned(reader, empty)?;
    let text = text.trim();
    if text.is_empty() {
        return Ok(T::default());
    }
    text.parse().map_err(|_| GpxError::InvalidNumber {
        element,
        value: text.to_string(),
    })
}

fn read_time(reader: &mut XmlReader<'_>, empty: bool, opts: &DecodeOptions) -> Result<Timestamp> {
    let text = read_text_owned(reader, empty)?;
    if text.trim().is_empty() {
        return Ok(None);
    }
    parse_time(&text, &opts.time_layouts).map(Some)
}

/// Read text content of the element just opened as an owned String.
/// Handles regular text, CDATA sections, and entity references (Event::GeneralRef).
/// Markup nested inside the element is skipped; its text is kept.
fn read_text_owned(reader: &mut XmlReader<'_>, empty: bool) -> Result<String> {
    let mut text = String::new();
    if empty {
        return Ok(text);
    }
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Text(e) => text.push_str(utf8(e.as_ref())?),
            Event::CData(e) => text.push_str(utf8(e.as_ref())?),
            Event::GeneralRef(e) => {
                // Handle character references (&#60; &#x3C;) and predefined entities
                if let Ok(Some(ch)) = e.resolve_char_ref() {
                    text.push(ch);
                } else {
                    match utf8(e.as_ref())? {
                        "amp" => text.push('&'),
                        "lt" => text.push('<'),
                        "gt" => text.push('>'),
                        "quot" => text.push('"'),
                        "apos" => text.push('\''),
                        other => log::trace!("dropping unknown entity &{other};"),
                    }
                }
            }
            Event::Start(_) => depth += 1,
            Event::End(_) if depth > 0 => depth -= 1,
            Event::End(_) => break,
            Event::Eof => {
                return Err(GpxError::UnexpectedEof {
                    element: "text".to_string(),
                });
            }
            _ => {}
        }
    }

    Ok(text)
}
