//! GPX encoder.
//!
//! Attribute and child element order is fixed. Optional values holding their
//! zero value, empty strings and empty lists are left out. Indentation puts
//! every element on its own line except text-only elements, whose end tag
//! stays on the start tag's line.

use std::io::Write;

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::error::{GpxError, Result};
use crate::gpx_types::*;
use crate::time::format_time;

/// XML declaration for callers that want one; the encoder never writes it.
pub const XML_HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

impl Document {
    /// Write the document without indentation.
    pub fn write<W: Write>(&self, out: W) -> Result<()> {
        self.write_indent(out, "", "")
    }

    /// Write the document, starting each line with `prefix` followed by one
    /// `indent` per nesting level.
    pub fn write_indent<W: Write>(&self, out: W, prefix: &str, indent: &str) -> Result<()> {
        let mut emitter = Emitter::new(out, prefix, indent);
        write_document(&mut emitter, self)?;
        emitter.writer.get_mut().flush()?;
        Ok(())
    }

    pub fn to_xml_string(&self, prefix: &str, indent: &str) -> Result<String> {
        let mut buf = Vec::new();
        self.write_indent(&mut buf, prefix, indent)?;
        String::from_utf8(buf).map_err(|_| GpxError::MalformedEncoding { encoding: "UTF-8" })
    }
}

/// Shortest decimal text that reads back as the same value, never in
/// exponent form.
fn format_float(value: f64) -> String {
    value.to_string()
}

struct Emitter<'i, W: Write> {
    writer: Writer<W>,
    prefix: &'i str,
    indent: &'i str,
    depth: usize,
    /// The last thing written was a start tag.
    indented_in: bool,
    /// Something has been written, so the next indent starts a new line.
    put_newline: bool,
}

impl<'i, W: Write> Emitter<'i, W> {
    fn new(out: W, prefix: &'i str, indent: &'i str) -> Self {
        Self {
            writer: Writer::new(out),
            prefix,
            indent,
            depth: 0,
            indented_in: false,
            put_newline: false,
        }
    }

    fn write_indent(&mut self, delta: i8) -> Result<()> {
        if self.prefix.is_empty() && self.indent.is_empty() {
            return Ok(());
        }
        if delta < 0 {
            self.depth = self.depth.saturating_sub(1);
            if self.indented_in {
                // Text-only element: close it on the same line.
                self.indented_in = false;
                return Ok(());
            }
        }
        let out = self.writer.get_mut();
        if self.put_newline {
            out.write_all(b"\n")?;
        } else {
            self.put_newline = true;
        }
        out.write_all(self.prefix.as_bytes())?;
        for _ in 0..self.depth {
            out.write_all(self.indent.as_bytes())?;
        }
        if delta > 0 {
            self.depth += 1;
            self.indented_in = true;
        }
        Ok(())
    }

    fn start(&mut self, start: BytesStart<'_>) -> Result<()> {
        self.write_indent(1)?;
        self.writer.write_event(Event::Start(start))?;
        Ok(())
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.write_indent(-1)?;
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn text_element(&mut self, name: &str, text: &str) -> Result<()> {
        self.start(BytesStart::new(name))?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    fn string(&mut self, name: &str, value: &str) -> Result<()> {
        if value.is_empty() {
            return Ok(());
        }
        self.text_element(name, value)
    }

    fn float(&mut self, name: &str, value: f64) -> Result<()> {
        if value == 0.0 {
            return Ok(());
        }
        self.text_element(name, &format_float(value))
    }

    fn int(&mut self, name: &str, value: i32) -> Result<()> {
        if value == 0 {
            return Ok(());
        }
        self.text_element(name, &value.to_string())
    }

    fn time(&mut self, name: &str, value: &Timestamp) -> Result<()> {
        match value {
            Some(t) => self.text_element(name, &format_time(t)),
            None => Ok(()),
        }
    }

    fn links(&mut self, links: &[Link]) -> Result<()> {
        for link in links {
            write_link(self, "link", link)?;
        }
        Ok(())
    }

    /// `<extensions>` with its stored inner XML copied through untouched.
    fn extensions(&mut self, extensions: &Option<Extensions>) -> Result<()> {
        let Some(extensions) = extensions else {
            return Ok(());
        };
        self.start(BytesStart::new("extensions"))?;
        self.writer.get_mut().write_all(extensions.as_bytes())?;
        self.end("extensions")
    }
}

fn write_document<W: Write>(em: &mut Emitter<'_, W>, doc: &Document) -> Result<()> {
    let namespace = doc.namespace();
    let mut schema_location = format!("{namespace} {namespace}/gpx.xsd");
    for token in &doc.schema_locations {
        schema_location.push(' ');
        schema_location.push_str(token);
    }

    let mut start = BytesStart::new("gpx");
    start.push_attribute(("version", doc.version.as_str()));
    start.push_attribute(("creator", doc.creator.as_str()));
    start.push_attribute(("xmlns:xsi", XSI_NAMESPACE));
    start.push_attribute(("xmlns", namespace.as_str()));
    start.push_attribute(("xsi:schemaLocation", schema_location.as_str()));
    for (key, value) in &doc.namespaces {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    em.start(start)?;

    if let Some(metadata) = &doc.metadata {
        write_metadata(em, metadata)?;
    }
    for waypoint in &doc.waypoints {
        write_waypoint(em, BytesStart::new("wpt"), waypoint)?;
    }
    for route in &doc.routes {
        write_route(em, route)?;
    }
    for track in &doc.tracks {
        write_track(em, track)?;
    }
    em.extensions(&doc.extensions)?;
    em.end("gpx")
}

fn write_metadata<W: Write>(em: &mut Emitter<'_, W>, metadata: &Metadata) -> Result<()> {
    em.start(BytesStart::new("metadata"))?;
    em.string("name", &metadata.name)?;
    em.string("desc", &metadata.desc)?;
    if let Some(author) = &metadata.author {
        write_person(em, "author", author)?;
    }
    if let Some(copyright) = &metadata.copyright {
        write_copyright(em, copyright)?;
    }
    em.links(&metadata.links)?;
    em.time("time", &metadata.time)?;
    em.string("keywords", &metadata.keywords)?;
    if let Some(bounds) = &metadata.bounds {
        write_bounds(em, bounds)?;
    }
    em.extensions(&metadata.extensions)?;
    em.end("metadata")
}

fn write_person<W: Write>(em: &mut Emitter<'_, W>, name: &str, person: &Person) -> Result<()> {
    em.start(BytesStart::new(name))?;
    em.string("name", &person.name)?;
    em.string("email", &person.email)?;
    if let Some(link) = &person.link {
        write_link(em, "link", link)?;
    }
    em.end(name)
}

fn write_copyright<W: Write>(em: &mut Emitter<'_, W>, copyright: &Copyright) -> Result<()> {
    let mut start = BytesStart::new("copyright");
    start.push_attribute(("author", copyright.author.as_str()));
    em.start(start)?;
    em.int("year", copyright.year)?;
    em.string("license", &copyright.license)?;
    em.end("copyright")
}

fn write_link<W: Write>(em: &mut Emitter<'_, W>, name: &str, link: &Link) -> Result<()> {
    let mut start = BytesStart::new(name);
    start.push_attribute(("href", link.href.as_str()));
    em.start(start)?;
    em.string("text", &link.text)?;
    em.string("type", &link.link_type)?;
    em.end(name)
}

fn write_bounds<W: Write>(em: &mut Emitter<'_, W>, bounds: &Bounds) -> Result<()> {
    let mut start = BytesStart::new("bounds");
    start.push_attribute(("minlat", format_float(bounds.min_lat).as_str()));
    start.push_attribute(("minlon", format_float(bounds.min_lon).as_str()));
    start.push_attribute(("maxlat", format_float(bounds.max_lat).as_str()));
    start.push_attribute(("maxlon", format_float(bounds.max_lon).as_str()));
    em.start(start)?;
    em.end("bounds")
}

/// Write a point under whatever start tag the caller built; `lat` and `lon`
/// follow the attributes it already carries.
fn write_waypoint<W: Write>(
    em: &mut Emitter<'_, W>,
    mut start: BytesStart<'_>,
    point: &Waypoint,
) -> Result<()> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    start.push_attribute(("lat", format_float(point.lat).as_str()));
    start.push_attribute(("lon", format_float(point.lon).as_str()));
    em.start(start)?;

    em.float("ele", point.ele)?;
    em.float("speed", point.speed)?;
    em.float("course", point.course)?;
    em.time("time", &point.time)?;
    em.float("magvar", point.magvar)?;
    em.float("geoidheight", point.geoid_height)?;
    em.string("name", &point.name)?;
    em.string("cmt", &point.cmt)?;
    em.string("desc", &point.desc)?;
    em.string("src", &point.src)?;
    em.links(&point.links)?;
    em.string("sym", &point.sym)?;
    em.string("type", &point.point_type)?;
    em.string("fix", &point.fix)?;
    em.int("sat", point.sat)?;
    em.float("hdop", point.hdop)?;
    em.float("vdop", point.vdop)?;
    em.float("pdop", point.pdop)?;
    em.float("ageofdgpsdata", point.age_of_dgps_data)?;
    // Every station id is written, zero included.
    for id in &point.dgps_ids {
        em.text_element("dgpsid", &id.to_string())?;
    }
    em.extensions(&point.extensions)?;
    em.end(&name)
}

fn write_route<W: Write>(em: &mut Emitter<'_, W>, route: &Route) -> Result<()> {
    em.start(BytesStart::new("rte"))?;
    em.string("name", &route.name)?;
    em.string("cmt", &route.cmt)?;
    em.string("desc", &route.desc)?;
    em.string("src", &route.src)?;
    em.links(&route.links)?;
    em.int("number", route.number)?;
    em.string("type", &route.route_type)?;
    em.extensions(&route.extensions)?;
    for point in &route.points {
        write_waypoint(em, BytesStart::new("rtept"), point)?;
    }
    em.end("rte")
}

fn write_track<W: Write>(em: &mut Emitter<'_, W>, track: &Track) -> Result<()> {
    em.start(BytesStart::new("trk"))?;
    em.string("name", &track.name)?;
    em.string("cmt", &track.cmt)?;
    em.string("desc", &track.desc)?;
    em.string("src", &track.src)?;
    em.links(&track.links)?;
    em.int("number", track.number)?;
    em.string("type", &track.track_type)?;
    em.extensions(&track.extensions)?;
    for segment in &track.segments {
        em.start(BytesStart::new("trkseg"))?;
        for point in &segment.points {
            write_waypoint(em, BytesStart::new("trkpt"), point)?;
        }
        em.extensions(&segment.extensions)?;
        em.end("trkseg")?;
    }
    em.end("trk")
}
