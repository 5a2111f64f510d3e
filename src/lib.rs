//! GPX 1.0/1.1 reading and writing, with geometry and GeoJSON views of the
//! parsed document.

pub mod charset;
pub mod converter;
pub mod error;
pub mod geom;
pub mod geometry;
pub mod gpx_types;
pub mod options;
pub mod parser;
pub mod time;
pub mod writer;

use wasm_bindgen::prelude::*;

pub use crate::error::{GpxError, Result};
pub use crate::geom::{Layout, LineString, MultiLineString, Point};
pub use crate::gpx_types::*;
pub use crate::options::{ConvertOptions, DecodeOptions, GpxElementType, TimeLayout};
pub use crate::parser::{parse_bytes_with_options, parse_gpx, parse_gpx_with_options, read, read_with_options};
pub use crate::time::{measure_to_time, time_to_measure};
pub use crate::writer::XML_HEADER;

/// Convert GPX string to GeoJSON, returned as a JS object.
#[wasm_bindgen(js_name = gpxToGeoJson)]
pub fn gpx_to_geojson(gpx_string: &str, options: JsValue) -> std::result::Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let opts = parse_options(options)?;
    let doc = parser::parse_gpx(gpx_string)?;
    let fc = converter::to_feature_collection(&doc, &opts)?;
    serde_wasm_bindgen::to_value(&fc).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Convert GPX string to GeoJSON, returned as a JSON string.
#[wasm_bindgen(js_name = gpxToGeoJsonString)]
pub fn gpx_to_geojson_string(gpx_string: &str, options: JsValue) -> std::result::Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let opts = parse_options(options)?;
    let doc = parser::parse_gpx(gpx_string)?;
    let fc = converter::to_feature_collection(&doc, &opts)?;
    serde_json::to_string(&fc).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Parse GPX into the document model, returned as a JS object.
#[wasm_bindgen(js_name = readGpx)]
pub fn read_gpx(gpx_string: &str) -> std::result::Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let doc = parser::parse_gpx(gpx_string)?;
    serde_wasm_bindgen::to_value(&doc).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Parse GPX and write it back in canonical form with two-space indentation.
#[wasm_bindgen(js_name = normalizeGpx)]
pub fn normalize_gpx(gpx_string: &str) -> std::result::Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let doc = parser::parse_gpx(gpx_string)?;
    let body = doc.to_xml_string("", "  ")?;
    Ok(format!("{XML_HEADER}{body}"))
}

fn parse_options(options: JsValue) -> std::result::Result<ConvertOptions, JsValue> {
    if options.is_undefined() || options.is_null() {
        Ok(ConvertOptions::default())
    } else {
        serde_wasm_bindgen::from_value(options).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}
