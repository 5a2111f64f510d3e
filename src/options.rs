use serde::Deserialize;

/// A way of reading GPX timestamp text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeLayout {
    /// RFC 3339: optional fractional seconds, `Z` or a numeric offset.
    Rfc3339,
    /// A chrono `strftime` pattern. Without an offset field the text is read
    /// as UTC; a date-only pattern yields midnight UTC.
    Format(String),
}

/// Options applied while decoding a document. Encoding is not affected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Tried in order; the first layout that parses wins.
    pub time_layouts: Vec<TimeLayout>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            time_layouts: vec![
                TimeLayout::Rfc3339,
                TimeLayout::Format("%Y-%m-%dT%H:%M:%S%.f".to_string()),
            ],
        }
    }
}

impl DecodeOptions {
    /// Replace the layout list with a single layout.
    pub fn with_time_layout(self, layout: TimeLayout) -> Self {
        self.with_time_layouts(vec![layout])
    }

    /// Replace the layout list with an ordered list of fallbacks.
    pub fn with_time_layouts(mut self, layouts: Vec<TimeLayout>) -> Self {
        self.time_layouts = layouts;
        self
    }
}

/// Options for GPX to GeoJSON conversion.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertOptions {
    /// Include elevation as the 3rd coordinate value (default: true)
    #[serde(default = "default_true")]
    pub include_elevation: bool,

    /// Include timestamps in coordinateProperties.times (default: true)
    #[serde(default = "default_true")]
    pub include_time: bool,

    /// Include metadata (name, desc, etc.) in properties (default: true)
    #[serde(default = "default_true")]
    pub include_metadata: bool,

    /// Which GPX element types to convert (default: all)
    #[serde(default)]
    pub types: Option<Vec<GpxElementType>>,

    /// Join track segments into a single MultiLineString (default: false)
    #[serde(default)]
    pub join_track_segments: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            include_elevation: true,
            include_time: true,
            include_metadata: true,
            types: None,
            join_track_segments: false,
        }
    }
}

impl ConvertOptions {
    pub fn should_include(&self, element_type: GpxElementType) -> bool {
        match &self.types {
            None => true,
            Some(types) => types.contains(&element_type),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpxElementType {
    Waypoint,
    Route,
    Track,
}

fn default_true() -> bool {
    true
}
