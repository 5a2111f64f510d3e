use wasm_bindgen::JsValue;

/// Everything that can go wrong while reading, writing or converting GPX.
#[derive(Debug, thiserror::Error)]
pub enum GpxError {
    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::Error),

    #[error("XML escape error: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported character encoding '{label}'")]
    UnsupportedEncoding { label: String },

    #[error("Input is not valid {encoding}")]
    MalformedEncoding { encoding: &'static str },

    #[error("No <gpx> element found")]
    MissingRoot,

    #[error("Expected <gpx> root element, found <{name}>")]
    UnexpectedRoot { name: String },

    #[error("Unexpected end of input inside <{element}>")]
    UnexpectedEof { element: String },

    #[error("Missing attribute '{attribute}' on <{element}>")]
    MissingAttribute { element: String, attribute: &'static str },

    #[error("Invalid value '{value}' for attribute '{attribute}' on <{element}>")]
    InvalidAttribute {
        element: String,
        attribute: &'static str,
        value: String,
    },

    #[error("Invalid number '{value}' in <{element}>")]
    InvalidNumber { element: &'static str, value: String },

    #[error("No matching time layout for '{value}'")]
    NoMatchingTimeLayout { value: String },

    #[error("Invalid copyright year '{value}'")]
    InvalidYear { value: String },

    #[error("{len} coordinates do not divide into stride {stride}")]
    StrideMismatch { len: usize, stride: usize },

    #[error("Line string ends {ends:?} do not fit {len} coordinates of stride {stride}")]
    InvalidEnds {
        ends: Vec<usize>,
        len: usize,
        stride: usize,
    },
}

impl GpxError {
    /// True for errors raised on well-formed XML whose text content could not
    /// be interpreted (timestamps, copyright years).
    pub fn is_semantic(&self) -> bool {
        matches!(
            self,
            Self::NoMatchingTimeLayout { .. } | Self::InvalidYear { .. }
        )
    }
}

impl From<quick_xml::events::attributes::AttrError> for GpxError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        Self::XmlParse(e.into())
    }
}

impl From<GpxError> for JsValue {
    fn from(e: GpxError) -> Self {
        js_sys::Error::new(&e.to_string()).into()
    }
}

pub type Result<T> = std::result::Result<T, GpxError>;
