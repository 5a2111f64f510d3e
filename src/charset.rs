//! Turn raw document bytes into UTF-8 text before XML parsing.
//!
//! Detection order: byte order mark, UTF-16 without BOM (from the `<?`
//! pattern), then the `encoding` pseudo-attribute of the XML declaration.
//! Anything else is read as UTF-8.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};

use crate::error::{GpxError, Result};

/// The declaration must appear within this many bytes.
const DECLARATION_WINDOW: usize = 1024;

/// Detect the document encoding and decode `bytes` to UTF-8.
pub fn decode_to_utf8(bytes: &[u8]) -> Result<Cow<'_, str>> {
    let (encoding, offset) = detect_encoding(bytes)?;
    if encoding != UTF_8 {
        log::debug!("transcoding GPX input from {}", encoding.name());
    }
    encoding
        .decode_without_bom_handling_and_without_replacement(&bytes[offset..])
        .ok_or(GpxError::MalformedEncoding {
            encoding: encoding.name(),
        })
}

/// Returns the encoding and the length of any byte order mark to skip.
fn detect_encoding(bytes: &[u8]) -> Result<(&'static Encoding, usize)> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return Ok((encoding, bom_len));
    }
    match bytes {
        [b'<', 0, b'?', 0, ..] => return Ok((UTF_16LE, 0)),
        [0, b'<', 0, b'?', ..] => return Ok((UTF_16BE, 0)),
        _ => {}
    }
    let Some(label) = declared_encoding(bytes) else {
        return Ok((UTF_8, 0));
    };
    let encoding = Encoding::for_label(label.as_bytes()).ok_or_else(|| {
        GpxError::UnsupportedEncoding {
            label: label.to_string(),
        }
    })?;
    // A UTF-16 label on 8-bit input cannot be right; the bytes are ASCII-compatible.
    if encoding == UTF_16LE || encoding == UTF_16BE {
        return Ok((UTF_8, 0));
    }
    Ok((encoding, 0))
}

/// Pull the `encoding="..."` value out of a leading `<?xml ... ?>`.
fn declared_encoding(bytes: &[u8]) -> Option<&str> {
    let window = &bytes[..bytes.len().min(DECLARATION_WINDOW)];
    let decl = window.strip_prefix(b"<?xml")?;
    let end = decl.windows(2).position(|w| w == b"?>")?;
    let decl = std::str::from_utf8(&decl[..end]).ok()?;

    let rest = &decl[decl.find("encoding")? + "encoding".len()..];
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &rest[1..];
    value.find(quote).map(|close| &value[..close])
}
