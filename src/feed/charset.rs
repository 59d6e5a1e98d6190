//! Character-set translation ahead of XML tokenization.
//!
//! The tokenizer only understands UTF-8. When a document declares another
//! encoding in its XML declaration, the raw bytes are handed to a
//! [`CharsetDecoder`] first. Callers needing more than the built-in set plug
//! in their own implementation.

use quick_xml::events::Event;
use quick_xml::Reader;

use super::parser::DecodeError;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Translates a byte stream in a named encoding into UTF-8 text.
pub trait CharsetDecoder {
    /// `label` is the encoding name exactly as declared in the document.
    fn decode(&self, label: &str, bytes: &[u8]) -> Result<String, DecodeError>;
}

/// Handles US-ASCII and ISO-8859-1 (Latin-1).
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCharsets;

impl CharsetDecoder for BuiltinCharsets {
    fn decode(&self, label: &str, bytes: &[u8]) -> Result<String, DecodeError> {
        match label.to_ascii_lowercase().as_str() {
            "us-ascii" | "ascii" => {
                if let Some(pos) = bytes.iter().position(|b| !b.is_ascii()) {
                    return Err(DecodeError::InvalidEncoding(format!(
                        "non-ASCII byte 0x{:02x} at offset {} in US-ASCII document",
                        bytes[pos], pos
                    )));
                }
                Ok(bytes.iter().map(|&b| char::from(b)).collect())
            }
            // Latin-1 maps every byte straight onto the first 256 code points
            "iso-8859-1" | "iso8859-1" | "iso_8859-1" | "latin1" | "latin-1" | "l1" => {
                Ok(bytes.iter().map(|&b| char::from(b)).collect())
            }
            _ => Err(DecodeError::UnsupportedCharset(label.to_string())),
        }
    }
}

/// Produces UTF-8 text from raw document bytes.
///
/// A leading UTF-8 byte-order mark is dropped. Documents without an encoding
/// declaration, or declaring UTF-8, must already be valid UTF-8.
pub fn to_utf8(data: &[u8], charset: &dyn CharsetDecoder) -> Result<String, DecodeError> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);

    match declared_encoding(data)? {
        Some(label) if !is_utf8_label(&label) => {
            tracing::debug!(charset = %label, "Translating non-UTF-8 document");
            charset.decode(&label, data)
        }
        _ => std::str::from_utf8(data)
            .map(str::to_owned)
            .map_err(|e| DecodeError::InvalidEncoding(e.to_string())),
    }
}

fn is_utf8_label(label: &str) -> bool {
    label.eq_ignore_ascii_case("utf-8") || label.eq_ignore_ascii_case("utf8")
}

/// Reads the `encoding` pseudo-attribute of the XML declaration, if any.
fn declared_encoding(data: &[u8]) -> Result<Option<String>, DecodeError> {
    let mut reader = Reader::from_reader(data);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Decl(decl)) => {
                return match decl.encoding() {
                    Some(Ok(label)) => Ok(Some(String::from_utf8_lossy(&label).into_owned())),
                    Some(Err(e)) => Err(DecodeError::Xml(e.to_string())),
                    None => Ok(None),
                };
            }
            // The declaration may only be preceded by nothing at all, but a
            // stray leading blank line is common enough to look past
            Ok(Event::Text(text)) if text.iter().all(u8::is_ascii_whitespace) => {}
            Ok(_) => return Ok(None),
            Err(e) => return Err(DecodeError::Xml(e.to_string())),
        }
        buf.clear();
    }
}
