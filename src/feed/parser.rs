//! Atom document decoding.
//!
//! Walks the XML event stream and collects the handful of elements the
//! normalizer needs into an [`AtomFeed`]. Everything else in the document is
//! skipped. Element names are matched on their local part, so namespace
//! prefixes (`<atom:entry>`) are accepted.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use super::charset::{to_utf8, CharsetDecoder};
use super::types::Image;

/// SEC-003: Maximum element nesting depth accepted in a feed document.
const MAX_DEPTH: usize = 64;

/// Errors that make a document undecodable.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// XML tokenization failed.
    #[error("XML parse error: {0}")]
    Xml(String),

    /// The document contains no root element.
    #[error("document has no root element")]
    MissingRoot,

    /// The root element is not an Atom `<feed>`.
    #[error("expected <feed> root element, found <{0}>")]
    UnexpectedRoot(String),

    /// Input ended with elements still open.
    #[error("unexpected end of document inside <{0}>")]
    Unclosed(String),

    /// An image dimension is not an integer.
    #[error("invalid image {field}: {value:?}")]
    InvalidDimension { field: &'static str, value: String },

    /// SEC-003: Element nesting exceeds safety limit.
    #[error("element nesting exceeds maximum of {0} levels")]
    MaxDepthExceeded(usize),

    /// The declared encoding has no registered translator.
    #[error("unsupported charset: {0}")]
    UnsupportedCharset(String),

    /// Bytes are not valid in the declared (or assumed) encoding.
    #[error("invalid character encoding: {0}")]
    InvalidEncoding(String),
}

/// Feed-level data as it appears in the document, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtomFeed {
    pub title: String,
    /// Taken from `<subtitle>`.
    pub description: String,
    pub link: String,
    pub image: Image,
    pub entries: Vec<AtomEntry>,
}

/// A single `<entry>` as it appears in the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtomEntry {
    pub title: String,
    pub summary: String,
    pub content: String,
    pub link: String,
    /// Raw `<updated>` text, untouched.
    pub date: String,
    /// Trimmed `<id>` text, possibly empty.
    pub id: String,
}

/// Tracks the best `<link>` seen so far for a feed or entry.
///
/// The first link with no `rel` or `rel="alternate"` wins; failing that, the
/// first link of any kind.
#[derive(Debug, Default)]
struct LinkChoice {
    href: String,
    alternate: bool,
}

impl LinkChoice {
    fn offer(&mut self, href: String, rel: Option<&str>) {
        if href.is_empty() {
            return;
        }
        let alternate = rel.map_or(true, |rel| rel == "alternate");
        if self.href.is_empty() || (alternate && !self.alternate) {
            self.href = href;
            self.alternate = alternate;
        }
    }
}

#[derive(Debug, Default)]
struct FeedBuilder {
    feed: AtomFeed,
    feed_link: LinkChoice,
    entry_link: LinkChoice,
    image_height: String,
    image_width: String,
}

impl FeedBuilder {
    /// Handles an opening tag. `path` holds the enclosing elements.
    fn open(&mut self, path: &[String], name: &str, link: Option<(String, Option<String>)>) {
        match (path.len(), name) {
            (1, "entry") => {
                self.feed.entries.push(AtomEntry::default());
                self.entry_link = LinkChoice::default();
            }
            (1, "link") => {
                if let Some((href, rel)) = link {
                    self.feed_link.offer(href, rel.as_deref());
                }
            }
            (2, "link") if path[1] == "entry" => {
                if let Some((href, rel)) = link {
                    self.entry_link.offer(href, rel.as_deref());
                }
            }
            _ => {}
        }
    }

    /// Handles a closing tag. `path` holds the enclosing elements.
    fn close(&mut self, path: &[String], name: &str) {
        if path.len() == 1 && name == "entry" {
            if let Some(entry) = self.feed.entries.last_mut() {
                entry.link = std::mem::take(&mut self.entry_link).href;
                entry.id = entry.id.trim().to_string();
            }
        }
    }

    /// Returns the field that character data at `path` belongs to.
    fn text_slot(&mut self, path: &[String]) -> Option<&mut String> {
        let child = path.get(1).map(String::as_str);
        let grandchild = path.get(2).map(String::as_str);

        match (child?, grandchild) {
            ("title", _) => Some(&mut self.feed.title),
            ("subtitle", _) => Some(&mut self.feed.description),
            ("image", Some("title")) => Some(&mut self.feed.image.title),
            ("image", Some("url")) => Some(&mut self.feed.image.url),
            ("image", Some("height")) => Some(&mut self.image_height),
            ("image", Some("width")) => Some(&mut self.image_width),
            ("entry", Some(field)) => {
                let entry = self.feed.entries.last_mut()?;
                match field {
                    "title" => Some(&mut entry.title),
                    "summary" => Some(&mut entry.summary),
                    "content" => Some(&mut entry.content),
                    "updated" if path.len() == 3 => Some(&mut entry.date),
                    "id" if path.len() == 3 => Some(&mut entry.id),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn finish(mut self) -> Result<AtomFeed, DecodeError> {
        self.feed.link = self.feed_link.href;
        self.feed.image.height = parse_dimension("height", &self.image_height)?;
        self.feed.image.width = parse_dimension("width", &self.image_width)?;
        Ok(self.feed)
    }
}

/// Negative values clamp to zero, empty text means zero.
fn parse_dimension(field: &'static str, raw: &str) -> Result<u32, DecodeError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    let value: i64 = raw.parse().map_err(|_| DecodeError::InvalidDimension {
        field,
        value: raw.to_string(),
    })?;
    Ok(u32::try_from(value.max(0)).unwrap_or(u32::MAX))
}

/// Decodes raw document bytes into an [`AtomFeed`].
///
/// Non-UTF-8 documents are translated through `charset` first. A document
/// with zero entries decodes successfully; rejecting it is up to the caller.
///
/// # Errors
///
/// Returns a [`DecodeError`] if the bytes are not well-formed XML, the root
/// element is not `<feed>`, or an image dimension is not numeric.
///
/// # Security
///
/// SEC-002: `quick-xml` never expands `<!ENTITY>` declarations; only the five
/// predefined XML entities are resolved when unescaping text and attributes.
pub fn decode_feed(data: &[u8], charset: &dyn CharsetDecoder) -> Result<AtomFeed, DecodeError> {
    let text = to_utf8(data, charset)?;
    let mut reader = Reader::from_str(&text);

    let mut builder = FeedBuilder::default();
    let mut path: Vec<String> = Vec::new();
    let mut seen_root = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = local_name(&e)?;
                enter(&path, &mut seen_root, &name)?;
                let link = link_attributes(&e, &name, &reader)?;
                builder.open(&path, &name, link);
                path.push(name);
            }
            Ok(Event::Empty(e)) => {
                let name = local_name(&e)?;
                enter(&path, &mut seen_root, &name)?;
                let link = link_attributes(&e, &name, &reader)?;
                builder.open(&path, &name, link);
                builder.close(&path, &name);
            }
            Ok(Event::End(_)) => {
                if let Some(name) = path.pop() {
                    builder.close(&path, &name);
                }
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|e| DecodeError::Xml(e.to_string()))?;
                append_text(&mut builder, &path, &text)?;
            }
            Ok(Event::CData(e)) => {
                let text = std::str::from_utf8(&e).map_err(|e| DecodeError::Xml(e.to_string()))?;
                append_text(&mut builder, &path, text)?;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(DecodeError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = path.last() {
        return Err(DecodeError::Unclosed(open.clone()));
    }
    if !seen_root {
        return Err(DecodeError::MissingRoot);
    }

    builder.finish()
}

/// Validates an element about to be pushed onto `path`.
fn enter(path: &[String], seen_root: &mut bool, name: &str) -> Result<(), DecodeError> {
    if path.is_empty() {
        if *seen_root {
            return Err(DecodeError::Xml(format!(
                "unexpected second root element <{}>",
                name
            )));
        }
        if name != "feed" {
            return Err(DecodeError::UnexpectedRoot(name.to_string()));
        }
        *seen_root = true;
    }
    // SEC-003: Reject excessively nested documents
    if path.len() >= MAX_DEPTH {
        return Err(DecodeError::MaxDepthExceeded(MAX_DEPTH));
    }
    Ok(())
}

fn append_text(builder: &mut FeedBuilder, path: &[String], text: &str) -> Result<(), DecodeError> {
    if path.is_empty() {
        if text.trim().is_empty() {
            return Ok(());
        }
        return Err(DecodeError::Xml(
            "character data outside the root element".to_string(),
        ));
    }
    if let Some(slot) = builder.text_slot(path) {
        slot.push_str(text);
    }
    Ok(())
}

fn local_name(e: &BytesStart<'_>) -> Result<String, DecodeError> {
    std::str::from_utf8(e.local_name().as_ref())
        .map(str::to_owned)
        .map_err(|e| DecodeError::Xml(e.to_string()))
}

/// Extracts `href` and `rel` from a `<link>` element.
fn link_attributes(
    e: &BytesStart<'_>,
    name: &str,
    reader: &Reader<&[u8]>,
) -> Result<Option<(String, Option<String>)>, DecodeError> {
    if name != "link" {
        return Ok(None);
    }

    let mut href = None;
    let mut rel = None;
    for attr_result in e.attributes() {
        let attr = match attr_result {
            Ok(attr) => attr,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed link attribute");
                continue;
            }
        };
        let value = || {
            attr.decode_and_unescape_value(reader.decoder())
                .map(|v| v.into_owned())
                .map_err(|e| DecodeError::Xml(e.to_string()))
        };
        match attr.key.local_name().as_ref() {
            b"href" => href = Some(value()?),
            b"rel" => rel = Some(value()?),
            _ => {}
        }
    }

    Ok(href.map(|href| (href, rel)))
}
