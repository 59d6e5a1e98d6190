//! Atom feed parsing and normalization.
//!
//! Raw document bytes flow through the following stages:
//!
//! - **Charset**: non-UTF-8 documents are translated by a pluggable [`CharsetDecoder`]
//! - **Decoding**: the XML is reduced to an [`AtomFeed`] with raw entry text
//! - **Normalization**: each entry gets an ID, is checked against read state,
//!   has its date parsed and is deduplicated into the final [`Feed`]
//!
//! # Example
//!
//! ```
//! use atomfeed::feed::parse_atom;
//! use atomfeed::storage::NeverRead;
//!
//! let xml = br#"<feed><title>Blog</title>
//!   <entry><id>1</id><title>Hello</title><updated>2024-05-01T10:00:00Z</updated></entry>
//! </feed>"#;
//!
//! let feed = parse_atom(xml, &NeverRead).unwrap();
//! assert_eq!(feed.unread, 1);
//! assert_eq!(feed.items[0].title, "Hello");
//! ```

mod charset;
mod id;
mod normalize;
mod parser;
mod timestamp;
mod types;

pub use charset::{BuiltinCharsets, CharsetDecoder};
pub use id::{assign_id, synthetic_id};
pub use normalize::{
    parse_atom, FeedError, FeedParser, ParseOptions, TimestampPolicy,
    DEFAULT_REFRESH_INTERVAL_MINUTES,
};
pub use parser::{decode_feed, AtomEntry, AtomFeed, DecodeError};
pub use timestamp::{parse_timestamp, TimestampError};
pub use types::{Feed, Image, Item};
