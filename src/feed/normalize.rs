use std::collections::HashSet;
use std::fmt;

use chrono::{Duration, Utc};
use serde::Deserialize;
use thiserror::Error;

use super::charset::{BuiltinCharsets, CharsetDecoder};
use super::id::assign_id;
use super::parser::{decode_feed, AtomEntry, AtomFeed, DecodeError};
use super::timestamp::{parse_timestamp, TimestampError};
use super::types::{Feed, Item};
use crate::storage::ReadState;

/// How long a freshly parsed feed is considered current.
pub const DEFAULT_REFRESH_INTERVAL_MINUTES: u64 = 10;

/// Errors that abort a whole parse. No partial feed is returned.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Failed to decode feed: {0}")]
    Decode(#[from] DecodeError),

    /// The document decoded but holds no `<entry>` elements.
    #[error("no entries found in feed")]
    Empty,

    /// Only produced under [`TimestampPolicy::Fail`].
    #[error("entry {id:?} has an unparseable date: {source}")]
    Timestamp {
        id: String,
        #[source]
        source: TimestampError,
    },
}

/// What to do with an entry whose `<updated>` text cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampPolicy {
    /// Drop the entry with a warning, like a missing or duplicate ID.
    #[default]
    Skip,
    /// Abort the whole parse with [`FeedError::Timestamp`].
    Fail,
}

#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Attach full entry dumps to warnings and log the raw document after a
    /// parse that produced any.
    pub debug: bool,
    /// Added to the current time to produce [`Feed::refresh`].
    pub refresh_interval: Duration,
    pub on_bad_timestamp: TimestampPolicy,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            debug: false,
            refresh_interval: Duration::minutes(DEFAULT_REFRESH_INTERVAL_MINUTES as i64),
            on_bad_timestamp: TimestampPolicy::default(),
        }
    }
}

/// Why an entry was left out of the feed.
#[derive(Debug)]
enum SkipReason {
    MissingId,
    DuplicateId,
    BadTimestamp(TimestampError),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingId => f.write_str("no ID"),
            SkipReason::DuplicateId => f.write_str("duplicate ID"),
            SkipReason::BadTimestamp(e) => write!(f, "{}", e),
        }
    }
}

/// Turns Atom documents into normalized [`Feed`]s.
///
/// Holds no state between calls; the duplicate-tracking set lives in the
/// returned feed and is rebuilt from scratch on every parse.
#[derive(Debug, Clone)]
pub struct FeedParser<C = BuiltinCharsets> {
    options: ParseOptions,
    charset: C,
}

impl FeedParser {
    pub fn new(options: ParseOptions) -> Self {
        Self {
            options,
            charset: BuiltinCharsets,
        }
    }
}

impl Default for FeedParser {
    fn default() -> Self {
        Self::new(ParseOptions::default())
    }
}

impl<C: CharsetDecoder> FeedParser<C> {
    /// Uses `charset` to translate documents declaring a non-UTF-8 encoding.
    pub fn with_charset(options: ParseOptions, charset: C) -> Self {
        Self { options, charset }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Decodes and normalizes one document.
    ///
    /// # Errors
    ///
    /// - [`FeedError::Decode`] if the bytes are not a well-formed Atom feed
    /// - [`FeedError::Empty`] if the feed has no entries
    /// - [`FeedError::Timestamp`] on a bad date under [`TimestampPolicy::Fail`]
    pub fn parse(&self, data: &[u8], read: &dyn ReadState) -> Result<Feed, FeedError> {
        let atom = decode_feed(data, &self.charset)?;
        let (feed, warnings) = self.build(atom, read)?;

        if warnings > 0 && self.options.debug {
            tracing::debug!(
                warnings,
                document = %String::from_utf8_lossy(data),
                "Feed parsed with warnings"
            );
        }
        Ok(feed)
    }

    /// Normalizes an already decoded document.
    pub fn normalize(&self, atom: AtomFeed, read: &dyn ReadState) -> Result<Feed, FeedError> {
        self.build(atom, read).map(|(feed, _)| feed)
    }

    /// Walks entries in document order. Each entry sees the item map as left
    /// by every entry before it.
    fn build(&self, atom: AtomFeed, read: &dyn ReadState) -> Result<(Feed, usize), FeedError> {
        if atom.entries.is_empty() {
            return Err(FeedError::Empty);
        }

        let mut feed = Feed {
            title: atom.title,
            description: atom.description,
            link: atom.link,
            image: atom.image,
            items: Vec::with_capacity(atom.entries.len()),
            item_map: HashSet::new(),
            unread: 0,
            refresh: Utc::now() + self.options.refresh_interval,
        };
        let mut warnings = 0;

        for entry in atom.entries {
            let id = assign_id(&entry.id, &entry.title, &entry.date);

            // One lookup per entry; an empty ID can't be meaningfully looked up
            if read.is_read(&id) && !id.is_empty() {
                tracing::trace!(id = %id, "Skipping entry already marked read");
                continue;
            }

            let date = if entry.date.trim().is_empty() {
                None
            } else {
                match parse_timestamp(&entry.date) {
                    Ok(date) => Some(date),
                    Err(source) => match self.options.on_bad_timestamp {
                        TimestampPolicy::Fail => return Err(FeedError::Timestamp { id, source }),
                        TimestampPolicy::Skip => {
                            self.report_skip(&entry, &id, SkipReason::BadTimestamp(source));
                            warnings += 1;
                            continue;
                        }
                    },
                }
            };

            // Unreachable while assign_id always synthesizes; kept as the ID-presence rule
            if id.is_empty() {
                self.report_skip(&entry, &id, SkipReason::MissingId);
                warnings += 1;
                continue;
            }

            if feed.item_map.contains(&id) {
                self.report_skip(&entry, &id, SkipReason::DuplicateId);
                warnings += 1;
                continue;
            }

            feed.item_map.insert(id.clone());
            feed.items.push(Item {
                title: entry.title,
                summary: entry.summary,
                content: entry.content,
                link: entry.link,
                date,
                id,
                read: false,
            });
            feed.unread += 1;
        }

        tracing::debug!(
            title = %feed.title,
            items = feed.items.len(),
            skipped = warnings,
            "Normalized feed"
        );
        Ok((feed, warnings))
    }

    fn report_skip(&self, entry: &AtomEntry, id: &str, reason: SkipReason) {
        if self.options.debug {
            tracing::warn!(title = %entry.title, id = %id, reason = %reason, entry = ?entry, "Skipping feed entry");
        } else {
            tracing::warn!(title = %entry.title, id = %id, reason = %reason, "Skipping feed entry");
        }
    }
}

/// Parses `data` with default options and built-in charsets.
pub fn parse_atom(data: &[u8], read: &dyn ReadState) -> Result<Feed, FeedError> {
    FeedParser::new(ParseOptions::default()).parse(data, read)
}
