//! Free-form timestamp parsing for feed entries.
//!
//! Feeds in the wild rarely stick to RFC 3339, so a timestamp is first tried
//! as Unix epoch seconds and then against an ordered list of layouts. Some
//! layouts accept a subset of what later ones accept, so the first match wins.

use chrono::{DateTime, NaiveDateTime, Utc, Weekday};
use thiserror::Error;

use crate::util::collapse_whitespace;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimestampError {
    /// Neither an epoch second count nor any known layout matched.
    #[error("unrecognized timestamp: {0:?}")]
    Unrecognized(String),
}

/// How a layout begins with respect to a weekday name.
///
/// Weekday names are validated but not cross-checked against the date, since
/// publishers frequently get them wrong.
#[derive(Debug, Clone, Copy)]
enum Lead {
    None,
    /// `Mon, ...`
    Comma,
    /// `Mon ...`
    Space,
}

/// How a layout expresses its UTC offset.
#[derive(Debug, Clone, Copy)]
enum Zone {
    /// Numeric offset such as `-0700`.
    Offset,
    /// Alphabetic abbreviation such as `MST`, rewritten to a numeric offset
    /// before matching.
    Abbreviation,
    /// No zone at all; the time is taken as UTC.
    Utc,
}

#[derive(Debug)]
enum Layout {
    Pattern {
        lead: Lead,
        format: &'static str,
        zone: Zone,
    },
    /// RFC 3339, with or without fractional seconds.
    Rfc3339,
}

const fn pattern(lead: Lead, format: &'static str, zone: Zone) -> Layout {
    Layout::Pattern { lead, format, zone }
}

const LAYOUTS: &[Layout] = &[
    // 2006-01-02 15:04:05 -0700
    pattern(Lead::None, "%Y-%m-%d %H:%M:%S %z", Zone::Offset),
    // 02 Jan 2006 15:04:05 -0700
    pattern(Lead::None, "%d %b %Y %H:%M:%S %z", Zone::Offset),
    // Mon, 02 Jan 06 15:04:05 -0700
    pattern(Lead::Comma, "%d %b %y %H:%M:%S %z", Zone::Offset),
    // Mon, 02 January 2006 15:04:05 -0700
    pattern(Lead::Comma, "%d %B %Y %H:%M:%S %z", Zone::Offset),
    // Mon, 2 Jan 2006 15:04:05 MST (also RFC 1123)
    pattern(Lead::Comma, "%d %b %Y %H:%M:%S %z", Zone::Abbreviation),
    // Mon, 2 Jan 2006 15:04:05 -0700 (also RFC 1123Z)
    pattern(Lead::Comma, "%d %b %Y %H:%M:%S %z", Zone::Offset),
    // ANSIC: Mon Jan 2 15:04:05 2006
    pattern(Lead::Space, "%b %d %H:%M:%S %Y", Zone::Utc),
    // Unix date: Mon Jan 2 15:04:05 MST 2006
    pattern(Lead::Space, "%b %d %H:%M:%S %z %Y", Zone::Abbreviation),
    // Ruby date: Mon Jan 02 15:04:05 -0700 2006
    pattern(Lead::Space, "%b %d %H:%M:%S %z %Y", Zone::Offset),
    // RFC 822: 02 Jan 06 15:04 MST
    pattern(Lead::None, "%d %b %y %H:%M %z", Zone::Abbreviation),
    // RFC 822Z: 02 Jan 06 15:04 -0700
    pattern(Lead::None, "%d %b %y %H:%M %z", Zone::Offset),
    // RFC 850: Monday, 02-Jan-06 15:04:05 MST
    pattern(Lead::Comma, "%d-%b-%y %H:%M:%S %z", Zone::Abbreviation),
    Layout::Rfc3339,
];

/// RFC 822 zone names, in hours east of UTC.
const ZONE_OFFSETS: &[(&str, i32)] = &[
    ("UT", 0),
    ("UTC", 0),
    ("GMT", 0),
    ("Z", 0),
    ("EST", -5),
    ("EDT", -4),
    ("CST", -6),
    ("CDT", -5),
    ("MST", -7),
    ("MDT", -6),
    ("PST", -8),
    ("PDT", -7),
];

/// Parses a feed timestamp.
///
/// Surrounding whitespace is ignored and inner runs of whitespace are
/// collapsed. A plain base-10 integer is read as seconds since the Unix
/// epoch; otherwise the first matching layout decides.
///
/// # Errors
///
/// Returns [`TimestampError::Unrecognized`] when nothing matches.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, TimestampError> {
    let normalized = collapse_whitespace(raw);

    if let Ok(secs) = normalized.parse::<i64>() {
        if let Some(instant) = DateTime::from_timestamp(secs, 0) {
            return Ok(instant);
        }
    }

    LAYOUTS
        .iter()
        .find_map(|layout| layout.parse(&normalized))
        .ok_or_else(|| TimestampError::Unrecognized(raw.trim().to_string()))
}

impl Layout {
    fn parse(&self, s: &str) -> Option<DateTime<Utc>> {
        match self {
            Layout::Rfc3339 => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|t| t.with_timezone(&Utc)),
            Layout::Pattern { lead, format, zone } => {
                let rest = strip_weekday(s, *lead)?;
                match zone {
                    Zone::Offset => parse_with_offset(rest, format),
                    Zone::Abbreviation => {
                        parse_with_offset(&replace_zone_abbreviation(rest)?, format)
                    }
                    Zone::Utc => NaiveDateTime::parse_from_str(rest, format)
                        .ok()
                        .map(|naive| naive.and_utc()),
                }
            }
        }
    }
}

fn parse_with_offset(s: &str, format: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(s, format)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn strip_weekday(s: &str, lead: Lead) -> Option<&str> {
    let (day, rest) = match lead {
        Lead::None => return Some(s),
        Lead::Comma => s.split_once(", ")?,
        Lead::Space => s.split_once(' ')?,
    };
    day.parse::<Weekday>().ok()?;
    Some(rest)
}

/// Table names match exactly; anything else needs 3 to 5 capitals.
fn is_zone_abbreviation(token: &str) -> bool {
    ZONE_OFFSETS.iter().any(|(name, _)| *name == token)
        || ((3..=5).contains(&token.len()) && token.bytes().all(|b| b.is_ascii_uppercase()))
}

/// Replaces the last zone abbreviation in `s` with its numeric offset.
///
/// Unknown abbreviations are given a zero offset. The first token is never
/// treated as a zone.
fn replace_zone_abbreviation(s: &str) -> Option<String> {
    let (index, abbreviation) = s
        .split(' ')
        .enumerate()
        .filter(|(i, token)| *i > 0 && is_zone_abbreviation(token))
        .last()?;

    let hours = ZONE_OFFSETS
        .iter()
        .find(|(name, _)| *name == abbreviation)
        .map_or(0, |(_, hours)| *hours);
    let sign = if hours < 0 { '-' } else { '+' };
    let offset = format!("{}{:02}00", sign, hours.abs());

    let replaced: Vec<&str> = s
        .split(' ')
        .enumerate()
        .map(|(i, token)| if i == index { offset.as_str() } else { token })
        .collect();
    Some(replaced.join(" "))
}
