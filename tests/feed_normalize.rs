//! Integration tests for the parse-and-normalize pipeline.
//!
//! Each test builds an Atom document in memory and runs it through the
//! public API, checking the invariants the resulting `Feed` must uphold.

use std::collections::HashSet;

use atomfeed::feed::{
    parse_atom, synthetic_id, CharsetDecoder, DecodeError, Feed, FeedError, FeedParser,
    ParseOptions, TimestampPolicy,
};
use atomfeed::storage::{NeverRead, ReadStateFile};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

struct TestEntry<'a> {
    id: &'a str,
    title: &'a str,
    updated: &'a str,
}

fn entry<'a>(id: &'a str, title: &'a str, updated: &'a str) -> TestEntry<'a> {
    TestEntry { id, title, updated }
}

fn document(entries: &[TestEntry<'_>]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Test Feed</title>
  <subtitle>Things happen</subtitle>
  <link href="https://example.com/"/>
"#,
    );
    for e in entries {
        xml.push_str("  <entry>\n");
        if !e.id.is_empty() {
            xml.push_str(&format!("    <id>{}</id>\n", e.id));
        }
        xml.push_str(&format!("    <title>{}</title>\n", e.title));
        xml.push_str(&format!(
            "    <link href=\"https://example.com/{}\"/>\n",
            e.title
        ));
        if !e.updated.is_empty() {
            xml.push_str(&format!("    <updated>{}</updated>\n", e.updated));
        }
        xml.push_str("    <summary>Summary</summary>\n  </entry>\n");
    }
    xml.push_str("</feed>\n");
    xml
}

fn item_ids(feed: &Feed) -> Vec<String> {
    feed.items.iter().map(|item| item.id.clone()).collect()
}

fn assert_consistent(feed: &Feed) {
    let ids: HashSet<String> = feed.items.iter().map(|item| item.id.clone()).collect();
    assert_eq!(ids.len(), feed.items.len(), "items must have unique IDs");
    assert_eq!(feed.item_map, ids);
    assert_eq!(feed.unread as usize, feed.items.len());
    assert!(feed.items.iter().all(|item| !item.id.is_empty() && !item.read));
}

// ============================================================================
// Whole-document behaviour
// ============================================================================

#[test]
fn test_all_entries_retained_when_unique_and_unread() {
    let xml = document(&[
        entry("1", "One", "2024-01-01T00:00:00Z"),
        entry("2", "Two", "2024-01-02T00:00:00Z"),
        entry("3", "Three", ""),
    ]);
    let feed = parse_atom(xml.as_bytes(), &NeverRead).unwrap();

    assert_eq!(feed.items.len(), 3);
    assert_eq!(feed.unread, 3);
    assert_eq!(feed.title, "Test Feed");
    assert_eq!(feed.description, "Things happen");
    assert_eq!(feed.link, "https://example.com/");
    assert_eq!(feed.items[1].link, "https://example.com/Two");
    assert_eq!(feed.items[1].summary, "Summary");
    assert_consistent(&feed);
}

#[test]
fn test_zero_entries_is_empty_feed_error() {
    let xml = document(&[]);
    let result = parse_atom(xml.as_bytes(), &NeverRead);
    assert!(matches!(result, Err(FeedError::Empty)));
}

#[test]
fn test_malformed_xml_is_decode_error() {
    let xml = "<feed><entry><title>Broken</entry>";
    let result = parse_atom(xml.as_bytes(), &NeverRead);
    assert!(matches!(result, Err(FeedError::Decode(_))));
}

#[test]
fn test_rss_document_is_decode_error() {
    let xml = r#"<rss version="2.0"><channel><item><title>x</title></item></channel></rss>"#;
    let result = parse_atom(xml.as_bytes(), &NeverRead);
    assert!(matches!(
        result,
        Err(FeedError::Decode(DecodeError::UnexpectedRoot(_)))
    ));
}

#[test]
fn test_latin1_document_is_translated() {
    let mut data = br#"<?xml version="1.0" encoding="ISO-8859-1"?><feed><entry><id>1</id><title>Caf"#.to_vec();
    data.push(0xE9);
    data.extend_from_slice(b"</title></entry></feed>");

    let feed = parse_atom(&data, &NeverRead).unwrap();
    assert_eq!(feed.items[0].title, "Café");
}

/// Maps `~` to `é` for documents labelled `x-test`.
struct TildeCharset;

impl CharsetDecoder for TildeCharset {
    fn decode(&self, label: &str, bytes: &[u8]) -> Result<String, DecodeError> {
        if label != "x-test" {
            return Err(DecodeError::UnsupportedCharset(label.to_string()));
        }
        Ok(String::from_utf8_lossy(bytes).replace('~', "é"))
    }
}

#[test]
fn test_custom_charset_reaches_items() {
    let parser = FeedParser::with_charset(ParseOptions::default(), TildeCharset);
    let xml = r#"<?xml version="1.0" encoding="x-test"?><feed><entry><id>1</id><title>Caf~</title></entry></feed>"#;

    let feed = parser.parse(xml.as_bytes(), &NeverRead).unwrap();
    assert_eq!(feed.items.len(), 1);
    assert_eq!(feed.items[0].title, "Café");
}

#[test]
fn test_custom_charset_rejects_unknown_label() {
    let parser = FeedParser::with_charset(ParseOptions::default(), TildeCharset);
    let xml = r#"<?xml version="1.0" encoding="ISO-8859-1"?><feed><entry><id>1</id></entry></feed>"#;

    let result = parser.parse(xml.as_bytes(), &NeverRead);
    assert!(matches!(
        result,
        Err(FeedError::Decode(DecodeError::UnsupportedCharset(_)))
    ));
}

// ============================================================================
// Identifiers and read state
// ============================================================================

#[test]
fn test_synthetic_ids_stable_across_documents() {
    let first = document(&[entry("", "Untagged", "2023-01-02 15:04:05 -0700")]);
    let second = document(&[
        entry("other", "Other", ""),
        entry("", "Untagged", "2023-01-02 15:04:05 -0700"),
    ]);

    let a = parse_atom(first.as_bytes(), &NeverRead).unwrap();
    let b = parse_atom(second.as_bytes(), &NeverRead).unwrap();

    assert_eq!(a.items[0].id, b.items[1].id);
    assert_eq!(
        a.items[0].id,
        synthetic_id("Untagged", "2023-01-02 15:04:05 -0700")
    );
}

#[test]
fn test_read_items_never_appear() {
    let xml = document(&[
        entry("seen", "Seen first", ""),
        entry("fresh", "Fresh", ""),
        entry("seen", "Seen again", ""),
    ]);
    let read = ReadStateFile::from_lines("seen\n");
    let feed = parse_atom(xml.as_bytes(), &read).unwrap();

    assert_eq!(item_ids(&feed), vec!["fresh".to_string()]);
    assert_eq!(feed.unread, 1);
    assert_consistent(&feed);
}

#[test]
fn test_read_synthetic_id_is_filtered() {
    let id = synthetic_id("Old news", "1700000000");
    let xml = document(&[entry("", "Old news", "1700000000"), entry("n", "New", "")]);
    let read = move |candidate: &str| candidate == id;

    let feed = parse_atom(xml.as_bytes(), &read).unwrap();
    assert_eq!(item_ids(&feed), vec!["n".to_string()]);
}

#[test]
fn test_all_entries_read_yields_empty_feed_value() {
    let xml = document(&[entry("a", "A", "")]);
    let read = |_: &str| true;

    let feed = parse_atom(xml.as_bytes(), &read).unwrap();
    assert!(feed.is_empty());
    assert_eq!(feed.unread, 0);
    assert!(feed.item_map.is_empty());
}

#[test]
fn test_duplicates_keep_first_occurrence() {
    let xml = document(&[
        entry("dup", "Original", ""),
        entry("dup", "Copy", ""),
        entry("solo", "Solo", ""),
    ]);
    let feed = parse_atom(xml.as_bytes(), &NeverRead).unwrap();

    assert_eq!(item_ids(&feed), vec!["dup".to_string(), "solo".to_string()]);
    assert_eq!(feed.items[0].title, "Original");
    assert_consistent(&feed);
}

#[test]
fn test_item_map_is_fresh_per_parse() {
    let parser = FeedParser::new(ParseOptions::default());
    let xml = document(&[entry("a", "A", "")]);

    let first = parser.parse(xml.as_bytes(), &NeverRead).unwrap();
    let second = parser.parse(xml.as_bytes(), &NeverRead).unwrap();

    assert_eq!(first.items.len(), 1);
    assert_eq!(second.items.len(), 1);
}

// ============================================================================
// Timestamps
// ============================================================================

#[test]
fn test_mixed_timestamp_formats() {
    let xml = document(&[
        entry("a", "A", "2023-01-02 15:04:05 -0700"),
        entry("b", "B", "1700000000"),
        entry("c", "C", "Mon, 02 Jan 2006 15:04:05 GMT"),
        entry("d", "D", "2006-01-02T15:04:05+07:00"),
    ]);
    let feed = parse_atom(xml.as_bytes(), &NeverRead).unwrap();

    let stamps: Vec<i64> = feed
        .items
        .iter()
        .map(|item| item.date.map(|d| d.timestamp()).unwrap_or_default())
        .collect();
    assert_eq!(
        stamps,
        vec![1_672_697_045, 1_700_000_000, 1_136_214_245, 1_136_189_045]
    );
}

#[test]
fn test_bad_timestamp_skipped_by_default() {
    let xml = document(&[entry("a", "A", "not-a-date"), entry("b", "B", "")]);
    let feed = parse_atom(xml.as_bytes(), &NeverRead).unwrap();

    assert_eq!(item_ids(&feed), vec!["b".to_string()]);
    assert_consistent(&feed);
}

#[test]
fn test_meridiem_suffix_is_not_a_zone() {
    let xml = document(&[
        entry("pm", "PM", "Mon, 02 Jan 2006 15:04:05 PM"),
        entry("ut", "UT", "Mon, 02 Jan 2006 15:04:05 UT"),
    ]);
    let feed = parse_atom(xml.as_bytes(), &NeverRead).unwrap();

    assert_eq!(item_ids(&feed), vec!["ut".to_string()]);
    assert_eq!(feed.items[0].date.map(|d| d.timestamp()), Some(1_136_214_245));
}

#[test]
fn test_bad_timestamp_fatal_when_configured() {
    let parser = FeedParser::new(ParseOptions {
        on_bad_timestamp: TimestampPolicy::Fail,
        ..Default::default()
    });
    let xml = document(&[entry("a", "A", "not-a-date"), entry("b", "B", "")]);

    let result = parser.parse(xml.as_bytes(), &NeverRead);
    assert!(matches!(result, Err(FeedError::Timestamp { .. })));
}

#[test]
fn test_json_output_omits_item_map() {
    let xml = document(&[entry("a", "A", "1700000000")]);
    let feed = parse_atom(xml.as_bytes(), &NeverRead).unwrap();

    let value = serde_json::to_value(&feed).unwrap();
    assert!(value.get("item_map").is_none());
    assert_eq!(value["unread"], 1);
    assert_eq!(value["items"][0]["id"], "a");
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_synthetic_id_deterministic(title in ".*", date in ".*") {
        prop_assert_eq!(synthetic_id(&title, &date), synthetic_id(&title, &date));
    }

    #[test]
    fn prop_feed_invariants_hold(
        ids in proptest::collection::vec(0u8..6, 1..20),
        read in proptest::collection::hash_set(0u8..6, 0..4),
    ) {
        let titles: Vec<String> = (0..ids.len()).map(|i| format!("Entry{}", i)).collect();
        let id_strings: Vec<String> = ids.iter().map(|id| format!("id-{}", id)).collect();
        let entries: Vec<TestEntry<'_>> = id_strings
            .iter()
            .zip(&titles)
            .map(|(id, title)| entry(id, title, ""))
            .collect();
        let read_ids: HashSet<String> = read.iter().map(|id| format!("id-{}", id)).collect();

        let xml = document(&entries);
        let feed = parse_atom(xml.as_bytes(), &read_ids).unwrap();

        // Expected: first occurrence of every unread ID, in document order
        let mut seen = HashSet::new();
        let expected: Vec<String> = id_strings
            .iter()
            .filter(|id| !read_ids.contains(*id) && seen.insert((*id).clone()))
            .cloned()
            .collect();

        prop_assert_eq!(item_ids(&feed), expected);
        prop_assert_eq!(feed.unread as usize, feed.items.len());
        let from_items: HashSet<String> = feed.items.iter().map(|i| i.id.clone()).collect();
        prop_assert_eq!(&feed.item_map, &from_items);
    }
}
