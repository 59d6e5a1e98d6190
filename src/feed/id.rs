//! Synthetic identifiers for entries published without an `<id>`.
//!
//! The identifier is a 64-bit FNV-1a hash of the entry title followed by its
//! raw `updated` string, rendered in base 10. The same title/date pair always
//! yields the same identifier, so re-published documents deduplicate against
//! read state without a persisted mapping table. Distinct entries that share
//! a title and date collide; that is accepted.

use std::hash::Hasher;

use fnv::FnvHasher;

/// Returns the entry's native ID, or a synthetic one when it is empty.
pub fn assign_id(native: &str, title: &str, raw_date: &str) -> String {
    if !native.is_empty() {
        return native.to_string();
    }
    synthetic_id(title, raw_date)
}

/// Hashes `title` then `raw_date` as one contiguous byte stream.
pub fn synthetic_id(title: &str, raw_date: &str) -> String {
    // `write` rather than `write_str`: no length or terminator suffix
    let mut hasher = FnvHasher::default();
    hasher.write(title.as_bytes());
    hasher.write(raw_date.as_bytes());
    hasher.finish().to_string()
}
