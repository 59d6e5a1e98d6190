use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A normalized feed produced by a single parse.
///
/// `item_map` holds exactly the IDs of `items`, and `unread` equals
/// `items.len()` because every retained item starts unread.
#[derive(Debug, Clone, Serialize)]
pub struct Feed {
    pub title: String,
    pub description: String,
    pub link: String,
    pub image: Image,
    pub items: Vec<Item>,
    /// IDs already present in `items`, used to reject duplicates.
    #[serde(skip)]
    pub item_map: HashSet<String>,
    pub unread: u32,
    /// Point in time until which this result is considered fresh.
    pub refresh: DateTime<Utc>,
}

/// A single normalized entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    pub title: String,
    pub summary: String,
    pub content: String,
    pub link: String,
    pub date: Option<DateTime<Utc>>,
    /// Native or synthetic identifier, never empty.
    pub id: String,
    pub read: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Image {
    pub title: String,
    pub url: String,
    pub height: u32,
    pub width: u32,
}

impl Feed {
    /// Number of retained items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.item_map.contains(id)
    }
}
