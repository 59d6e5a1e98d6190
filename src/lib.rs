//! Turns Atom documents into normalized, deduplicated lists of unread items.
//!
//! - [`feed`] decodes documents and builds [`feed::Feed`] values
//! - [`storage`] defines the read-state lookup consulted per entry
//! - [`config`] loads parse settings from a TOML file

pub mod config;
pub mod feed;
pub mod storage;
pub mod util;
