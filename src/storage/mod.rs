//! Read-state lookups consulted while normalizing a feed.
//!
//! Persisting read state is the host application's job; this module only
//! defines the query interface and a few ready-made implementations.

mod read_state;

pub use read_state::{NeverRead, ReadState, ReadStateError, ReadStateFile};
