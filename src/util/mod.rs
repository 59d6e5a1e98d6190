//! Small text helpers shared by the timestamp parser and the CLI.

mod text;

pub use text::{collapse_whitespace, single_line};
