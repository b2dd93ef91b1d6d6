//! Utility modules.

pub mod datetime;

pub use datetime::{format_instant, parse_instant, DateTimeParseError};
