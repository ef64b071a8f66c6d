//! Utility functions for string formatting and manipulation.

pub mod format;

pub use format::{excerpt, format_timestamp, truncate_string};
