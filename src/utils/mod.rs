//! Utility functions

mod duration;
mod sanitize;

pub use duration::{durations_match, format_duration};
pub use sanitize::sanitize_filename;
