use chrono::{DateTime, Local};

use crate::state::data::TIMESTAMP_FORMAT;

/// Prefix of rendered image files
pub const IMAGE_PREFIX: &str = "generated_";
/// Prefix of metadata files
pub const METADATA_PREFIX: &str = "metadata_";
/// Extension of rendered image files
pub const IMAGE_EXTENSION: &str = "png";
/// Extension of metadata files
pub const METADATA_EXTENSION: &str = "json";

/// Format a generation time as `YYYYMMDD_HHMMSS`
pub fn timestamp(at: DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Timestamp for a generation finishing now
pub fn timestamp_now() -> String {
    timestamp(Local::now())
}

/// Filename stem shared by an image and its metadata
///
/// Attempt 0 is the plain timestamp; later attempts add `_<n>` so a second
/// generation in the same second gets its own pair of files.
fn stem(timestamp: &str, attempt: u32) -> String {
    if attempt == 0 {
        timestamp.to_string()
    } else {
        format!("{}_{}", timestamp, attempt)
    }
}

pub fn image_file_name(timestamp: &str, attempt: u32) -> String {
    format!("{}{}.{}", IMAGE_PREFIX, stem(timestamp, attempt), IMAGE_EXTENSION)
}

pub fn metadata_file_name(timestamp: &str, attempt: u32) -> String {
    format!(
        "{}{}.{}",
        METADATA_PREFIX,
        stem(timestamp, attempt),
        METADATA_EXTENSION
    )
}
