/// Shared data structures for the archive
///
/// A `GenerationRecord` is what flows between the generator, which writes
/// one per image, and the archive browser, which reads them all back.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Timestamp format used in record fields and output filenames
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// One persisted generation
///
/// All fields are required when parsing; a file missing any of them is a
/// malformed record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GenerationRecord {
    /// Creation time, `YYYYMMDD_HHMMSS`
    pub timestamp: String,
    /// Prompt the image was generated from
    pub prompt: String,
    /// Pretrained pipeline that produced the image
    pub model_id: String,
    /// Compute backend: "cuda", "metal" or "cpu"
    pub device: String,
    /// Path of the rendered image
    pub image_path: String,
}

impl GenerationRecord {
    /// Date part of the timestamp (`YYYYMMDD`)
    pub fn date(&self) -> &str {
        match self.timestamp.char_indices().nth(8) {
            Some((idx, _)) => &self.timestamp[..idx],
            None => &self.timestamp,
        }
    }

    /// Whether the referenced image is still on disk
    pub fn image_exists(&self) -> bool {
        Path::new(&self.image_path).is_file()
    }

    /// Serialize for writing to a metadata file
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from the contents of a metadata file
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(timestamp: &str) -> GenerationRecord {
        GenerationRecord {
            timestamp: timestamp.to_string(),
            prompt: "a lighthouse at dawn".to_string(),
            model_id: "runwayml/stable-diffusion-v1-5".to_string(),
            device: "cpu".to_string(),
            image_path: "images/generated_20240101_120000.png".to_string(),
        }
    }

    #[test]
    fn test_date_is_first_eight_chars() {
        assert_eq!(record("20240101_120000").date(), "20240101");
        assert_eq!(record("2024").date(), "2024");
    }

    #[test]
    fn test_json_uses_flat_schema() {
        let json = record("20240101_120000").to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        for key in ["timestamp", "prompt", "model_id", "device", "image_path"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let json = r#"{
            "timestamp": "20240101_120000",
            "prompt": "x",
            "device": "cpu",
            "image_path": "a.png"
        }"#;
        assert!(GenerationRecord::from_json(json).is_err());
    }

    #[test]
    fn test_missing_image_reported() {
        assert!(!record("20240101_120000").image_exists());
    }
}
