use std::fs;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Result, StudioError};
use crate::output::naming::METADATA_EXTENSION;
use crate::state::GenerationRecord;

/// Load every metadata record in `metadata_dir`, newest first
///
/// Only `*.json` files directly inside the directory are read. A directory
/// that does not exist is an empty archive. Any file that fails to parse
/// fails the whole load.
pub fn load_metadata(metadata_dir: &Path) -> Result<Vec<GenerationRecord>> {
    if !metadata_dir.is_dir() {
        debug!("Metadata directory {} not found", metadata_dir.display());
        return Ok(Vec::new());
    }

    let mut records = Vec::new();

    for entry in WalkDir::new(metadata_dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        let path = entry.path();

        if !entry.file_type().is_file() {
            continue;
        }

        let is_record = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case(METADATA_EXTENSION))
            .unwrap_or(false);
        if !is_record {
            continue;
        }

        let content = fs::read_to_string(path)?;
        let record = GenerationRecord::from_json(&content).map_err(|source| {
            StudioError::MalformedRecord {
                path: path.to_path_buf(),
                source,
            }
        })?;
        records.push(record);
    }

    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    debug!("Loaded {} records from {}", records.len(), metadata_dir.display());

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_record(dir: &Path, file: &str, timestamp: &str) {
        let record = GenerationRecord {
            timestamp: timestamp.to_string(),
            prompt: format!("prompt {timestamp}"),
            model_id: "runwayml/stable-diffusion-v1-5".to_string(),
            device: "cpu".to_string(),
            image_path: format!("images/generated_{timestamp}.png"),
        };
        fs::write(dir.join(file), record.to_json().unwrap()).unwrap();
    }

    #[test]
    fn test_nonexistent_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let records = load_metadata(&dir.path().join("nope")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_empty_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_metadata(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_sorted_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        // Filenames deliberately out of timestamp order
        write_record(dir.path(), "b.json", "20240101_000000");
        write_record(dir.path(), "c.json", "20240103_000000");
        write_record(dir.path(), "a.json", "20240102_000000");

        let timestamps: Vec<String> = load_metadata(dir.path())
            .unwrap()
            .into_iter()
            .map(|r| r.timestamp)
            .collect();

        assert_eq!(
            timestamps,
            vec!["20240103_000000", "20240102_000000", "20240101_000000"]
        );
    }

    #[test]
    fn test_ignores_other_files_and_subdirs() {
        let dir = tempfile::tempdir().unwrap();
        write_record(dir.path(), "metadata_20240101_000000.json", "20240101_000000");
        fs::write(dir.path().join("notes.txt"), "not a record").unwrap();

        let nested = dir.path().join("old");
        fs::create_dir(&nested).unwrap();
        write_record(&nested, "metadata_20230101_000000.json", "20230101_000000");

        let records = load_metadata(dir.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].timestamp, "20240101_000000");
    }

    #[test]
    fn test_malformed_record_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        write_record(dir.path(), "good.json", "20240101_000000");
        fs::write(dir.path().join("bad.json"), r#"{"prompt": 12}"#).unwrap();

        match load_metadata(dir.path()) {
            Err(StudioError::MalformedRecord { path, .. }) => {
                assert!(path.ends_with("bad.json"));
            }
            other => panic!("expected MalformedRecord, got {:?}", other),
        }
    }
}
