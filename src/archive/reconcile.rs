use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use super::loader::load_metadata;
use crate::error::Result;
use crate::output::publish::is_published_image;
use crate::output::OutputDirs;

/// Find published images that no metadata record points at
///
/// These are left behind when a process dies between writing an image and
/// writing its record. Nothing is deleted.
pub fn find_orphans(dirs: &OutputDirs) -> Result<Vec<PathBuf>> {
    if !dirs.images.is_dir() {
        return Ok(Vec::new());
    }

    let referenced: HashSet<PathBuf> = load_metadata(&dirs.metadata)?
        .iter()
        .map(|record| normalize(Path::new(&record.image_path)))
        .collect();

    let mut orphans = Vec::new();
    for entry in WalkDir::new(&dirs.images).min_depth(1).max_depth(1) {
        let entry = entry?;
        let path = entry.path();

        if entry.file_type().is_file()
            && is_published_image(path)
            && !referenced.contains(&normalize(path))
        {
            warn!("Orphaned image without metadata: {}", path.display());
            orphans.push(path.to_path_buf());
        }
    }

    orphans.sort();
    Ok(orphans)
}

/// Resolve a path for comparison, falling back to the path as written
fn normalize(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::GenerationRecord;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_orphan_detected() {
        let root = tempfile::tempdir().unwrap();
        let dirs = OutputDirs::new(root.path().join("images"), root.path().join("metadata"));
        let record = GenerationRecord {
            timestamp: "20240101_000000".to_string(),
            prompt: "kept".to_string(),
            model_id: "m".to_string(),
            device: "cpu".to_string(),
            image_path: String::new(),
        };
        let published = dirs
            .publish(&RgbImage::from_pixel(2, 2, Rgb([1, 2, 3])), record)
            .unwrap();

        // Image written with no record, as after a crash mid-publish
        let orphan = dirs.images.join("generated_20240101_000001.png");
        RgbImage::new(2, 2).save(&orphan).unwrap();
        fs::write(dirs.images.join("readme.txt"), "ignored").unwrap();

        let orphans = find_orphans(&dirs).unwrap();
        assert_eq!(orphans, vec![orphan]);
        assert!(published.image_path.exists());
    }

    #[test]
    fn test_no_images_dir() {
        let root = tempfile::tempdir().unwrap();
        let dirs = OutputDirs::new(root.path().join("images"), root.path().join("metadata"));
        assert!(find_orphans(&dirs).unwrap().is_empty());
    }
}
