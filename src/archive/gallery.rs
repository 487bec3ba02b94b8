/// Gallery grid layout
///
/// Turns an ordered list of records into a fixed-column grid. Both the
/// interactive gallery and the contact-sheet export render from this layout.

use std::path::PathBuf;

use tracing::debug;

use crate::state::GenerationRecord;

/// Characters of the prompt kept in a caption
pub const CAPTION_CHARS: usize = 50;

/// One position in the grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryCell {
    /// Record whose image is on disk
    Image { image_path: PathBuf, caption: String },
    /// Record whose image file is gone; drawn empty
    Blank,
    /// Filler after the last record in the final row; not drawn at all
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryLayout {
    pub columns: usize,
    /// Row-major, always `rows * columns` long
    pub cells: Vec<GalleryCell>,
}

impl GalleryLayout {
    pub fn rows(&self) -> usize {
        self.cells.len() / self.columns
    }

    /// Cells grouped by row
    pub fn row_iter(&self) -> impl Iterator<Item = &[GalleryCell]> {
        self.cells.chunks(self.columns)
    }
}

/// Caption shown under a gallery image
pub fn caption(prompt: &str) -> String {
    let fragment: String = prompt.chars().take(CAPTION_CHARS).collect();
    format!("Prompt: {}...", fragment)
}

/// Lay records out in a grid of `columns` columns
///
/// Rows are `ceil(records / columns)`. A record whose image is missing
/// becomes a blank cell. A column count of zero is treated as one.
pub fn render_gallery(records: &[GenerationRecord], columns: usize) -> GalleryLayout {
    let columns = columns.max(1);
    let rows = records.len().div_ceil(columns);

    let mut cells: Vec<GalleryCell> = records
        .iter()
        .map(|record| {
            if record.image_exists() {
                GalleryCell::Image {
                    image_path: PathBuf::from(&record.image_path),
                    caption: caption(&record.prompt),
                }
            } else {
                debug!("Skipping {}: image missing", record.image_path);
                GalleryCell::Blank
            }
        })
        .collect();
    cells.resize(rows * columns, GalleryCell::Hidden);

    GalleryLayout { columns, cells }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn record(image_path: &Path, prompt: &str) -> GenerationRecord {
        GenerationRecord {
            timestamp: "20240101_000000".to_string(),
            prompt: prompt.to_string(),
            model_id: "m".to_string(),
            device: "cpu".to_string(),
            image_path: image_path.to_string_lossy().to_string(),
        }
    }

    #[test]
    fn test_missing_image_is_blank() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("present.png");
        fs::write(&present, b"png").unwrap();

        let records = [
            record(&present, "kept"),
            record(&dir.path().join("gone.png"), "gone"),
        ];
        let layout = render_gallery(&records, 3);

        assert_eq!(layout.rows(), 1);
        assert!(matches!(layout.cells[0], GalleryCell::Image { .. }));
        assert_eq!(layout.cells[1], GalleryCell::Blank);
        assert_eq!(layout.cells[2], GalleryCell::Hidden);
    }

    #[test]
    fn test_rows_round_up() {
        let dir = tempfile::tempdir().unwrap();
        let records: Vec<GenerationRecord> = (0..7)
            .map(|i| record(&dir.path().join(format!("{i}.png")), "x"))
            .collect();

        let layout = render_gallery(&records, 3);
        assert_eq!(layout.rows(), 3);
        assert_eq!(layout.cells.len(), 9);
        assert_eq!(
            layout
                .cells
                .iter()
                .filter(|c| **c == GalleryCell::Hidden)
                .count(),
            2
        );
        assert_eq!(layout.row_iter().count(), 3);
    }

    #[test]
    fn test_empty_and_zero_columns() {
        let layout = render_gallery(&[], 3);
        assert_eq!(layout.rows(), 0);

        let dir = tempfile::tempdir().unwrap();
        let records = [record(&dir.path().join("a.png"), "x")];
        let layout = render_gallery(&records, 0);
        assert_eq!(layout.columns, 1);
        assert_eq!(layout.rows(), 1);
    }

    #[test]
    fn test_caption_truncates_by_chars() {
        let long = "é".repeat(80);
        let text = caption(&long);
        assert_eq!(text, format!("Prompt: {}...", "é".repeat(50)));
        assert_eq!(caption("short"), "Prompt: short...");
    }
}
