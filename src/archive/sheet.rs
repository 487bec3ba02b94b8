use image::{imageops, imageops::FilterType, Rgb, RgbImage};
use std::path::Path;
use tracing::info;

use super::gallery::{GalleryCell, GalleryLayout};
use crate::error::Result;

/// Default edge length of a contact-sheet tile
pub const TILE_SIZE: u32 = 256;

/// Gap between tiles and around the sheet
const PADDING: u32 = 8;

const BACKGROUND: Rgb<u8> = Rgb([24, 24, 27]);
const BLANK_TILE: Rgb<u8> = Rgb([40, 40, 46]);

/// Load an image and scale it to fit a square tile, keeping aspect ratio
pub fn thumbnail(image_path: &Path, size: u32) -> Result<RgbImage> {
    let img = image::open(image_path)?;
    Ok(img.resize(size, size, FilterType::Lanczos3).to_rgb8())
}

/// Tile the gallery layout into a single image
///
/// Blank cells get an empty tile; hidden cells are left as background.
pub fn render_contact_sheet(layout: &GalleryLayout, tile_size: u32) -> Result<RgbImage> {
    let columns = layout.columns as u32;
    let rows = layout.rows() as u32;
    let width = PADDING + columns * (tile_size + PADDING);
    let height = PADDING + rows * (tile_size + PADDING);

    let mut sheet = RgbImage::from_pixel(width, height, BACKGROUND);

    for (index, cell) in layout.cells.iter().enumerate() {
        let col = index as u32 % columns;
        let row = index as u32 / columns;
        let x = PADDING + col * (tile_size + PADDING);
        let y = PADDING + row * (tile_size + PADDING);

        match cell {
            GalleryCell::Image { image_path, .. } => {
                let thumb = thumbnail(image_path, tile_size)?;
                // Center inside the tile
                let dx = tile_size.saturating_sub(thumb.width()) / 2;
                let dy = tile_size.saturating_sub(thumb.height()) / 2;
                imageops::overlay(&mut sheet, &thumb, (x + dx) as i64, (y + dy) as i64);
            }
            GalleryCell::Blank => {
                let tile = RgbImage::from_pixel(tile_size, tile_size, BLANK_TILE);
                imageops::overlay(&mut sheet, &tile, x as i64, y as i64);
            }
            GalleryCell::Hidden => {}
        }
    }

    Ok(sheet)
}

/// Render the layout and write it as an image file
pub fn export_contact_sheet(layout: &GalleryLayout, tile_size: u32, output: &Path) -> Result<()> {
    let sheet = render_contact_sheet(layout, tile_size)?;
    sheet.save(output)?;
    info!(
        "🖼️  Wrote {}x{} contact sheet to {}",
        sheet.width(),
        sheet.height(),
        output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::gallery::render_gallery;
    use crate::state::GenerationRecord;

    fn record(image_path: &Path) -> GenerationRecord {
        GenerationRecord {
            timestamp: "20240101_000000".to_string(),
            prompt: "tile".to_string(),
            model_id: "m".to_string(),
            device: "cpu".to_string(),
            image_path: image_path.to_string_lossy().to_string(),
        }
    }

    #[test]
    fn test_sheet_dimensions_and_tiles() {
        let dir = tempfile::tempdir().unwrap();
        let red = dir.path().join("red.png");
        RgbImage::from_pixel(64, 64, Rgb([255, 0, 0]))
            .save(&red)
            .unwrap();

        let records = [record(&red), record(&dir.path().join("missing.png"))];
        let layout = render_gallery(&records, 3);
        let sheet = render_contact_sheet(&layout, 32).unwrap();

        assert_eq!(sheet.width(), PADDING + 3 * (32 + PADDING));
        assert_eq!(sheet.height(), PADDING + 32 + PADDING);

        let center = |col: u32| PADDING + col * (32 + PADDING) + 16;
        let [r, g, b] = sheet.get_pixel(center(0), center(0)).0;
        assert!(r > 250 && g < 5 && b < 5);
        assert_eq!(*sheet.get_pixel(center(1), center(0)), BLANK_TILE);
        assert_eq!(*sheet.get_pixel(center(2), center(0)), BACKGROUND);
    }

    #[test]
    fn test_zero_tile_size_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let small = dir.path().join("small.png");
        RgbImage::from_pixel(8, 8, Rgb([0, 255, 0]))
            .save(&small)
            .unwrap();

        let layout = render_gallery(&[record(&small)], 3);
        let sheet = render_contact_sheet(&layout, 0).unwrap();
        assert_eq!(sheet.width(), PADDING + 3 * PADDING);
        assert_eq!(sheet.height(), 2 * PADDING);
    }

    #[test]
    fn test_thumbnail_keeps_aspect() {
        let dir = tempfile::tempdir().unwrap();
        let wide = dir.path().join("wide.png");
        RgbImage::new(200, 100).save(&wide).unwrap();

        let thumb = thumbnail(&wide, 50).unwrap();
        assert_eq!(thumb.dimensions(), (50, 25));
    }

    #[test]
    fn test_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("sheet.png");
        let layout = render_gallery(&[], 3);

        export_contact_sheet(&layout, 16, &output).unwrap();
        let sheet = image::open(&output).unwrap();
        assert_eq!(sheet.width(), PADDING + 3 * (16 + PADDING));
    }
}
