/// Publishing generated images and their metadata records
///
/// Both files are written to temporary files inside their target directory
/// and renamed into place. The image is published before the record, so a
/// record never points at a file that is still being written.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbImage};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::naming::{image_file_name, metadata_file_name, IMAGE_EXTENSION, IMAGE_PREFIX};
use crate::error::Result;
use crate::state::GenerationRecord;

/// Give up finding a free name after this many same-second collisions
const MAX_ATTEMPTS: u32 = 1000;

/// The sibling directory pair holding images and records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDirs {
    pub images: PathBuf,
    pub metadata: PathBuf,
}

/// Where a publish landed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub image_path: PathBuf,
    pub metadata_path: PathBuf,
    pub record: GenerationRecord,
}

impl OutputDirs {
    pub fn new(images: impl Into<PathBuf>, metadata: impl Into<PathBuf>) -> Self {
        Self {
            images: images.into(),
            metadata: metadata.into(),
        }
    }

    /// Create both directories if they don't exist
    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.images)?;
        fs::create_dir_all(&self.metadata)?;
        Ok(())
    }

    /// Write an image and its record
    ///
    /// `record.image_path` is filled in here; the remaining fields are taken
    /// as given. Existing files are never overwritten.
    pub fn publish(&self, image: &RgbImage, mut record: GenerationRecord) -> Result<Published> {
        self.ensure()?;

        let mut image_tmp = NamedTempFile::new_in(&self.images)?;
        {
            let mut writer = BufWriter::new(image_tmp.as_file_mut());
            image.write_to(&mut writer, ImageFormat::Png)?;
            writer.flush()?;
        }

        let (image_path, attempt) = self.publish_image(image_tmp, &record.timestamp)?;
        record.image_path = image_path.to_string_lossy().to_string();

        let metadata_path = self
            .metadata
            .join(metadata_file_name(&record.timestamp, attempt));
        let mut metadata_tmp = NamedTempFile::new_in(&self.metadata)?;
        metadata_tmp.write_all(record.to_json()?.as_bytes())?;
        metadata_tmp.persist_noclobber(&metadata_path)?;

        info!("💾 Saved {}", image_path.display());
        info!("📝 Saved {}", metadata_path.display());

        Ok(Published {
            image_path,
            metadata_path,
            record,
        })
    }

    /// Rename the encoded image to the first free name for `timestamp`
    ///
    /// A name is free only when neither the image nor its metadata file
    /// exists, so both halves of the pair share one stem.
    fn publish_image(&self, mut tmp: NamedTempFile, timestamp: &str) -> Result<(PathBuf, u32)> {
        for attempt in 0..MAX_ATTEMPTS {
            let image_path = self.images.join(image_file_name(timestamp, attempt));
            let metadata_path = self.metadata.join(metadata_file_name(timestamp, attempt));

            if metadata_path.exists() {
                continue;
            }

            match tmp.persist_noclobber(&image_path) {
                Ok(_) => return Ok((image_path, attempt)),
                Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
                    debug!("{} already taken", image_path.display());
                    tmp = err.file;
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free output name for timestamp {timestamp}"),
        )
        .into())
    }
}

/// Whether `path` is named like a published image
pub fn is_published_image(path: &Path) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return false,
    };
    name.starts_with(IMAGE_PREFIX)
        && path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case(IMAGE_EXTENSION))
            .unwrap_or(false)
}
