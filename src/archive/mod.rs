/// Archive browser module
///
/// This module handles everything that reads past generations back:
/// - Loading and ordering metadata records
/// - Laying records out as a gallery grid
/// - Exporting the grid as a contact sheet
/// - Aggregate statistics
/// - Finding images whose record never got written

pub mod gallery;
pub mod loader;
pub mod reconcile;
pub mod sheet;
pub mod stats;

pub use gallery::{render_gallery, GalleryCell, GalleryLayout};
pub use loader::load_metadata;
pub use stats::{compute_stats, ArchiveStats};
