/// Output module
///
/// This module handles:
/// - Timestamp-derived names for image and metadata files
/// - Publishing both files without partial or clobbered writes

pub mod naming;
pub mod publish;

pub use publish::{OutputDirs, Published};
