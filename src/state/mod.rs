/// State module
///
/// This module holds the data model shared by the generator and the archive:
/// - Persisted generation records (data.rs)
/// - Sampling parameters and their validation (params.rs)

pub mod data;
pub mod params;

pub use data::GenerationRecord;
pub use params::GenerationParams;
