use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use serde::Serialize;

use super::loader::load_metadata;
use crate::error::Result;
use crate::state::GenerationRecord;

/// Aggregate view of the archive
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArchiveStats {
    pub total_images: usize,
    pub devices_used: BTreeSet<String>,
    pub model_versions: BTreeSet<String>,
    /// Distinct `YYYYMMDD` dates, ascending
    pub generation_dates: Vec<String>,
}

impl ArchiveStats {
    pub fn from_records(records: &[GenerationRecord]) -> Self {
        let dates: BTreeSet<&str> = records.iter().map(|r| r.date()).collect();

        Self {
            total_images: records.len(),
            devices_used: records.iter().map(|r| r.device.clone()).collect(),
            model_versions: records.iter().map(|r| r.model_id.clone()).collect(),
            generation_dates: dates.into_iter().map(str::to_string).collect(),
        }
    }
}

/// Read the archive and summarize it
pub fn compute_stats(metadata_dir: &Path) -> Result<ArchiveStats> {
    let records = load_metadata(metadata_dir)?;
    Ok(ArchiveStats::from_records(&records))
}

fn join(items: impl IntoIterator<Item = impl AsRef<str>>) -> String {
    items
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for ArchiveStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total images:     {}", self.total_images)?;
        writeln!(f, "Devices used:     {}", join(&self.devices_used))?;
        writeln!(f, "Model versions:   {}", join(&self.model_versions))?;
        write!(f, "Generation dates: {}", join(&self.generation_dates))
    }
}
