//! Hand cleaned entries to an exporter, one at a time.

use crate::entry::Entry;
use crate::filter::EntryFilter;
use crate::managers::Exporter;
use crate::Result;
use tracing::{debug, warn};

/// Outcome of an export run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    /// Paths of the inserted entries.
    pub inserted: Vec<String>,
    /// Paths that could not be inserted, with the reason.
    pub failed: Vec<(String, String)>,
}

impl ExportReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Insert `entries` into `exporter`, keeping those selected by `filter`.
///
/// A `Manager` error on one entry is reported and the run goes on; any
/// other error aborts it. `finish` runs only when nothing aborted.
pub fn export_entries(
    exporter: &mut dyn Exporter,
    entries: &[Entry],
    filter: Option<&EntryFilter>,
) -> Result<ExportReport> {
    let batch: Vec<Entry> = entries
        .iter()
        .filter(|entry| filter.map_or(true, |f| f.matches(entry)))
        .cloned()
        .collect();
    if batch.len() != entries.len() {
        debug!("Filter kept {} of {} entries", batch.len(), entries.len());
    }
    exporter.prepare(&batch)?;

    let mut report = ExportReport::default();
    for entry in &batch {
        let path = entry.path().to_string();
        match exporter.insert(entry) {
            Ok(()) => {
                debug!("Inserted {}", path);
                report.inserted.push(path);
            }
            Err(e) if e.is_manager_error() => {
                warn!("Impossible to insert {}: {}", path, e);
                report.failed.push((path, e.to_string()));
            }
            Err(e) => return Err(e),
        }
    }
    exporter.finish()?;
    Ok(report)
}
