use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::LibraryError;
use crate::ingest::IngestedIds;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub files_seen: usize,
    pub ingested: usize,
    pub failed: usize,
}

/// Feeds every regular file under each root to `ingest`, in root order.
/// Per-file failures are counted and logged; they never stop the walk.
pub fn scan_roots<F>(roots: &[PathBuf], mut ingest: F) -> ScanReport
where
    F: FnMut(&Path) -> Result<IngestedIds, LibraryError>,
{
    let mut report = ScanReport::default();

    for root in roots {
        if !root.exists() {
            warn!("Library path {:?} does not exist; skipping", root);
            continue;
        }
        info!("Scanning {:?}", root);

        for entry in WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Failed to walk {:?}: {}", root, err);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            report.files_seen += 1;
            match ingest(entry.path()) {
                Ok(_) => report.ingested += 1,
                Err(LibraryError::UnreadableMedia { path, source }) => {
                    debug!("Skipping {}: {}", path, source);
                    report.failed += 1;
                }
                Err(err) => {
                    warn!("Failed to add {:?}: {}", entry.path(), err);
                    report.failed += 1;
                }
            }
        }
    }

    info!(
        "Scan finished: {} files, {} ingested, {} failed",
        report.files_seen, report.ingested, report.failed
    );
    report
}
