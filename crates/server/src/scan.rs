use std::time::SystemTime;

use tracing::{info, warn};

use crate::state::{AppState, ScanStatus};

/// Walks every configured library root on the blocking pool. Returns false
/// without starting anything when a scan is already running.
pub fn start_scan(state: AppState) -> bool {
    {
        let mut guard = state.scan_status.write();
        if matches!(*guard, ScanStatus::Scanning { .. }) {
            return false;
        }
        *guard = ScanStatus::Scanning {
            started: SystemTime::now(),
        };
    }

    tokio::spawn(async move {
        let library = state.library.clone();
        let result = tokio::task::spawn_blocking(move || library.scan()).await;
        match result {
            Ok(report) => {
                info!(
                    "Library scan complete: {} files, {} ingested, {} failed",
                    report.files_seen, report.ingested, report.failed
                );
                *state.scan_status.write() = ScanStatus::Finished(report);
            }
            Err(err) => {
                let message = err.to_string();
                warn!("Library scan join error: {}", message);
                *state.scan_status.write() = ScanStatus::Failed(message);
            }
        }
    });
    true
}
