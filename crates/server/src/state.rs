use std::sync::Arc;
use std::time::SystemTime;

use axum::http::StatusCode;
use axum::Json;
use library::{Library, ScanReport};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct AppState {
    pub library: Library,
    pub scan_status: Arc<RwLock<ScanStatus>>,
}

impl AppState {
    pub fn new(library: Library) -> Self {
        Self {
            library,
            scan_status: Arc::new(RwLock::new(ScanStatus::Idle)),
        }
    }
}

#[derive(Clone, Debug)]
pub enum ScanStatus {
    Idle,
    Scanning { started: SystemTime },
    Finished(ScanReport),
    Failed(String),
}

impl ScanStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ScanStatus::Idle => "idle",
            ScanStatus::Scanning { .. } => "scanning",
            ScanStatus::Finished(_) => "ready",
            ScanStatus::Failed(_) => "error",
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct LibraryStatusResponse {
    pub status: &'static str,
    pub message: Option<String>,
    pub artists: usize,
    pub albums: usize,
    pub tracks: usize,
    /// Unix seconds, while a scan is running.
    pub scan_started: Option<u64>,
    pub last_scan: Option<ScanReport>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    pub limit: Option<usize>,
}

pub type JsonResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;
