use std::io::SeekFrom;
use std::time::UNIX_EPOCH;

use axum::{
    body::Body,
    extract::{Path as AxumPath, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
    Json,
};
use common::SearchResult;
use library::{Library, LibraryError};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use crate::range::{parse_range_header, unsatisfied_range, RangeError};
use crate::state::{AppState, JsonResult, LibraryStatusResponse, ScanStatus, SearchQuery};
use crate::utils::{attachment_disposition, json_error, json_error_response, parse_id};

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> JsonResult<Vec<SearchResult>> {
    run_search(&state.library, &params.query, params.limit)
}

pub async fn search_term(
    State(state): State<AppState>,
    AxumPath(term): AxumPath<String>,
) -> JsonResult<Vec<SearchResult>> {
    run_search(&state.library, &term, None)
}

fn run_search(
    library: &Library,
    term: &str,
    limit: Option<usize>,
) -> JsonResult<Vec<SearchResult>> {
    if term.trim().is_empty() {
        return Err(json_error(StatusCode::BAD_REQUEST, "query is required"));
    }
    let mut results = library.search(term);
    if let Some(limit) = limit {
        results.truncate(limit);
    }
    Ok(Json(results))
}

pub async fn get_file(
    State(state): State<AppState>,
    AxumPath(track_id): AxumPath<String>,
    headers: HeaderMap,
) -> Response {
    let Some(track_id) = parse_id(&track_id) else {
        return json_error_response(StatusCode::NOT_FOUND, "track not found");
    };
    let Some(path) = state.library.get_file_path(track_id) else {
        return json_error_response(StatusCode::NOT_FOUND, "track not found");
    };

    let mut file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!("Track {} points at missing file {:?}", track_id, path);
            return json_error_response(StatusCode::NOT_FOUND, "file not found");
        }
        Err(err) => {
            warn!("Failed to open {:?}: {}", path, err);
            return json_error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to open file");
        }
    };
    let size = match file.metadata().await {
        Ok(meta) => meta.len(),
        Err(err) => {
            warn!("Failed to stat {:?}: {}", path, err);
            return json_error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to open file");
        }
    };
    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    let content_type = HeaderValue::from_str(mime.as_ref())
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    let range = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok())
        .map(|value| parse_range_header(value, size));

    let mut response = match range {
        Some(Ok(range)) => {
            if let Err(err) = file.seek(SeekFrom::Start(range.start)).await {
                warn!("Failed to seek {:?}: {}", path, err);
                return json_error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "failed to read file",
                );
            }
            let body = Body::from_stream(ReaderStream::new(file.take(range.len())));
            let mut response = Response::new(body);
            *response.status_mut() = StatusCode::PARTIAL_CONTENT;
            let headers = response.headers_mut();
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(range.len()));
            if let Ok(value) = HeaderValue::from_str(&range.content_range(size)) {
                headers.insert(header::CONTENT_RANGE, value);
            }
            response
        }
        Some(Err(RangeError::Unsatisfiable)) => {
            let mut response = json_error_response(
                StatusCode::RANGE_NOT_SATISFIABLE,
                "requested range not satisfiable",
            );
            if let Ok(value) = HeaderValue::from_str(&unsatisfied_range(size)) {
                response.headers_mut().insert(header::CONTENT_RANGE, value);
            }
            return response;
        }
        Some(Err(RangeError::Invalid)) | None => {
            let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
            response
                .headers_mut()
                .insert(header::CONTENT_LENGTH, HeaderValue::from(size));
            response
        }
    };

    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    response
}

pub async fn get_album(
    State(state): State<AppState>,
    AxumPath(album_id): AxumPath<String>,
) -> Response {
    let Some(album_id) = parse_id(&album_id) else {
        return json_error_response(StatusCode::NOT_FOUND, "album not found");
    };

    let library = state.library.clone();
    let result = tokio::task::spawn_blocking(move || {
        let (summary, staged) = library.stage_album_archive(album_id)?;
        let size = staged.metadata()?.len();
        Ok::<_, LibraryError>((summary, staged, size))
    })
    .await;

    let (summary, staged, size) = match result {
        Ok(Ok(built)) => built,
        Ok(Err(err)) if err.is_not_found() => {
            return json_error_response(StatusCode::NOT_FOUND, "album not found");
        }
        Ok(Err(LibraryError::Closed)) => {
            return json_error_response(StatusCode::SERVICE_UNAVAILABLE, "library closed");
        }
        Ok(Err(err)) => {
            warn!("Failed to archive album {}: {}", album_id, err);
            return json_error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to build archive: {}", err),
            );
        }
        Err(err) => {
            warn!("Album archive join error: {}", err);
            return json_error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to build archive",
            );
        }
    };
    debug!(
        "Serving {} ({} entries, {} bytes)",
        summary.file_name,
        summary.entries.len(),
        size
    );

    let file = tokio::fs::File::from_std(staged);
    let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/zip"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    headers.insert(
        header::CONTENT_DISPOSITION,
        attachment_disposition(&summary.file_name),
    );
    response
}

pub async fn get_stats(State(state): State<AppState>) -> JsonResult<LibraryStatusResponse> {
    let stats = match state.library.stats() {
        Ok(stats) => stats,
        Err(LibraryError::Closed) => {
            return Err(json_error(StatusCode::SERVICE_UNAVAILABLE, "library closed"));
        }
        Err(err) => {
            return Err(json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("library error: {}", err),
            ));
        }
    };
    let status = state.scan_status.read().clone();
    let mut scan_started = None;
    let (message, last_scan) = match &status {
        ScanStatus::Failed(message) => (Some(message.clone()), None),
        ScanStatus::Finished(report) => (None, Some(report.clone())),
        ScanStatus::Scanning { started } => {
            scan_started = started
                .duration_since(UNIX_EPOCH)
                .ok()
                .map(|elapsed| elapsed.as_secs());
            (Some("library scan in progress".to_string()), None)
        }
        ScanStatus::Idle => (None, None),
    };
    Ok(Json(LibraryStatusResponse {
        status: status.label(),
        message,
        artists: stats.artists,
        albums: stats.albums,
        tracks: stats.tracks,
        scan_started,
        last_scan,
    }))
}
