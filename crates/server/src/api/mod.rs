pub mod library;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use crate::scan::start_scan;
use crate::state::{AppState, HealthResponse};
use crate::utils::json_error_response;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/search", get(library::search))
        .route("/search/:term", get(library::search_term))
        .route("/file/:track_id", get(library::get_file))
        .route("/album/:album_id", get(library::get_album))
        .route("/library/stats", get(library::get_stats))
        .route("/library/scan", post(trigger_scan))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

async fn trigger_scan(State(state): State<AppState>) -> axum::response::Response {
    if start_scan(state) {
        (StatusCode::ACCEPTED, Json(HealthResponse { status: "scanning" })).into_response()
    } else {
        json_error_response(StatusCode::CONFLICT, "library scan already running")
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use axum::Router;
    use library::test_support::test_library;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::api_router;
    use crate::state::AppState;

    pub fn test_state() -> (TempDir, AppState) {
        let (dir, library) = test_library();
        (dir, AppState::new(library))
    }

    pub fn app(state: AppState) -> Router {
        Router::new().nest("/api/v1", api_router(state))
    }

    pub async fn get(app: Router, uri: &str) -> Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub async fn body_bytes(response: Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    pub async fn body_json(response: Response) -> serde_json::Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    pub fn assert_status(response: &Response, status: StatusCode) {
        assert_eq!(response.status(), status, "unexpected status");
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use tower::ServiceExt;

    use super::test_support::{app, assert_status, body_json, get, test_state};

    #[tokio::test]
    async fn health_reports_ok() {
        let (_dir, state) = test_state();
        let response = get(app(state), "/api/v1/health").await;
        assert_status(&response, StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn scan_can_be_triggered() {
        let (_dir, state) = test_state();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/library/scan")
            .body(Body::empty())
            .unwrap();
        let response = app(state).oneshot(request).await.unwrap();
        assert_status(&response, StatusCode::ACCEPTED);
    }
}
