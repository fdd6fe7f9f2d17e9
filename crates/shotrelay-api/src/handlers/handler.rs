use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use shotrelay_capture::CaptureRequest as OrchestratorRequest;
use shotrelay_core::problemdetails::Problem;
use shotrelay_core::{SERVICE_NAME, SERVICE_VERSION};
use tracing::info;

use super::types::{
    CaptureRequest, CaptureResponse, CaptureUploadRequest, CaptureUploadResponse, HealthResponse,
    ServiceInfoResponse, UploadScreenshotRequest, UploadScreenshotResponse,
};
use crate::state::AppState;

/// Capture a screenshot
///
/// Tries the direct route first and escalates through the configured proxy
/// tiers on retryable failures. An explicit `proxy` is tried once instead.
#[utoipa::path(
    post,
    path = "/capture",
    request_body = CaptureRequest,
    responses(
        (status = 200, description = "Screenshot captured", body = CaptureResponse),
        (status = 400, description = "Invalid target URL or request"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 502, description = "Rendering provider failed on every tier"),
        (status = 503, description = "No capture route configured"),
        (status = 504, description = "Capture timed out")
    ),
    tag = "Screenshots",
    security(("bearer_auth" = []))
)]
pub async fn capture_screenshot(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CaptureRequest>,
) -> Result<impl IntoResponse, Problem> {
    info!("Capturing screenshot for URL: {}", request.url);

    let orchestrator_request =
        OrchestratorRequest::new(request.url.clone()).with_proxy(request.proxy);
    let captured = state.pipeline.capture(&orchestrator_request).await?;

    Ok(Json(CaptureResponse {
        screenshot_url: captured.screenshot_url,
        url: request.url,
    }))
}

/// Capture a screenshot and upload it
///
/// Stores the capture on the configured storage backend and returns its
/// public URL.
#[utoipa::path(
    post,
    path = "/capture/and-upload",
    request_body = CaptureUploadRequest,
    responses(
        (status = 200, description = "Screenshot captured and uploaded", body = CaptureUploadResponse),
        (status = 400, description = "Invalid target URL or request"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 502, description = "Capture or upload failed"),
        (status = 503, description = "No capture route configured"),
        (status = 504, description = "Capture timed out")
    ),
    tag = "Screenshots",
    security(("bearer_auth" = []))
)]
pub async fn capture_and_upload(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CaptureUploadRequest>,
) -> Result<impl IntoResponse, Problem> {
    info!("Capturing and uploading screenshot for URL: {}", request.url);

    let orchestrator_request =
        OrchestratorRequest::new(request.url.clone()).with_proxy(request.proxy);
    let result = state
        .pipeline
        .capture_and_upload(&orchestrator_request, request.folder)
        .await?;

    Ok(Json(CaptureUploadResponse {
        uploaded_url: result.upload.url,
        screenshot_url: result.captured.screenshot_url,
        url: request.url,
        folder: result.upload.folder,
    }))
}

/// Upload an existing screenshot URL
#[utoipa::path(
    post,
    path = "/capture/upload",
    request_body = UploadScreenshotRequest,
    responses(
        (status = 200, description = "Screenshot uploaded", body = UploadScreenshotResponse),
        (status = 400, description = "Invalid screenshot URL"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 502, description = "Download or upload failed")
    ),
    tag = "Screenshots",
    security(("bearer_auth" = []))
)]
pub async fn upload_screenshot(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UploadScreenshotRequest>,
) -> Result<impl IntoResponse, Problem> {
    info!("Uploading existing screenshot: {}", request.screenshot_url);

    let upload = state
        .pipeline
        .upload_existing(&request.screenshot_url, request.folder)
        .await?;

    Ok(Json(UploadScreenshotResponse {
        uploaded_url: upload.url,
        screenshot_url: request.screenshot_url,
        folder: upload.folder,
    }))
}

/// Liveness check
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "Health"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: SERVICE_VERSION.to_string(),
    })
}

/// Service metadata
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service metadata", body = ServiceInfoResponse)),
    tag = "Health"
)]
pub async fn service_info() -> Json<ServiceInfoResponse> {
    Json(ServiceInfoResponse {
        service: SERVICE_NAME.to_string(),
        version: SERVICE_VERSION.to_string(),
        docs: "/docs".to_string(),
        health: "/health".to_string(),
    })
}

/// Routes that require a bearer token
pub fn capture_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/capture", post(capture_screenshot))
        .route("/capture/and-upload", post(capture_and_upload))
        .route("/capture/upload", post(upload_screenshot))
}

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/", get(service_info))
}
