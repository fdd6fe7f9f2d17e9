use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CaptureRequest {
    /// The URL to capture a screenshot of
    #[schema(example = "https://example.com")]
    pub url: String,
    /// Proxy to use for this capture instead of tier escalation
    pub proxy: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CaptureResponse {
    /// The URL of the captured screenshot
    pub screenshot_url: String,
    /// The original URL that was captured
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CaptureUploadRequest {
    /// The URL to capture a screenshot of
    #[schema(example = "https://example.com")]
    pub url: String,
    /// Proxy to use for this capture instead of tier escalation
    pub proxy: Option<String>,
    /// Destination folder, e.g. `screenshots/2024/12`
    pub folder: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CaptureUploadResponse {
    /// Public URL of the stored screenshot
    pub uploaded_url: String,
    /// The URL of the captured screenshot
    pub screenshot_url: String,
    /// The original URL that was captured
    pub url: String,
    /// Folder the screenshot was stored under, null for the root
    pub folder: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadScreenshotRequest {
    /// An already rendered screenshot URL to store
    pub screenshot_url: String,
    /// Destination folder, e.g. `screenshots/2024/12`
    pub folder: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadScreenshotResponse {
    /// Public URL of the stored screenshot
    pub uploaded_url: String,
    /// The screenshot URL that was uploaded
    pub screenshot_url: String,
    /// Folder the screenshot was stored under, null for the root
    pub folder: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: String,
    pub service: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfoResponse {
    pub service: String,
    pub version: String,
    #[schema(example = "/docs")]
    pub docs: String,
    #[schema(example = "/health")]
    pub health: String,
}
