//! ScreenshotOne capture client
//!
//! Calls the ScreenshotOne `take` endpoint with `response_type=json` and returns
//! the hosted screenshot URL from the response.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::client::{CaptureAttemptResult, CaptureClient};
use crate::error::{CaptureError, CaptureFailure, CaptureResult, FailureClass};
use crate::tier::ProxyAssignment;

pub const DEFAULT_SCREENSHOTONE_API_URL: &str = "https://api.screenshotone.com/take";

/// Rendered screenshots stay in the provider cache for 29 days
const CACHE_TTL_SECS: u64 = 2_505_600;

/// Page content that marks a bot wall rather than the real page
const FAIL_IF_CONTENT_CONTAINS: [&str; 2] = ["Verify you are human", "blocked"];

const AUTH_ERROR_CODES: [&str; 6] = [
    "access_key_required",
    "access_key_invalid",
    "invalid_access_key",
    "signature_is_required",
    "signature_is_not_valid",
    "screenshots_limit_reached",
];

const REQUEST_ERROR_CODES: [&str; 2] = ["request_not_valid", "invalid_request"];

#[derive(Debug, Clone)]
pub struct ScreenshotOneSettings {
    /// Full URL of the `take` endpoint
    pub api_url: String,
    /// Account access key
    pub access_key: String,
    /// Per-attempt timeout
    pub timeout: Duration,
}

impl ScreenshotOneSettings {
    pub fn new(access_key: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_SCREENSHOTONE_API_URL.to_string(),
            access_key: access_key.into(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Capture client backed by the ScreenshotOne API
pub struct ScreenshotOneClient {
    settings: ScreenshotOneSettings,
    client: Client,
}

#[derive(Deserialize)]
struct TakeResponse {
    #[serde(default)]
    screenshot: Option<String>,
    #[serde(default)]
    screenshot_url: Option<String>,
    #[serde(default)]
    cache_url: Option<String>,
}

impl TakeResponse {
    fn into_url(self) -> Option<String> {
        [self.screenshot, self.screenshot_url, self.cache_url]
            .into_iter()
            .flatten()
            .map(|u| u.trim().to_string())
            .find(|u| !u.is_empty())
    }
}

#[derive(Deserialize, Default)]
struct ErrorResponse {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    returned_status_code: Option<u16>,
}

impl ScreenshotOneClient {
    pub fn new(settings: ScreenshotOneSettings) -> CaptureResult<Self> {
        if settings.access_key.trim().is_empty() {
            return Err(CaptureError::Config(
                "SCREENSHOTONE_ACCESS_KEY is required".to_string(),
            ));
        }
        Url::parse(&settings.api_url).map_err(|e| {
            CaptureError::Config(format!(
                "Invalid ScreenshotOne API URL '{}': {}",
                settings.api_url, e
            ))
        })?;

        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| {
                error!("Failed to create HTTP client: {}", e);
                CaptureError::Config(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { settings, client })
    }

    fn query(&self, target: &Url, assignment: &ProxyAssignment) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("access_key", self.settings.access_key.clone()),
            ("url", target.to_string()),
            ("response_type", "json".to_string()),
            ("format", "jpeg".to_string()),
            ("image_quality", "70".to_string()),
            ("cache", "true".to_string()),
            ("cache_ttl", CACHE_TTL_SECS.to_string()),
        ];
        for needle in FAIL_IF_CONTENT_CONTAINS {
            query.push(("fail_if_content_contains", needle.to_string()));
        }
        if let Some(ref proxy) = assignment.endpoint {
            query.push(("proxy", proxy.clone()));
        }
        query
    }

    async fn take(&self, target: &Url, assignment: &ProxyAssignment) -> Result<String, CaptureFailure> {
        let response = self
            .client
            .get(&self.settings.api_url)
            .query(&self.query(target, assignment))
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(classify_transport_error)?;

        if !status.is_success() {
            return Err(classify_error_response(status, &body));
        }

        let parsed: TakeResponse = serde_json::from_str(&body).map_err(|e| {
            CaptureFailure::new(
                FailureClass::MalformedResponse,
                format!("Failed to parse provider response: {}", e),
            )
        })?;

        parsed.into_url().ok_or_else(|| {
            CaptureFailure::new(
                FailureClass::MalformedResponse,
                format!("No screenshot URL in response: {}", truncate(&body, 500)),
            )
        })
    }
}

#[async_trait]
impl CaptureClient for ScreenshotOneClient {
    async fn capture(&self, target: &Url, assignment: &ProxyAssignment) -> CaptureAttemptResult {
        debug!(
            "Capturing screenshot of {} via {} ({})",
            target,
            assignment.route,
            assignment.endpoint_preview()
        );

        match self.take(target, assignment).await {
            Ok(screenshot_url) => {
                info!(
                    "Screenshot URL obtained for {} using {} tier",
                    target, assignment.route
                );
                CaptureAttemptResult::succeeded(assignment.route, screenshot_url)
            }
            Err(failure) => {
                warn!(
                    "Capture of {} via {} tier failed ({}): {}",
                    target, assignment.route, failure.class, failure.message
                );
                CaptureAttemptResult::failed(assignment.route, failure)
            }
        }
    }

    fn provider_name(&self) -> &'static str {
        "screenshotone"
    }
}

fn classify_transport_error(e: reqwest::Error) -> CaptureFailure {
    // The request URL carries the access key
    let e = e.without_url();
    if e.is_timeout() {
        CaptureFailure::new(FailureClass::Timeout, format!("Request timed out: {}", e))
    } else {
        CaptureFailure::new(
            FailureClass::Connectivity,
            format!("Request to rendering provider failed: {}", e),
        )
    }
}

fn classify_error_response(status: StatusCode, body: &str) -> CaptureFailure {
    let details: ErrorResponse = serde_json::from_str(body).unwrap_or_default();

    let mut message = format!("API Error {}", status.as_u16());
    match details.error_message {
        Some(ref msg) => message.push_str(&format!(": {}", msg)),
        None if details.error_code.is_none() => {
            message.push_str(&format!(": {}", truncate(body, 500)))
        }
        None => {}
    }
    if let Some(code) = details.returned_status_code {
        message.push_str(&format!(" (target site returned {})", code));
    }
    if let Some(ref code) = details.error_code {
        message.push_str(&format!(" [Error Code: {}]", code));
    }

    let code = details.error_code.as_deref().unwrap_or_default();
    let class = if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || AUTH_ERROR_CODES.contains(&code)
    {
        FailureClass::ProviderAuth
    } else if status == StatusCode::TOO_MANY_REQUESTS || code == "concurrency_limit_reached" {
        FailureClass::RateLimited
    } else if status.is_server_error()
        || code == "temporary_unavailable"
        || code == "internal_application_error"
    {
        FailureClass::ProviderUnavailable
    } else if code == "timeout_error" {
        FailureClass::Timeout
    } else if REQUEST_ERROR_CODES.contains(&code) {
        FailureClass::InvalidRequest
    } else {
        FailureClass::TargetRejected
    };

    CaptureFailure::new(class, message)
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
