//! Capture client trait
//!
//! Defines the interface for a single capture attempt against a rendering provider.

use async_trait::async_trait;
use url::Url;

use crate::error::CaptureFailure;
use crate::tier::{ProxyAssignment, ProxyRoute};

/// Result of one capture attempt. Produced once per attempt, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureAttemptResult {
    /// Route the attempt went through
    pub route: ProxyRoute,
    /// Screenshot URL on success, classified failure otherwise
    pub outcome: Result<String, CaptureFailure>,
}

impl CaptureAttemptResult {
    pub fn succeeded(route: ProxyRoute, screenshot_url: impl Into<String>) -> Self {
        Self {
            route,
            outcome: Ok(screenshot_url.into()),
        }
    }

    pub fn failed(route: ProxyRoute, failure: CaptureFailure) -> Self {
        Self {
            route,
            outcome: Err(failure),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn screenshot_url(&self) -> Option<&str> {
        self.outcome.as_ref().ok().map(String::as_str)
    }

    pub fn failure(&self) -> Option<&CaptureFailure> {
        self.outcome.as_ref().err()
    }
}

/// Capture client - implement this for each rendering provider.
///
/// Implementations make exactly one outbound call per invocation and never
/// retry internally. Every failure must come back classified.
#[async_trait]
pub trait CaptureClient: Send + Sync {
    /// Capture `target` through the proxy in `assignment`
    async fn capture(&self, target: &Url, assignment: &ProxyAssignment) -> CaptureAttemptResult;

    /// Get the name of this provider (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
