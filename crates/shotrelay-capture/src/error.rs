//! Capture failure classification and error types

use std::fmt;

use axum::http::StatusCode;
use serde::Serialize;
use shotrelay_core::problemdetails::{self, Problem};
use thiserror::Error;

use crate::tier::ProxyRoute;

pub type CaptureResult<T> = Result<T, CaptureError>;

/// Classification of a failed capture attempt.
///
/// Retryable classes escalate to the next proxy tier; the rest end the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// The attempt exceeded its timeout
    Timeout,
    /// Provider rate limit or concurrency limit hit
    RateLimited,
    /// Transport-level failure talking to the provider
    Connectivity,
    /// Provider returned a 5xx or reported itself unavailable
    ProviderUnavailable,
    /// Provider could not render the target (blocked, bot wall, target error)
    TargetRejected,
    /// Target URL is not a valid absolute http(s) URL
    InvalidTarget,
    /// Provider rejected the request itself as malformed
    InvalidRequest,
    /// Provider rejected our credentials or account
    ProviderAuth,
    /// Provider answered 2xx with a body we cannot use
    MalformedResponse,
    /// No proxy tier is configured, nothing was attempted
    NoRouteAvailable,
}

impl FailureClass {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FailureClass::Timeout
                | FailureClass::RateLimited
                | FailureClass::Connectivity
                | FailureClass::ProviderUnavailable
                | FailureClass::TargetRejected
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureClass::Timeout => "timeout",
            FailureClass::RateLimited => "rate_limited",
            FailureClass::Connectivity => "connectivity",
            FailureClass::ProviderUnavailable => "provider_unavailable",
            FailureClass::TargetRejected => "target_rejected",
            FailureClass::InvalidTarget => "invalid_target",
            FailureClass::InvalidRequest => "invalid_request",
            FailureClass::ProviderAuth => "provider_auth",
            FailureClass::MalformedResponse => "malformed_response",
            FailureClass::NoRouteAvailable => "no_route_available",
        }
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified attempt failure. Never raised unclassified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{class}: {message}")]
pub struct CaptureFailure {
    pub class: FailureClass,
    pub message: String,
}

impl CaptureFailure {
    pub fn new(class: FailureClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.class.is_retryable()
    }
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Screenshot capture failed after {attempts} attempt(s): {failure}")]
    Exhausted {
        failure: CaptureFailure,
        last_route: Option<ProxyRoute>,
        attempts: usize,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CaptureError {
    /// Failure class of the terminal attempt, if this was an exhausted run
    pub fn failure_class(&self) -> Option<FailureClass> {
        match self {
            CaptureError::Exhausted { failure, .. } => Some(failure.class),
            CaptureError::Config(_) => None,
        }
    }
}

impl From<CaptureError> for Problem {
    fn from(error: CaptureError) -> Self {
        match error {
            CaptureError::Exhausted {
                failure,
                last_route,
                attempts,
            } => {
                let (status, title) = match failure.class {
                    FailureClass::InvalidTarget => (StatusCode::BAD_REQUEST, "Invalid URL"),
                    FailureClass::InvalidRequest => {
                        (StatusCode::BAD_REQUEST, "Invalid Capture Request")
                    }
                    FailureClass::NoRouteAvailable => {
                        (StatusCode::SERVICE_UNAVAILABLE, "No Capture Route Configured")
                    }
                    FailureClass::Timeout => (StatusCode::GATEWAY_TIMEOUT, "Capture Timed Out"),
                    FailureClass::ProviderAuth => {
                        (StatusCode::BAD_GATEWAY, "Rendering Provider Rejected Credentials")
                    }
                    _ => (StatusCode::BAD_GATEWAY, "Capture Failed"),
                };

                let mut problem = problemdetails::new(status)
                    .with_title(title)
                    .with_detail(failure.message)
                    .with_value("failure_class", failure.class.as_str())
                    .with_value("attempts", attempts);
                if let Some(route) = last_route {
                    problem = problem.with_value("last_tier", route.as_str());
                }
                problem
            }

            CaptureError::Config(msg) => problemdetails::new(StatusCode::INTERNAL_SERVER_ERROR)
                .with_title("Configuration Error")
                .with_detail(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::ProxyTier;

    #[test]
    fn test_retryable_taxonomy() {
        assert!(FailureClass::Timeout.is_retryable());
        assert!(FailureClass::RateLimited.is_retryable());
        assert!(FailureClass::TargetRejected.is_retryable());
        assert!(!FailureClass::InvalidTarget.is_retryable());
        assert!(!FailureClass::ProviderAuth.is_retryable());
        assert!(!FailureClass::MalformedResponse.is_retryable());
        assert!(!FailureClass::NoRouteAvailable.is_retryable());
    }

    #[test]
    fn test_invalid_target_maps_to_bad_request() {
        let error = CaptureError::Exhausted {
            failure: CaptureFailure::new(FailureClass::InvalidTarget, "Invalid URL format"),
            last_route: None,
            attempts: 0,
        };
        let problem: Problem = error.into();
        assert_eq!(problem.status_code, StatusCode::BAD_REQUEST);
        assert_eq!(problem.title(), Some("Invalid URL"));
    }

    #[test]
    fn test_exhausted_timeout_maps_to_gateway_timeout() {
        let error = CaptureError::Exhausted {
            failure: CaptureFailure::new(FailureClass::Timeout, "attempt timed out"),
            last_route: Some(ProxyRoute::Tier(ProxyTier::Advanced)),
            attempts: 3,
        };
        let problem: Problem = error.into();
        assert_eq!(problem.status_code, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(problem.body["last_tier"], "advanced");
        assert_eq!(problem.body["attempts"], 3);
        assert_eq!(problem.body["failure_class"], "timeout");
    }
}
