//! Capture orchestrator
//!
//! Drives the escalation loop for one request:
//! `Start -> Attempting(route) -> Succeeded | Attempting(next) | Exhausted`.
//! Attempts run strictly one after another; the loop is bounded by the number
//! of configured tiers (or the single explicit override).

use std::sync::Arc;
use std::time::Duration;

use shotrelay_core::validate_target_url;
use tracing::{debug, info, warn};
use url::Url;

use crate::client::{CaptureAttemptResult, CaptureClient};
use crate::error::{CaptureError, CaptureFailure, CaptureResult, FailureClass};
use crate::policy::EscalationPolicy;
use crate::tier::{ProxyRoute, ProxyTiers};

/// Slack on top of the summed per-attempt timeouts so a timed-out final
/// attempt is reported as such rather than as a blown overall budget
const OVERALL_BUDGET_GRACE: Duration = Duration::from_secs(1);

/// Inbound capture request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    /// Page to capture, validated by the orchestrator
    pub url: String,
    /// Explicit proxy, tried once instead of tier escalation
    pub proxy_override: Option<String>,
}

impl CaptureRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            proxy_override: None,
        }
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy_override = proxy;
        self
    }
}

/// Terminal result of an orchestration run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    Captured {
        screenshot_url: String,
        tier_used: ProxyRoute,
        attempts: Vec<CaptureAttemptResult>,
    },
    Exhausted {
        last_error: CaptureFailure,
        last_route: Option<ProxyRoute>,
        attempts: Vec<CaptureAttemptResult>,
    },
}

/// Successful capture, detached from the attempt log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    pub screenshot_url: String,
    pub tier_used: ProxyRoute,
    pub attempts: usize,
}

impl CaptureOutcome {
    pub fn is_captured(&self) -> bool {
        matches!(self, CaptureOutcome::Captured { .. })
    }

    pub fn attempts(&self) -> &[CaptureAttemptResult] {
        match self {
            CaptureOutcome::Captured { attempts, .. } => attempts,
            CaptureOutcome::Exhausted { attempts, .. } => attempts,
        }
    }

    /// Routes in the order they were attempted
    pub fn routes_tried(&self) -> Vec<ProxyRoute> {
        self.attempts().iter().map(|a| a.route).collect()
    }

    pub fn into_result(self) -> CaptureResult<Captured> {
        match self {
            CaptureOutcome::Captured {
                screenshot_url,
                tier_used,
                attempts,
            } => Ok(Captured {
                screenshot_url,
                tier_used,
                attempts: attempts.len(),
            }),
            CaptureOutcome::Exhausted {
                last_error,
                last_route,
                attempts,
            } => Err(CaptureError::Exhausted {
                failure: last_error,
                last_route,
                attempts: attempts.len(),
            }),
        }
    }
}

/// Runs capture attempts against a [`CaptureClient`] following an
/// [`EscalationPolicy`] built per request.
pub struct CaptureOrchestrator {
    client: Arc<dyn CaptureClient>,
    tiers: Arc<ProxyTiers>,
    attempt_timeout: Duration,
    overall_timeout: Option<Duration>,
}

impl CaptureOrchestrator {
    pub fn new(
        client: Arc<dyn CaptureClient>,
        tiers: Arc<ProxyTiers>,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            client,
            tiers,
            attempt_timeout,
            overall_timeout: None,
        }
    }

    /// Cap the whole escalation run at `timeout`.
    ///
    /// Without it the run is bounded by the per-attempt timeout times the
    /// number of possible attempts, plus a second of grace.
    pub fn with_overall_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.overall_timeout = timeout;
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.client.provider_name()
    }

    /// Run the escalation loop for `request` until success or exhaustion.
    pub async fn run(&self, request: &CaptureRequest) -> CaptureOutcome {
        let target = match validate_target_url(&request.url) {
            Ok(url) => url,
            Err(e) => {
                warn!("Rejecting capture of '{}': {}", request.url, e);
                return CaptureOutcome::Exhausted {
                    last_error: CaptureFailure::new(FailureClass::InvalidTarget, e.to_string()),
                    last_route: None,
                    attempts: Vec::new(),
                };
            }
        };

        let policy = EscalationPolicy::new(self.tiers.clone(), request.proxy_override.clone());
        let budget = self
            .overall_timeout
            .unwrap_or_else(|| default_budget(self.attempt_timeout, policy.max_attempts()));
        let mut attempts = Vec::new();

        let result =
            tokio::time::timeout(budget, self.escalate(&target, &policy, &mut attempts)).await;

        match result {
            Ok(Ok((screenshot_url, tier_used))) => CaptureOutcome::Captured {
                screenshot_url,
                tier_used,
                attempts,
            },
            Ok(Err((last_error, last_route))) => CaptureOutcome::Exhausted {
                last_error,
                last_route,
                attempts,
            },
            Err(_) => {
                warn!(
                    "Capture of {} exceeded overall budget of {:?} after {} attempt(s)",
                    target,
                    budget,
                    attempts.len()
                );
                let last_route = attempts.last().map(|a: &CaptureAttemptResult| a.route);
                CaptureOutcome::Exhausted {
                    last_error: CaptureFailure::new(
                        FailureClass::Timeout,
                        format!("Capture exceeded overall time budget of {:?}", budget),
                    ),
                    last_route,
                    attempts,
                }
            }
        }
    }

    async fn escalate(
        &self,
        target: &Url,
        policy: &EscalationPolicy,
        attempts: &mut Vec<CaptureAttemptResult>,
    ) -> Result<(String, ProxyRoute), (CaptureFailure, Option<ProxyRoute>)> {
        let mut tried: Vec<ProxyRoute> = Vec::new();
        let mut last_failure: Option<(CaptureFailure, ProxyRoute)> = None;
        let mut next = policy.first_route();

        while let Some(route) = next {
            let assignment = policy.assignment(route);
            info!(
                "Attempting capture of {} via {} tier ({})",
                target,
                route,
                assignment.endpoint_preview()
            );

            let attempt = match tokio::time::timeout(
                self.attempt_timeout,
                self.client.capture(target, &assignment),
            )
            .await
            {
                Ok(attempt) => attempt,
                Err(_) => CaptureAttemptResult::failed(
                    route,
                    CaptureFailure::new(
                        FailureClass::Timeout,
                        format!("Attempt timed out after {:?}", self.attempt_timeout),
                    ),
                ),
            };
            tried.push(route);

            let outcome = attempt.outcome.clone();
            attempts.push(attempt);

            match outcome {
                Ok(screenshot_url) => {
                    if attempts.len() > 1 {
                        info!("Capture succeeded via {} tier (fallback used)", route);
                    } else {
                        debug!("Capture succeeded via {} tier", route);
                    }
                    return Ok((screenshot_url, route));
                }
                Err(failure) => {
                    next = policy.next_route(&tried, Some(&failure.class));
                    match next {
                        Some(next_route) => warn!(
                            "Capture via {} tier failed ({}), escalating to {}",
                            route, failure.class, next_route
                        ),
                        None if !failure.is_retryable() => warn!(
                            "Capture via {} tier failed with non-retryable {}, not escalating",
                            route, failure.class
                        ),
                        None => warn!(
                            "Capture via {} tier failed ({}), no tiers left",
                            route, failure.class
                        ),
                    }
                    last_failure = Some((failure, route));
                }
            }
        }

        Err(match last_failure {
            Some((failure, route)) => (failure, Some(route)),
            None => (
                CaptureFailure::new(
                    FailureClass::NoRouteAvailable,
                    "No proxy tier is configured and no explicit proxy was given",
                ),
                None,
            ),
        })
    }
}

/// Summed per-attempt timeouts plus grace, saturating at `Duration::MAX`
fn default_budget(attempt_timeout: Duration, max_attempts: usize) -> Duration {
    let attempts = u32::try_from(max_attempts.max(1)).unwrap_or(u32::MAX);
    attempt_timeout
        .checked_mul(attempts)
        .and_then(|total| total.checked_add(OVERALL_BUDGET_GRACE))
        .unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budget() {
        assert_eq!(
            default_budget(Duration::from_secs(60), 3),
            Duration::from_secs(181)
        );
        assert_eq!(
            default_budget(Duration::from_secs(60), 0),
            Duration::from_secs(61)
        );
        assert_eq!(
            default_budget(Duration::from_secs(u64::MAX / 2), 3),
            Duration::MAX
        );
    }

    #[test]
    fn test_into_result_for_exhausted() {
        let outcome = CaptureOutcome::Exhausted {
            last_error: CaptureFailure::new(FailureClass::RateLimited, "slow down"),
            last_route: None,
            attempts: Vec::new(),
        };
        assert!(!outcome.is_captured());

        match outcome.into_result() {
            Err(CaptureError::Exhausted {
                failure, attempts, ..
            }) => {
                assert_eq!(failure.class, FailureClass::RateLimited);
                assert_eq!(attempts, 0);
            }
            other => panic!("Expected Exhausted error, got: {:?}", other),
        }
    }

    #[test]
    fn test_request_builder() {
        let request =
            CaptureRequest::new("https://example.com").with_proxy(Some("http://p:1".to_string()));
        assert_eq!(request.url, "https://example.com");
        assert_eq!(request.proxy_override.as_deref(), Some("http://p:1"));
    }
}
