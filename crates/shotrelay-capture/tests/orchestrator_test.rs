//! Orchestration tests against a scripted capture client

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use shotrelay_capture::{
    CaptureAttemptResult, CaptureClient, CaptureError, CaptureFailure, CaptureOrchestrator,
    CaptureOutcome, CaptureRequest, FailureClass, ProxyAssignment, ProxyRoute, ProxyTier,
    ProxyTiers,
};
use url::Url;

/// Mock client that answers per route and records every call
struct ScriptedClient {
    script: HashMap<ProxyRoute, Result<String, CaptureFailure>>,
    delays: HashMap<ProxyRoute, Duration>,
    calls: Mutex<Vec<ProxyAssignment>>,
}

impl ScriptedClient {
    fn new() -> Self {
        Self {
            script: HashMap::new(),
            delays: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn succeed(mut self, route: ProxyRoute, url: &str) -> Self {
        self.script.insert(route, Ok(url.to_string()));
        self
    }

    fn fail(mut self, route: ProxyRoute, class: FailureClass) -> Self {
        self.script.insert(
            route,
            Err(CaptureFailure::new(class, format!("{} failure", class))),
        );
        self
    }

    fn hang(mut self, route: ProxyRoute, delay: Duration) -> Self {
        self.delays.insert(route, delay);
        self
    }

    fn calls(&self) -> Vec<ProxyAssignment> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CaptureClient for ScriptedClient {
    async fn capture(&self, _target: &Url, assignment: &ProxyAssignment) -> CaptureAttemptResult {
        self.calls.lock().unwrap().push(assignment.clone());

        if let Some(delay) = self.delays.get(&assignment.route) {
            tokio::time::sleep(*delay).await;
        }

        match self.script.get(&assignment.route) {
            Some(Ok(url)) => CaptureAttemptResult::succeeded(assignment.route, url.clone()),
            Some(Err(failure)) => CaptureAttemptResult::failed(assignment.route, failure.clone()),
            None => CaptureAttemptResult::failed(
                assignment.route,
                CaptureFailure::new(FailureClass::ProviderUnavailable, "unscripted route"),
            ),
        }
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

const NONE: ProxyRoute = ProxyRoute::Tier(ProxyTier::None);
const BASIC: ProxyRoute = ProxyRoute::Tier(ProxyTier::Basic);
const ADVANCED: ProxyRoute = ProxyRoute::Tier(ProxyTier::Advanced);

fn all_tiers() -> ProxyTiers {
    ProxyTiers::new(
        true,
        Some("http://basic.proxy:8000".to_string()),
        Some("http://unlocker.proxy:9000".to_string()),
    )
}

fn orchestrator(client: Arc<ScriptedClient>, tiers: ProxyTiers) -> CaptureOrchestrator {
    CaptureOrchestrator::new(client, Arc::new(tiers), Duration::from_secs(30))
}

#[tokio::test]
async fn test_falls_back_to_basic_and_stops() {
    let client = Arc::new(
        ScriptedClient::new()
            .fail(NONE, FailureClass::TargetRejected)
            .succeed(BASIC, "https://cache.example/basic.jpeg")
            .succeed(ADVANCED, "https://cache.example/advanced.jpeg"),
    );
    let outcome = orchestrator(client.clone(), all_tiers())
        .run(&CaptureRequest::new("https://example.com"))
        .await;

    match &outcome {
        CaptureOutcome::Captured {
            screenshot_url,
            tier_used,
            ..
        } => {
            assert_eq!(screenshot_url, "https://cache.example/basic.jpeg");
            assert_eq!(*tier_used, BASIC);
        }
        other => panic!("Expected Captured, got: {:?}", other),
    }

    assert_eq!(outcome.routes_tried(), vec![NONE, BASIC]);
    let calls = client.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].endpoint, None);
    assert_eq!(calls[1].endpoint.as_deref(), Some("http://basic.proxy:8000"));
}

#[tokio::test]
async fn test_escalates_through_all_tiers() {
    let client = Arc::new(
        ScriptedClient::new()
            .fail(NONE, FailureClass::Timeout)
            .fail(BASIC, FailureClass::RateLimited)
            .succeed(ADVANCED, "https://cache.example/advanced.jpeg"),
    );
    let outcome = orchestrator(client.clone(), all_tiers())
        .run(&CaptureRequest::new("https://example.com"))
        .await;

    let captured = outcome.into_result().unwrap();
    assert_eq!(captured.tier_used, ADVANCED);
    assert_eq!(captured.attempts, 3);
    assert_eq!(captured.screenshot_url, "https://cache.example/advanced.jpeg");
}

#[tokio::test]
async fn test_override_is_attempted_exactly_once() {
    let client = Arc::new(
        ScriptedClient::new()
            .fail(ProxyRoute::Override, FailureClass::TargetRejected)
            .succeed(NONE, "https://cache.example/none.jpeg"),
    );
    let request = CaptureRequest::new("https://example.com")
        .with_proxy(Some("http://mine.proxy:1234".to_string()));
    let outcome = orchestrator(client.clone(), all_tiers()).run(&request).await;

    match &outcome {
        CaptureOutcome::Exhausted {
            last_error,
            last_route,
            ..
        } => {
            assert_eq!(last_error.class, FailureClass::TargetRejected);
            assert_eq!(*last_route, Some(ProxyRoute::Override));
        }
        other => panic!("Expected Exhausted, got: {:?}", other),
    }

    let calls = client.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].route, ProxyRoute::Override);
    assert_eq!(calls[0].endpoint.as_deref(), Some("http://mine.proxy:1234"));
}

#[tokio::test]
async fn test_no_tiers_configured_makes_no_calls() {
    let client = Arc::new(ScriptedClient::new().succeed(NONE, "https://never"));
    let outcome = orchestrator(client.clone(), ProxyTiers::default())
        .run(&CaptureRequest::new("https://example.com"))
        .await;

    match outcome {
        CaptureOutcome::Exhausted {
            last_error,
            attempts,
            ..
        } => {
            assert_eq!(last_error.class, FailureClass::NoRouteAvailable);
            assert!(attempts.is_empty());
        }
        other => panic!("Expected Exhausted, got: {:?}", other),
    }
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_non_retryable_failure_stops_escalation() {
    let client = Arc::new(
        ScriptedClient::new()
            .fail(NONE, FailureClass::ProviderAuth)
            .succeed(BASIC, "https://cache.example/basic.jpeg"),
    );
    let outcome = orchestrator(client.clone(), all_tiers())
        .run(&CaptureRequest::new("https://example.com"))
        .await;

    assert!(!outcome.is_captured());
    assert_eq!(outcome.routes_tried(), vec![NONE]);
    assert_eq!(client.calls().len(), 1);
}

#[tokio::test]
async fn test_invalid_target_is_rejected_without_calls() {
    let client = Arc::new(ScriptedClient::new().succeed(NONE, "https://never"));
    let outcome = orchestrator(client.clone(), all_tiers())
        .run(&CaptureRequest::new("not-a-url"))
        .await;

    assert!(client.calls().is_empty());
    match outcome.into_result() {
        Err(CaptureError::Exhausted {
            failure, attempts, ..
        }) => {
            assert_eq!(failure.class, FailureClass::InvalidTarget);
            assert_eq!(attempts, 0);
        }
        other => panic!("Expected InvalidTarget exhaustion, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_exhausted_reports_last_tier_failure() {
    let client = Arc::new(
        ScriptedClient::new()
            .fail(NONE, FailureClass::Timeout)
            .fail(BASIC, FailureClass::TargetRejected)
            .fail(ADVANCED, FailureClass::ProviderUnavailable),
    );
    let outcome = orchestrator(client.clone(), all_tiers())
        .run(&CaptureRequest::new("https://example.com"))
        .await;

    assert_eq!(outcome.routes_tried(), vec![NONE, BASIC, ADVANCED]);
    match outcome {
        CaptureOutcome::Exhausted {
            last_error,
            last_route,
            ..
        } => {
            assert_eq!(last_error.class, FailureClass::ProviderUnavailable);
            assert_eq!(last_route, Some(ADVANCED));
        }
        other => panic!("Expected Exhausted, got: {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_hanging_attempt_times_out_and_escalates() {
    let client = Arc::new(
        ScriptedClient::new()
            .hang(BASIC, Duration::from_secs(600))
            .succeed(BASIC, "https://never")
            .succeed(ADVANCED, "https://cache.example/advanced.jpeg"),
    );
    let tiers = ProxyTiers::new(
        false,
        Some("http://basic.proxy:8000".to_string()),
        Some("http://unlocker.proxy:9000".to_string()),
    );
    let outcome = CaptureOrchestrator::new(client.clone(), Arc::new(tiers), Duration::from_secs(5))
        .run(&CaptureRequest::new("https://example.com"))
        .await;

    let attempts = outcome.attempts().to_vec();
    assert_eq!(attempts.len(), 2);
    assert_eq!(
        attempts[0].failure().map(|f| f.class),
        Some(FailureClass::Timeout)
    );
    assert_eq!(outcome.into_result().unwrap().tier_used, ADVANCED);
}

#[tokio::test(start_paused = true)]
async fn test_overall_timeout_ends_the_run() {
    let client = Arc::new(
        ScriptedClient::new()
            .hang(BASIC, Duration::from_secs(600))
            .hang(ADVANCED, Duration::from_secs(600)),
    );
    let tiers = ProxyTiers::new(
        false,
        Some("http://basic.proxy:8000".to_string()),
        Some("http://unlocker.proxy:9000".to_string()),
    );
    let outcome = CaptureOrchestrator::new(client.clone(), Arc::new(tiers), Duration::from_secs(5))
        .with_overall_timeout(Some(Duration::from_secs(7)))
        .run(&CaptureRequest::new("https://example.com"))
        .await;

    // basic timed out at 5s; advanced was cut off by the 7s budget
    assert_eq!(client.calls().len(), 2);
    match outcome {
        CaptureOutcome::Exhausted {
            last_error,
            last_route,
            attempts,
        } => {
            assert_eq!(last_error.class, FailureClass::Timeout);
            assert!(last_error.message.contains("overall time budget"));
            assert_eq!(last_route, Some(BASIC));
            assert_eq!(attempts.len(), 1);
        }
        other => panic!("Expected Exhausted, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_huge_attempt_timeout_does_not_overflow() {
    let client = Arc::new(ScriptedClient::new().succeed(NONE, "https://cache.example/none.jpeg"));
    let outcome = CaptureOrchestrator::new(
        client,
        Arc::new(all_tiers()),
        Duration::from_secs(u64::MAX / 2),
    )
    .run(&CaptureRequest::new("https://example.com"))
    .await;

    assert_eq!(outcome.into_result().unwrap().tier_used, NONE);
}
