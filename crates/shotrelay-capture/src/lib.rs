//! Screenshot capture with proxy escalation
//!
//! A capture request is sent to the rendering provider through the cheapest
//! configured proxy tier first. Retryable failures escalate to the next tier
//! (`none` -> `basic` -> `advanced`); non-retryable failures stop immediately.

pub mod client;
pub mod error;
pub mod orchestrator;
pub mod policy;
pub mod screenshotone;
pub mod tier;

pub use client::{CaptureAttemptResult, CaptureClient};
pub use error::{CaptureError, CaptureFailure, CaptureResult, FailureClass};
pub use orchestrator::{CaptureOrchestrator, CaptureOutcome, CaptureRequest, Captured};
pub use policy::EscalationPolicy;
pub use screenshotone::{ScreenshotOneClient, ScreenshotOneSettings, DEFAULT_SCREENSHOTONE_API_URL};
pub use tier::{ProxyAssignment, ProxyRoute, ProxyTier, ProxyTiers};
