//! Capture and upload pipeline
//!
//! Glues the capture orchestrator to the active storage backend. A capture
//! that succeeds but fails to upload is reported as an upload failure and
//! is not retried.

use std::sync::Arc;

use shotrelay_capture::{CaptureError, CaptureOrchestrator, CaptureRequest, Captured};
use shotrelay_core::problemdetails::{self, Problem};
use shotrelay_core::validate_target_url;
use shotrelay_storage::{
    name_hint_from_url, StorageError, StorageSelector, UploadResult, UploadTarget,
};
use thiserror::Error;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Invalid screenshot URL: {0}")]
    InvalidScreenshotUrl(String),
}

impl From<PipelineError> for Problem {
    fn from(error: PipelineError) -> Self {
        match error {
            PipelineError::Capture(e) => e.into(),
            PipelineError::Storage(e) => e.into(),
            PipelineError::InvalidScreenshotUrl(msg) => {
                problemdetails::new(axum::http::StatusCode::BAD_REQUEST)
                    .with_title("Invalid Screenshot URL")
                    .with_detail(msg)
            }
        }
    }
}

/// A capture that was uploaded to the active backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedUpload {
    pub captured: Captured,
    pub upload: UploadResult,
}

pub struct ScreenshotPipeline {
    orchestrator: Arc<CaptureOrchestrator>,
    storage: StorageSelector,
}

impl ScreenshotPipeline {
    pub fn new(orchestrator: Arc<CaptureOrchestrator>, storage: StorageSelector) -> Self {
        Self {
            orchestrator,
            storage,
        }
    }

    /// Capture a screenshot, escalating through proxy tiers as needed
    pub async fn capture(&self, request: &CaptureRequest) -> Result<Captured, PipelineError> {
        let outcome = self.orchestrator.run(request).await;
        let captured = outcome.into_result().map_err(|e| {
            error!("Failed to capture {}: {}", request.url, e);
            e
        })?;

        info!(
            "Captured {} via {} tier after {} attempt(s)",
            request.url, captured.tier_used, captured.attempts
        );
        Ok(captured)
    }

    /// Capture a screenshot, then store it on the active backend
    pub async fn capture_and_upload(
        &self,
        request: &CaptureRequest,
        folder: Option<String>,
    ) -> Result<CapturedUpload, PipelineError> {
        let captured = self.capture(request).await?;
        let upload = self.upload(&captured.screenshot_url, folder).await?;
        Ok(CapturedUpload { captured, upload })
    }

    /// Store an already rendered screenshot URL on the active backend
    pub async fn upload_existing(
        &self,
        screenshot_url: &str,
        folder: Option<String>,
    ) -> Result<UploadResult, PipelineError> {
        let url = validate_target_url(screenshot_url)
            .map_err(|e| PipelineError::InvalidScreenshotUrl(e.to_string()))?;
        self.upload(url.as_str(), folder).await
    }

    async fn upload(
        &self,
        screenshot_url: &str,
        folder: Option<String>,
    ) -> Result<UploadResult, PipelineError> {
        let target = UploadTarget::remote(screenshot_url)
            .with_folder(folder)
            .with_name_hint(Some(name_hint_from_url(screenshot_url)));

        let result = self
            .storage
            .active_backend()
            .upload(target)
            .await
            .map_err(|e| {
                error!("Failed to upload {}: {}", screenshot_url, e);
                e
            })?;

        info!(
            "Screenshot uploaded to folder '{}': {}",
            result.folder.as_deref().unwrap_or("root"),
            result.url
        );
        Ok(result)
    }
}
