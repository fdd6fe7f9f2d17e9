use std::sync::Arc;

use crate::auth::AuthSettings;
use crate::services::ScreenshotPipeline;

/// Shared, read-only application state
pub struct AppState {
    pub pipeline: Arc<ScreenshotPipeline>,
    pub auth: AuthSettings,
}

impl AppState {
    pub fn new(pipeline: Arc<ScreenshotPipeline>, auth: AuthSettings) -> Self {
        Self { pipeline, auth }
    }
}
