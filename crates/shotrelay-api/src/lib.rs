//! HTTP surface of the screenshot service
//!
//! `POST /capture*` routes sit behind bearer authentication; `/health`, `/`
//! and the OpenAPI docs at `/docs` are public.

pub mod auth;
pub mod handlers;
pub mod services;
pub mod state;

use std::sync::Arc;

use axum::middleware;
use axum::Router;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use auth::{AuthError, AuthSettings};
pub use handlers::ApiDoc;
pub use services::{CapturedUpload, PipelineError, ScreenshotPipeline};
pub use state::AppState;

/// Build the full application router
pub fn build_router(state: Arc<AppState>) -> Router {
    let protected = handlers::capture_routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        auth::require_bearer,
    ));

    Router::new()
        .merge(handlers::public_routes())
        .merge(protected)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
}
