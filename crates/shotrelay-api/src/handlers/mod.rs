mod handler;
pub mod types;

pub use handler::{capture_routes, public_routes};

use shotrelay_core::problemdetails::ProblemDetails;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use self::types::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        handler::capture_screenshot,
        handler::capture_and_upload,
        handler::upload_screenshot,
        handler::health_check,
        handler::service_info,
    ),
    components(
        schemas(
            CaptureRequest,
            CaptureResponse,
            CaptureUploadRequest,
            CaptureUploadResponse,
            UploadScreenshotRequest,
            UploadScreenshotResponse,
            HealthResponse,
            ServiceInfoResponse,
            ProblemDetails,
        )
    ),
    modifiers(&BearerAuth),
    info(
        title = "Screenshot Capture Service",
        description = "Capture web page screenshots through a rendering provider with proxy-tier \
        escalation, and store them on Cloudinary or S3 behind a CDN."
    ),
    tags(
        (name = "Screenshots", description = "Screenshot capture and upload endpoints"),
        (name = "Health", description = "Liveness and service metadata")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let mut http_scheme = Http::new(HttpAuthScheme::Bearer);
        http_scheme.description =
            Some("Bearer token authentication. Use format: `Bearer <API_TOKEN>`.".to_string());

        openapi
            .components
            .get_or_insert_with(Default::default)
            .add_security_scheme("bearer_auth", SecurityScheme::Http(http_scheme));
    }
}
