//! Core utilities and types shared across all Shotrelay crates

pub mod problemdetails;
pub mod url_validation;
pub use problemdetails::{Problem, ProblemDetails};
pub use url_validation::{validate_target_url, UrlValidationError};

/// Human-readable service name reported by the metadata endpoints
pub const SERVICE_NAME: &str = "Screenshot Capture Service";

/// Service version reported by the metadata endpoints
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-export external dependencies
pub use serde;
pub use serde_json;
pub use thiserror;
pub use tracing;
