//! Error types for the storage backends

use axum::http::StatusCode;
use shotrelay_core::problemdetails::{self, Problem};
use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while selecting a backend or uploading to it
#[derive(Error, Debug)]
pub enum StorageError {
    /// Missing or invalid backend configuration. Raised at startup only.
    #[error("Storage configuration error: {0}")]
    Config(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Failed to download image: {0}")]
    Download(String),
}

impl StorageError {
    pub(crate) fn missing(variable: &str, provider: &str) -> Self {
        StorageError::Config(format!(
            "{} is required when STORAGE_PROVIDER={}",
            variable, provider
        ))
    }
}

impl From<StorageError> for Problem {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::Config(msg) => problemdetails::new(StatusCode::INTERNAL_SERVER_ERROR)
                .with_title("Storage Misconfigured")
                .with_detail(msg),

            StorageError::UploadFailed(msg) => problemdetails::new(StatusCode::BAD_GATEWAY)
                .with_title("Upload Failed")
                .with_detail(msg),

            StorageError::Download(msg) => problemdetails::new(StatusCode::BAD_GATEWAY)
                .with_title("Image Download Failed")
                .with_detail(msg),
        }
    }
}
