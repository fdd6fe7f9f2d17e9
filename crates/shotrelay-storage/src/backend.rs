//! Upload contract shared by every storage backend

use bytes::Bytes;
use serde::Serialize;
use tracing::debug;

use crate::cloudinary::CloudinaryBackend;
use crate::error::{StorageError, StorageResult};
use crate::naming::sniff_content_type;
use crate::s3::S3CdnBackend;

/// Where the image to upload comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Raw image bytes already in memory
    Bytes { data: Bytes, content_type: String },
    /// Publicly fetchable image URL
    Remote(String),
}

/// One upload request. Callers never need to know which backend is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub source: ImageSource,
    /// Destination folder; `None` falls back to the configured base folder
    pub folder: Option<String>,
    /// Preferred object name, sanitized by the backend
    pub name_hint: Option<String>,
}

impl UploadTarget {
    pub fn remote(url: impl Into<String>) -> Self {
        Self {
            source: ImageSource::Remote(url.into()),
            folder: None,
            name_hint: None,
        }
    }

    /// Upload raw bytes; the content type is sniffed from the data
    pub fn bytes(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let content_type = sniff_content_type(&data).to_string();
        Self {
            source: ImageSource::Bytes { data, content_type },
            folder: None,
            name_hint: None,
        }
    }

    pub fn with_folder(mut self, folder: Option<String>) -> Self {
        self.folder = folder;
        self
    }

    pub fn with_name_hint(mut self, name_hint: Option<String>) -> Self {
        self.name_hint = name_hint;
        self
    }
}

/// Where an image ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadResult {
    /// Publicly resolvable URL of the stored image
    pub url: String,
    /// Folder the image was stored under, `None` for the root
    pub folder: Option<String>,
}

/// Closed set of storage backends, selected once per process
#[derive(Debug)]
pub enum StorageBackend {
    Cloudinary(CloudinaryBackend),
    S3Cdn(S3CdnBackend),
}

impl StorageBackend {
    /// Upload `target` and return its public URL. Failures are not retried.
    pub async fn upload(&self, target: UploadTarget) -> StorageResult<UploadResult> {
        match self {
            StorageBackend::Cloudinary(backend) => backend.upload(target).await,
            StorageBackend::S3Cdn(backend) => backend.upload(target).await,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        match self {
            StorageBackend::Cloudinary(_) => "cloudinary",
            StorageBackend::S3Cdn(_) => "aws",
        }
    }
}

/// Download a remote image, returning its bytes and content type
pub(crate) async fn fetch_remote(
    http: &reqwest::Client,
    image_url: &str,
) -> StorageResult<(Bytes, String)> {
    debug!("Downloading image from {}", image_url);

    let response = http
        .get(image_url)
        .send()
        .await
        .map_err(|e| StorageError::Download(e.without_url().to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(StorageError::Download(format!(
            "Image URL returned HTTP {}",
            status
        )));
    }

    let header_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
        .filter(|v| v.starts_with("image/"));

    let data = response
        .bytes()
        .await
        .map_err(|e| StorageError::Download(e.without_url().to_string()))?;

    if data.is_empty() {
        return Err(StorageError::Download("Image URL returned no data".to_string()));
    }

    let content_type = header_type.unwrap_or_else(|| sniff_content_type(&data).to_string());
    debug!("Downloaded {} bytes ({})", data.len(), content_type);

    Ok((data, content_type))
}
