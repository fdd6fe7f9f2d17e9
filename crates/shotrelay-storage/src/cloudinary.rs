//! Cloudinary backend
//!
//! Signed uploads to the Cloudinary upload API. Remote sources are handed to
//! Cloudinary as a URL and fetched on their side.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::backend::{ImageSource, UploadResult, UploadTarget};
use crate::error::{StorageError, StorageResult};
use crate::naming::{extension_for, normalize_folder, sanitize_key};

pub const DEFAULT_CLOUDINARY_API_BASE: &str = "https://api.cloudinary.com";

/// Cloudinary credentials as read from the environment
#[derive(Clone, PartialEq, Eq)]
pub struct CloudinaryConfig {
    pub cloud_name: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub api_base: String,
}

impl Default for CloudinaryConfig {
    fn default() -> Self {
        Self {
            cloud_name: None,
            api_key: None,
            api_secret: None,
            api_base: DEFAULT_CLOUDINARY_API_BASE.to_string(),
        }
    }
}

impl fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &self.api_secret.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .finish()
    }
}

pub struct CloudinaryBackend {
    cloud_name: String,
    api_key: String,
    api_secret: String,
    api_base: String,
    default_folder: Option<String>,
    http: reqwest::Client,
}

impl fmt::Debug for CloudinaryBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudinaryBackend")
            .field("cloud_name", &self.cloud_name)
            .field("api_base", &self.api_base)
            .field("default_folder", &self.default_folder)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl CloudinaryBackend {
    /// Validate `config` and build the backend
    pub fn from_config(
        config: &CloudinaryConfig,
        default_folder: Option<&str>,
        upload_timeout: Duration,
    ) -> StorageResult<Self> {
        let required = |value: &Option<String>, variable: &str| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| StorageError::missing(variable, "cloudinary"))
        };

        let cloud_name = required(&config.cloud_name, "CLOUDINARY_CLOUD_NAME")?;
        let api_key = required(&config.api_key, "CLOUDINARY_API_KEY")?;
        let api_secret = required(&config.api_secret, "CLOUDINARY_API_SECRET")?;

        let http = reqwest::Client::builder()
            .timeout(upload_timeout)
            .build()
            .map_err(|e| StorageError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            cloud_name,
            api_key,
            api_secret,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            default_folder: normalize_folder(default_folder),
            http,
        })
    }

    pub fn default_folder(&self) -> Option<&str> {
        self.default_folder.as_deref()
    }

    fn upload_url(&self) -> String {
        format!("{}/v1_1/{}/image/upload", self.api_base, self.cloud_name)
    }

    pub async fn upload(&self, target: UploadTarget) -> StorageResult<UploadResult> {
        let folder =
            normalize_folder(target.folder.as_deref()).or_else(|| self.default_folder.clone());
        let public_id = target.name_hint.as_deref().map(sanitize_key);

        let mut params: BTreeMap<&'static str, String> = BTreeMap::new();
        if let Some(folder) = &folder {
            params.insert("folder", folder.clone());
        }
        if let Some(public_id) = public_id {
            params.insert("public_id", public_id);
        }
        params.insert("timestamp", Utc::now().timestamp().to_string());

        let signature = sign_params(&params, &self.api_secret);

        let file = match target.source {
            ImageSource::Bytes { data, content_type } => {
                Part::bytes(data.to_vec())
                    .file_name(format!("screenshot.{}", extension_for(&content_type)))
                    .mime_str(&content_type)
                    .map_err(|e| {
                        StorageError::UploadFailed(format!("Invalid content type: {}", e))
                    })?
            }
            ImageSource::Remote(url) => Part::text(url),
        };

        let mut form = Form::new()
            .part("file", file)
            .text("api_key", self.api_key.clone())
            .text("signature_algorithm", "sha256")
            .text("signature", signature);
        for (name, value) in params {
            form = form.text(name, value);
        }

        debug!(
            "Uploading to Cloudinary cloud '{}' (folder: {})",
            self.cloud_name,
            folder.as_deref().unwrap_or("root")
        );

        let response = self
            .http
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                StorageError::UploadFailed(format!(
                    "Cloudinary request failed: {}",
                    e.without_url()
                ))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to read Cloudinary response: {}", e))
        })?;
        let parsed: Option<UploadResponse> = serde_json::from_str(&body).ok();

        if !status.is_success() {
            let message = parsed
                .and_then(|r| r.error)
                .map(|e| e.message)
                .unwrap_or(body);
            warn!("Cloudinary upload failed with {}: {}", status, message);
            return Err(StorageError::UploadFailed(format!(
                "Cloudinary returned {}: {}",
                status, message
            )));
        }

        let url = parsed
            .and_then(|r| r.secure_url.or(r.url))
            .ok_or_else(|| {
                StorageError::UploadFailed(
                    "Cloudinary upload succeeded but no URL returned".to_string(),
                )
            })?;

        info!("Image uploaded to Cloudinary: {}", url);
        Ok(UploadResult { url, folder })
    }
}

/// Hex SHA-256 over the sorted `key=value` pairs joined by `&`, followed by
/// the API secret
fn sign_params(params: &BTreeMap<&'static str, String>, api_secret: &str) -> String {
    let to_sign = params
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}
