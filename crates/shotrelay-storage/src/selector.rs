//! Storage selector
//!
//! Resolves the active backend once from [`StorageConfig`] at startup.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::backend::StorageBackend;
use crate::cloudinary::{CloudinaryBackend, CloudinaryConfig};
use crate::error::{StorageError, StorageResult};
use crate::naming::normalize_folder;
use crate::s3::{S3CdnBackend, S3Config, S3Settings};

pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageProvider {
    #[default]
    Cloudinary,
    Aws,
}

impl StorageProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageProvider::Cloudinary => "cloudinary",
            StorageProvider::Aws => "aws",
        }
    }
}

impl fmt::Display for StorageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageProvider {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "cloudinary" => Ok(StorageProvider::Cloudinary),
            "aws" => Ok(StorageProvider::Aws),
            other => Err(StorageError::Config(format!(
                "Unknown STORAGE_PROVIDER: {}. Use 'cloudinary' or 'aws'.",
                other
            ))),
        }
    }
}

/// Process-wide storage configuration, read once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub provider: StorageProvider,
    pub cloudinary: CloudinaryConfig,
    pub s3: S3Config,
    /// Base folder used when a request does not name one
    pub default_folder: Option<String>,
    pub upload_timeout: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: StorageProvider::default(),
            cloudinary: CloudinaryConfig::default(),
            s3: S3Config::default(),
            default_folder: None,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
        }
    }
}

/// Holds the single active backend for the process lifetime
#[derive(Debug, Clone)]
pub struct StorageSelector {
    backend: Arc<StorageBackend>,
    default_folder: Option<String>,
}

impl StorageSelector {
    /// Validate `config` and build the active backend.
    ///
    /// Fails with [`StorageError::Config`] naming the missing variable when
    /// the selected provider's credentials are incomplete.
    pub async fn from_config(config: StorageConfig) -> StorageResult<Self> {
        let default_folder = normalize_folder(config.default_folder.as_deref());

        let backend = match config.provider {
            StorageProvider::Cloudinary => StorageBackend::Cloudinary(
                CloudinaryBackend::from_config(
                    &config.cloudinary,
                    default_folder.as_deref(),
                    config.upload_timeout,
                )?,
            ),
            StorageProvider::Aws => {
                let settings = S3Settings::from_config(&config.s3)?;
                StorageBackend::S3Cdn(
                    S3CdnBackend::connect(
                        settings,
                        default_folder.as_deref(),
                        config.upload_timeout,
                    )
                    .await?,
                )
            }
        };

        info!(
            "Storage backend: {} (default folder: {})",
            backend.provider_name(),
            default_folder.as_deref().unwrap_or("root")
        );

        Ok(Self::with_backend(backend, default_folder))
    }

    /// Wrap an already built backend
    pub fn with_backend(backend: StorageBackend, default_folder: Option<String>) -> Self {
        Self {
            backend: Arc::new(backend),
            default_folder: normalize_folder(default_folder.as_deref()),
        }
    }

    pub fn active_backend(&self) -> Arc<StorageBackend> {
        self.backend.clone()
    }

    pub fn default_folder(&self) -> Option<&str> {
        self.default_folder.as_deref()
    }

    pub fn provider_name(&self) -> &'static str {
        self.backend.provider_name()
    }
}
