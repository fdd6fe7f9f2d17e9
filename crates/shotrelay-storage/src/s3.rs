//! S3 + CDN backend
//!
//! Objects are written to an S3 bucket and served through a CDN domain that
//! already has the bucket as its origin.

use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::backend::{fetch_remote, ImageSource, UploadResult, UploadTarget};
use crate::error::{StorageError, StorageResult};
use crate::naming::{extension_for, normalize_folder, sanitize_key};

/// S3 and CDN settings as read from the environment.
///
/// Credentials are not part of this; they come from the default AWS
/// provider chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct S3Config {
    pub region: Option<String>,
    pub bucket: Option<String>,
    pub cloudfront_domain: Option<String>,
    pub prefix: Option<String>,
}

/// Validated S3 settings with the CDN base normalised to include a scheme
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Settings {
    pub region: String,
    pub bucket: String,
    pub cdn_base: String,
    pub prefix: Option<String>,
}

impl S3Settings {
    pub fn from_config(config: &S3Config) -> StorageResult<Self> {
        let required = |value: &Option<String>, variable: &str| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| StorageError::missing(variable, "aws"))
        };

        let region = required(&config.region, "AWS_REGION")?;
        let bucket = required(&config.bucket, "AWS_S3_BUCKET")?;
        let domain = required(&config.cloudfront_domain, "AWS_CLOUDFRONT_DOMAIN")?;

        let (scheme, host) = match domain.split_once("://") {
            Some((scheme, host)) if scheme == "http" || scheme == "https" => (scheme, host),
            _ => ("https", domain.as_str()),
        };
        let host = host.trim_matches('/');
        if host.is_empty() {
            return Err(StorageError::missing("AWS_CLOUDFRONT_DOMAIN", "aws"));
        }
        let cdn_base = format!("{}://{}", scheme, host);

        Ok(Self {
            region,
            bucket,
            cdn_base,
            prefix: normalize_folder(config.prefix.as_deref()),
        })
    }
}

#[derive(Debug)]
pub struct S3CdnBackend {
    client: Client,
    http: reqwest::Client,
    settings: S3Settings,
    default_folder: Option<String>,
    upload_timeout: Duration,
}

impl S3CdnBackend {
    /// Load AWS configuration for the settings' region and build the backend
    pub async fn connect(
        settings: S3Settings,
        default_folder: Option<&str>,
        upload_timeout: Duration,
    ) -> StorageResult<Self> {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .load()
            .await;

        let http = download_client(upload_timeout)?;
        Ok(Self::with_client(
            Client::new(&config),
            http,
            settings,
            default_folder,
            upload_timeout,
        ))
    }

    /// Build the backend around an already configured S3 client.
    ///
    /// `upload_timeout` bounds each `PutObject` call.
    pub fn with_client(
        client: Client,
        http: reqwest::Client,
        settings: S3Settings,
        default_folder: Option<&str>,
        upload_timeout: Duration,
    ) -> Self {
        Self {
            client,
            http,
            settings,
            default_folder: normalize_folder(default_folder),
            upload_timeout,
        }
    }

    pub fn default_folder(&self) -> Option<&str> {
        self.default_folder.as_deref()
    }

    pub fn settings(&self) -> &S3Settings {
        &self.settings
    }

    /// `[prefix]/[folder]/name` with empty segments dropped
    pub fn object_key(&self, folder: Option<&str>, name: &str) -> String {
        [self.settings.prefix.as_deref(), folder, Some(name)]
            .into_iter()
            .flatten()
            .map(|segment| segment.trim_matches('/'))
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn public_url(&self, object_key: &str) -> String {
        format!("{}/{}", self.settings.cdn_base, object_key)
    }

    pub async fn upload(&self, target: UploadTarget) -> StorageResult<UploadResult> {
        let folder =
            normalize_folder(target.folder.as_deref()).or_else(|| self.default_folder.clone());

        let (data, content_type) = match target.source {
            ImageSource::Bytes { data, content_type } => (data, content_type),
            ImageSource::Remote(url) => fetch_remote(&self.http, &url).await?,
        };

        let name = object_name(target.name_hint.as_deref(), &content_type);
        let key = self.object_key(folder.as_deref(), &name);

        debug!(
            "PUT s3://{}/{} ({} bytes, {})",
            self.settings.bucket,
            key,
            data.len(),
            content_type
        );

        let put = self
            .client
            .put_object()
            .bucket(&self.settings.bucket)
            .key(&key)
            .body(ByteStream::from(data))
            .content_type(&content_type)
            .send();

        match tokio::time::timeout(self.upload_timeout, put).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                error!("Failed to upload image to S3: {}", e);
                return Err(StorageError::UploadFailed(format!(
                    "S3 upload failed: {}",
                    e
                )));
            }
            Err(_) => {
                error!(
                    "S3 upload of {} timed out after {:?}",
                    key, self.upload_timeout
                );
                return Err(StorageError::UploadFailed(format!(
                    "S3 upload timed out after {}s",
                    self.upload_timeout.as_secs_f64()
                )));
            }
        }

        let url = self.public_url(&key);
        info!("Image uploaded to S3, URL: {}", url);

        Ok(UploadResult { url, folder })
    }
}

/// Sanitized hint with the content-type extension, or a random name
fn object_name(name_hint: Option<&str>, content_type: &str) -> String {
    let extension = extension_for(content_type);
    match name_hint.map(str::trim).filter(|h| !h.is_empty()) {
        Some(hint) => {
            let name = sanitize_key(hint);
            let has_extension = name
                .rsplit_once('.')
                .map(|(_, ext)| matches!(ext, "jpg" | "jpeg" | "png" | "webp"))
                .unwrap_or(false);
            if has_extension {
                name
            } else {
                format!("{}.{}", name, extension)
            }
        }
        None => format!("{}.{}", Uuid::new_v4().simple(), extension),
    }
}

fn download_client(timeout: Duration) -> StorageResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| StorageError::Config(format!("Failed to build HTTP client: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::config::Credentials;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config() -> S3Config {
        S3Config {
            region: Some("us-east-1".to_string()),
            bucket: Some("b".to_string()),
            cloudfront_domain: Some("d.cloudfront.net".to_string()),
            prefix: None,
        }
    }

    fn test_client(endpoint: Option<&str>) -> Client {
        let mut builder = aws_sdk_s3::Config::builder()
            .region(Region::new("us-east-1"))
            .behavior_version_latest()
            .credentials_provider(Credentials::new("test", "test", None, None, "shotrelay"))
            .force_path_style(true);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        Client::from_conf(builder.build())
    }

    fn backend(config: &S3Config, endpoint: Option<&str>) -> S3CdnBackend {
        backend_with_timeout(config, endpoint, Duration::from_secs(30))
    }

    fn backend_with_timeout(
        config: &S3Config,
        endpoint: Option<&str>,
        upload_timeout: Duration,
    ) -> S3CdnBackend {
        S3CdnBackend::with_client(
            test_client(endpoint),
            reqwest::Client::new(),
            S3Settings::from_config(config).unwrap(),
            None,
            upload_timeout,
        )
    }

    #[test]
    fn test_settings_add_https_to_bare_domain() {
        let settings = S3Settings::from_config(&config()).unwrap();
        assert_eq!(settings.cdn_base, "https://d.cloudfront.net");

        let mut cfg = config();
        cfg.cloudfront_domain = Some("http://cdn.local/".to_string());
        let settings = S3Settings::from_config(&cfg).unwrap();
        assert_eq!(settings.cdn_base, "http://cdn.local");
    }

    #[test]
    fn test_settings_require_each_variable() {
        let mut no_region = config();
        no_region.region = None;
        let mut blank_bucket = config();
        blank_bucket.bucket = Some(String::new());
        let mut scheme_only = config();
        scheme_only.cloudfront_domain = Some("https://".to_string());

        for (variable, cfg) in [
            ("AWS_REGION", no_region),
            ("AWS_S3_BUCKET", blank_bucket),
            ("AWS_CLOUDFRONT_DOMAIN", scheme_only),
        ] {
            let err = S3Settings::from_config(&cfg).unwrap_err();
            assert!(err.to_string().contains(variable), "{}", err);
        }
    }

    #[test]
    fn test_object_key_drops_empty_segments() {
        let mut cfg = config();
        cfg.prefix = Some("/media/".to_string());
        let backend = backend(&cfg, None);

        assert_eq!(
            backend.object_key(Some("shots"), "a.jpg"),
            "media/shots/a.jpg"
        );
        assert_eq!(backend.object_key(None, "a.jpg"), "media/a.jpg");

        let backend = self::backend(&config(), None);
        assert_eq!(backend.object_key(Some("/shots/"), "a.jpg"), "shots/a.jpg");
        assert_eq!(backend.object_key(None, "a.jpg"), "a.jpg");
    }

    #[test]
    fn test_public_url_uses_cdn_domain() {
        let backend = backend(&config(), None);
        let key = backend.object_key(Some("shots"), "a.jpg");
        assert_eq!(
            backend.public_url(&key),
            "https://d.cloudfront.net/shots/a.jpg"
        );
    }

    #[test]
    fn test_object_name() {
        assert_eq!(object_name(Some("my shot"), "image/png"), "my_shot.png");
        assert_eq!(object_name(Some("already.jpeg"), "image/jpeg"), "already.jpeg");
        assert_eq!(
            object_name(Some("example.com_page"), "image/jpeg"),
            "example.com_page.jpg"
        );

        let generated = object_name(None, "image/webp");
        assert!(generated.ends_with(".webp"));
        assert_eq!(generated.len(), 32 + ".webp".len());
    }

    #[tokio::test]
    async fn test_upload_bytes_puts_object_and_returns_cdn_url() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/b/shots/example.com_home.jpg"))
            .and(header("content-type", "image/jpeg"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend(&config(), Some(&server.uri()));
        let result = backend
            .upload(
                UploadTarget::bytes(vec![0xFF, 0xD8, 0xFF, 0xE0])
                    .with_folder(Some("shots".to_string()))
                    .with_name_hint(Some("example.com_home".to_string())),
            )
            .await
            .unwrap();

        assert_eq!(
            result.url,
            "https://d.cloudfront.net/shots/example.com_home.jpg"
        );
        assert_eq!(result.folder.as_deref(), Some("shots"));
    }

    #[tokio::test]
    async fn test_upload_surfaces_s3_errors() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(403).set_body_string(
                "<Error><Code>AccessDenied</Code><Message>Access Denied</Message></Error>",
            ))
            .mount(&server)
            .await;

        let backend = backend(&config(), Some(&server.uri()));
        let err = backend
            .upload(UploadTarget::bytes(vec![0xFF, 0xD8, 0xFF]))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UploadFailed(_)));
    }

    #[tokio::test]
    async fn test_stalled_put_fails_after_upload_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let backend =
            backend_with_timeout(&config(), Some(&server.uri()), Duration::from_millis(300));
        let started = std::time::Instant::now();
        let err = backend
            .upload(UploadTarget::bytes(vec![0xFF, 0xD8, 0xFF]))
            .await
            .unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(3));
        match err {
            StorageError::UploadFailed(message) => assert!(message.contains("timed out")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
