mod shutdown;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args};
use shotrelay_api::{build_router, AppState, AuthSettings, ScreenshotPipeline};
use shotrelay_capture::{
    CaptureOrchestrator, ProxyTier, ProxyTiers, ScreenshotOneClient, ScreenshotOneSettings,
    DEFAULT_SCREENSHOTONE_API_URL,
};
use shotrelay_core::{SERVICE_NAME, SERVICE_VERSION};
use shotrelay_storage::{
    CloudinaryConfig, S3Config, StorageConfig, StorageProvider, StorageSelector,
};
use tokio::net::TcpListener;
use tracing::{info, warn};

use self::shutdown::shutdown_signal;

/// Upper bound accepted for any timeout setting
const MAX_TIMEOUT_SECS: u64 = 3600;

#[derive(Args)]
pub struct ServeCommand {
    /// Interface to bind the HTTP server to
    #[arg(long, default_value = "0.0.0.0", env = "HOST")]
    pub host: String,

    /// Port to bind the HTTP server to
    #[arg(long, default_value_t = 8000, env = "PORT")]
    pub port: u16,

    /// Bearer token required on the capture endpoints
    #[arg(long, env = "API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Whether the capture endpoints require a bearer token
    #[arg(
        long,
        default_value = "true",
        env = "API_TOKEN_REQUIRED",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub api_token_required: bool,

    /// ScreenshotOne access key
    #[arg(long, env = "SCREENSHOTONE_ACCESS_KEY", hide_env_values = true)]
    pub screenshotone_access_key: String,

    /// ScreenshotOne take endpoint
    #[arg(long, default_value = DEFAULT_SCREENSHOTONE_API_URL, env = "SCREENSHOTONE_API_URL")]
    pub screenshotone_api_url: String,

    /// Try a direct capture (no proxy) before the proxy tiers
    #[arg(
        long,
        default_value = "true",
        env = "CAPTURE_DIRECT_ENABLED",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub capture_direct_enabled: bool,

    /// Basic proxy tier endpoint
    #[arg(long, env = "SCREENSHOTONE_PROXY", hide_env_values = true)]
    pub screenshotone_proxy: Option<String>,

    /// Append a random `:1..=N` port to the basic proxy on each attempt.
    /// The basic endpoint must then have no port or path of its own.
    #[arg(long, env = "SCREENSHOTONE_PROXY_PORT_POOL")]
    pub screenshotone_proxy_port_pool: Option<u16>,

    /// Advanced (web unlocker) proxy tier endpoint
    #[arg(long, env = "WEB_UNLOCKER_PROXY", hide_env_values = true)]
    pub web_unlocker_proxy: Option<String>,

    /// Timeout for a single capture attempt, in seconds
    #[arg(
        long,
        default_value_t = 60,
        env = "CAPTURE_ATTEMPT_TIMEOUT_SECS",
        value_parser = clap::value_parser!(u64).range(1..=MAX_TIMEOUT_SECS)
    )]
    pub capture_attempt_timeout_secs: u64,

    /// Cap on a whole capture run across all tiers, in seconds.
    /// Defaults to the attempt timeout times the number of tiers.
    #[arg(
        long,
        env = "CAPTURE_OVERALL_TIMEOUT_SECS",
        value_parser = clap::value_parser!(u64).range(1..=MAX_TIMEOUT_SECS)
    )]
    pub capture_overall_timeout_secs: Option<u64>,

    /// Storage backend: cloudinary or aws
    #[arg(long, default_value = "cloudinary", env = "STORAGE_PROVIDER")]
    pub storage_provider: String,

    #[arg(long, env = "CLOUDINARY_CLOUD_NAME")]
    pub cloudinary_cloud_name: Option<String>,

    #[arg(long, env = "CLOUDINARY_API_KEY", hide_env_values = true)]
    pub cloudinary_api_key: Option<String>,

    #[arg(long, env = "CLOUDINARY_API_SECRET", hide_env_values = true)]
    pub cloudinary_api_secret: Option<String>,

    /// Base folder used when a request does not name one
    #[arg(long, env = "CLOUDINARY_FOLDER")]
    pub cloudinary_folder: Option<String>,

    #[arg(long, env = "AWS_REGION")]
    pub aws_region: Option<String>,

    #[arg(long, env = "AWS_S3_BUCKET")]
    pub aws_s3_bucket: Option<String>,

    /// CDN domain serving the bucket, e.g. d123abc.cloudfront.net
    #[arg(long, env = "AWS_CLOUDFRONT_DOMAIN")]
    pub aws_cloudfront_domain: Option<String>,

    /// Key prefix for uploaded objects
    #[arg(long, env = "AWS_S3_PREFIX")]
    pub aws_s3_prefix: Option<String>,

    /// Timeout for uploads and image downloads, in seconds
    #[arg(
        long,
        default_value_t = 30,
        env = "UPLOAD_TIMEOUT_SECS",
        value_parser = clap::value_parser!(u64).range(1..=MAX_TIMEOUT_SECS)
    )]
    pub upload_timeout_secs: u64,
}

impl ServeCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.run())
    }

    async fn run(self) -> anyhow::Result<()> {
        let tiers = self.proxy_tiers();
        tiers
            .validate()
            .context("Invalid proxy tier configuration")?;
        let tiers = Arc::new(tiers);
        let configured: Vec<&str> = tiers.configured().iter().map(ProxyTier::as_str).collect();
        if configured.is_empty() {
            warn!("No capture tier is configured; captures without an explicit proxy will fail");
        } else {
            info!("Capture tiers: {}", configured.join(" -> "));
        }

        let client = ScreenshotOneClient::new(self.screenshotone_settings())
            .context("Failed to configure the ScreenshotOne client")?;
        let orchestrator = CaptureOrchestrator::new(
            Arc::new(client),
            tiers,
            Duration::from_secs(self.capture_attempt_timeout_secs),
        )
        .with_overall_timeout(self.capture_overall_timeout_secs.map(Duration::from_secs));

        let storage = StorageSelector::from_config(self.storage_config()?)
            .await
            .context("Failed to configure storage")?;

        let auth = self.auth_settings();
        if !auth.required {
            warn!("API_TOKEN_REQUIRED is false; capture endpoints are unauthenticated");
        } else if auth.token.is_none() {
            warn!("API_TOKEN is not set; capture endpoints will answer 500 until it is");
        }

        let pipeline = Arc::new(ScreenshotPipeline::new(Arc::new(orchestrator), storage));
        let app = build_router(Arc::new(AppState::new(pipeline, auth)));

        let listener = TcpListener::bind((self.host.as_str(), self.port))
            .await
            .with_context(|| format!("Failed to bind {}:{}", self.host, self.port))?;
        info!(
            "Starting {} v{} on {}",
            SERVICE_NAME,
            SERVICE_VERSION,
            listener.local_addr()?
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("Server exited");
        Ok(())
    }

    fn proxy_tiers(&self) -> ProxyTiers {
        ProxyTiers::new(
            self.capture_direct_enabled,
            self.screenshotone_proxy.clone(),
            self.web_unlocker_proxy.clone(),
        )
        .with_basic_port_pool(self.screenshotone_proxy_port_pool)
    }

    fn screenshotone_settings(&self) -> ScreenshotOneSettings {
        ScreenshotOneSettings::new(self.screenshotone_access_key.clone())
            .with_api_url(self.screenshotone_api_url.clone())
            .with_timeout(Duration::from_secs(self.capture_attempt_timeout_secs))
    }

    fn storage_config(&self) -> anyhow::Result<StorageConfig> {
        let provider: StorageProvider = self.storage_provider.parse()?;
        Ok(StorageConfig {
            provider,
            cloudinary: CloudinaryConfig {
                cloud_name: self.cloudinary_cloud_name.clone(),
                api_key: self.cloudinary_api_key.clone(),
                api_secret: self.cloudinary_api_secret.clone(),
                ..CloudinaryConfig::default()
            },
            s3: S3Config {
                region: self.aws_region.clone(),
                bucket: self.aws_s3_bucket.clone(),
                cloudfront_domain: self.aws_cloudfront_domain.clone(),
                prefix: self.aws_s3_prefix.clone(),
            },
            default_folder: self.cloudinary_folder.clone(),
            upload_timeout: Duration::from_secs(self.upload_timeout_secs),
        })
    }

    fn auth_settings(&self) -> AuthSettings {
        AuthSettings::new(self.api_token_required, self.api_token.clone())
    }
}
