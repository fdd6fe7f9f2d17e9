//! Both backends honour the same upload contract

use std::time::Duration;

use aws_sdk_s3::config::{Credentials, Region};
use shotrelay_storage::{
    CloudinaryBackend, CloudinaryConfig, S3CdnBackend, S3Config, S3Settings, StorageBackend,
    StorageSelector, UploadResult, UploadTarget,
};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JPEG: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xE0];

async fn cloudinary_backend(server: &MockServer) -> StorageBackend {
    Mock::given(method("POST"))
        .and(path("/v1_1/demo/image/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "secure_url": "https://res.cloudinary.com/demo/image/upload/v1/shots/page.jpg"
        })))
        .mount(server)
        .await;

    let config = CloudinaryConfig {
        cloud_name: Some("demo".to_string()),
        api_key: Some("key".to_string()),
        api_secret: Some("secret".to_string()),
        api_base: server.uri(),
    };
    StorageBackend::Cloudinary(
        CloudinaryBackend::from_config(&config, None, Duration::from_secs(5)).unwrap(),
    )
}

async fn s3_backend(server: &MockServer) -> StorageBackend {
    Mock::given(method("PUT"))
        .and(path_regex(r"^/b/.+"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;

    let client = aws_sdk_s3::Client::from_conf(
        aws_sdk_s3::Config::builder()
            .region(Region::new("us-east-1"))
            .behavior_version_latest()
            .credentials_provider(Credentials::new("test", "test", None, None, "tests"))
            .endpoint_url(server.uri())
            .force_path_style(true)
            .build(),
    );
    let settings = S3Settings::from_config(&S3Config {
        region: Some("us-east-1".to_string()),
        bucket: Some("b".to_string()),
        cloudfront_domain: Some("d.cloudfront.net".to_string()),
        prefix: None,
    })
    .unwrap();

    StorageBackend::S3Cdn(S3CdnBackend::with_client(
        client,
        reqwest::Client::new(),
        settings,
        None,
        Duration::from_secs(30),
    ))
}

fn target() -> UploadTarget {
    UploadTarget::bytes(JPEG.to_vec())
        .with_folder(Some("shots".to_string()))
        .with_name_hint(Some("example.com_page".to_string()))
}

fn assert_contract(result: &UploadResult) {
    assert!(!result.url.is_empty());
    let parsed = reqwest::Url::parse(&result.url).unwrap();
    assert_eq!(parsed.scheme(), "https");
    assert!(parsed.host_str().is_some());
    assert_eq!(result.folder.as_deref(), Some("shots"));
}

#[tokio::test]
async fn test_same_target_same_contract() {
    let cloudinary_server = MockServer::start().await;
    let s3_server = MockServer::start().await;

    let backends = [
        cloudinary_backend(&cloudinary_server).await,
        s3_backend(&s3_server).await,
    ];

    for backend in &backends {
        let result = backend.upload(target()).await.unwrap();
        assert_contract(&result);
    }
}

#[tokio::test]
async fn test_aws_upload_lands_under_cdn_folder() {
    let server = MockServer::start().await;
    let selector = StorageSelector::with_backend(s3_backend(&server).await, None);

    let result = selector
        .active_backend()
        .upload(target())
        .await
        .unwrap();

    assert_eq!(selector.provider_name(), "aws");
    assert!(
        result.url.starts_with("https://d.cloudfront.net/shots/"),
        "{}",
        result.url
    );
}
