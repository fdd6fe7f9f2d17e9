//! Validation of capture target URLs
//!
//! A target must be an absolute `http`/`https` URL with a host. Anything else is
//! rejected before the rendering provider is contacted.

use thiserror::Error;
use url::Url;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UrlValidationError {
    #[error("URL is empty")]
    Empty,

    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("URL scheme must be HTTP or HTTPS, got '{0}'")]
    InvalidScheme(String),

    #[error("URL has no host")]
    MissingHost,
}

/// Parse and validate a capture target URL.
///
/// ```
/// use shotrelay_core::validate_target_url;
///
/// assert!(validate_target_url("https://example.com/pricing").is_ok());
/// assert!(validate_target_url("not-a-url").is_err());
/// assert!(validate_target_url("ftp://example.com").is_err());
/// ```
pub fn validate_target_url(raw: &str) -> Result<Url, UrlValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UrlValidationError::Empty);
    }

    let parsed =
        Url::parse(trimmed).map_err(|e| UrlValidationError::InvalidFormat(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(UrlValidationError::InvalidScheme(other.to_string())),
    }

    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(parsed),
        _ => Err(UrlValidationError::MissingHost),
    }
}
