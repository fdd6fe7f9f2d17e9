//! Bearer token authentication for the capture endpoints

use std::fmt;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use sha2::{Digest, Sha256};
use shotrelay_core::problemdetails::{self, Problem};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::state::AppState;

/// Static API token settings, read once at startup
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthSettings {
    /// When false every request is let through
    pub required: bool,
    pub token: Option<String>,
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("required", &self.required)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authentication is misconfigured")]
    Misconfigured,

    #[error("Missing Authorization header")]
    MissingHeader,

    #[error("Invalid Authorization header format. Expected: Bearer <token>")]
    InvalidFormat,

    #[error("Invalid authentication token")]
    InvalidToken,
}

impl From<AuthError> for Problem {
    fn from(error: AuthError) -> Self {
        let (status, title) = match error {
            AuthError::Misconfigured => (StatusCode::INTERNAL_SERVER_ERROR, "Server Misconfigured"),
            _ => (StatusCode::UNAUTHORIZED, "Unauthorized"),
        };

        problemdetails::new(status)
            .with_title(title)
            .with_detail(error.to_string())
            .with_header(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"))
    }
}

impl AuthSettings {
    pub fn new(required: bool, token: Option<String>) -> Self {
        let token = token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Self { required, token }
    }

    /// Check an `Authorization` header value against the configured token
    pub fn verify(&self, authorization: Option<&HeaderValue>) -> Result<(), AuthError> {
        if !self.required {
            return Ok(());
        }

        let expected = self.token.as_deref().ok_or_else(|| {
            error!("API_TOKEN not configured but API_TOKEN_REQUIRED is true");
            AuthError::Misconfigured
        })?;

        let header = match authorization {
            None => None,
            Some(value) => Some(value.to_str().map_err(|_| {
                warn!("Authorization header is not valid ASCII");
                AuthError::InvalidFormat
            })?),
        }
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| {
            warn!("Missing Authorization header");
            AuthError::MissingHeader
        })?;

        let token = match header.split_once(' ') {
            Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
            _ => {
                warn!("Invalid Authorization header format");
                return Err(AuthError::InvalidFormat);
            }
        };

        if !tokens_match(token, expected) {
            warn!("Invalid token provided");
            return Err(AuthError::InvalidToken);
        }

        debug!("Token verified successfully");
        Ok(())
    }
}

/// Compare SHA-256 digests of both tokens in constant time
fn tokens_match(provided: &str, expected: &str) -> bool {
    let provided = hex::encode(Sha256::digest(provided.as_bytes()));
    let expected = hex::encode(Sha256::digest(expected.as_bytes()));
    constant_time_eq(&provided, &expected)
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

/// Middleware guarding the capture routes
pub async fn require_bearer(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, Problem> {
    state.auth.verify(request.headers().get(AUTHORIZATION))?;
    Ok(next.run(request).await)
}
