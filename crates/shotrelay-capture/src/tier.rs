//! Proxy tiers and the routes a capture attempt can take

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{CaptureError, CaptureResult};

/// Proxy tier, ordered by escalation priority (`None < Basic < Advanced`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ProxyTier {
    /// Direct capture, no proxy
    None,
    /// Cheap rotating proxy
    Basic,
    /// Web-unlocker style proxy, expensive
    Advanced,
}

impl ProxyTier {
    /// All tiers in ascending escalation order
    pub const ALL: [ProxyTier; 3] = [ProxyTier::None, ProxyTier::Basic, ProxyTier::Advanced];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyTier::None => "none",
            ProxyTier::Basic => "basic",
            ProxyTier::Advanced => "advanced",
        }
    }
}

impl fmt::Display for ProxyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a single attempt was routed through.
///
/// An explicit per-request proxy bypasses tier ordering entirely, so it is
/// tracked separately from the configured tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyRoute {
    Tier(ProxyTier),
    Override,
}

impl ProxyRoute {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyRoute::Tier(tier) => tier.as_str(),
            ProxyRoute::Override => "override",
        }
    }

    pub fn tier(&self) -> Option<ProxyTier> {
        match self {
            ProxyRoute::Tier(tier) => Some(*tier),
            ProxyRoute::Override => None,
        }
    }
}

impl fmt::Display for ProxyRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ProxyTier> for ProxyRoute {
    fn from(tier: ProxyTier) -> Self {
        ProxyRoute::Tier(tier)
    }
}

/// Configured proxy endpoints, read once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyTiers {
    /// Whether the `none` tier (direct capture) may be attempted
    pub direct_enabled: bool,
    /// Endpoint for the `basic` tier
    pub basic: Option<String>,
    /// Endpoint for the `advanced` tier
    pub advanced: Option<String>,
    /// When set, each basic-tier attempt appends a random `:{1..=N}` port
    /// to the basic endpoint so the proxy hands out a fresh session.
    pub basic_port_pool: Option<u16>,
}

impl ProxyTiers {
    /// Build tiers from optional endpoints, discarding blank values.
    pub fn new(direct_enabled: bool, basic: Option<String>, advanced: Option<String>) -> Self {
        Self {
            direct_enabled,
            basic: non_blank(basic),
            advanced: non_blank(advanced),
            basic_port_pool: None,
        }
    }

    pub fn with_basic_port_pool(mut self, pool: Option<u16>) -> Self {
        self.basic_port_pool = pool.filter(|n| *n > 0);
        self
    }

    /// Reject combinations that would produce unusable endpoints.
    ///
    /// A port pool needs a bare `scheme://[user:pass@]host` basic endpoint,
    /// since the rotated port is appended to it.
    pub fn validate(&self) -> CaptureResult<()> {
        if let (Some(basic), Some(_)) = (&self.basic, self.basic_port_pool) {
            if !is_bare_host(basic) {
                return Err(CaptureError::Config(format!(
                    "SCREENSHOTONE_PROXY must not carry a port or path when \
                     SCREENSHOTONE_PROXY_PORT_POOL is set (got {})",
                    redact_endpoint(basic)
                )));
            }
        }
        Ok(())
    }

    pub fn is_configured(&self, tier: ProxyTier) -> bool {
        match tier {
            ProxyTier::None => self.direct_enabled,
            ProxyTier::Basic => self.basic.is_some(),
            ProxyTier::Advanced => self.advanced.is_some(),
        }
    }

    /// Configured tiers in ascending escalation order
    pub fn configured(&self) -> Vec<ProxyTier> {
        ProxyTier::ALL
            .into_iter()
            .filter(|tier| self.is_configured(*tier))
            .collect()
    }

    /// Proxy endpoint to hand to the provider for `tier`.
    ///
    /// `None` for the direct tier and for tiers without an endpoint.
    pub fn endpoint(&self, tier: ProxyTier) -> Option<String> {
        match tier {
            ProxyTier::None => None,
            ProxyTier::Basic => self.basic.as_ref().map(|basic| match self.basic_port_pool {
                Some(pool) => {
                    let port = rand::thread_rng().gen_range(1..=pool);
                    format!("{}:{}", basic.trim_end_matches('/'), port)
                }
                None => basic.clone(),
            }),
            ProxyTier::Advanced => self.advanced.clone(),
        }
    }
}

/// A route together with the concrete proxy endpoint for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyAssignment {
    pub route: ProxyRoute,
    pub endpoint: Option<String>,
}

impl ProxyAssignment {
    /// Short, credential-free preview of the endpoint for log lines.
    pub fn endpoint_preview(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => redact_endpoint(endpoint),
            None => "direct".to_string(),
        }
    }
}

/// Strip userinfo from a proxy URL and cap it at 50 characters.
pub fn redact_endpoint(endpoint: &str) -> String {
    let without_credentials = match (endpoint.find("://"), endpoint.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***@{}", &endpoint[..scheme_end], &endpoint[at + 1..])
        }
        (None, Some(at)) => format!("***@{}", &endpoint[at + 1..]),
        _ => endpoint.to_string(),
    };

    if without_credentials.chars().count() > 50 {
        let head: String = without_credentials.chars().take(50).collect();
        format!("{}...", head)
    } else {
        without_credentials
    }
}

/// `scheme://[userinfo@]host` with no port, path or query
fn is_bare_host(endpoint: &str) -> bool {
    let rest = endpoint
        .split_once("://")
        .map_or(endpoint, |(_, rest)| rest)
        .trim_end_matches('/');
    if rest.contains(['/', '?', '#']) {
        return false;
    }
    let host = rest.rsplit_once('@').map_or(rest, |(_, host)| host);
    let has_port = host
        .rsplit_once(':')
        .is_some_and(|(_, port)| port.chars().all(|c| c.is_ascii_digit()));
    !host.is_empty() && !has_port
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
