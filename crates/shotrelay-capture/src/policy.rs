//! Proxy escalation policy
//!
//! Pure decision logic: given the routes already tried and how the last one
//! failed, pick the next route or report that escalation is exhausted.

use std::sync::Arc;

use crate::error::FailureClass;
use crate::tier::{ProxyAssignment, ProxyRoute, ProxyTiers};

#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    tiers: Arc<ProxyTiers>,
    explicit_proxy: Option<String>,
}

impl EscalationPolicy {
    /// Policy for one orchestration run. A non-blank `explicit_proxy` is tried
    /// exactly once and replaces automatic escalation.
    pub fn new(tiers: Arc<ProxyTiers>, explicit_proxy: Option<String>) -> Self {
        let explicit_proxy = explicit_proxy
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        Self {
            tiers,
            explicit_proxy,
        }
    }

    pub fn has_override(&self) -> bool {
        self.explicit_proxy.is_some()
    }

    /// Upper bound on the number of attempts this policy can hand out
    pub fn max_attempts(&self) -> usize {
        if self.has_override() {
            1
        } else {
            self.tiers.configured().len()
        }
    }

    /// Route for the first attempt, `None` if nothing is configured
    pub fn first_route(&self) -> Option<ProxyRoute> {
        self.next_route(&[], None)
    }

    /// Next route to attempt, or `None` once escalation is exhausted.
    ///
    /// `last_failure` is the class of the most recent failed attempt; a
    /// non-retryable class ends escalation regardless of remaining tiers.
    pub fn next_route(
        &self,
        tried: &[ProxyRoute],
        last_failure: Option<&FailureClass>,
    ) -> Option<ProxyRoute> {
        if let Some(class) = last_failure {
            if !class.is_retryable() {
                return None;
            }
        }

        if self.has_override() {
            return if tried.contains(&ProxyRoute::Override) {
                None
            } else {
                Some(ProxyRoute::Override)
            };
        }

        let highest_tried = tried.iter().filter_map(ProxyRoute::tier).max();

        self.tiers
            .configured()
            .into_iter()
            .filter(|tier| highest_tried.map_or(true, |highest| *tier > highest))
            .find(|tier| !tried.contains(&ProxyRoute::Tier(*tier)))
            .map(ProxyRoute::Tier)
    }

    /// Resolve the proxy endpoint for `route`
    pub fn assignment(&self, route: ProxyRoute) -> ProxyAssignment {
        let endpoint = match route {
            ProxyRoute::Override => self.explicit_proxy.clone(),
            ProxyRoute::Tier(tier) => self.tiers.endpoint(tier),
        };
        ProxyAssignment { route, endpoint }
    }
}
