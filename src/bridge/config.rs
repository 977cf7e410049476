//! Content bridge configuration.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::page::MARKER_NAME;
use crate::protocol::{REQUEST_TAG, RESPONSE_TAG};

// ============================================================================
// Constants
// ============================================================================

/// Default delay before the first throttled reconnect attempt.
pub const DEFAULT_RECONNECT_INITIAL: Duration = Duration::from_millis(100);

/// Default upper bound on the reconnect delay.
pub const DEFAULT_RECONNECT_MAX: Duration = Duration::from_secs(30);

// ============================================================================
// PendingPolicy
// ============================================================================

/// How unacknowledged requests are kept for replay after a reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PendingPolicy {
    /// One slot holding the latest request; any channel message clears it.
    #[default]
    Latest,
    /// Every request until the response carrying its id arrives.
    ///
    /// A request whose response is lost stays held and is resent on every
    /// reconnect until it is answered.
    ById,
}

// ============================================================================
// ReconnectPolicy
// ============================================================================

/// Exponential backoff bounds for reconnecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay after the first consecutive failure.
    pub initial: Duration,
    /// Delay ceiling.
    pub max: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial: DEFAULT_RECONNECT_INITIAL,
            max: DEFAULT_RECONNECT_MAX,
        }
    }
}

// ============================================================================
// BridgeConfig
// ============================================================================

/// Settings for a [`ContentBridge`](super::ContentBridge).
///
/// `target_origin` has no usable default; build through
/// [`BridgeBuilder`](super::BridgeBuilder), which rejects an empty or
/// wildcard origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Origin responses are posted to.
    pub target_origin: String,

    /// Tag on page messages accepted as requests.
    pub request_tag: String,

    /// Tag on page messages carrying responses.
    pub response_tag: String,

    /// Name of the presence marker.
    pub marker_name: String,

    /// Version announced by the presence marker.
    pub marker_version: String,

    /// Replay policy for unacknowledged requests.
    pub pending_policy: PendingPolicy,

    /// Reconnect backoff bounds.
    pub reconnect: ReconnectPolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            target_origin: String::new(),
            request_tag: REQUEST_TAG.to_string(),
            response_tag: RESPONSE_TAG.to_string(),
            marker_name: MARKER_NAME.to_string(),
            marker_version: env!("CARGO_PKG_VERSION").to_string(),
            pending_policy: PendingPolicy::default(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert!(config.target_origin.is_empty());
        assert_eq!(config.request_tag, "frcnIntegrationRequest");
        assert_eq!(config.response_tag, "frcnIntegrationResponse");
        assert_eq!(config.marker_name, "frcn-integration-version");
        assert_eq!(config.marker_version, env!("CARGO_PKG_VERSION"));
        assert_eq!(config.pending_policy, PendingPolicy::Latest);
    }

    #[test]
    fn test_default_reconnect_policy() {
        let policy = ReconnectPolicy::default();
        assert!(policy.initial < policy.max);
    }
}
