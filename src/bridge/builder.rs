//! Builder pattern for bridge configuration.
//!
//! # Example
//!
//! ```ignore
//! let bridge = ContentBridge::builder()
//!     .target_origin("https://frcn.example")
//!     .pending_policy(PendingPolicy::ById)
//!     .build(connector, page)?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use url::Url;

use crate::channel::Connector;
use crate::error::{Error, Result};
use crate::page::PageSurface;

use super::config::{BridgeConfig, PendingPolicy};
use super::core::ContentBridge;

// ============================================================================
// BridgeBuilder
// ============================================================================

/// Builder for configuring a [`ContentBridge`].
///
/// Use [`ContentBridge::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct BridgeBuilder {
    config: BridgeConfig,
}

// ============================================================================
// BridgeBuilder Implementation
// ============================================================================

impl BridgeBuilder {
    /// Creates a builder with default settings and no target origin.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration.
    #[inline]
    #[must_use]
    pub fn from_config(config: BridgeConfig) -> Self {
        Self { config }
    }

    /// Sets the origin responses are posted to.
    #[inline]
    #[must_use]
    pub fn target_origin(mut self, origin: impl Into<String>) -> Self {
        self.config.target_origin = origin.into();
        self
    }

    /// Sets the tag accepted on page requests.
    #[inline]
    #[must_use]
    pub fn request_tag(mut self, tag: impl Into<String>) -> Self {
        self.config.request_tag = tag.into();
        self
    }

    /// Sets the tag on page responses.
    #[inline]
    #[must_use]
    pub fn response_tag(mut self, tag: impl Into<String>) -> Self {
        self.config.response_tag = tag.into();
        self
    }

    /// Sets the presence marker's name and version.
    #[inline]
    #[must_use]
    pub fn marker(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.config.marker_name = name.into();
        self.config.marker_version = version.into();
        self
    }

    /// Sets the replay policy.
    #[inline]
    #[must_use]
    pub fn pending_policy(mut self, policy: PendingPolicy) -> Self {
        self.config.pending_policy = policy;
        self
    }

    /// Sets the reconnect backoff bounds.
    #[inline]
    #[must_use]
    pub fn reconnect_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.config.reconnect.initial = initial;
        self.config.reconnect.max = max;
        self
    }

    /// Validates the configuration without building.
    ///
    /// # Errors
    ///
    /// Same as [`build`](Self::build).
    pub fn into_config(self) -> Result<BridgeConfig> {
        self.validate_target_origin()?;
        self.validate_tags()?;
        self.validate_reconnect()?;
        Ok(self.config)
    }

    /// Builds the bridge with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the target origin is empty, `*`, or not an origin
    /// - [`Error::Config`] if a tag is empty or both tags are equal
    /// - [`Error::Config`] if the backoff bounds are inverted
    pub fn build<C, P>(self, connector: C, page: P) -> Result<ContentBridge>
    where
        C: Connector,
        P: PageSurface,
    {
        let config = self.into_config()?;
        Ok(ContentBridge::with_config(config, connector, page))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl BridgeBuilder {
    /// Validates the target origin.
    fn validate_target_origin(&self) -> Result<()> {
        let origin = self.config.target_origin.trim();

        if origin.is_empty() {
            return Err(Error::config(
                "Target origin is required. Use .target_origin() to set it.\n\
                 Example: ContentBridge::builder().target_origin(\"https://frcn.example\")",
            ));
        }

        if origin == "*" {
            return Err(Error::config(
                "Target origin must not be '*'; responses are never broadcast",
            ));
        }

        let url = Url::parse(origin)
            .map_err(|e| Error::config(format!("Invalid target origin {origin:?}: {e}")))?;
        if !url.origin().is_tuple() {
            return Err(Error::config(format!(
                "Target origin {origin:?} has no host"
            )));
        }

        Ok(())
    }

    /// Validates the page message tags.
    fn validate_tags(&self) -> Result<()> {
        if self.config.request_tag.is_empty() || self.config.response_tag.is_empty() {
            return Err(Error::config("Page message tags must not be empty"));
        }

        if self.config.request_tag == self.config.response_tag {
            return Err(Error::config(
                "Request and response tags must differ, or responses would be relayed back",
            ));
        }

        Ok(())
    }

    /// Validates the backoff bounds.
    fn validate_reconnect(&self) -> Result<()> {
        let reconnect = &self.config.reconnect;
        if reconnect.initial > reconnect.max {
            return Err(Error::config(format!(
                "Reconnect initial delay {:?} exceeds maximum {:?}",
                reconnect.initial, reconnect.max
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_origin() {
        let config = BridgeBuilder::new()
            .target_origin("https://frcn.example")
            .into_config()
            .expect("valid config");
        assert_eq!(config.target_origin, "https://frcn.example");
    }

    #[test]
    fn test_missing_origin_rejected() {
        let err = BridgeBuilder::new().into_config().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_wildcard_origin_rejected() {
        let err = BridgeBuilder::new()
            .target_origin("*")
            .into_config()
            .unwrap_err();
        assert!(err.to_string().contains("'*'"));
    }

    #[test]
    fn test_opaque_origin_rejected() {
        assert!(
            BridgeBuilder::new()
                .target_origin("data:text/plain,hi")
                .into_config()
                .is_err()
        );
        assert!(
            BridgeBuilder::new()
                .target_origin("not an origin")
                .into_config()
                .is_err()
        );
    }

    #[test]
    fn test_equal_tags_rejected() {
        let err = BridgeBuilder::new()
            .target_origin("http://localhost:3000")
            .request_tag("same")
            .response_tag("same")
            .into_config()
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_inverted_backoff_rejected() {
        let err = BridgeBuilder::new()
            .target_origin("http://localhost:3000")
            .reconnect_backoff(Duration::from_secs(5), Duration::from_secs(1))
            .into_config()
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_setters_apply() {
        let config = BridgeBuilder::new()
            .target_origin("http://localhost:3000")
            .marker("frcn-test", "9.9.9")
            .pending_policy(PendingPolicy::ById)
            .into_config()
            .expect("valid config");

        assert_eq!(config.marker_name, "frcn-test");
        assert_eq!(config.marker_version, "9.9.9");
        assert_eq!(config.pending_policy, PendingPolicy::ById);
    }
}
