//! Error types for the frcn bridge.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use frcn_bridge::{Error, Result};
//!
//! hub.register("lookup", |payload| async move {
//!     let handle = payload["handle"].as_str().ok_or_else(|| Error::handler("missing handle"))?;
//!     Ok(handle.to_uppercase())
//! });
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionRefused`], [`Error::PortDisconnected`], [`Error::NoChannel`] |
//! | Protocol | [`Error::UnknownOperation`], [`Error::Protocol`] |
//! | Handler | [`Error::Handler`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`], [`Error::Url`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::PortId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when bridge or hub configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Establishing a channel failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// The other side is not accepting connections.
    #[error("Connection refused")]
    ConnectionRefused,

    /// A message was posted on a port that is no longer connected.
    #[error("Port {port_id} is disconnected")]
    PortDisconnected {
        /// The disconnected port.
        port_id: PortId,
    },

    /// No channel is live to carry the message.
    #[error("No live channel")]
    NoChannel,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// No handler is registered for the requested operation.
    ///
    /// The display text is what the page sees in the error envelope.
    #[error("Unknown request type")]
    UnknownOperation {
        /// The operation name that was requested.
        operation: String,
    },

    /// Message did not have the expected shape.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // Handler Errors
    // ========================================================================
    /// An operation handler failed.
    ///
    /// Displays exactly the handler's message so it reaches the page unchanged.
    #[error("{message}")]
    Handler {
        /// Failure message reported to the page.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// URL parse error.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a port disconnected error.
    #[inline]
    pub fn port_disconnected(port_id: PortId) -> Self {
        Self::PortDisconnected { port_id }
    }

    /// Creates an unknown operation error.
    #[inline]
    pub fn unknown_operation(operation: impl Into<String>) -> Self {
        Self::UnknownOperation {
            operation: operation.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a handler error.
    #[inline]
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionRefused
                | Self::PortDisconnected { .. }
                | Self::NoChannel
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed after the bridge reconnects.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionRefused
                | Self::PortDisconnected { .. }
                | Self::NoChannel
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::connection("hub unreachable");
        assert_eq!(err.to_string(), "Connection failed: hub unreachable");
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("target origin must not be '*'");
        assert_eq!(
            err.to_string(),
            "Configuration error: target origin must not be '*'"
        );
    }

    #[test]
    fn test_unknown_operation_display_is_fixed() {
        let err = Error::unknown_operation("nope");
        assert_eq!(err.to_string(), "Unknown request type");
    }

    #[test]
    fn test_handler_error_displays_message_verbatim() {
        let err = Error::handler("Not logged in to robertsspaceindustries.com");
        assert_eq!(
            err.to_string(),
            "Not logged in to robertsspaceindustries.com"
        );
    }

    #[test]
    fn test_is_connection_error() {
        let conn_err = Error::connection("test");
        let refused = Error::ConnectionRefused;
        let closed = Error::port_disconnected(PortId::generate());
        let other_err = Error::config("test");

        assert!(conn_err.is_connection_error());
        assert!(refused.is_connection_error());
        assert!(closed.is_connection_error());
        assert!(!other_err.is_connection_error());
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::ConnectionRefused.is_recoverable());
        assert!(!Error::handler("boom").is_recoverable());
        assert!(!Error::config("test").is_recoverable());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::BrokenPipe, "pipe closed");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_from_url_error() {
        let url_err = url::Url::parse("not a url").unwrap_err();
        let err: Error = url_err.into();
        assert!(matches!(err, Error::Url(_)));
    }
}
