//! Type-safe identifiers.
//!
//! Newtype wrappers prevent mixing request ids and port ids.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ============================================================================
// RequestId
// ============================================================================

/// Caller-assigned request identifier.
///
/// The page picks the value; the hub echoes it back as `requestId`.
/// Uniqueness among in-flight requests is the caller's responsibility.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Creates a request id from any string.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Reads the `id` field of a raw request envelope.
    ///
    /// Returns `None` unless the field is present and a string.
    #[must_use]
    pub fn from_envelope(message: &Value) -> Option<Self> {
        message.get("id").and_then(Value::as_str).map(Self::new)
    }

    /// Reads the `requestId` field of a raw response envelope.
    #[must_use]
    pub fn from_response(message: &Value) -> Option<Self> {
        message
            .get("requestId")
            .and_then(Value::as_str)
            .map(Self::new)
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ============================================================================
// PortId
// ============================================================================

/// Identity of one Host Channel instance.
///
/// Every connect produces a fresh id, which is how a superseded port is told
/// apart from the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortId(Uuid);

impl PortId {
    /// Generates a new random port id.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First group is enough to tell ports apart in logs.
        let simple = self.0.simple().to_string();
        f.write_str(&simple[..8])
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_request_id_serializes_as_plain_string() {
        let id = RequestId::new("42");
        assert_eq!(serde_json::to_value(&id).expect("serialize"), json!("42"));
    }

    #[test]
    fn test_request_id_from_envelope() {
        let message = json!({ "id": "7", "type": "echo", "message": {} });
        assert_eq!(RequestId::from_envelope(&message), Some(RequestId::new("7")));
    }

    #[test]
    fn test_request_id_from_envelope_rejects_non_string() {
        assert_eq!(RequestId::from_envelope(&json!({ "id": 7 })), None);
        assert_eq!(RequestId::from_envelope(&json!({ "type": "echo" })), None);
        assert_eq!(RequestId::from_envelope(&json!("7")), None);
    }

    #[test]
    fn test_request_id_from_response() {
        let message = json!({ "requestId": "9", "value": "null" });
        assert_eq!(RequestId::from_response(&message), Some(RequestId::new("9")));
    }

    #[test]
    fn test_port_ids_are_unique() {
        assert_ne!(PortId::generate(), PortId::generate());
    }

    #[test]
    fn test_port_id_display_is_short() {
        let id = PortId::generate();
        assert_eq!(id.to_string().len(), 8);
    }
}
