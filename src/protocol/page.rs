//! Page-level message wrapper.
//!
//! Envelopes travel between the page and the content bridge wrapped in a
//! tagged object, posted through the window messaging surface.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Constants
// ============================================================================

/// Tag on page messages carrying a request envelope.
pub const REQUEST_TAG: &str = "frcnIntegrationRequest";

/// Tag on page messages carrying a response envelope.
pub const RESPONSE_TAG: &str = "frcnIntegrationResponse";

// ============================================================================
// PageMessage
// ============================================================================

/// A tagged message exchanged with the page.
///
/// # Format
///
/// ```json
/// {
///   "type": "frcnIntegrationRequest",
///   "message": { "id": "1", "type": "echo", "message": {} }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageMessage {
    /// Direction tag.
    #[serde(rename = "type")]
    pub tag: String,

    /// The wrapped envelope, untouched.
    pub message: Value,
}

impl PageMessage {
    /// Creates a new page message.
    #[inline]
    #[must_use]
    pub fn new(tag: impl Into<String>, message: Value) -> Self {
        Self {
            tag: tag.into(),
            message,
        }
    }

    /// Wraps a request envelope with the default request tag.
    #[inline]
    #[must_use]
    pub fn request(message: Value) -> Self {
        Self::new(REQUEST_TAG, message)
    }

    /// Wraps a response envelope with the default response tag.
    #[inline]
    #[must_use]
    pub fn response(message: Value) -> Self {
        Self::new(RESPONSE_TAG, message)
    }

    /// Extracts the wrapped message if `data` carries `tag`.
    ///
    /// Anything that is not an object with a matching string `type` yields
    /// `None`.
    #[must_use]
    pub fn unwrap_tagged(data: Value, tag: &str) -> Option<Value> {
        let Value::Object(mut fields) = data else {
            return None;
        };

        match fields.get("type") {
            Some(Value::String(found)) if found == tag => {}
            _ => return None,
        }

        Some(fields.remove("message").unwrap_or(Value::Null))
    }

    /// Converts into the posted wire value.
    #[must_use]
    pub fn into_value(self) -> Value {
        let mut fields = serde_json::Map::with_capacity(2);
        fields.insert("type".into(), Value::String(self.tag));
        fields.insert("message".into(), self.message);
        Value::Object(fields)
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
    fn test_unwrap_tagged_matches() {
        let data = json!({ "type": REQUEST_TAG, "message": { "id": "1" } });
        assert_eq!(
            PageMessage::unwrap_tagged(data, REQUEST_TAG),
            Some(json!({ "id": "1" }))
        );
    }

    #[test]
    fn test_unwrap_tagged_rejects_other_tags() {
        let data = json!({ "type": RESPONSE_TAG, "message": {} });
        assert_eq!(PageMessage::unwrap_tagged(data, REQUEST_TAG), None);
        assert_eq!(PageMessage::unwrap_tagged(json!("x"), REQUEST_TAG), None);
        assert_eq!(PageMessage::unwrap_tagged(json!({}), REQUEST_TAG), None);
    }

    #[test]
    fn test_response_wire_format() {
        let message = PageMessage::response(json!({ "requestId": "1", "value": "1" }));
        assert_eq!(
            message.into_value(),
            json!({
                "type": "frcnIntegrationResponse",
                "message": { "requestId": "1", "value": "1" }
            })
        );
    }
}
