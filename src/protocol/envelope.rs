//! Request and response envelopes.
//!
//! The two message families carried by the Host Channel between the
//! content bridge and the background hub.

// ============================================================================
// Imports
// ============================================================================

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;

use super::Operation;

// ============================================================================
// RequestEnvelope
// ============================================================================

/// A request from the page, relayed by the bridge to the hub.
///
/// # Format
///
/// ```json
/// {
///   "id": "1",
///   "type": "spectrumRequest",
///   "message": { ... }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Caller-assigned id, echoed back as `requestId`.
    pub id: RequestId,

    /// Operation name selecting the handler.
    #[serde(rename = "type", default)]
    pub operation: String,

    /// Opaque handler-defined payload.
    #[serde(default)]
    pub message: Value,
}

impl RequestEnvelope {
    /// Creates a new request envelope.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<RequestId>, operation: impl Into<String>, message: Value) -> Self {
        Self {
            id: id.into(),
            operation: operation.into(),
            message,
        }
    }

    /// Creates a request envelope for a typed operation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the payload cannot be serialized.
    pub fn for_operation<O: Operation>(id: impl Into<RequestId>, payload: &O::Payload) -> Result<Self>
    where
        O::Payload: Serialize,
    {
        Ok(Self::new(id, O::NAME, serde_json::to_value(payload)?))
    }

    /// Parses a raw channel message into a request envelope.
    ///
    /// Only the `id` is mandatory. A missing or non-string `type` becomes an
    /// empty operation name, which no handler is registered under.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the message is not an object with a
    /// string `id`.
    pub fn parse(raw: Value) -> Result<Self> {
        let Value::Object(mut fields) = raw else {
            return Err(Error::protocol("request envelope is not an object"));
        };

        let id = match fields.remove("id") {
            Some(Value::String(id)) => RequestId::new(id),
            _ => return Err(Error::protocol("request envelope has no string id")),
        };

        let operation = match fields.remove("type") {
            Some(Value::String(operation)) => operation,
            _ => String::new(),
        };

        Ok(Self {
            id,
            operation,
            message: fields.remove("message").unwrap_or(Value::Null),
        })
    }

    /// Deserializes the payload into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the payload does not match `T`.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(T::deserialize(&self.message)?)
    }

    /// Converts the envelope into its wire value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut fields = Map::with_capacity(3);
        fields.insert("id".into(), Value::String(self.id.to_string()));
        fields.insert("type".into(), Value::String(self.operation.clone()));
        fields.insert("message".into(), self.message.clone());
        Value::Object(fields)
    }
}

// ============================================================================
// ResponseEnvelope
// ============================================================================

/// A response from the hub, relayed by the bridge to the page.
///
/// Exactly one of `value` / `error` is present.
///
/// # Format
///
/// Success (`value` holds the JSON text of the handler's result):
/// ```json
/// { "requestId": "1", "value": "{\"a\":1}" }
/// ```
///
/// Error:
/// ```json
/// { "requestId": "2", "error": { "message": "Unknown request type" } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Matches the request `id`.
    #[serde(rename = "requestId")]
    pub request_id: RequestId,

    /// Serialized result (if success).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Failure description (if error).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl ResponseEnvelope {
    /// Creates a success envelope by serializing `value`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if `value` cannot be serialized.
    pub fn success<T: Serialize + ?Sized>(request_id: RequestId, value: &T) -> Result<Self> {
        Ok(Self {
            request_id,
            value: Some(serde_json::to_string(value)?),
            error: None,
        })
    }

    /// Creates an error envelope.
    #[inline]
    #[must_use]
    pub fn failure(request_id: RequestId, message: impl Into<String>) -> Self {
        Self {
            request_id,
            value: None,
            error: Some(ErrorBody {
                message: message.into(),
            }),
        }
    }

    /// Returns `true` if this is a success response.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Returns `true` if this is an error response.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Returns the error message, if any.
    #[inline]
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.message.as_str())
    }

    /// Extracts the serialized value, returning error if response was error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Handler`] carrying the envelope's message if the
    /// response was an error.
    pub fn into_result(self) -> Result<String> {
        match self.error {
            Some(body) => Err(Error::handler(body.message)),
            None => Ok(self.value.unwrap_or_else(|| "null".to_string())),
        }
    }

    /// Parses the serialized value into `T`.
    ///
    /// # Errors
    ///
    /// - [`Error::Handler`] if the response was an error
    /// - [`Error::Json`] if the value does not parse as `T`
    pub fn decode_value<T: DeserializeOwned>(&self) -> Result<T> {
        if let Some(body) = &self.error {
            return Err(Error::handler(body.message.clone()));
        }
        let text = self.value.as_deref().unwrap_or("null");
        Ok(serde_json::from_str(text)?)
    }

    /// Converts the envelope into its wire value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut fields = Map::with_capacity(2);
        fields.insert(
            "requestId".into(),
            Value::String(self.request_id.to_string()),
        );
        if let Some(value) = &self.value {
            fields.insert("value".into(), Value::String(value.clone()));
        }
        if let Some(error) = &self.error {
            let mut body = Map::with_capacity(1);
            body.insert("message".into(), Value::String(error.message.clone()));
            fields.insert("error".into(), Value::Object(body));
        }
        Value::Object(fields)
    }
}

// ============================================================================
// ErrorBody
// ============================================================================

/// Error payload of a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable failure message.
    pub message: String,
}

// ============================================================================
// Tests
// ============================================================================
