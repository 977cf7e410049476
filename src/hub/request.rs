//! The request handed to an operation handler.
//!
//! A [`Request`] carries the payload and the two answer capabilities,
//! `send` and `fail`. Only the first answer counts; later ones are ignored.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::trace;

use crate::error::Result;
use crate::identifiers::RequestId;
use crate::protocol::{RequestEnvelope, ResponseEnvelope};

// ============================================================================
// Responder
// ============================================================================

/// Answer slot shared by a request and the hub.
///
/// When every clone is dropped without answering, the receiving side sees
/// the oneshot close.
#[derive(Debug, Clone)]
pub(crate) struct Responder {
    request_id: RequestId,
    answer: Arc<Mutex<Option<oneshot::Sender<ResponseEnvelope>>>>,
}

impl Responder {
    pub(crate) fn new(request_id: RequestId) -> (Self, oneshot::Receiver<ResponseEnvelope>) {
        let (tx, rx) = oneshot::channel();
        let responder = Self {
            request_id,
            answer: Arc::new(Mutex::new(Some(tx))),
        };
        (responder, rx)
    }

    /// Answers with `response` unless already answered.
    pub(crate) fn respond(&self, response: ResponseEnvelope) -> bool {
        let Some(tx) = self.answer.lock().take() else {
            trace!(request_id = %self.request_id, "Ignoring second answer");
            return false;
        };
        let _ = tx.send(response);
        true
    }

    pub(crate) fn has_responded(&self) -> bool {
        self.answer.lock().is_none()
    }

    pub(crate) fn request_id(&self) -> &RequestId {
        &self.request_id
    }
}

// ============================================================================
// Request
// ============================================================================

/// A dispatched request, as seen by its handler.
#[derive(Debug)]
pub struct Request {
    operation: String,
    message: Value,
    responder: Responder,
}

impl Request {
    pub(crate) fn new(envelope: RequestEnvelope, responder: Responder) -> Self {
        Self {
            operation: envelope.operation,
            message: envelope.message,
            responder,
        }
    }

    /// Returns the caller-assigned request id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &RequestId {
        self.responder.request_id()
    }

    /// Returns the operation name.
    #[inline]
    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Returns the raw payload.
    #[inline]
    #[must_use]
    pub fn message(&self) -> &Value {
        &self.message
    }

    /// Deserializes the payload into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the payload does not
    /// match `T`.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(T::deserialize(&self.message)?)
    }

    /// Answers with a success value.
    ///
    /// A value that fails to serialize answers with the serializer's error
    /// instead. Returns `false` if the request was already answered.
    pub fn send<T: Serialize + ?Sized>(&self, value: &T) -> bool {
        let id = self.id().clone();
        let response = ResponseEnvelope::success(id.clone(), value)
            .unwrap_or_else(|e| ResponseEnvelope::failure(id, e.to_string()));
        self.responder.respond(response)
    }

    /// Answers with an error message.
    ///
    /// Returns `false` if the request was already answered.
    pub fn fail(&self, message: impl Into<String>) -> bool {
        self.responder
            .respond(ResponseEnvelope::failure(self.id().clone(), message))
    }

    /// Returns `true` once `send` or `fail` has been called.
    #[inline]
    #[must_use]
    pub fn has_responded(&self) -> bool {
        self.responder.has_responded()
    }
}

// ============================================================================
// Tests
// ============================================================================
