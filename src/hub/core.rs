//! Background hub implementation.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::channel::{Acceptor, ConnectionSlot, Port, PortEvent, PortEvents};
use crate::error::{Error, Result};
use crate::protocol::{Echo, Operation, RequestEnvelope, ResponseEnvelope, Version};

use super::registry::{Handler, HandlerFuture, HandlerRegistry};
use super::request::{Request, Responder};

// ============================================================================
// Constants
// ============================================================================

/// Error message when a handler future panics.
pub const HANDLER_PANICKED: &str = "Handler panicked";

/// Error message when a handler drops its request without answering.
pub const HANDLER_NO_RESPONSE: &str = "Handler completed without responding";

// ============================================================================
// Hub
// ============================================================================

/// The privileged side of the bridge.
///
/// Owns the operation registry and the single live channel. Cloning is
/// cheap; all clones share state.
///
/// # Example
///
/// ```ignore
/// let hub = Hub::new();
/// hub.register("echo", |payload| async move { Ok(payload) });
///
/// let (connector, acceptor) = channel::memory::runtime();
/// tokio::spawn({
///     let hub = hub.clone();
///     async move { hub.serve(acceptor).await }
/// });
/// ```
#[derive(Clone, Default)]
pub struct Hub {
    inner: Arc<HubInner>,
}

/// Shared hub state.
#[derive(Default)]
struct HubInner {
    /// Registered operation handlers.
    registry: HandlerRegistry,
    /// The live channel to the bridge.
    slot: ConnectionSlot,
}

impl fmt::Debug for Hub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hub")
            .field("operations", &self.operations())
            .field("connected", &self.is_connected())
            .finish()
    }
}

// ============================================================================
// Hub - Registration
// ============================================================================

impl Hub {
    /// Creates a hub with no handlers and no connection.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler that answers through the [`Request`] capabilities.
    ///
    /// Replaces any handler already registered under `name`. Registration
    /// may happen before or after a connection is live.
    pub fn handle<F, Fut>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let name = name.into();
        let handler: Handler =
            Arc::new(move |request: Request| -> HandlerFuture { Box::pin(handler(request)) });

        if self.inner.registry.insert(name.clone(), handler) {
            warn!(operation = %name, "Handler replaced");
        } else {
            debug!(operation = %name, "Handler registered");
        }
    }

    /// Registers a handler that resolves to a value.
    ///
    /// `Ok(value)` answers with the serialized value, `Err(e)` answers
    /// with `e`'s message.
    pub fn register<F, Fut, T>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        self.handle(name, move |request: Request| {
            let call = handler(request.message().clone());
            async move {
                let value = call.await?;
                request.send(&value);
                Ok(())
            }
        });
    }

    /// Registers a handler for a typed [`Operation`].
    ///
    /// A payload that does not deserialize as `O::Payload` is answered with
    /// an error without calling the handler.
    pub fn register_operation<O, F, Fut>(&self, handler: F)
    where
        O: Operation,
        F: Fn(O::Payload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O::Output>> + Send + 'static,
    {
        self.handle(O::NAME, move |request: Request| {
            let call = request
                .payload::<O::Payload>()
                .map_err(|e| Error::handler(format!("Invalid {} payload: {e}", O::NAME)))
                .map(&handler);
            async move {
                let output = call?.await?;
                request.send(&output);
                Ok(())
            }
        });
    }

    /// Registers the built-in `echo` and `version` operations.
    pub fn register_builtins(&self) {
        self.register_operation::<Echo, _, _>(|payload| async move { Ok(payload) });
        self.register_operation::<Version, _, _>(|_| async {
            Ok(env!("CARGO_PKG_VERSION").to_string())
        });
    }

    /// Registered operation names, sorted.
    #[must_use]
    pub fn operations(&self) -> Vec<String> {
        self.inner.registry.names()
    }

    /// Returns `true` if a handler is registered under `name`.
    #[inline]
    #[must_use]
    pub fn has_handler(&self, name: &str) -> bool {
        self.inner.registry.contains(name)
    }
}

// ============================================================================
// Hub - Connection
// ============================================================================

impl Hub {
    /// Returns `true` while a bridge channel is live.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.slot.is_connected()
    }

    /// Returns the live channel, if any.
    #[inline]
    #[must_use]
    pub fn current_port(&self) -> Option<Port> {
        self.inner.slot.current()
    }

    /// Makes `port` the live channel and starts reading its requests.
    ///
    /// Any previous channel is superseded without being closed. The
    /// returned task ends when the channel disconnects.
    pub fn attach(&self, port: Port, events: PortEvents) -> JoinHandle<()> {
        info!(port_id = %port.id(), "Extension connected");
        self.inner.slot.replace(port);

        let hub = self.clone();
        tokio::spawn(async move { hub.read_port(events).await })
    }

    /// Attaches every channel `acceptor` yields.
    ///
    /// Returns once the acceptor is exhausted.
    pub async fn serve<A: Acceptor>(&self, mut acceptor: A) {
        debug!("Hub accept loop started");

        while let Some((port, events)) = acceptor.accept().await {
            self.attach(port, events);
        }

        debug!("Hub accept loop terminated");
    }

    /// Reads one channel until it disconnects.
    async fn read_port(self, mut events: PortEvents) {
        let port_id = events.id();

        loop {
            match events.next().await {
                PortEvent::Message(raw) => self.handle_message(raw),
                PortEvent::Disconnect => break,
            }
        }

        let was_current = self.inner.slot.clear_if(port_id);
        info!(%port_id, was_current, "Extension disconnected");
    }

    /// Parses and dispatches one incoming message.
    fn handle_message(&self, raw: Value) {
        match RequestEnvelope::parse(raw) {
            Ok(envelope) => self.dispatch(envelope),
            Err(e) => warn!(error = %e, "Dropping malformed request"),
        }
    }
}

// ============================================================================
// Hub - Dispatch
// ============================================================================

impl Hub {
    /// Dispatches a request and writes its response to the live channel.
    ///
    /// An unknown operation is answered immediately. Otherwise the handler
    /// runs on its own task, so a slow handler never holds up others.
    pub fn dispatch(&self, envelope: RequestEnvelope) {
        debug!(request_id = %envelope.id, operation = %envelope.operation, "Dispatching request");

        let Some(handler) = self.inner.registry.get(&envelope.operation) else {
            warn!(operation = %envelope.operation, "Unknown request type");
            let message = Error::unknown_operation(envelope.operation).to_string();
            self.deliver(ResponseEnvelope::failure(envelope.id, message));
            return;
        };

        let hub = self.clone();
        tokio::spawn(async move {
            let response = run_handler(handler, envelope).await;
            hub.deliver(response);
        });
    }

    /// Runs a request to completion and returns its response.
    ///
    /// Nothing is written to the channel.
    pub async fn execute(&self, envelope: RequestEnvelope) -> ResponseEnvelope {
        match self.inner.registry.get(&envelope.operation) {
            Some(handler) => run_handler(handler, envelope).await,
            None => {
                let message = Error::unknown_operation(envelope.operation).to_string();
                ResponseEnvelope::failure(envelope.id, message)
            }
        }
    }

    /// Writes a response to the live channel, dropping it if there is none.
    fn deliver(&self, response: ResponseEnvelope) {
        match self.inner.slot.post(response.to_value()) {
            Ok(port_id) => {
                trace!(request_id = %response.request_id, %port_id, "Response sent");
            }
            Err(e) => {
                debug!(request_id = %response.request_id, error = %e, "Response dropped");
            }
        }
    }
}

// ============================================================================
// Handler Execution
// ============================================================================

/// Runs `handler` and turns every outcome into exactly one response.
async fn run_handler(handler: Handler, envelope: RequestEnvelope) -> ResponseEnvelope {
    let request_id = envelope.id.clone();
    let (responder, answer) = Responder::new(request_id.clone());
    let request = Request::new(envelope, responder.clone());

    let outcome = AssertUnwindSafe(async move { handler(request).await })
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            warn!(%request_id, error = %e, "Handler failed");
            responder.respond(ResponseEnvelope::failure(request_id.clone(), e.to_string()));
        }
        Err(_) => {
            error!(%request_id, "Handler panicked");
            responder.respond(ResponseEnvelope::failure(
                request_id.clone(),
                HANDLER_PANICKED,
            ));
        }
    }

    // The request may still be held by work the handler spawned.
    drop(responder);

    answer
        .await
        .unwrap_or_else(|_| ResponseEnvelope::failure(request_id, HANDLER_NO_RESPONSE))
}

// ============================================================================
// Tests
// ============================================================================
