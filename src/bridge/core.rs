//! Content bridge run loop.
//!
//! One task owns the bridge state machine:
//!
//! ```text
//!             connect ok
//! Disconnected ──────────► Connected
//!      ▲                       │
//!      └───────────────────────┘
//!        port disconnect (reconnect after backoff delay)
//! ```
//!
//! Page requests are relayed while connected and kept for replay either
//! way. Channel messages are acknowledged and forwarded to the page.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::{self, Future};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, error, info, trace, warn};

use crate::channel::{Connected, ConnectionSlot, Connector, Port, PortEvent, PortEvents};
use crate::error::Result;
use crate::identifiers::RequestId;
use crate::page::{EventSource, Marker, PageEvent, PageEvents, PageSurface};
use crate::protocol::PageMessage;

use super::backoff::Backoff;
use super::builder::BridgeBuilder;
use super::config::BridgeConfig;
use super::pending::PendingRequests;

// ============================================================================
// Connector Erasure
// ============================================================================

/// Object-safe view of a [`Connector`].
trait ErasedConnector: Send + Sync + 'static {
    fn connect_boxed(&self) -> BoxFuture<'_, Result<Connected>>;
}

impl<C: Connector> ErasedConnector for C {
    fn connect_boxed(&self) -> BoxFuture<'_, Result<Connected>> {
        Box::pin(self.connect())
    }
}

// ============================================================================
// ContentBridge
// ============================================================================

/// The relay living next to the hosted page.
///
/// # Example
///
/// ```ignore
/// let (window, page_tx, page_events, mut posted) = page::window();
/// let handle = ContentBridge::builder()
///     .target_origin("https://frcn.example")
///     .build(connector, window)?
///     .spawn(page_events);
///
/// page_tx.send(PageEvent::request(json!({ "id": "1", "type": "echo", "message": {} })))?;
/// let response = posted.recv().await;
/// ```
pub struct ContentBridge {
    config: BridgeConfig,
    connector: Arc<dyn ErasedConnector>,
    page: Arc<dyn PageSurface>,
    slot: Arc<ConnectionSlot>,
}

impl fmt::Debug for ContentBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentBridge")
            .field("config", &self.config)
            .field("connected", &self.slot.is_connected())
            .finish_non_exhaustive()
    }
}

impl ContentBridge {
    /// Creates a builder.
    #[inline]
    #[must_use]
    pub fn builder() -> BridgeBuilder {
        BridgeBuilder::new()
    }

    /// Creates a bridge from an already validated configuration.
    pub(crate) fn with_config<C, P>(config: BridgeConfig, connector: C, page: P) -> Self
    where
        C: Connector,
        P: PageSurface,
    {
        Self {
            config,
            connector: Arc::new(connector),
            page: Arc::new(page),
            slot: Arc::new(ConnectionSlot::new()),
        }
    }

    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Runs the bridge on a new task.
    pub fn spawn(self, page_events: PageEvents) -> BridgeHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let slot = Arc::clone(&self.slot);

        let shutdown = async move {
            let requested = shutdown_rx.wait_for(|stop| *stop).await.is_ok();
            if !requested {
                // Handle dropped: run until the page goes away.
                future::pending::<()>().await;
            }
        };

        let task = tokio::spawn(self.run(page_events, shutdown));

        BridgeHandle {
            shutdown: shutdown_tx,
            slot,
            task,
        }
    }

    /// Runs the bridge until `shutdown` resolves or the page event stream
    /// ends.
    ///
    /// Connects first, then inserts the presence marker, then relays.
    pub async fn run<S>(self, mut page_events: PageEvents, shutdown: S)
    where
        S: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);

        let mut state = RelayState {
            pending: PendingRequests::new(self.config.pending_policy),
            backoff: Backoff::new(self.config.reconnect),
            link: None,
            carried_message: false,
            retry_at: Instant::now(),
            marker_inserted: false,
        };

        loop {
            tokio::select! {
                biased;

                () = &mut shutdown => {
                    debug!("Bridge shutdown requested");
                    break;
                }

                event = next_port_event(&mut state.link), if state.link.is_some() => {
                    self.on_port_event(&mut state, event);
                }

                () = time::sleep_until(state.retry_at), if state.link.is_none() => {
                    let attempt = tokio::select! {
                        () = &mut shutdown => {
                            debug!("Bridge shutdown during connect");
                            break;
                        }
                        attempt = self.connector.connect_boxed() => attempt,
                    };
                    self.on_connect(&mut state, attempt);
                    self.insert_marker_once(&mut state);
                }

                event = page_events.recv() => {
                    match event {
                        Some(event) => self.on_page_event(&mut state, event),
                        None => {
                            debug!("Page event source closed");
                            break;
                        }
                    }
                }
            }
        }

        if let Some(port) = self.slot.clear() {
            port.disconnect();
        }

        info!(pending = state.pending.len(), "Bridge stopped");
    }
}

// ============================================================================
// ContentBridge - Event Handling
// ============================================================================

impl ContentBridge {
    /// Handles the outcome of a connect attempt.
    fn on_connect(&self, state: &mut RelayState, attempt: Result<Connected>) {
        match attempt {
            Ok((port, events)) => {
                info!(port_id = %port.id(), "Bridge connected");
                self.slot.replace(port);
                state.link = Some(events);
                state.carried_message = false;
                self.replay(state);
            }
            Err(e) => {
                state.backoff.record_failure();
                let delay = state.backoff.delay();
                warn!(
                    error = %e,
                    failures = state.backoff.failures(),
                    ?delay,
                    "Bridge connect failed"
                );
                state.retry_at = Instant::now() + delay;
            }
        }
    }

    /// Resends everything pending on the new channel, oldest first.
    fn replay(&self, state: &RelayState) {
        let mut replayed = 0_usize;

        for envelope in state.pending.replay() {
            if let Err(e) = self.slot.post(envelope.clone()) {
                warn!(error = %e, "Replay interrupted");
                break;
            }
            replayed += 1;
        }

        if replayed > 0 {
            info!(replayed, "Replayed pending requests");
        }
    }

    /// Announces the bridge to the page after the first connect attempt.
    fn insert_marker_once(&self, state: &mut RelayState) {
        if state.marker_inserted {
            return;
        }

        let marker = Marker::new(&self.config.marker_name, &self.config.marker_version);
        self.page.insert_marker(&marker);
        state.marker_inserted = true;

        info!(version = %self.config.marker_version, "Bridge loaded");
    }

    /// Handles a message or disconnect on the live channel.
    fn on_port_event(&self, state: &mut RelayState, event: PortEvent) {
        match event {
            PortEvent::Message(message) => {
                state.carried_message = true;
                state.backoff.reset();

                let released = state.pending.acknowledge(&message);
                debug!(
                    request_id = ?RequestId::from_response(&message),
                    released,
                    "Relaying response to page"
                );

                self.page.post_message(
                    PageMessage::new(&self.config.response_tag, message),
                    &self.config.target_origin,
                );
            }

            PortEvent::Disconnect => {
                if let Some(events) = state.link.take() {
                    self.slot.clear_if(events.id());
                }

                if !state.carried_message {
                    state.backoff.record_failure();
                }

                let delay = state.backoff.delay();
                state.retry_at = Instant::now() + delay;

                info!(
                    pending = state.pending.len(),
                    ?delay,
                    "Bridge disconnected, reconnecting"
                );
            }
        }
    }

    /// Filters a page event and relays accepted requests.
    ///
    /// Accepts same-window messages carrying the request tag and relays
    /// their `message` unchanged. Under [`PendingPolicy::ById`] the message
    /// also needs a string `id` to be matched against its response; without
    /// one it is dropped.
    ///
    /// [`PendingPolicy::ById`]: super::PendingPolicy::ById
    fn on_page_event(&self, state: &mut RelayState, event: PageEvent) {
        if event.source != EventSource::SameWindow {
            trace!("Ignoring message from another window");
            return;
        }

        let Some(envelope) = PageMessage::unwrap_tagged(event.data, &self.config.request_tag)
        else {
            return;
        };

        let request_id = RequestId::from_envelope(&envelope);
        if !state.pending.record(envelope.clone()) {
            debug!("Ignoring page request without a string id");
            return;
        }

        debug!(request_id = ?request_id, "Relaying request to hub");

        if let Err(e) = self.slot.post(envelope) {
            debug!(request_id = ?request_id, error = %e, "No live channel, request kept for replay");
        }
    }
}

// ============================================================================
// RelayState
// ============================================================================

/// Mutable state owned by the run loop.
struct RelayState {
    pending: PendingRequests,
    backoff: Backoff,
    /// Event stream of the live channel.
    link: Option<PortEvents>,
    /// Whether the live channel has delivered anything yet.
    carried_message: bool,
    /// When to attempt the next connect while disconnected.
    retry_at: Instant,
    marker_inserted: bool,
}

/// Waits on the live channel, or forever if there is none.
async fn next_port_event(link: &mut Option<PortEvents>) -> PortEvent {
    match link {
        Some(events) => events.next().await,
        None => future::pending().await,
    }
}

// ============================================================================
// BridgeHandle
// ============================================================================

/// Control handle for a spawned [`ContentBridge`].
///
/// Dropping the handle leaves the bridge running until its page event
/// stream ends.
#[derive(Debug)]
pub struct BridgeHandle {
    shutdown: watch::Sender<bool>,
    slot: Arc<ConnectionSlot>,
    task: JoinHandle<()>,
}

impl BridgeHandle {
    /// Stops the bridge, cancelling any pending reconnect.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Returns the live channel, if any.
    #[inline]
    #[must_use]
    pub fn current_port(&self) -> Option<Port> {
        self.slot.current()
    }

    /// Returns `true` while a channel to the hub is live.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.slot.is_connected()
    }

    /// Returns `true` once the run loop has exited.
    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the run loop to exit.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            error!(error = %e, "Bridge task failed");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
