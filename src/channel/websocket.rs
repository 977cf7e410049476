//! WebSocket Host Channel runtime.
//!
//! Carries the channel between two processes: the hub binds a
//! [`PortServer`] on localhost, the bridge connects with a [`WsConnector`].
//! Each JSON message travels as one text frame.
//!
//! # Connection Flow
//!
//! 1. Hub binds `PortServer` (port 0 picks a random port)
//! 2. Bridge connects to `ws_url()`
//! 3. The hub upgrades each TCP connection on its own task, bounded by
//!    [`HANDSHAKE_TIMEOUT`], so a silent client never holds up the next one
//! 4. Both sides spawn a port event loop mapping frames to [`PortEvent`]s
//! 5. Close frame, socket error or EOF becomes [`PortEvent::Disconnect`]

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, from_str, to_string};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::PortId;

use super::port::Link;
use super::{Acceptor, Connected, Connector, Port, PortEvent, PortEvents};

// ============================================================================
// Constants
// ============================================================================

/// Time a TCP client gets to complete the WebSocket upgrade.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// PortServer
// ============================================================================

/// A completed upgrade waiting to be handed out by `accept`.
type Upgraded = (SocketAddr, WebSocketStream<TcpStream>);

/// Hub-side WebSocket listener.
///
/// # Example
///
/// ```ignore
/// let mut server = PortServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).await?;
/// println!("bridge should connect to {}", server.ws_url());
///
/// while let Some((port, events)) = server.accept().await {
///     hub.attach(port, events);
/// }
/// ```
pub struct PortServer {
    /// TCP listener for incoming connections.
    listener: TcpListener,
    /// Address the server is bound to.
    local_addr: SocketAddr,
    /// Deadline for each WebSocket upgrade.
    handshake_timeout: Duration,
    /// Sender cloned into every handshake task.
    upgraded_tx: mpsc::UnboundedSender<Upgraded>,
    /// Upgrades completed by handshake tasks.
    upgraded_rx: mpsc::UnboundedReceiver<Upgraded>,
}

impl PortServer {
    /// Binds a WebSocket server to the specified address and port.
    ///
    /// Use port 0 to let the OS assign a random available port.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn bind(ip: IpAddr, port: u16) -> Result<Self> {
        Self::bind_addr(SocketAddr::new(ip, port)).await
    }

    /// Binds a WebSocket server to a socket address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if binding fails.
    pub async fn bind_addr(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        let (upgraded_tx, upgraded_rx) = mpsc::unbounded_channel();

        debug!(%local_addr, "Port server bound");

        Ok(Self {
            listener,
            local_addr,
            handshake_timeout: HANDSHAKE_TIMEOUT,
            upgraded_tx,
            upgraded_rx,
        })
    }

    /// Sets the deadline for each WebSocket upgrade.
    #[inline]
    #[must_use]
    pub fn with_handshake_timeout(mut self, handshake_timeout: Duration) -> Self {
        self.handshake_timeout = handshake_timeout;
        self
    }

    /// Returns the port the server is bound to.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Returns the local socket address.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the WebSocket URL bridges should connect to.
    ///
    /// An unspecified bind address is reported as loopback.
    #[must_use]
    pub fn ws_url(&self) -> String {
        let ip = if self.local_addr.ip().is_unspecified() {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            self.local_addr.ip()
        };
        format!("ws://{}", SocketAddr::new(ip, self.port()))
    }

    /// Returns the next connection whose WebSocket upgrade completed.
    ///
    /// Upgrades run concurrently, each on its own task. Failed or timed
    /// out upgrades are logged and skipped. Returns `None` only if the
    /// listener itself fails.
    pub async fn accept_connection(&mut self) -> Option<Connected> {
        loop {
            tokio::select! {
                Some((addr, ws_stream)) = self.upgraded_rx.recv() => {
                    let connected = spawn_port(ws_stream);
                    info!(?addr, port_id = %connected.0.id(), "WebSocket channel established");
                    return Some(connected);
                }

                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            debug!(?addr, "TCP connection accepted");
                            self.spawn_handshake(stream, addr);
                        }
                        Err(e) => {
                            error!(error = %e, "Accept failed");
                            return None;
                        }
                    }
                }
            }
        }
    }

    /// Upgrades `stream` on a separate task.
    fn spawn_handshake(&self, stream: TcpStream, addr: SocketAddr) {
        let upgraded_tx = self.upgraded_tx.clone();
        let handshake_timeout = self.handshake_timeout;

        tokio::spawn(async move {
            match timeout(handshake_timeout, tokio_tungstenite::accept_async(stream)).await {
                Ok(Ok(ws_stream)) => {
                    if upgraded_tx.send((addr, ws_stream)).is_err() {
                        debug!(?addr, "Port server gone, dropping upgraded connection");
                    }
                }
                Ok(Err(e)) => {
                    warn!(error = %e, ?addr, "WebSocket upgrade failed");
                }
                Err(_) => {
                    warn!(
                        ?addr,
                        timeout_ms = handshake_timeout.as_millis() as u64,
                        "WebSocket upgrade timed out"
                    );
                }
            }
        });
    }
}

impl Acceptor for PortServer {
    async fn accept(&mut self) -> Option<Connected> {
        self.accept_connection().await
    }
}

// ============================================================================
// WsConnector
// ============================================================================

/// Bridge-side `connect()` over WebSocket.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: Url,
}

impl WsConnector {
    /// Creates a connector for `url`.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if `url` does not parse
    /// - [`Error::Config`] if the scheme is not `ws` or `wss`
    pub fn new(url: &str) -> Result<Self> {
        let url = Url::parse(url)?;
        match url.scheme() {
            "ws" | "wss" => Ok(Self { url }),
            other => Err(Error::config(format!(
                "hub URL must use ws:// or wss://, got {other}://"
            ))),
        }
    }

    /// Returns the hub URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl Connector for WsConnector {
    async fn connect(&self) -> Result<Connected> {
        let (ws_stream, _response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| Error::connection(format!("{}: {e}", self.url)))?;

        let connected = spawn_port(ws_stream);
        debug!(url = %self.url, port_id = %connected.0.id(), "Connected to hub");
        Ok(connected)
    }
}

// ============================================================================
// Port Event Loop
// ============================================================================

/// Wraps a WebSocket stream as a port and spawns its event loop.
fn spawn_port<S>(ws_stream: WebSocketStream<S>) -> Connected
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let link = Link::new(PortId::generate());
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();

    let port = Port::new(Arc::clone(&link), outbound_tx, inbox_tx.downgrade());
    let events = PortEvents::new(Arc::clone(&link), inbox_rx);

    tokio::spawn(run_port_loop(ws_stream, outbound_rx, inbox_tx, link));

    (port, events)
}

/// Event loop that handles WebSocket I/O for one port.
async fn run_port_loop<S>(
    ws_stream: WebSocketStream<S>,
    mut outbound_rx: mpsc::UnboundedReceiver<PortEvent>,
    inbox_tx: mpsc::UnboundedSender<PortEvent>,
    link: Arc<Link>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let port_id = link.id();
    let (mut ws_write, mut ws_read) = ws_stream.split();

    loop {
        tokio::select! {
            // Frames from the other process
            frame = ws_read.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        match from_str::<Value>(&text) {
                            Ok(message) => {
                                if inbox_tx.send(PortEvent::Message(message)).is_err() {
                                    debug!(%port_id, "Port events dropped, closing");
                                    let _ = ws_write.close().await;
                                    break;
                                }
                            }
                            Err(e) => warn!(%port_id, error = %e, "Dropping non-JSON frame"),
                        }
                    }

                    Some(Ok(Message::Close(_))) => {
                        debug!(%port_id, "WebSocket closed by remote");
                        break;
                    }

                    Some(Err(e)) => {
                        error!(%port_id, error = %e, "WebSocket error");
                        break;
                    }

                    None => {
                        debug!(%port_id, "WebSocket stream ended");
                        break;
                    }

                    // Ignore Binary, Ping, Pong
                    _ => {}
                }
            }

            // Messages posted on the local port
            outbound = outbound_rx.recv() => {
                match outbound {
                    Some(PortEvent::Message(message)) => {
                        let json = match to_string(&message) {
                            Ok(json) => json,
                            Err(e) => {
                                warn!(%port_id, error = %e, "Failed to serialize message");
                                continue;
                            }
                        };

                        if let Err(e) = ws_write.send(Message::Text(json.into())).await {
                            warn!(%port_id, error = %e, "Failed to send frame");
                            break;
                        }

                        trace!(%port_id, "Frame sent");
                    }

                    Some(PortEvent::Disconnect) | None => {
                        debug!(%port_id, "Local disconnect, closing WebSocket");
                        let _ = ws_write.close().await;
                        break;
                    }
                }
            }
        }
    }

    link.close();
    let _ = inbox_tx.send(PortEvent::Disconnect);

    debug!(%port_id, "Port event loop terminated");
}

// ============================================================================
// Tests
// ============================================================================
