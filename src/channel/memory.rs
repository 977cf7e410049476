//! In-process Host Channel runtime.
//!
//! Both contexts live in one process and talk over [`pair`](super::pair)
//! links. Used by the tests and benchmarks, and by embedders that run the
//! hub and the bridge side by side.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{Error, Result};

use super::{Acceptor, Connected, Connector, pair};

// ============================================================================
// Runtime
// ============================================================================

/// Creates a connected connector/acceptor pair.
#[must_use]
pub fn runtime() -> (MemoryConnector, MemoryAcceptor) {
    let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();

    let connector = MemoryConnector {
        incoming: incoming_tx,
        refusing: Arc::new(AtomicBool::new(false)),
        attempts: Arc::new(AtomicUsize::new(0)),
    };

    (connector, MemoryAcceptor { incoming: incoming_rx })
}

// ============================================================================
// MemoryConnector
// ============================================================================

/// Bridge-side `connect()` for the in-process runtime.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    incoming: mpsc::UnboundedSender<Connected>,
    refusing: Arc<AtomicBool>,
    attempts: Arc<AtomicUsize>,
}

impl MemoryConnector {
    /// Makes subsequent connects fail with [`Error::ConnectionRefused`].
    pub fn refuse_connections(&self, refuse: bool) {
        self.refusing.store(refuse, Ordering::SeqCst);
    }

    /// Returns how many times `connect` has been called.
    #[inline]
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Connector for MemoryConnector {
    async fn connect(&self) -> Result<Connected> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if self.refusing.load(Ordering::SeqCst) {
            return Err(Error::ConnectionRefused);
        }

        let (local, remote) = pair();
        self.incoming
            .send(remote)
            .map_err(|_| Error::ConnectionRefused)?;

        debug!(port_id = %local.0.id(), "In-memory connection opened");
        Ok(local)
    }
}

// ============================================================================
// MemoryAcceptor
// ============================================================================

/// Hub-side `onIncomingConnection` for the in-process runtime.
#[derive(Debug)]
pub struct MemoryAcceptor {
    incoming: mpsc::UnboundedReceiver<Connected>,
}

impl Acceptor for MemoryAcceptor {
    async fn accept(&mut self) -> Option<Connected> {
        self.incoming.recv().await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::channel::PortEvent;

    #[tokio::test]
    async fn test_connect_reaches_acceptor() {
        let (connector, mut acceptor) = runtime();

        let (port, _events) = connector.connect().await.expect("connect");
        let (hub_port, mut hub_events) = acceptor.accept().await.expect("accept");

        assert_eq!(port.id(), hub_port.id());
        port.post_message(json!({ "id": "1" })).expect("post");
        assert_eq!(
            hub_events.next().await,
            PortEvent::Message(json!({ "id": "1" }))
        );
    }

    #[tokio::test]
    async fn test_refused_connect() {
        let (connector, _acceptor) = runtime();
        connector.refuse_connections(true);

        let err = connector.connect().await.unwrap_err();
        assert!(matches!(err, Error::ConnectionRefused));
        assert_eq!(connector.attempts(), 1);

        connector.refuse_connections(false);
        assert!(connector.connect().await.is_ok());
        assert_eq!(connector.attempts(), 2);
    }

    #[tokio::test]
    async fn test_connect_fails_without_acceptor() {
        let (connector, acceptor) = runtime();
        drop(acceptor);

        assert!(connector.connect().await.is_err());
    }
}
