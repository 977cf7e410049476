//! Host Channel port.
//!
//! A [`Port`] is one end of an ordered, bidirectional message link. The
//! sending half ([`Port`]) is cheap to clone; the receiving half
//! ([`PortEvents`]) has a single consumer.
//!
//! A link carries no delivery guarantee across a disconnect. Once either
//! end disconnects, posting fails on both ends and both event streams end
//! with [`PortEvent::Disconnect`].

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::identifiers::PortId;

// ============================================================================
// PortEvent
// ============================================================================

/// Something that happened on a port.
#[derive(Debug, Clone, PartialEq)]
pub enum PortEvent {
    /// A whole structured message from the other end.
    Message(Value),
    /// The link is gone. Terminal.
    Disconnect,
}

// ============================================================================
// Link
// ============================================================================

/// State shared by every handle on one end of a link.
#[derive(Debug)]
pub(crate) struct Link {
    id: PortId,
    connected: AtomicBool,
}

impl Link {
    pub(crate) fn new(id: PortId) -> Arc<Self> {
        Arc::new(Self {
            id,
            connected: AtomicBool::new(true),
        })
    }

    pub(crate) fn id(&self) -> PortId {
        self.id
    }

    /// Marks the link dead. Returns `true` if it was alive.
    pub(crate) fn close(&self) -> bool {
        self.connected.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

// ============================================================================
// Port
// ============================================================================

/// Sending half of a Host Channel end.
#[derive(Debug, Clone)]
pub struct Port {
    /// Shared link state.
    link: Arc<Link>,
    /// Queue toward the other end (or its transport writer).
    peer: mpsc::UnboundedSender<PortEvent>,
    /// Our own inbox, used to wake the local reader on disconnect.
    inbox: mpsc::WeakUnboundedSender<PortEvent>,
}

impl Port {
    pub(crate) fn new(
        link: Arc<Link>,
        peer: mpsc::UnboundedSender<PortEvent>,
        inbox: mpsc::WeakUnboundedSender<PortEvent>,
    ) -> Self {
        Self { link, peer, inbox }
    }

    /// Returns this link's id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> PortId {
        self.link.id
    }

    /// Returns `true` while the link is usable.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.link.is_connected() && !self.peer.is_closed()
    }

    /// Posts a message to the other end.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PortDisconnected`] if the link is gone.
    pub fn post_message(&self, message: Value) -> Result<()> {
        if !self.link.is_connected() {
            return Err(Error::port_disconnected(self.id()));
        }

        if self.peer.send(PortEvent::Message(message)).is_err() {
            self.link.close();
            return Err(Error::port_disconnected(self.id()));
        }

        trace!(port_id = %self.id(), "Message posted");
        Ok(())
    }

    /// Tears down the link from this side.
    ///
    /// Both ends observe [`PortEvent::Disconnect`]. Calling it again is a
    /// no-op.
    pub fn disconnect(&self) {
        if !self.link.close() {
            return;
        }

        let _ = self.peer.send(PortEvent::Disconnect);
        if let Some(inbox) = self.inbox.upgrade() {
            let _ = inbox.send(PortEvent::Disconnect);
        }

        debug!(port_id = %self.id(), "Port disconnected locally");
    }
}

// ============================================================================
// PortEvents
// ============================================================================

/// Receiving half of a Host Channel end.
#[derive(Debug)]
pub struct PortEvents {
    link: Arc<Link>,
    rx: mpsc::UnboundedReceiver<PortEvent>,
    finished: bool,
}

impl PortEvents {
    pub(crate) fn new(link: Arc<Link>, rx: mpsc::UnboundedReceiver<PortEvent>) -> Self {
        Self {
            link,
            rx,
            finished: false,
        }
    }

    /// Returns this link's id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> PortId {
        self.link.id
    }

    /// Waits for the next event.
    ///
    /// A peer that went away without disconnecting is reported as
    /// [`PortEvent::Disconnect`]. After the first `Disconnect` every call
    /// returns `Disconnect` immediately.
    pub async fn next(&mut self) -> PortEvent {
        if self.finished {
            return PortEvent::Disconnect;
        }

        match self.rx.recv().await {
            Some(PortEvent::Message(message)) => PortEvent::Message(message),
            Some(PortEvent::Disconnect) | None => {
                self.finished = true;
                self.link.close();
                self.rx.close();
                PortEvent::Disconnect
            }
        }
    }
}

// ============================================================================
// Pair
// ============================================================================

/// Creates two connected ends of one link.
///
/// Both ends share one [`PortId`].
#[must_use]
pub fn pair() -> ((Port, PortEvents), (Port, PortEvents)) {
    let id = PortId::generate();
    let (a_tx, a_rx) = mpsc::unbounded_channel();
    let (b_tx, b_rx) = mpsc::unbounded_channel();

    let a_link = Link::new(id);
    let b_link = Link::new(id);

    let a = (
        Port::new(Arc::clone(&a_link), b_tx.clone(), a_tx.downgrade()),
        PortEvents::new(a_link, a_rx),
    );
    let b = (
        Port::new(Arc::clone(&b_link), a_tx, b_tx.downgrade()),
        PortEvents::new(b_link, b_rx),
    );

    (a, b)
}

// ============================================================================
// Tests
// ============================================================================
