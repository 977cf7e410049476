//! The single live channel held by the hub and by the bridge.
//!
//! Lifecycle: empty → `replace` (active) → `clear`/`clear_if` (torn down) →
//! `replace` again. Posting happens under the slot lock, so a post can never
//! land on a port that has already been superseded.

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::PortId;

use super::Port;

// ============================================================================
// ConnectionSlot
// ============================================================================

/// Holds at most one live [`Port`].
#[derive(Debug, Default)]
pub struct ConnectionSlot {
    current: Mutex<Option<Port>>,
}

impl ConnectionSlot {
    /// Creates an empty slot.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the live port, if any.
    #[must_use]
    pub fn current(&self) -> Option<Port> {
        self.current
            .lock()
            .as_ref()
            .filter(|port| port.is_connected())
            .cloned()
    }

    /// Returns `true` if a live port is held.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.current().is_some()
    }

    /// Makes `port` the live port, returning the one it supersedes.
    pub fn replace(&self, port: Port) -> Option<Port> {
        let new_id = port.id();
        let previous = self.current.lock().replace(port);

        if let Some(previous) = &previous
            && previous.id() != new_id
        {
            debug!(old = %previous.id(), new = %new_id, "Live port superseded");
        }

        previous
    }

    /// Empties the slot only if `id` is still the live port.
    ///
    /// Returns `true` if the slot was cleared.
    pub fn clear_if(&self, id: PortId) -> bool {
        let mut current = self.current.lock();
        if current.as_ref().is_some_and(|port| port.id() == id) {
            *current = None;
            true
        } else {
            false
        }
    }

    /// Empties the slot unconditionally.
    pub fn clear(&self) -> Option<Port> {
        self.current.lock().take()
    }

    /// Posts `message` on the live port.
    ///
    /// # Errors
    ///
    /// - [`Error::NoChannel`] if the slot is empty
    /// - [`Error::PortDisconnected`] if the held port has gone away
    pub fn post(&self, message: Value) -> Result<PortId> {
        let current = self.current.lock();
        let port = current.as_ref().ok_or(Error::NoChannel)?;
        port.post_message(message)?;
        Ok(port.id())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::channel::{PortEvent, pair};

    #[test]
    fn test_empty_slot_rejects_post() {
        let slot = ConnectionSlot::new();
        assert!(slot.current().is_none());
        assert!(matches!(slot.post(json!({})), Err(Error::NoChannel)));
    }

    #[tokio::test]
    async fn test_replace_supersedes_previous() {
        let slot = ConnectionSlot::new();
        let ((first, _first_events), (_first_peer, mut first_peer_events)) = pair();
        let ((second, _second_events), (_second_peer, mut second_peer_events)) = pair();

        assert!(slot.replace(first.clone()).is_none());
        let previous = slot.replace(second.clone()).expect("previous port");
        assert_eq!(previous.id(), first.id());

        slot.post(json!("hello")).expect("post");
        assert_eq!(
            second_peer_events.next().await,
            PortEvent::Message(json!("hello"))
        );

        first.disconnect();
        assert_eq!(first_peer_events.next().await, PortEvent::Disconnect);
    }

    #[test]
    fn test_clear_if_ignores_stale_id() {
        let slot = ConnectionSlot::new();
        let ((first, _a), _b) = pair();
        let ((second, _c), _d) = pair();

        slot.replace(first.clone());
        slot.replace(second.clone());

        assert!(!slot.clear_if(first.id()));
        assert!(slot.is_connected());
        assert!(slot.clear_if(second.id()));
        assert!(!slot.is_connected());
    }

    #[test]
    fn test_current_hides_dead_port() {
        let slot = ConnectionSlot::new();
        let ((port, _events), _peer) = pair();

        slot.replace(port.clone());
        port.disconnect();

        assert!(slot.current().is_none());
        assert!(slot.post(json!(1)).is_err());
    }
}
