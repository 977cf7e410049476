//! Host Channel layer.
//!
//! The ordered, bidirectional message link between the content bridge and
//! the background hub. Delivery is not guaranteed across a disconnect;
//! recovering from that is the bridge's job.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Content Bridge │                              │  Background Hub │
//! │                 │          Host Channel        │                 │
//! │  Connector      │─────────────────────────────►│  Acceptor       │
//! │  → Port         │◄────────────────────────────►│  → Port         │
//! │                 │   in-memory or WebSocket     │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `port` | `Port` / `PortEvents` link ends |
//! | `slot` | `ConnectionSlot`, the single live channel |
//! | `memory` | In-process runtime |
//! | `websocket` | WebSocket runtime |

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;

use crate::error::Result;

// ============================================================================
// Submodules
// ============================================================================

/// In-process runtime.
pub mod memory;

/// Link ends.
pub mod port;

/// The single live channel.
pub mod slot;

/// WebSocket runtime.
pub mod websocket;

// ============================================================================
// Re-exports
// ============================================================================

pub use memory::{MemoryAcceptor, MemoryConnector};
pub use port::{Port, PortEvent, PortEvents, pair};
pub use slot::ConnectionSlot;
pub use websocket::{PortServer, WsConnector};

// ============================================================================
// Types
// ============================================================================

/// A freshly established channel: sending half and event stream.
pub type Connected = (Port, PortEvents);

// ============================================================================
// Traits
// ============================================================================

/// Bridge-side ability to open a new channel to the hub.
pub trait Connector: Send + Sync + 'static {
    /// Opens a new channel instance.
    fn connect(&self) -> impl Future<Output = Result<Connected>> + Send;
}

/// Hub-side source of incoming channels.
pub trait Acceptor: Send + 'static {
    /// Waits for the next incoming channel.
    ///
    /// Returns `None` once no more connections can arrive.
    fn accept(&mut self) -> impl Future<Output = Option<Connected>> + Send;
}
