//! FRCN bridge - cross-context request/response relay.
//!
//! Lets an untrusted page get the results of privileged operations without
//! ever holding credentials, by relaying its requests through two isolated
//! contexts joined by one persistent channel.
//!
//! # Architecture
//!
//! ```text
//! Page ──window message──► Content Bridge ──channel──► Background Hub
//!  ▲                             │                          │
//!  └──────window message─────────┴◄─────────channel─────────┘
//! ```
//!
//! - **Background Hub**: registry of named operations; answers every
//!   request with exactly one response envelope
//! - **Content Bridge**: owns the channel lifecycle, relays page requests,
//!   replays unanswered ones after a reconnect
//! - **Host Channel**: ordered message link, in-process or over WebSocket
//!
//! # Quick Start
//!
//! ```no_run
//! use frcn_bridge::channel::memory;
//! use frcn_bridge::page::{self, PageEvent};
//! use frcn_bridge::{ContentBridge, Hub, Result};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let hub = Hub::new();
//!     hub.register("echo", |payload| async move { Ok(payload) });
//!
//!     let (connector, acceptor) = memory::runtime();
//!     tokio::spawn({
//!         let hub = hub.clone();
//!         async move { hub.serve(acceptor).await }
//!     });
//!
//!     let (window, page_tx, page_events, mut posted) = page::window();
//!     let _bridge = ContentBridge::builder()
//!         .target_origin("https://frcn.example")
//!         .build(connector, window)?
//!         .spawn(page_events);
//!
//!     let _ = page_tx.send(PageEvent::request(json!({
//!         "id": "1", "type": "echo", "message": { "a": 1 }
//!     })));
//!     println!("{:?}", posted.recv().await);
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bridge`] | Content bridge, configuration and replay buffer |
//! | [`channel`] | Host Channel ports and runtimes |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`hub`] | Background hub and handler registry |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`page`] | Page messaging surface |
//! | [`protocol`] | Wire envelopes and typed operations |

// ============================================================================
// Modules
// ============================================================================

/// Content bridge.
///
/// Use [`ContentBridge::builder()`] to configure and start one.
pub mod bridge;

/// Host Channel.
///
/// Ports, the live-channel slot, and the in-memory and WebSocket runtimes.
pub mod channel;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Background hub.
pub mod hub;

/// Type-safe identifiers.
pub mod identifiers;

/// Page messaging surface.
pub mod page;

/// Wire protocol message types.
pub mod protocol;

// ============================================================================
// Re-exports
// ============================================================================

// Bridge types
pub use bridge::{BridgeBuilder, BridgeConfig, BridgeHandle, ContentBridge, PendingPolicy};

// Channel types
pub use channel::{Acceptor, ConnectionSlot, Connector, Port, PortEvent, PortEvents};

// Error types
pub use error::{Error, Result};

// Hub types
pub use hub::{Hub, Request};

// Identifier types
pub use identifiers::{PortId, RequestId};

// Protocol types
pub use protocol::{Operation, PageMessage, RequestEnvelope, ResponseEnvelope};
