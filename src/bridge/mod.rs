//! Content bridge.
//!
//! Lives next to the hosted page: keeps one channel to the hub open,
//! relays tagged page requests onto it and posts every channel message
//! back to the page, scoped to the configured target origin.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `config` | `BridgeConfig`, `PendingPolicy`, `ReconnectPolicy` |
//! | `builder` | Validating `BridgeBuilder` |
//! | `pending` | Replay buffer |
//! | `backoff` | Reconnect delay |
//! | `core` | `ContentBridge` run loop and `BridgeHandle` |

// ============================================================================
// Submodules
// ============================================================================

/// Reconnect delay.
pub mod backoff;

/// Validating builder.
pub mod builder;

/// Bridge settings.
pub mod config;

/// Run loop and handle.
pub mod core;

/// Replay buffer.
pub mod pending;

// ============================================================================
// Re-exports
// ============================================================================

pub use backoff::Backoff;
pub use builder::BridgeBuilder;
pub use config::{BridgeConfig, PendingPolicy, ReconnectPolicy};
pub use core::{BridgeHandle, ContentBridge};
pub use pending::PendingRequests;
