//! Wire protocol message types.
//!
//! This module defines the messages exchanged between the page, the
//! content bridge and the background hub.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Purpose |
//! |---------|-----------|---------|
//! | `PageMessage` (request tag) | Page → Bridge | Wraps a request envelope |
//! | `RequestEnvelope` | Bridge → Hub | Operation request |
//! | `ResponseEnvelope` | Hub → Bridge | Success value or error |
//! | `PageMessage` (response tag) | Bridge → Page | Wraps a response envelope |
//!
//! There is no version field. Hub and bridge ship from the same release.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `envelope` | Request and response envelopes |
//! | `operation` | Typed operation trait and built-ins |
//! | `page` | Page-level tagged wrapper |

// ============================================================================
// Submodules
// ============================================================================

/// Request and response envelopes.
pub mod envelope;

/// Typed operation definitions.
pub mod operation;

/// Page-level tagged wrapper.
pub mod page;

// ============================================================================
// Re-exports
// ============================================================================

pub use envelope::{ErrorBody, RequestEnvelope, ResponseEnvelope};
pub use operation::{Echo, Operation, Version};
pub use page::{PageMessage, REQUEST_TAG, RESPONSE_TAG};
