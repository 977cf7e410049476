//! Background hub.
//!
//! The privileged context: holds the registry of named operations, accepts
//! channels from the content bridge and answers every request on the live
//! channel with exactly one response envelope.
//!
//! # Example
//!
//! ```ignore
//! use frcn_bridge::{Error, Hub};
//!
//! let hub = Hub::new();
//! hub.register("spectrumRequest", |payload| async move {
//!     let session = current_session().ok_or_else(|| {
//!         Error::handler("Not logged in to robertsspaceindustries.com")
//!     })?;
//!     session.call(payload).await
//! });
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Hub state, registration and dispatch.
pub mod core;

/// Handler registry.
pub mod registry;

/// Handler-side request.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use core::{HANDLER_NO_RESPONSE, HANDLER_PANICKED, Hub};
pub use registry::{Handler, HandlerFuture};
pub use request::Request;
