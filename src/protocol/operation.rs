//! Typed operations.
//!
//! An [`Operation`] ties an operation name to its payload and result types,
//! so handlers registered through
//! [`Hub::register_operation`](crate::hub::Hub::register_operation) work with
//! concrete types instead of raw JSON.
//!
//! # Example
//!
//! ```ignore
//! struct Lookup;
//!
//! impl Operation for Lookup {
//!     const NAME: &'static str = "lookup";
//!     type Payload = LookupParams;
//!     type Output = Citizen;
//! }
//!
//! hub.register_operation::<Lookup, _, _>(|params| async move { fetch(params).await });
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

// ============================================================================
// Operation
// ============================================================================

/// A named operation exposed by the hub.
pub trait Operation: Send + Sync + 'static {
    /// Wire name, matched against the request envelope's `type`.
    const NAME: &'static str;

    /// Request payload.
    type Payload: DeserializeOwned + Send + 'static;

    /// Successful result.
    type Output: Serialize + Send + 'static;
}

// ============================================================================
// Built-in Operations
// ============================================================================

/// Returns its payload unchanged.
#[derive(Debug, Clone, Copy)]
pub struct Echo;

impl Operation for Echo {
    const NAME: &'static str = "echo";
    type Payload = Value;
    type Output = Value;
}

/// Reports the hub's crate version.
#[derive(Debug, Clone, Copy)]
pub struct Version;

impl Operation for Version {
    const NAME: &'static str = "version";
    type Payload = Value;
    type Output = String;
}
