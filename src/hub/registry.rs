//! Operation handler registry.

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::Result;

use super::Request;

// ============================================================================
// Types
// ============================================================================

/// Future returned by a type-erased handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// Type-erased operation handler.
///
/// Receives the [`Request`] and answers through
/// [`Request::send`] / [`Request::fail`]. Returning `Err` answers with the
/// error's message if nothing was sent yet.
pub type Handler = Arc<dyn Fn(Request) -> HandlerFuture + Send + Sync>;

// ============================================================================
// HandlerRegistry
// ============================================================================

/// Maps operation names to handlers. Last registration wins.
#[derive(Default)]
pub(crate) struct HandlerRegistry {
    handlers: RwLock<FxHashMap<String, Handler>>,
}

impl HandlerRegistry {
    /// Stores `handler` under `name`, returning `true` if it replaced one.
    pub(crate) fn insert(&self, name: String, handler: Handler) -> bool {
        self.handlers.write().insert(name, handler).is_some()
    }

    /// Looks up the handler for `name`.
    pub(crate) fn get(&self, name: &str) -> Option<Handler> {
        self.handlers.read().get(name).cloned()
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.handlers.read().contains_key(name)
    }

    /// Registered operation names, sorted.
    pub(crate) fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }
}

// ============================================================================
// Tests
// ============================================================================
