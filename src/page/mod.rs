//! Page messaging surface.
//!
//! The bridge talks to the hosted page through window messages: inbound
//! [`PageEvent`]s and outbound [`PageMessage`]s posted to one target
//! origin. It also announces itself once with a [`Marker`].
//!
//! [`Window`] is the in-process page used by tests and embedders;
//! [`stdio`] is the line-oriented page used by the `relay` binary.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::trace;

use crate::protocol::PageMessage;

// ============================================================================
// Submodules
// ============================================================================

/// JSON-lines page over arbitrary byte streams.
pub mod stdio;

// ============================================================================
// Constants
// ============================================================================

/// Name of the metadata tag announcing the bridge.
pub const MARKER_NAME: &str = "frcn-integration-version";

// ============================================================================
// Types
// ============================================================================

/// Stream of inbound page events consumed by the bridge.
pub type PageEvents = mpsc::UnboundedReceiver<PageEvent>;

/// Sending side of [`PageEvents`].
pub type PageEventSender = mpsc::UnboundedSender<PageEvent>;

// ============================================================================
// EventSource
// ============================================================================

/// Where a window message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EventSource {
    /// The hosted page's own window.
    #[default]
    SameWindow,
    /// Another frame or window.
    Other,
}

// ============================================================================
// PageEvent
// ============================================================================

/// A message event observed on the page's window.
#[derive(Debug, Clone, PartialEq)]
pub struct PageEvent {
    /// Origin window of the event.
    pub source: EventSource,
    /// The posted data, unvalidated.
    pub data: Value,
}

impl PageEvent {
    /// Creates a page event.
    #[inline]
    #[must_use]
    pub fn new(source: EventSource, data: Value) -> Self {
        Self { source, data }
    }

    /// An event posted by the page itself.
    #[inline]
    #[must_use]
    pub fn same_window(data: Value) -> Self {
        Self::new(EventSource::SameWindow, data)
    }

    /// An event posted by some other frame.
    #[inline]
    #[must_use]
    pub fn other(data: Value) -> Self {
        Self::new(EventSource::Other, data)
    }

    /// The page issuing a request envelope with the default request tag.
    #[must_use]
    pub fn request(envelope: Value) -> Self {
        Self::same_window(PageMessage::request(envelope).into_value())
    }
}

// ============================================================================
// PostedMessage
// ============================================================================

/// A message the bridge posted to the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostedMessage {
    /// Origin the message was scoped to.
    pub target_origin: String,
    /// The posted data.
    pub data: Value,
}

// ============================================================================
// Marker
// ============================================================================

/// Discoverable tag announcing bridge presence and version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    /// Tag name.
    pub name: String,
    /// Version string.
    pub content: String,
}

impl Marker {
    /// Creates a marker.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<meta name=\"{}\" content=\"{}\">", self.name, self.content)
    }
}

// ============================================================================
// PageSurface
// ============================================================================

/// What the bridge needs from the hosted page.
pub trait PageSurface: Send + Sync + 'static {
    /// Posts `message` to the page, visible only to `target_origin`.
    fn post_message(&self, message: PageMessage, target_origin: &str);

    /// Attaches the presence marker to the page.
    fn insert_marker(&self, marker: &Marker);
}

// ============================================================================
// Window
// ============================================================================

/// In-process page.
///
/// Posted messages are forwarded to the receiver returned by [`window`];
/// markers are kept for inspection. Clones share state.
#[derive(Debug, Clone)]
pub struct Window {
    inner: Arc<WindowInner>,
}

#[derive(Debug)]
struct WindowInner {
    posted: mpsc::UnboundedSender<PostedMessage>,
    markers: Mutex<Vec<Marker>>,
}

/// Creates an in-process page.
///
/// Returns the window, the sender the page uses to emit events toward the
/// bridge, the bridge-side event stream, and the stream of messages the
/// bridge posts back.
#[must_use]
pub fn window() -> (
    Window,
    PageEventSender,
    PageEvents,
    mpsc::UnboundedReceiver<PostedMessage>,
) {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (posted_tx, posted_rx) = mpsc::unbounded_channel();

    let window = Window {
        inner: Arc::new(WindowInner {
            posted: posted_tx,
            markers: Mutex::new(Vec::new()),
        }),
    };

    (window, event_tx, event_rx, posted_rx)
}

impl Window {
    /// Markers inserted so far, in order.
    #[must_use]
    pub fn markers(&self) -> Vec<Marker> {
        self.inner.markers.lock().clone()
    }

    /// Returns the content of the marker named `name`, if present.
    #[must_use]
    pub fn marker(&self, name: &str) -> Option<String> {
        self.inner
            .markers
            .lock()
            .iter()
            .find(|marker| marker.name == name)
            .map(|marker| marker.content.clone())
    }
}

impl PageSurface for Window {
    fn post_message(&self, message: PageMessage, target_origin: &str) {
        let posted = PostedMessage {
            target_origin: target_origin.to_string(),
            data: message.into_value(),
        };
        if self.inner.posted.send(posted).is_err() {
            trace!("Page closed, dropping posted message");
        }
    }

    fn insert_marker(&self, marker: &Marker) {
        self.inner.markers.lock().push(marker.clone());
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::protocol::REQUEST_TAG;

    #[test]
    fn test_request_event_is_tagged() {
        let event = PageEvent::request(json!({ "id": "1", "type": "echo", "message": {} }));
        assert_eq!(event.source, EventSource::SameWindow);
        assert_eq!(event.data["type"], REQUEST_TAG);
        assert_eq!(event.data["message"]["id"], "1");
    }

    #[test]
    fn test_marker_display() {
        let marker = Marker::new(MARKER_NAME, "0.1.0");
        assert_eq!(
            marker.to_string(),
            "<meta name=\"frcn-integration-version\" content=\"0.1.0\">"
        );
    }

    #[tokio::test]
    async fn test_window_records_posts_and_markers() {
        let (window, _events_tx, _events, mut posted) = window();

        window.insert_marker(&Marker::new(MARKER_NAME, "1.2.3"));
        window.post_message(
            PageMessage::response(json!({ "requestId": "1", "value": "1" })),
            "https://example.org",
        );

        assert_eq!(window.marker(MARKER_NAME).as_deref(), Some("1.2.3"));
        assert_eq!(window.markers().len(), 1);

        let message = posted.recv().await.expect("posted message");
        assert_eq!(message.target_origin, "https://example.org");
        assert_eq!(message.data["message"]["requestId"], "1");
    }

    #[test]
    fn test_posted_message_wire_format() {
        let posted = PostedMessage {
            target_origin: "https://example.org".into(),
            data: json!({ "type": "frcnIntegrationResponse", "message": {} }),
        };
        assert_eq!(
            serde_json::to_value(&posted).expect("serialize"),
            json!({
                "targetOrigin": "https://example.org",
                "data": { "type": "frcnIntegrationResponse", "message": {} }
            })
        );
    }
}
