//! JSON-lines page.
//!
//! Each input line is the `data` of one window message from the page
//! itself. Each message the bridge posts is written as one line of
//! [`PostedMessage`] JSON.

// ============================================================================
// Imports
// ============================================================================

use std::io::Write;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::protocol::PageMessage;

use super::{Marker, PageEvent, PageEvents, PageSurface, PostedMessage};

// ============================================================================
// LinePage
// ============================================================================

/// A page whose outbound messages are JSON lines on a writer.
#[derive(Debug)]
pub struct LinePage<W> {
    writer: Mutex<W>,
}

impl<W: Write> LinePage<W> {
    /// Creates a page writing to `writer`.
    #[inline]
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Consumes the page, returning the writer.
    #[inline]
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send + 'static> PageSurface for LinePage<W> {
    fn post_message(&self, message: PageMessage, target_origin: &str) {
        let posted = PostedMessage {
            target_origin: target_origin.to_string(),
            data: message.into_value(),
        };

        let line = match serde_json::to_string(&posted) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to serialize page message");
                return;
            }
        };

        let mut writer = self.writer.lock();
        if let Err(e) = writeln!(writer, "{line}").and_then(|()| writer.flush()) {
            warn!(error = %e, "Failed to write page message");
        }
    }

    fn insert_marker(&self, marker: &Marker) {
        info!(%marker, "Marker inserted");
    }
}

// ============================================================================
// Input
// ============================================================================

/// Spawns a reader turning JSON lines into same-window [`PageEvent`]s.
///
/// Blank lines are skipped and lines that are not JSON are logged and
/// dropped. The stream ends at EOF or on a read error.
pub fn read_events<R>(reader: R) -> PageEvents
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut lines = reader.lines();

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Page input failed");
                    break;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<Value>(&line) {
                Ok(data) => {
                    if tx.send(PageEvent::same_window(data)).is_err() {
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "Dropping non-JSON page input"),
            }
        }

        debug!("Page input closed");
    });

    rx
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::page::EventSource;

    #[test]
    fn test_post_writes_one_line() {
        let page = LinePage::new(Vec::new());
        page.post_message(
            PageMessage::response(json!({ "requestId": "1", "value": "1" })),
            "https://example.org",
        );

        let output = String::from_utf8(page.into_inner()).expect("utf8");
        assert!(output.ends_with('\n'));
        assert_eq!(output.lines().count(), 1);

        let posted: PostedMessage = serde_json::from_str(output.trim()).expect("json");
        assert_eq!(posted.target_origin, "https://example.org");
        assert_eq!(posted.data["type"], "frcnIntegrationResponse");
    }

    #[tokio::test]
    async fn test_read_events_skips_garbage() {
        let input = b"{\"type\":\"frcnIntegrationRequest\",\"message\":{\"id\":\"1\"}}\n\nnot json\n42\n";
        let mut events = read_events(&input[..]);

        let first = events.recv().await.expect("first event");
        assert_eq!(first.source, EventSource::SameWindow);
        assert_eq!(first.data["message"]["id"], "1");

        let second = events.recv().await.expect("second event");
        assert_eq!(second.data, json!(42));

        assert!(events.recv().await.is_none());
    }
}
