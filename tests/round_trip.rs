//! Page → bridge → hub → bridge → page, end to end.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_test::{assert_err, assert_ok};

use frcn_bridge::bridge::{BridgeHandle, ContentBridge, PendingPolicy};
use frcn_bridge::channel::memory;
use frcn_bridge::channel::{Acceptor, Connector, PortServer, WsConnector};
use frcn_bridge::hub::Hub;
use frcn_bridge::page::{self, PageEvent, PageEventSender, PostedMessage, Window};
use frcn_bridge::{Error, Port, PortEvent, PortEvents, ResponseEnvelope};

const ORIGIN: &str = "https://frcn.example";
const WAIT: Duration = Duration::from_secs(5);

// ============================================================================
// Helpers
// ============================================================================

fn echo_hub() -> Hub {
    let hub = Hub::new();
    hub.register("echo", |payload| async move { Ok(payload) });
    hub.register("spectrumRequest", |_payload| async {
        Err::<Value, _>(Error::handler("Not logged in to robertsspaceindustries.com"))
    });
    hub
}

struct Page {
    window: Window,
    tx: PageEventSender,
    posted: mpsc::UnboundedReceiver<PostedMessage>,
}

impl Page {
    fn request(&self, id: &str, operation: &str, message: Value) {
        assert_ok!(self.tx.send(PageEvent::request(json!({
            "id": id,
            "type": operation,
            "message": message,
        }))));
    }

    async fn response(&mut self) -> Value {
        let posted = timeout(WAIT, self.posted.recv())
            .await
            .expect("response timed out")
            .expect("page closed");
        assert_eq!(posted.target_origin, ORIGIN);
        assert_eq!(posted.data["type"], "frcnIntegrationResponse");
        posted.data["message"].clone()
    }
}

fn start_bridge<C: Connector>(connector: C, policy: PendingPolicy) -> (BridgeHandle, Page) {
    let (window, tx, page_events, posted) = page::window();
    let handle = ContentBridge::builder()
        .target_origin(ORIGIN)
        .pending_policy(policy)
        .reconnect_backoff(Duration::from_millis(10), Duration::from_millis(50))
        .build(connector, window.clone())
        .expect("valid bridge config")
        .spawn(page_events);

    (handle, Page { window, tx, posted })
}

fn serve<A: Acceptor>(hub: &Hub, acceptor: A) {
    let hub = hub.clone();
    tokio::spawn(async move { hub.serve(acceptor).await });
}

async fn accept<A: Acceptor>(acceptor: &mut A) -> (Port, PortEvents) {
    timeout(WAIT, acceptor.accept())
        .await
        .expect("accept timed out")
        .expect("connection")
}

async fn next_message(events: &mut PortEvents) -> Value {
    match timeout(WAIT, events.next()).await {
        Ok(PortEvent::Message(message)) => message,
        other => panic!("expected message, got {other:?}"),
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    let reached = timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert_ok!(reached);
}

// ============================================================================
// In-memory runtime
// ============================================================================

#[tokio::test]
async fn test_example_scenario_in_memory() {
    let hub = echo_hub();
    let (connector, acceptor) = memory::runtime();
    serve(&hub, acceptor);
    let (handle, mut page) = start_bridge(connector, PendingPolicy::ById);

    page.request("1", "echo", json!({ "a": 1 }));
    let response = page.response().await;
    assert_eq!(response, json!({ "requestId": "1", "value": "{\"a\":1}" }));

    let envelope: ResponseEnvelope = serde_json::from_value(response).expect("envelope");
    let value: Value = envelope.decode_value().expect("value");
    assert_eq!(value, json!({ "a": 1 }));

    page.request("2", "nope", json!({}));
    assert_eq!(
        page.response().await,
        json!({ "requestId": "2", "error": { "message": "Unknown request type" } })
    );

    assert_eq!(
        page.window.marker("frcn-integration-version").as_deref(),
        Some(env!("CARGO_PKG_VERSION"))
    );

    handle.shutdown();
    timeout(WAIT, handle.join()).await.expect("bridge stopped");
}

#[tokio::test]
async fn test_handler_failure_reaches_page() {
    let hub = echo_hub();
    let (connector, acceptor) = memory::runtime();
    serve(&hub, acceptor);
    let (_handle, mut page) = start_bridge(connector, PendingPolicy::ById);

    page.request("9", "spectrumRequest", json!({ "method": "GET", "path": "/x" }));
    assert_eq!(
        page.response().await,
        json!({
            "requestId": "9",
            "error": { "message": "Not logged in to robertsspaceindustries.com" }
        })
    );
}

#[tokio::test]
async fn test_unanswered_request_replayed_after_hub_drops_channel() {
    let hub = Hub::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let (release_tx, release_rx) = tokio::sync::watch::channel(false);

    // Holds its answer until released, so the request is still in flight
    // when the channel goes away.
    hub.register("echo", {
        let calls = Arc::clone(&calls);
        move |payload| {
            calls.fetch_add(1, Ordering::SeqCst);
            let mut release = release_rx.clone();
            async move {
                let _ = release.wait_for(|go| *go).await;
                Ok(payload)
            }
        }
    });

    let (connector, acceptor) = memory::runtime();
    serve(&hub, acceptor);
    let (handle, mut page) = start_bridge(connector, PendingPolicy::Latest);

    page.request("3", "echo", json!({ "b": 2 }));
    wait_until(|| calls.load(Ordering::SeqCst) == 1).await;

    let port = hub.current_port().expect("hub connected");
    port.disconnect();

    // Only the bridge resending id 3 can make the handler run again.
    wait_until(|| calls.load(Ordering::SeqCst) == 2).await;
    assert!(hub.current_port().is_some_and(|current| current.id() != port.id()));

    release_tx.send_replace(true);
    let response = page.response().await;
    assert_eq!(response, json!({ "requestId": "3", "value": "{\"b\":2}" }));

    handle.shutdown();
}

#[tokio::test]
async fn test_replay_is_verbatim_and_precedes_newer_requests() {
    let (connector, mut acceptor) = memory::runtime();
    let (handle, page) = start_bridge(connector, PendingPolicy::Latest);

    let (hub_port, mut hub_events) = accept(&mut acceptor).await;
    page.request("3", "echo", json!({ "b": 2 }));
    let original = next_message(&mut hub_events).await;
    hub_port.disconnect();

    let (_new_port, mut new_events) = accept(&mut acceptor).await;
    page.request("4", "echo", json!({}));

    let replayed = next_message(&mut new_events).await;
    assert_eq!(
        assert_ok!(serde_json::to_string(&replayed)),
        assert_ok!(serde_json::to_string(&original))
    );
    assert_eq!(next_message(&mut new_events).await["id"], "4");

    handle.shutdown();
}

#[tokio::test]
async fn test_default_bridge_replays_nothing_after_any_response() {
    let (connector, mut acceptor) = memory::runtime();
    let (window, tx, page_events, posted) = page::window();
    let handle = ContentBridge::builder()
        .target_origin(ORIGIN)
        .reconnect_backoff(Duration::from_millis(10), Duration::from_millis(50))
        .build(connector, window.clone())
        .expect("valid bridge config")
        .spawn(page_events);
    let mut page = Page { window, tx, posted };

    let (hub_port, mut hub_events) = accept(&mut acceptor).await;
    page.request("5", "echo", json!({}));
    assert_eq!(next_message(&mut hub_events).await["id"], "5");

    // A response for another id still empties the slot.
    assert_ok!(hub_port.post_message(json!({ "requestId": "other", "value": "1" })));
    assert_eq!(page.response().await["requestId"], "other");
    hub_port.disconnect();

    let (_new_port, mut new_events) = accept(&mut acceptor).await;
    let quiet = timeout(Duration::from_millis(200), new_events.next()).await;
    assert_err!(quiet);

    page.request("6", "echo", json!({}));
    assert_eq!(next_message(&mut new_events).await["id"], "6");

    handle.shutdown();
}

// ============================================================================
// WebSocket runtime
// ============================================================================

#[tokio::test]
async fn test_example_scenario_over_websocket() {
    let hub = echo_hub();
    let server = PortServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
        .await
        .expect("bind");
    let connector = WsConnector::new(&server.ws_url()).expect("connector");
    serve(&hub, server);

    let (handle, mut page) = start_bridge(connector, PendingPolicy::ById);

    page.request("1", "echo", json!({ "a": 1 }));
    assert_eq!(
        page.response().await,
        json!({ "requestId": "1", "value": "{\"a\":1}" })
    );

    page.request("2", "nope", json!({}));
    assert_eq!(
        page.response().await,
        json!({ "requestId": "2", "error": { "message": "Unknown request type" } })
    );

    handle.shutdown();
    timeout(WAIT, handle.join()).await.expect("bridge stopped");
}

#[tokio::test]
async fn test_bridge_survives_hub_restart_over_websocket() {
    let server = PortServer::bind(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
        .await
        .expect("bind");
    let addr = server.local_addr();
    let connector = WsConnector::new(&server.ws_url()).expect("connector");

    // First hub accepts once and then disappears with its listener.
    let first = tokio::spawn(async move {
        let mut server = server;
        let (port, mut events) = server.accept_connection().await.expect("accept");
        drop(server);
        let _ = events.next().await; // the request
        port.disconnect();
    });

    let (_handle, mut page) = start_bridge(connector, PendingPolicy::ById);
    page.request("7", "echo", json!("again"));
    timeout(WAIT, first).await.expect("first hub").expect("task");

    // Second hub on the same address answers the replayed request.
    let hub = echo_hub();
    let second = timeout(WAIT, async {
        loop {
            match PortServer::bind_addr(addr).await {
                Ok(server) => break server,
                Err(_) => tokio::time::sleep(Duration::from_millis(10)).await,
            }
        }
    })
    .await
    .expect("rebind");
    serve(&hub, second);

    assert_eq!(
        page.response().await,
        json!({ "requestId": "7", "value": "\"again\"" })
    );
}

#[tokio::test]
async fn test_wildcard_origin_never_builds() {
    let (connector, _acceptor) = memory::runtime();
    let (window, _tx, _events, _posted) = page::window();

    let result = ContentBridge::builder()
        .target_origin("*")
        .build(connector, window);
    let err = assert_err!(result);
    assert!(matches!(err, Error::Config { .. }));
}
