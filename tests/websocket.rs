#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    reason = "Do not need additional syntax for setting up tests"
)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use chat_client_sdk::realtime::{Client, EventKind, RealtimeEvent};
use chat_client_sdk::ws::ConnectionState;
use chat_client_sdk::ws::config::Config;
use futures_util::{SinkExt as _, StreamExt as _};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;

const USER_ID: &str = "3f1c0b44-8a77-4a2b-9a8e-6a1a4f6f9d10";
const CONVERSATION_ID: &str = "c7d9e543-21aa-4b58-8f0e-1fcb5f0a7a31";

/// Mock WebSocket server for the realtime endpoint.
struct MockWsServer {
    addr: SocketAddr,
    /// Broadcast messages to ALL connected clients
    message_tx: broadcast::Sender<String>,
    /// Receives client frames (heartbeat pings filtered out)
    frame_rx: mpsc::UnboundedReceiver<String>,
    /// Receives heartbeat ping frames only
    ping_rx: mpsc::UnboundedReceiver<String>,
    /// Number of connections accepted so far
    accepted: Arc<AtomicUsize>,
    /// When set, connection tasks drop their streams
    disconnect_signal: Arc<AtomicBool>,
}

impl MockWsServer {
    /// Start a mock WebSocket server on a random port.
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (message_tx, _) = broadcast::channel::<String>(100);
        let (frame_tx, frame_rx) = mpsc::unbounded_channel::<String>();
        let (ping_tx, ping_rx) = mpsc::unbounded_channel::<String>();
        let accepted = Arc::new(AtomicUsize::new(0));
        let disconnect_signal = Arc::new(AtomicBool::new(false));

        let broadcast_tx = message_tx.clone();
        let accepted_counter = Arc::clone(&accepted);
        let disconnect = Arc::clone(&disconnect_signal);

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };

                let Ok(ws_stream) = tokio_tungstenite::accept_async(stream).await else {
                    continue;
                };
                accepted_counter.fetch_add(1, Ordering::SeqCst);

                let (mut write, mut read) = ws_stream.split();
                let frame_tx = frame_tx.clone();
                let ping_tx = ping_tx.clone();
                let mut msg_rx = broadcast_tx.subscribe();
                let disconnect = Arc::clone(&disconnect);

                tokio::spawn(async move {
                    loop {
                        if disconnect.load(Ordering::SeqCst) {
                            break;
                        }

                        tokio::select! {
                            msg = read.next() => {
                                match msg {
                                    Some(Ok(Message::Text(text))) => {
                                        if is_ping(&text) {
                                            drop(ping_tx.send(text.to_string()));
                                        } else {
                                            drop(frame_tx.send(text.to_string()));
                                        }
                                    }
                                    Some(Ok(_)) => {}
                                    _ => break,
                                }
                            }
                            msg = msg_rx.recv() => {
                                match msg {
                                    Ok(text) => {
                                        if write.send(Message::Text(text.into())).await.is_err() {
                                            break;
                                        }
                                    }
                                    Err(_) => break,
                                }
                            }
                            () = sleep(Duration::from_millis(25)) => {
                                if disconnect.load(Ordering::SeqCst) {
                                    break;
                                }
                            }
                        }
                    }
                });
            }
        });

        Self {
            addr,
            message_tx,
            frame_rx,
            ping_rx,
            accepted,
            disconnect_signal,
        }
    }

    fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Send a raw message to all connected clients.
    fn send(&self, message: &str) {
        drop(self.message_tx.send(message.to_owned()));
    }

    /// Receive the next non-ping frame sent by a client.
    async fn recv_frame(&mut self) -> Option<Value> {
        let text = timeout(Duration::from_secs(2), self.frame_rx.recv())
            .await
            .ok()
            .flatten()?;
        serde_json::from_str(&text).ok()
    }

    /// Receive the next heartbeat ping frame sent by a client.
    async fn recv_ping(&mut self) -> Option<Value> {
        let text = timeout(Duration::from_secs(2), self.ping_rx.recv())
            .await
            .ok()
            .flatten()?;
        serde_json::from_str(&text).ok()
    }

    fn connections(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Drop every live connection without a close handshake.
    fn disconnect_all(&self) {
        self.disconnect_signal.store(true, Ordering::SeqCst);
    }

    fn allow_reconnect(&self) {
        self.disconnect_signal.store(false, Ordering::SeqCst);
    }
}

fn is_ping(text: &str) -> bool {
    serde_json::from_str::<Value>(text)
        .ok()
        .is_some_and(|v| v["type"] == "ping")
}

/// Short backoff so reconnection paths run within test timeouts.
fn fast_config() -> Config {
    let mut config = Config::default();
    config.reconnect.initial_backoff = Duration::from_millis(20);
    config.reconnect.max_backoff = Duration::from_millis(80);
    config
}

/// Register a listener that forwards events of `kind` into a channel.
fn subscribe(client: &Client, kind: EventKind) -> mpsc::UnboundedReceiver<RealtimeEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    client.on(kind, move |event| {
        drop(tx.send(event.clone()));
    });
    rx
}

async fn recv_event(rx: &mut mpsc::UnboundedReceiver<RealtimeEvent>) -> Option<RealtimeEvent> {
    timeout(Duration::from_secs(2), rx.recv()).await.ok().flatten()
}

#[tokio::test]
async fn connect_emits_connected_event() {
    let server = MockWsServer::start().await;
    let client = Client::new(&server.base_url(), Config::default()).unwrap();

    let mut connected = subscribe(&client, EventKind::Connected);

    assert!(!client.is_connected());
    client.connect(USER_ID);

    let event = recv_event(&mut connected).await.expect("connected event");
    assert_eq!(event.kind(), EventKind::Connected);
    assert!(client.is_connected());

    client.disconnect();
}

#[tokio::test]
async fn message_frame_dispatches_to_listener() {
    let server = MockWsServer::start().await;
    let client = Client::new(&server.base_url(), Config::default()).unwrap();

    let mut connected = subscribe(&client, EventKind::Connected);
    let mut messages = subscribe(&client, EventKind::Message);

    client.connect(USER_ID);
    recv_event(&mut connected).await.expect("connected event");

    server.send(&json!({ "type": "message", "payload": { "id": "m1" } }).to_string());

    let event = recv_event(&mut messages).await.expect("message event");
    assert_eq!(event.payload(), Some(&json!({ "id": "m1" })));

    client.disconnect();
}

#[tokio::test]
async fn unknown_frame_type_is_dropped() {
    let server = MockWsServer::start().await;
    let client = Client::new(&server.base_url(), Config::default()).unwrap();

    let mut connected = subscribe(&client, EventKind::Connected);
    let mut messages = subscribe(&client, EventKind::Message);

    client.connect(USER_ID);
    recv_event(&mut connected).await.expect("connected event");

    // Unknown discriminator first, then a recognized frame. Only the
    // recognized one reaches listeners, proving order and survival.
    server.send(&json!({ "type": "bogus", "payload": { "id": "x" } }).to_string());
    server.send(&json!({ "type": "message", "payload": { "id": "m2" } }).to_string());

    let event = recv_event(&mut messages).await.expect("message event");
    assert_eq!(event.payload(), Some(&json!({ "id": "m2" })));

    client.disconnect();
}

#[tokio::test]
async fn malformed_frame_does_not_kill_connection() {
    let server = MockWsServer::start().await;
    let client = Client::new(&server.base_url(), Config::default()).unwrap();

    let mut connected = subscribe(&client, EventKind::Connected);
    let mut messages = subscribe(&client, EventKind::Message);

    client.connect(USER_ID);
    recv_event(&mut connected).await.expect("connected event");

    server.send("this is not json");
    server.send(&json!({ "type": "message", "payload": { "id": "m3" } }).to_string());

    let event = recv_event(&mut messages).await.expect("message event");
    assert_eq!(event.payload(), Some(&json!({ "id": "m3" })));
    assert!(client.is_connected());

    client.disconnect();
}

#[tokio::test]
async fn outbound_frames_reach_server() {
    let mut server = MockWsServer::start().await;
    let client = Client::new(&server.base_url(), Config::default()).unwrap();

    let mut connected = subscribe(&client, EventKind::Connected);
    client.connect(USER_ID);
    recv_event(&mut connected).await.expect("connected event");

    assert!(client.join_conversation(CONVERSATION_ID));
    let frame = server.recv_frame().await.expect("join frame");
    assert_eq!(frame["type"], "join_conversation");
    assert_eq!(frame["payload"]["conversation_id"], CONVERSATION_ID);

    assert!(client.send_typing_indicator(CONVERSATION_ID, true));
    let frame = server.recv_frame().await.expect("typing frame");
    assert_eq!(frame["type"], "typing_start");
    assert_eq!(frame["payload"]["conversation_id"], CONVERSATION_ID);
    assert_eq!(frame["payload"]["user_id"], USER_ID);

    assert!(client.send_typing_indicator(CONVERSATION_ID, false));
    let frame = server.recv_frame().await.expect("typing stop frame");
    assert_eq!(frame["type"], "typing_stop");

    assert!(client.leave_conversation(CONVERSATION_ID));
    let frame = server.recv_frame().await.expect("leave frame");
    assert_eq!(frame["type"], "leave_conversation");

    client.disconnect();
}

#[tokio::test]
async fn heartbeat_pings_reach_the_server() {
    let mut server = MockWsServer::start().await;
    let mut config = Config::default();
    config.heartbeat_interval = Duration::from_millis(50);
    let client = Client::new(&server.base_url(), config).unwrap();

    let mut connected = subscribe(&client, EventKind::Connected);
    client.connect(USER_ID);
    recv_event(&mut connected).await.expect("connected event");

    let ping = server.recv_ping().await.expect("heartbeat ping");
    assert_eq!(ping["type"], "ping");
    assert_eq!(ping["payload"], json!({}));

    // The heartbeat keeps running for as long as the connection is up.
    server.recv_ping().await.expect("second heartbeat ping");
    assert!(client.is_connected());

    client.disconnect();
}

#[tokio::test]
async fn send_while_disconnected_returns_false() {
    let server = MockWsServer::start().await;
    let client = Client::new(&server.base_url(), Config::default()).unwrap();

    assert!(!client.send("message", json!({ "text": "dropped" })));
    assert!(!client.join_conversation(CONVERSATION_ID));
}

#[tokio::test]
async fn manual_disconnect_does_not_reconnect() {
    let server = MockWsServer::start().await;
    let client = Client::new(&server.base_url(), fast_config()).unwrap();

    let mut connected = subscribe(&client, EventKind::Connected);
    let mut disconnected = subscribe(&client, EventKind::Disconnected);

    client.connect(USER_ID);
    recv_event(&mut connected).await.expect("connected event");
    assert_eq!(server.connections(), 1);

    client.disconnect();
    recv_event(&mut disconnected)
        .await
        .expect("disconnected event");
    assert!(!client.is_connected());

    // With 20ms backoff any reconnect attempt would land well within this
    // window.
    sleep(Duration::from_millis(300)).await;
    assert_eq!(server.connections(), 1, "deliberate close must not reconnect");
}

#[tokio::test]
async fn reconnects_after_server_drop() {
    let server = MockWsServer::start().await;
    let client = Client::new(&server.base_url(), fast_config()).unwrap();

    let mut connected = subscribe(&client, EventKind::Connected);
    let mut disconnected = subscribe(&client, EventKind::Disconnected);

    client.connect(USER_ID);
    recv_event(&mut connected).await.expect("initial connect");

    server.disconnect_all();
    recv_event(&mut disconnected)
        .await
        .expect("disconnected event");
    server.allow_reconnect();

    recv_event(&mut connected).await.expect("reconnected");
    assert!(client.is_connected());
    assert!(server.connections() >= 2, "a new connection must be opened");

    client.disconnect();
}

#[tokio::test]
async fn exhausted_retries_emit_single_event() {
    // Nothing listens on this port, every attempt fails immediately.
    let mut config = fast_config();
    config.reconnect.max_attempts = Some(2);
    let client = Client::new("http://127.0.0.1:9", config).unwrap();

    let mut exhausted = subscribe(&client, EventKind::MaxReconnectAttemptsReached);

    client.connect(USER_ID);

    let event = recv_event(&mut exhausted).await.expect("exhaustion event");
    assert_eq!(event.kind(), EventKind::MaxReconnectAttemptsReached);
    assert!(!client.is_connected());

    // Exactly once per connect call.
    sleep(Duration::from_millis(200)).await;
    assert!(
        exhausted.try_recv().is_err(),
        "exhaustion must be reported exactly once"
    );
}

#[tokio::test]
async fn disconnect_during_reconnect_leaves_disconnected_state() {
    // Nothing listens on this port, so the client sits in its retry cycle.
    let mut config = fast_config();
    config.reconnect.initial_backoff = Duration::from_millis(5);
    config.reconnect.max_backoff = Duration::from_millis(5);
    let client = Client::new("http://127.0.0.1:9", config).unwrap();

    client.connect(USER_ID);
    sleep(Duration::from_millis(30)).await;

    // Cancelling mid-retry must not let a racing failure path publish a
    // Reconnecting state after the Disconnected one.
    client.disconnect();
    sleep(Duration::from_millis(100)).await;

    assert_eq!(client.connection_state(), ConnectionState::Disconnected);
    assert!(!client.is_connected());
}

#[tokio::test]
async fn connect_after_exhaustion_starts_fresh() {
    // Nothing listens on this port, every attempt fails immediately.
    let mut config = fast_config();
    config.reconnect.max_attempts = Some(1);
    let client = Client::new("http://127.0.0.1:9", config).unwrap();

    let mut exhausted = subscribe(&client, EventKind::MaxReconnectAttemptsReached);

    client.connect(USER_ID);
    recv_event(&mut exhausted).await.expect("first exhaustion");

    // A new connect call resets the attempt budget, so the cycle repeats
    // and reports exhaustion once more.
    client.connect(USER_ID);
    recv_event(&mut exhausted).await.expect("second exhaustion");
}
