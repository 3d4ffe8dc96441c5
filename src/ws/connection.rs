#![expect(
    clippy::module_name_repetitions,
    reason = "Connection types expose their domain in the name for clarity"
)]

use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use backoff::backoff::Backoff as _;
use futures::{SinkExt as _, StreamExt as _};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{interval, sleep};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::config::Config;
use super::error::WsError;
use super::frame::Frame;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Broadcast channel capacity for connection signals.
const SIGNAL_CAPACITY: usize = 1024;

/// Connection state tracking.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected
    Disconnected,
    /// Attempting to connect
    Connecting,
    /// Successfully connected
    Connected {
        /// When the connection was established
        since: Instant,
    },
    /// Waiting to reconnect after a failure
    Reconnecting {
        /// Current reconnection attempt number
        attempt: u32,
    },
}

impl ConnectionState {
    /// Check if the connection is currently active.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}

/// Notification broadcast by the connection manager to its subscribers.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum ConnectionSignal {
    /// The transport opened successfully
    Opened,
    /// The transport closed (manual close or failure)
    Closed,
    /// Reconnection gave up after exhausting the attempt budget
    RetriesExhausted {
        /// Number of attempts that were made
        attempts: u32,
    },
    /// A frame arrived and decoded successfully
    Frame(Frame),
}

/// How an active connection ended. A normal-closure code (or local
/// cancellation) means the close was deliberate and must not trigger a
/// reconnect; anything else is failure-class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseKind {
    Manual,
    Failure,
}

/// State for one `connect` call: the retained identity, the handle used
/// to cancel the running connection task, and the channel feeding it
/// outbound frames.
struct Session {
    user_id: String,
    cancel: CancellationToken,
    outbound_tx: mpsc::UnboundedSender<String>,
}

/// Manages the realtime WebSocket connection lifecycle, reconnection, and heartbeat.
///
/// The manager owns at most one live transport at a time. `connect` starts a
/// background task that opens the transport and keeps it alive across
/// transient failures with bounded exponential backoff; `disconnect` tears it
/// down with a normal closure and never triggers a reconnect. All inbound
/// frames and lifecycle transitions are broadcast as [`ConnectionSignal`]s.
///
/// Each `connect` call carries its own [`CancellationToken`], so a pending
/// reconnect timer from a previous session can never resurrect a connection
/// that was deliberately closed.
pub struct ConnectionManager {
    /// Endpoint the transport connects to (identity appended per session)
    endpoint: Url,
    config: Config,
    /// Watch channel for state changes (enables reconnection detection)
    state_tx: watch::Sender<ConnectionState>,
    /// Watch channel receiver for state changes (for use in checking the current state)
    ///
    /// Also keeps the channel open: `watch::Sender::send` does not store
    /// the value once every receiver is gone.
    state_rx: watch::Receiver<ConnectionState>,
    /// Broadcast sender for connection signals
    signal_tx: broadcast::Sender<ConnectionSignal>,
    /// Active session, if `connect` has been called
    session: Mutex<Option<Session>>,
}

impl ConnectionManager {
    /// Create a new connection manager. No transport is opened until
    /// [`Self::connect`] is called.
    #[must_use]
    pub fn new(endpoint: Url, config: Config) -> Self {
        let (signal_tx, _) = broadcast::channel(SIGNAL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        Self {
            endpoint,
            config,
            state_tx,
            state_rx,
            signal_tx,
            session: Mutex::new(None),
        }
    }

    /// Open the connection with the given identity.
    ///
    /// No-op if a connection task is already running (connected, connecting,
    /// or waiting to reconnect). The identity is retained so automatic
    /// reconnect attempts re-establish the connection without the caller
    /// re-supplying it. Calling `connect` after reconnection gave up starts a
    /// fresh task with the attempt counter and backoff reset.
    pub fn connect(&self, user_id: &str) {
        let mut session = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(active) = session.as_ref()
            && !active.cancel.is_cancelled()
        {
            tracing::debug!("realtime connection already active, ignoring connect");
            return;
        }

        let mut url = self.endpoint.clone();
        url.query_pairs_mut().clear().append_pair("user_id", user_id);

        let cancel = CancellationToken::new();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        *session = Some(Session {
            user_id: user_id.to_owned(),
            cancel: cancel.clone(),
            outbound_tx,
        });

        let config = self.config.clone();
        let signal_tx = self.signal_tx.clone();
        let state_tx = self.state_tx.clone();

        drop(session);

        tokio::spawn(async move {
            Self::connection_loop(url, config, outbound_rx, signal_tx, state_tx, cancel).await;
        });
    }

    /// Close the connection deliberately.
    ///
    /// Cancels the connection task (including any pending reconnect timer),
    /// which sends a close frame with the normal closure code. This path
    /// never schedules a reconnect.
    pub fn disconnect(&self) {
        let session = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(active) = session.as_ref() {
            active.cancel.cancel();
        }
        // State flips immediately; the connection task observes the
        // cancellation and finishes the transport close asynchronously.
        _ = self.state_tx.send(ConnectionState::Disconnected);
    }

    /// Send a frame to the server.
    ///
    /// Returns `false` without raising if the connection is not currently
    /// open or the frame cannot be serialized.
    pub fn send(&self, frame: &Frame) -> bool {
        if !self.state().is_connected() {
            tracing::warn!(kind = %frame.kind, "realtime connection not open, dropping outbound frame");
            return false;
        }

        let json = match frame.encode() {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize outbound frame");
                return false;
            }
        };

        let session = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        session
            .as_ref()
            .is_some_and(|active| active.outbound_tx.send(json).is_ok())
    }

    /// The identity retained from the last `connect` call, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<String> {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|active| active.user_id.clone())
    }

    /// Get the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Subscribe to connection signals.
    ///
    /// Each call returns a new independent receiver. Multiple subscribers can
    /// receive signals concurrently without blocking each other.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionSignal> {
        self.signal_tx.subscribe()
    }

    /// Subscribe to connection state changes.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Main connection loop with automatic reconnection.
    async fn connection_loop(
        url: Url,
        config: Config,
        mut outbound_rx: mpsc::UnboundedReceiver<String>,
        signal_tx: broadcast::Sender<ConnectionSignal>,
        state_tx: watch::Sender<ConnectionState>,
        cancel: CancellationToken,
    ) {
        let mut attempt = 0_u32;
        let mut backoff: backoff::ExponentialBackoff = config.reconnect.clone().into();

        loop {
            if cancel.is_cancelled() {
                _ = state_tx.send(ConnectionState::Disconnected);
                return;
            }
            _ = state_tx.send(ConnectionState::Connecting);

            let opened = tokio::select! {
                () = cancel.cancelled() => {
                    _ = state_tx.send(ConnectionState::Disconnected);
                    return;
                }
                result = connect_async(url.as_str()) => result,
            };

            match opened {
                Ok((ws_stream, _)) => {
                    attempt = 0;
                    backoff.reset();
                    _ = state_tx.send(ConnectionState::Connected {
                        since: Instant::now(),
                    });
                    _ = signal_tx.send(ConnectionSignal::Opened);
                    tracing::debug!("realtime connection established");

                    let outcome = Self::drive_connection(
                        ws_stream,
                        &mut outbound_rx,
                        &signal_tx,
                        state_tx.subscribe(),
                        &config,
                        &cancel,
                    )
                    .await;

                    _ = signal_tx.send(ConnectionSignal::Closed);

                    if outcome == CloseKind::Manual {
                        if !cancel.is_cancelled() {
                            // Server closed with the normal code; treated the
                            // same as a local disconnect.
                            _ = state_tx.send(ConnectionState::Disconnected);
                            cancel.cancel();
                        }
                        return;
                    }
                }
                Err(e) => {
                    let error = crate::error::Error::from(WsError::Connection(e));
                    tracing::warn!(error = ?error, "unable to open realtime connection");
                    _ = signal_tx.send(ConnectionSignal::Closed);
                }
            }

            // A disconnect may race any state write in this loop, so every
            // cancelled exit stores Disconnected last and skips the reconnect.
            if cancel.is_cancelled() {
                _ = state_tx.send(ConnectionState::Disconnected);
                return;
            }

            // Failure-class closure: reconnect with the retained identity
            // unless the attempt budget is spent.
            if let Some(max) = config.reconnect.max_attempts
                && attempt >= max
            {
                tracing::error!(attempts = attempt, "max reconnection attempts reached");
                _ = state_tx.send(ConnectionState::Disconnected);
                _ = signal_tx.send(ConnectionSignal::RetriesExhausted { attempts: attempt });
                cancel.cancel();
                return;
            }

            attempt = attempt.saturating_add(1);
            _ = state_tx.send(ConnectionState::Reconnecting { attempt });

            let delay = backoff
                .next_backoff()
                .unwrap_or(config.reconnect.max_backoff);
            tracing::debug!(attempt, ?delay, "scheduling reconnection attempt");

            tokio::select! {
                () = cancel.cancelled() => {
                    _ = state_tx.send(ConnectionState::Disconnected);
                    return;
                }
                () = sleep(delay) => {}
            }
        }
    }

    /// Drive an active WebSocket connection until it closes.
    async fn drive_connection(
        ws_stream: WsStream,
        outbound_rx: &mut mpsc::UnboundedReceiver<String>,
        signal_tx: &broadcast::Sender<ConnectionSignal>,
        state_rx: watch::Receiver<ConnectionState>,
        config: &Config,
        cancel: &CancellationToken,
    ) -> CloseKind {
        let (mut write, mut read) = ws_stream.split();
        let (ping_tx, mut ping_rx) = mpsc::unbounded_channel();

        let heartbeat_interval = config.heartbeat_interval;
        let heartbeat_handle = tokio::spawn(async move {
            Self::heartbeat_loop(ping_tx, state_rx, heartbeat_interval).await;
        });

        let outcome = loop {
            tokio::select! {
                // Deliberate close: send the normal closure code so the
                // server can tell this apart from a failure.
                () = cancel.cancelled() => {
                    let frame = CloseFrame {
                        code: CloseCode::Normal,
                        reason: "client disconnect".into(),
                    };
                    _ = write.send(Message::Close(Some(frame))).await;
                    break CloseKind::Manual;
                }

                // Handle incoming frames
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            match Frame::decode(text.as_bytes()) {
                                Ok(frame) => {
                                    tracing::trace!(kind = %frame.kind, "received realtime frame");
                                    _ = signal_tx.send(ConnectionSignal::Frame(frame));
                                }
                                Err(e) => {
                                    // Bad frame is dropped, connection stays open
                                    tracing::warn!(error = %e, "failed to parse realtime frame");
                                }
                            }
                        }
                        Some(Ok(Message::Close(close))) => {
                            let manual = close
                                .as_ref()
                                .is_some_and(|c| c.code == CloseCode::Normal);
                            tracing::debug!(?close, "realtime connection closed by server");
                            break if manual { CloseKind::Manual } else { CloseKind::Failure };
                        }
                        Some(Ok(_)) => {
                            // Binary frames and transport-level ping/pong are ignored.
                        }
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "realtime connection error");
                            break CloseKind::Failure;
                        }
                        None => break CloseKind::Failure,
                    }
                }

                // Handle outgoing frames from the client surface
                Some(text) = outbound_rx.recv() => {
                    if write.send(Message::Text(text.into())).await.is_err() {
                        break CloseKind::Failure;
                    }
                }

                // Handle keepalive requests from the heartbeat loop
                Some(()) = ping_rx.recv() => {
                    let Ok(ping) = Frame::ping().encode() else {
                        continue;
                    };
                    if write.send(Message::Text(ping.into())).await.is_err() {
                        break CloseKind::Failure;
                    }
                }
            }
        };

        heartbeat_handle.abort();

        outcome
    }

    /// Heartbeat loop that requests a `ping` frame on every interval while
    /// the connection is up.
    ///
    /// Receipt of the server's `pong` is not monitored here: a missing pong
    /// never triggers reconnection on its own, only transport close/error
    /// events do.
    async fn heartbeat_loop(
        ping_tx: mpsc::UnboundedSender<()>,
        state_rx: watch::Receiver<ConnectionState>,
        period: std::time::Duration,
    ) {
        let mut ticker = interval(period);
        // The first tick completes immediately; the first ping should go out
        // one full period after the connection opened.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            if !state_rx.borrow().is_connected() {
                break;
            }

            if ping_tx.send(()).is_err() {
                // Connection task has terminated
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ConnectionManager {
        let endpoint = Url::parse("ws://127.0.0.1:1/ws").expect("static url");
        ConnectionManager::new(endpoint, Config::default())
    }

    #[test]
    fn starts_disconnected() {
        let manager = manager();
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(!manager.state().is_connected());
        assert!(manager.user_id().is_none());
    }

    #[test]
    fn send_while_disconnected_returns_false() {
        let manager = manager();
        assert!(!manager.send(&Frame::ping()));
    }

    #[tokio::test]
    async fn connect_retains_identity() {
        let manager = manager();
        manager.connect("u-42");
        assert_eq!(manager.user_id().as_deref(), Some("u-42"));
        manager.disconnect();
    }

    #[tokio::test]
    async fn disconnect_flips_state_synchronously() {
        let manager = manager();
        manager.connect("u-42");
        manager.disconnect();
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }
}
