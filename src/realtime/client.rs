use std::sync::Arc;

use serde_json::{Value, json};
use tokio::sync::broadcast::error::RecvError;
use url::Url;

use super::events::{EventKind, RealtimeEvent};
use super::listeners::{ListenerId, ListenerRegistry};
use crate::Result;
use crate::error::Error;
use crate::ws::config::Config;
use crate::ws::{ConnectionManager, ConnectionState, Frame};

/// Realtime client for the chat service.
///
/// Owns one logical connection to the server's `/ws` endpoint, translates
/// inbound frames into typed [`RealtimeEvent`]s, and keeps the connection
/// alive across transient failures with bounded exponential backoff. No
/// other part of the application needs to manage connection state.
///
/// # Example
///
/// ```no_run
/// use chat_client_sdk::realtime::{Client, EventKind};
/// use chat_client_sdk::ws::config::Config;
///
/// # fn example() -> chat_client_sdk::Result<()> {
/// let client = Client::new("https://chat.example.com", Config::default())?;
///
/// client.on(EventKind::Message, |event| {
///     println!("new message: {:?}", event.payload());
/// });
///
/// client.connect("3f1c0b44-8a77-4a2b-9a8e-6a1a4f6f9d10");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    /// Connection manager for the realtime transport
    connection: ConnectionManager,
    /// Registered event listeners
    listeners: Arc<ListenerRegistry>,
}

impl Client {
    /// Create a realtime client for the service at `base_url`.
    ///
    /// The WebSocket endpoint is derived from the base URL: `https` maps to
    /// `wss`, `http` to `ws`, and the path is fixed to `/ws`. No connection
    /// is opened until [`Self::connect`] is called.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid http(s) URL.
    pub fn new(base_url: &str, config: Config) -> Result<Self> {
        let endpoint = realtime_endpoint(base_url)?;
        let connection = ConnectionManager::new(endpoint, config);
        let listeners = Arc::new(ListenerRegistry::new());

        let client = Self {
            inner: Arc::new(ClientInner {
                connection,
                listeners,
            }),
        };
        client.spawn_dispatcher();

        Ok(client)
    }

    /// Open the connection with the given identity.
    ///
    /// No-op if already connected. The identity is retained for automatic
    /// reconnection; calling `connect` again after reconnection gave up
    /// starts over with a fresh attempt budget.
    pub fn connect(&self, user_id: &str) {
        self.inner.connection.connect(user_id);
    }

    /// Close the connection deliberately. Never triggers a reconnect.
    pub fn disconnect(&self) {
        self.inner.connection.disconnect();
    }

    /// Whether the connection is currently open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connection.state().is_connected()
    }

    /// The current connection state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.inner.connection.state()
    }

    /// Send a frame with the given discriminator and payload.
    ///
    /// Returns `false` (and logs a warning) if the connection is not open;
    /// never raises.
    pub fn send(&self, kind: &str, payload: Value) -> bool {
        self.inner.connection.send(&Frame::new(kind, payload))
    }

    /// Notify the conversation that the local user started or stopped
    /// typing.
    pub fn send_typing_indicator(&self, conversation_id: &str, is_typing: bool) -> bool {
        let Some(user_id) = self.inner.connection.user_id() else {
            tracing::warn!("no identity retained, cannot send typing indicator");
            return false;
        };

        let kind = if is_typing { "typing_start" } else { "typing_stop" };
        self.send(
            kind,
            json!({
                "conversation_id": conversation_id,
                "user_id": user_id,
            }),
        )
    }

    /// Join a conversation for realtime updates.
    pub fn join_conversation(&self, conversation_id: &str) -> bool {
        self.send(
            "join_conversation",
            json!({ "conversation_id": conversation_id }),
        )
    }

    /// Leave a conversation.
    pub fn leave_conversation(&self, conversation_id: &str) -> bool {
        self.send(
            "leave_conversation",
            json!({ "conversation_id": conversation_id }),
        )
    }

    /// Register a callback for an event kind.
    ///
    /// Callbacks for one kind fire in registration order; a panicking
    /// callback is isolated and logged without affecting the others.
    pub fn on<F>(&self, kind: EventKind, callback: F) -> ListenerId
    where
        F: Fn(&RealtimeEvent) + Send + Sync + 'static,
    {
        self.inner.listeners.on(kind, callback)
    }

    /// Remove a registration made with [`Self::on`].
    pub fn off(&self, kind: EventKind, id: ListenerId) -> bool {
        self.inner.listeners.off(kind, id)
    }

    /// Dispatcher task: maps connection signals to events and fans them out
    /// to registered listeners for the lifetime of the client.
    fn spawn_dispatcher(&self) {
        let mut signals = self.inner.connection.subscribe();
        let listeners = Arc::clone(&self.inner.listeners);

        tokio::spawn(async move {
            loop {
                match signals.recv().await {
                    Ok(signal) => {
                        if let Some(event) = RealtimeEvent::from_signal(signal) {
                            listeners.emit(&event);
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "realtime dispatcher lagged behind the connection");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }
}

/// Derive the realtime endpoint from the service base URL: secure scheme
/// maps to `wss`, insecure to `ws`, fixed path `/ws`.
fn realtime_endpoint(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)?;

    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(Error::validation(format!(
                "unsupported URL scheme for realtime endpoint: {other}"
            )));
        }
    };

    url.set_scheme(scheme)
        .map_err(|()| Error::validation("base URL does not allow a websocket scheme"))?;
    url.set_path("/ws");
    url.set_query(None);

    Ok(url)
}
