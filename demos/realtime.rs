//! Realtime event listener demo.
//!
//! Logs in against a running chat service, opens the realtime connection,
//! and prints every event delivered for one minute.
//!
//! Run with tracing enabled:
//! ```sh
//! CHAT_BASE_URL=http://localhost:3000 CHAT_USERNAME=alice \
//!     RUST_LOG=info cargo run --example realtime
//! ```

use std::time::Duration;

use chat_client_sdk::api::Client as ApiClient;
use chat_client_sdk::realtime::{Client as RealtimeClient, EventKind};
use chat_client_sdk::ws::config::Config;
use tokio::time::sleep;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let base_url =
        std::env::var("CHAT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());
    let username = std::env::var("CHAT_USERNAME").unwrap_or_else(|_| "demo".to_owned());

    let api = ApiClient::new(&base_url)?;
    let identity = api.login(&username).await?;
    info!(user = %identity.name, id = %identity.identifier, "logged in");

    let realtime = RealtimeClient::new(&base_url, Config::default())?;

    realtime.on(EventKind::Connected, |_| info!(event = "connected"));
    realtime.on(EventKind::Disconnected, |_| info!(event = "disconnected"));
    realtime.on(EventKind::MaxReconnectAttemptsReached, |_| {
        info!(event = "max_reconnect_attempts_reached");
    });
    realtime.on(EventKind::Message, |event| {
        info!(event = "message", payload = ?event.payload());
    });
    realtime.on(EventKind::MessageDeleted, |event| {
        info!(event = "message_deleted", payload = ?event.payload());
    });
    realtime.on(EventKind::ReactionChanged, |event| {
        info!(event = "reaction_changed", payload = ?event.payload());
    });
    realtime.on(EventKind::UserOnline, |event| {
        info!(event = "user_online", payload = ?event.payload());
    });
    realtime.on(EventKind::UserOffline, |event| {
        info!(event = "user_offline", payload = ?event.payload());
    });
    realtime.on(EventKind::ConversationUpdated, |event| {
        info!(event = "conversation_updated", payload = ?event.payload());
    });
    realtime.on(EventKind::TypingStart, |event| {
        info!(event = "typing_start", payload = ?event.payload());
    });
    realtime.on(EventKind::TypingStop, |event| {
        info!(event = "typing_stop", payload = ?event.payload());
    });

    realtime.connect(&identity.identifier.to_string());

    // Join the first conversation so its typing indicators come through
    if let Some(conversation) = api.conversations(identity.identifier).await?.first() {
        info!(conversation = %conversation.id, "joining conversation");
        realtime.join_conversation(&conversation.id.to_string());
        realtime.send_typing_indicator(&conversation.id.to_string(), true);
        sleep(Duration::from_secs(2)).await;
        realtime.send_typing_indicator(&conversation.id.to_string(), false);
    }

    info!("listening for events for 60 seconds");
    sleep(Duration::from_secs(60)).await;

    realtime.disconnect();
    info!(connected = realtime.is_connected(), "shut down");

    Ok(())
}
