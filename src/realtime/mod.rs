//! Realtime messaging client.
//!
//! This module provides the push-side counterpart of the REST client in
//! [`crate::api`]: a WebSocket connection that delivers typed events for
//! new messages, deletions, reactions, presence, conversation updates, and
//! typing indicators, and accepts typing/join/leave intents.
//!
//! # Lifecycle
//!
//! Call [`Client::connect`] once at session start with the logged-in user's
//! id, and [`Client::disconnect`] at session end. Transient connection
//! failures are retried automatically with exponential backoff (1s doubling
//! to a 30s cap, five attempts); when the budget is exhausted a
//! [`EventKind::MaxReconnectAttemptsReached`] event fires and the client
//! stays down until `connect` is called again.
//!
//! # Example
//!
//! ```no_run
//! use chat_client_sdk::realtime::{Client, EventKind};
//! use chat_client_sdk::ws::config::Config;
//!
//! # fn example() -> chat_client_sdk::Result<()> {
//! let client = Client::new("https://chat.example.com", Config::default())?;
//!
//! client.on(EventKind::Message, |event| {
//!     println!("message: {:?}", event.payload());
//! });
//! client.on(EventKind::Disconnected, |_| {
//!     println!("connection lost");
//! });
//!
//! client.connect("3f1c0b44-8a77-4a2b-9a8e-6a1a4f6f9d10");
//! client.join_conversation("c7d9e543-21aa-4b58-8f0e-1fcb5f0a7a31");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod events;
pub mod listeners;

pub use client::Client;
pub use events::{EventKind, RealtimeEvent};
pub use listeners::{ListenerId, ListenerRegistry};
