//! Core WebSocket infrastructure.
//!
//! This module owns the single realtime transport: opening it, keeping it
//! alive across transient failures with bounded exponential backoff, sending
//! the periodic keepalive, and fanning inbound frames out to subscribers.
//!
//! # Architecture
//!
//! - [`ConnectionManager`]: connection lifecycle, reconnection, heartbeat
//! - [`Frame`]: the `{type, payload}` wire unit
//! - [`Config`](config::Config): heartbeat and reconnect tuning
//!
//! The layer above ([`crate::realtime`]) interprets frame discriminators;
//! this module treats payloads as opaque JSON.

pub mod config;
pub mod connection;
pub mod error;
pub mod frame;

pub use connection::{ConnectionManager, ConnectionSignal, ConnectionState};
#[expect(
    clippy::module_name_repetitions,
    reason = "WsError includes module name for clarity when used outside this module"
)]
pub use error::WsError;
pub use frame::Frame;
