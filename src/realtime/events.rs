//! Typed event taxonomy for the realtime channel.
//!
//! Inbound frames are tagged with a string discriminator; this module maps
//! that fixed taxonomy onto a tagged enum so consumers subscribe by
//! [`EventKind`] instead of raw strings and mismatches surface at compile
//! time.

use serde_json::Value;

use crate::ws::{ConnectionSignal, Frame};

/// An event delivered to registered listeners.
///
/// Payloads are passed through exactly as received from the server; the
/// lifecycle variants (`Connected`, `Disconnected`,
/// `MaxReconnectAttemptsReached`) carry no payload.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum RealtimeEvent {
    /// The connection opened successfully
    Connected,
    /// The connection closed (deliberately or after a failure)
    Disconnected,
    /// Automatic reconnection gave up; a manual `connect` is required
    MaxReconnectAttemptsReached,
    /// A new chat message arrived
    Message(Value),
    /// A message was deleted
    MessageDeleted(Value),
    /// A reaction was added to or removed from a message
    ReactionChanged(Value),
    /// A user came online
    UserOnline(Value),
    /// A user went offline
    UserOffline(Value),
    /// Conversation metadata changed
    ConversationUpdated(Value),
    /// A participant started typing
    TypingStart(Value),
    /// A participant stopped typing
    TypingStop(Value),
}

/// Discriminant of [`RealtimeEvent`], used as the listener registry key.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connected,
    Disconnected,
    MaxReconnectAttemptsReached,
    Message,
    MessageDeleted,
    ReactionChanged,
    UserOnline,
    UserOffline,
    ConversationUpdated,
    TypingStart,
    TypingStop,
}

impl RealtimeEvent {
    /// The kind listeners subscribe to.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Connected => EventKind::Connected,
            Self::Disconnected => EventKind::Disconnected,
            Self::MaxReconnectAttemptsReached => EventKind::MaxReconnectAttemptsReached,
            Self::Message(_) => EventKind::Message,
            Self::MessageDeleted(_) => EventKind::MessageDeleted,
            Self::ReactionChanged(_) => EventKind::ReactionChanged,
            Self::UserOnline(_) => EventKind::UserOnline,
            Self::UserOffline(_) => EventKind::UserOffline,
            Self::ConversationUpdated(_) => EventKind::ConversationUpdated,
            Self::TypingStart(_) => EventKind::TypingStart,
            Self::TypingStop(_) => EventKind::TypingStop,
        }
    }

    /// The server payload, if this event carries one.
    #[must_use]
    pub const fn payload(&self) -> Option<&Value> {
        match self {
            Self::Connected | Self::Disconnected | Self::MaxReconnectAttemptsReached => None,
            Self::Message(payload)
            | Self::MessageDeleted(payload)
            | Self::ReactionChanged(payload)
            | Self::UserOnline(payload)
            | Self::UserOffline(payload)
            | Self::ConversationUpdated(payload)
            | Self::TypingStart(payload)
            | Self::TypingStop(payload) => Some(payload),
        }
    }

    /// Map a connection signal to the event delivered to listeners.
    ///
    /// Returns `None` for signals that produce no event: heartbeat `pong`
    /// replies are swallowed, unknown discriminators are logged and dropped.
    pub(crate) fn from_signal(signal: ConnectionSignal) -> Option<Self> {
        match signal {
            ConnectionSignal::Opened => Some(Self::Connected),
            ConnectionSignal::Closed => Some(Self::Disconnected),
            ConnectionSignal::RetriesExhausted { .. } => Some(Self::MaxReconnectAttemptsReached),
            ConnectionSignal::Frame(frame) => Self::from_frame(frame),
        }
    }

    /// Map an inbound frame to its event by the `type` discriminator.
    pub(crate) fn from_frame(frame: Frame) -> Option<Self> {
        let Frame { kind, payload } = frame;

        match kind.as_str() {
            "message" => Some(Self::Message(payload)),
            "message_deleted" => Some(Self::MessageDeleted(payload)),
            "reaction_added" | "reaction_removed" => Some(Self::ReactionChanged(payload)),
            "user_online" => Some(Self::UserOnline(payload)),
            "user_offline" => Some(Self::UserOffline(payload)),
            "conversation_updated" => Some(Self::ConversationUpdated(payload)),
            "typing_start" => Some(Self::TypingStart(payload)),
            "typing_stop" => Some(Self::TypingStop(payload)),
            "pong" => {
                // Heartbeat reply, connection is alive
                tracing::trace!("heartbeat acknowledged");
                None
            }
            other => {
                tracing::warn!(kind = %other, "unknown realtime frame type");
                None
            }
        }
    }
}
