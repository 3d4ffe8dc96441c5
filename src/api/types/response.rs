use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Identity returned by a successful login.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Identity {
    /// Identifier used as the bearer token for all authenticated calls
    pub identifier: Uuid,
    /// The (possibly normalized) username the account was registered under
    pub name: String,
}

/// A registered user.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    /// Profile picture URL, absent if never set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

/// One message within a conversation.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    pub id: Uuid,
    #[serde(rename = "senderId")]
    pub sender_id: Uuid,
    pub text: String,
    /// Attached image, if any
    #[serde(rename = "imageUrl", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(rename = "senderUsername")]
    pub sender_username: String,
    /// Server-side timestamp, opaque to the client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// Emoji reactions keyed by emoji, values are reaction metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reactions: Option<Value>,
    #[serde(rename = "isRead", default)]
    pub is_read: bool,
    /// Users that have read this message
    #[serde(rename = "readBy", default)]
    pub read_by: Vec<Uuid>,
}

/// A direct or group conversation.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Conversation {
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    /// Conversation picture URL, empty if never set
    #[serde(default)]
    pub picture: String,
    #[serde(default)]
    pub participants: Vec<User>,
    #[serde(rename = "lastMessage", default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<Message>,
    #[serde(
        rename = "lastMessageTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_message_time: Option<String>,
    #[serde(rename = "unreadCount", default)]
    pub unread_count: i64,
}
