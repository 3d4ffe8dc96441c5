//! Wire frame encoding for the realtime channel.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::WsError;
use crate::Result;

/// One structured message unit exchanged over the realtime transport.
///
/// Every frame carries a `type` discriminator and a `payload` object.
/// Payloads are passed through as raw JSON; interpretation of the
/// discriminator belongs to the layer above.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    /// Frame discriminator (e.g., `message`, `typing_start`, `ping`)
    #[serde(rename = "type")]
    pub kind: String,
    /// Frame-specific data object
    #[serde(default)]
    pub payload: Value,
}

impl Frame {
    /// Create a frame with the given discriminator and payload.
    #[must_use]
    pub fn new<K: Into<String>>(kind: K, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// The keepalive frame sent while the connection is up.
    #[must_use]
    pub fn ping() -> Self {
        Self::new("ping", Value::Object(serde_json::Map::new()))
    }

    /// Decode a frame from raw bytes received off the wire.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| WsError::FrameParse(e).into())
    }

    /// Encode the frame as its JSON wire representation.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
