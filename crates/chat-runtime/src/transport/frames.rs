//! JSON frame codec.
//!
//! Client → server:
//!
//! ```json
//! {"type": "claim_name", "name": "ada"}
//! {"type": "message", "text": "hello"}
//! ```
//!
//! Server → client frames are `OutboundEvent` serialized as-is.

use serde::Deserialize;
use shared_types::{InboundEvent, OutboundEvent};
use thiserror::Error;

/// Frames a client may send. Lifecycle events never come off the wire.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    ClaimName { name: String },
    Message { text: String },
}

impl ClientFrame {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientFrame::ClaimName { .. } => "claim_name",
            ClientFrame::Message { .. } => "message",
        }
    }
}

impl From<ClientFrame> for InboundEvent {
    fn from(frame: ClientFrame) -> Self {
        match frame {
            ClientFrame::ClaimName { name } => InboundEvent::ClaimName { name },
            ClientFrame::Message { text } => InboundEvent::Message { text },
        }
    }
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("unrecognized frame: {0}")]
    Malformed(String),

    #[error("failed to encode event: {0}")]
    Encode(String),
}

pub fn decode_frame(raw: &str) -> Result<ClientFrame, FrameError> {
    serde_json::from_str(raw).map_err(|e| FrameError::Malformed(e.to_string()))
}

pub fn encode_event(event: &OutboundEvent) -> Result<String, FrameError> {
    serde_json::to_string(event).map_err(|e| FrameError::Encode(e.to_string()))
}
