//! # Session Events
//!
//! `InboundEvent` is what a transport hands to the session controller for one
//! connection. `OutboundEvent` is what the dispatcher queues back to clients.

use serde::{Deserialize, Serialize};

/// Events flowing from a transport connection into the session controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    /// The transport accepted a new connection.
    Connect,
    /// The client asks to bind a display name.
    ClaimName { name: String },
    /// A chat line, possibly a command.
    Message { text: String },
    /// The transport connection is gone.
    Disconnect,
}

impl InboundEvent {
    /// Short label used in logs and metrics.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            InboundEvent::Connect => "connect",
            InboundEvent::ClaimName { .. } => "claim_name",
            InboundEvent::Message { .. } => "message",
            InboundEvent::Disconnect => "disconnect",
        }
    }
}

/// Events the dispatcher delivers to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    ClaimAccepted { name: String },
    ClaimRejected { reason: String },
    ChatMessage { from: String, text: String },
    /// System-level announcement (joins, departures, grants, renames).
    StatusNotice { text: String },
    /// Private reply to a command or a rejected message.
    CommandResult { text: String },
    /// The receiving connection's own display name changed.
    IdentityChanged { old: String, new: String },
}

impl OutboundEvent {
    pub fn status(text: impl Into<String>) -> Self {
        OutboundEvent::StatusNotice { text: text.into() }
    }

    pub fn result(text: impl Into<String>) -> Self {
        OutboundEvent::CommandResult { text: text.into() }
    }

    pub fn chat(from: impl Into<String>, text: impl Into<String>) -> Self {
        OutboundEvent::ChatMessage {
            from: from.into(),
            text: text.into(),
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            OutboundEvent::ClaimAccepted { .. } => "claim_accepted",
            OutboundEvent::ClaimRejected { .. } => "claim_rejected",
            OutboundEvent::ChatMessage { .. } => "chat_message",
            OutboundEvent::StatusNotice { .. } => "status_notice",
            OutboundEvent::CommandResult { .. } => "command_result",
            OutboundEvent::IdentityChanged { .. } => "identity_changed",
        }
    }
}
