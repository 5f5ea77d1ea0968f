//! Wire protocol of the live exam channel.
//!
//! Inbound text frames carry [`ClientEvent`] JSON. Outbound traffic is a
//! sequence of [`OutboundFrame`]s: JSON [`ServerEvent`]s, raw audio, and a
//! final close frame.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Close codes used to end the channel.
pub mod close_code {
    /// Session finished normally.
    pub const NORMAL: u16 = 1000;
    /// Session not found or owned by someone else.
    pub const SESSION_NOT_OWNED: u16 = 1008;
    /// Unexpected server-side failure.
    pub const INTERNAL_ERROR: u16 = 1011;
    /// Credential missing, invalid, or expired.
    pub const INVALID_CREDENTIAL: u16 = 4001;
}

/// Event sent by the candidate's client.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// A complete spoken utterance, already transcribed.
    UserTranscript {
        #[serde(default)]
        text: String,
    },
    /// Any other well-formed event type. Ignored by the session.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, thiserror::Error)]
#[error("malformed client event: {0}")]
pub struct ProtocolError(#[from] serde_json::Error);

impl ClientEvent {
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// JSON event sent to the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// The examiner starts speaking; `text` is authoritative, audio follows.
    DosenReplyStart { text: String },
    /// The time budget is exhausted; the closing reply follows.
    SessionEnding,
}

/// Why the channel is being closed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloseReason {
    pub code: u16,
    pub reason: String,
}

impl CloseReason {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    pub fn normal() -> Self {
        Self::new(close_code::NORMAL, "")
    }
}

/// One unit of outbound traffic, delivered in order on a single connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutboundFrame {
    Event(ServerEvent),
    Audio(Bytes),
    Close(CloseReason),
}

impl OutboundFrame {
    pub fn reply(text: impl Into<String>) -> Self {
        Self::Event(ServerEvent::DosenReplyStart { text: text.into() })
    }
}
