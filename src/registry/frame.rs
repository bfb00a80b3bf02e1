//! Room codes and relayed frames
//!
//! This module defines the key type identifying a room and the payload type
//! fanned out to room members.

use std::borrow::Borrow;
use std::fmt;

use bytes::Bytes;
use tokio_tungstenite::tungstenite::{Message, Utf8Bytes};
use uuid::Uuid;

/// Length of codes produced by [`RoomCode::generate`]
pub const GENERATED_CODE_LEN: usize = 8;

/// Opaque, client-supplied room identifier
///
/// Two codes name the same room only if they are byte-for-byte equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomCode(String);

impl RoomCode {
    /// Create a room code
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Generate a fresh short code from a random UUID
    ///
    /// Nothing is registered; the room comes into existence on first join.
    pub fn generate() -> Self {
        let id = Uuid::new_v4().simple().to_string();
        Self(id[..GENERATED_CODE_LEN].to_string())
    }

    /// Extract a room code from a request path such as `/ws/abc`
    ///
    /// Any query string is ignored. Returns `None` if the path does not start
    /// with `prefix`, or if the remainder is empty or contains a `/`.
    pub fn from_path(path: &str, prefix: &str) -> Option<Self> {
        let path = path.split('?').next().unwrap_or_default();
        let code = path.strip_prefix(prefix)?;

        if code.is_empty() || code.contains('/') {
            return None;
        }

        Some(Self::new(code))
    }

    /// Borrow the code as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for RoomCode {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

/// A message relayed between room members
///
/// Cheap to clone: both variants are reference counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayFrame {
    /// UTF-8 text message
    Text(Utf8Bytes),
    /// Binary message
    Binary(Bytes),
}

impl RelayFrame {
    /// Create a text frame
    pub fn text(text: impl Into<String>) -> Self {
        RelayFrame::Text(Utf8Bytes::from(text.into()))
    }

    /// Create a binary frame
    pub fn binary(data: impl Into<Bytes>) -> Self {
        RelayFrame::Binary(data.into())
    }

    /// Convert an inbound WebSocket message
    ///
    /// Control frames (ping, pong, close) are not relayed and yield `None`.
    pub fn from_message(msg: Message) -> Option<Self> {
        match msg {
            Message::Text(text) => Some(RelayFrame::Text(text)),
            Message::Binary(data) => Some(RelayFrame::Binary(data)),
            _ => None,
        }
    }

    /// Convert into an outbound WebSocket message
    pub fn into_message(self) -> Message {
        match self {
            RelayFrame::Text(text) => Message::Text(text),
            RelayFrame::Binary(data) => Message::Binary(data),
        }
    }

    /// Text content, if this is a text frame
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RelayFrame::Text(text) => Some(text.as_str()),
            RelayFrame::Binary(_) => None,
        }
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        match self {
            RelayFrame::Text(text) => text.len(),
            RelayFrame::Binary(data) => data.len(),
        }
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
