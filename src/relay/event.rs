//! Wire events exchanged with clients

use crate::auth::Identity;
use crate::error::{RelayError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A frame sent by a client: `{ "type", "room_id", "text"? }`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub room_id: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl ClientEvent {
    /// Decode a text frame
    ///
    /// A missing `room_id` decodes as empty; only the event kinds that
    /// address a room reject it (see [`ClientEvent::room`]).
    ///
    /// # Errors
    /// `RelayError::Protocol` if the frame is not valid JSON or is missing
    /// `type`.
    pub fn decode(frame: &str) -> Result<Self> {
        Ok(serde_json::from_str(frame)?)
    }

    /// The addressed room
    ///
    /// # Errors
    /// `RelayError::Protocol` when `room_id` is missing or empty.
    pub fn room(&self) -> Result<&str> {
        if self.room_id.is_empty() {
            return Err(RelayError::protocol(format!(
                "{} requires a room_id",
                self.kind
            )));
        }
        Ok(&self.room_id)
    }
}

/// Frames sent by the relay
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Presence: someone joined (or re-joined) the room
    UserJoined { payload: Identity },
    /// A chat message
    Message(MessageFrame),
}

/// Wire projection of a [`ChatMessage`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageFrame {
    pub id: String,
    pub room_id: String,
    pub sender_id: String,
    pub sender: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A chat message as recorded by the persistence sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub room_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(room_id: impl Into<String>, sender: &Identity, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id: room_id.into(),
            sender_id: sender.id.clone(),
            sender_name: sender.display_name.clone(),
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn to_frame(&self) -> MessageFrame {
        MessageFrame {
            id: self.id.to_string(),
            room_id: self.room_id.clone(),
            sender_id: self.sender_id.clone(),
            sender: self.sender_name.clone(),
            content: self.content.clone(),
            created_at: self.created_at,
        }
    }
}
