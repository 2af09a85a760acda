//! Per-connection event dispatch
//!
//! A [`Session`] is shared by every connection. It decodes client frames and
//! drives the registry, the persistence sink and the broadcaster:
//!
//! - `join`: add the connection to the room, then tell the whole room
//!   (joiner included) with a `user_joined` event. Re-joining repeats the
//!   announcement.
//! - `message`: if the sender is currently a member, record the message and
//!   broadcast it. Messages from non-members are dropped without a reply.
//!
//! Anything that cannot be decoded is a protocol error and the caller closes
//! the connection.

use crate::error::Result;
use crate::store::MessageStore;
use super::broadcast::{BroadcastReport, Broadcaster};
use super::connection::Connection;
use super::event::{ChatMessage, ClientEvent, ServerEvent};
use super::registry::{JoinOutcome, RoomRegistry};
use std::sync::Arc;
use std::time::Duration;

/// Default upper bound on a single persistence append
pub const DEFAULT_PERSIST_TIMEOUT: Duration = Duration::from_secs(5);

/// What a handled event resulted in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The connection joined (or re-joined) a room and presence went out
    Joined {
        outcome: JoinOutcome,
        report: BroadcastReport,
    },
    /// A chat message was broadcast
    Delivered {
        message_id: uuid::Uuid,
        persisted: bool,
        report: BroadcastReport,
    },
    /// A message from a non-member was discarded
    Dropped,
    /// An event type the relay does not handle
    Ignored,
}

/// Shared protocol handler
pub struct Session {
    registry: Arc<RoomRegistry>,
    broadcaster: Broadcaster,
    store: Arc<dyn MessageStore>,
    persist_timeout: Duration,
}

impl Session {
    pub fn new(registry: Arc<RoomRegistry>, store: Arc<dyn MessageStore>) -> Self {
        Self {
            broadcaster: Broadcaster::new(registry.clone()),
            registry,
            store,
            persist_timeout: DEFAULT_PERSIST_TIMEOUT,
        }
    }

    pub fn with_persist_timeout(mut self, timeout: Duration) -> Self {
        self.persist_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    pub fn store_healthy(&self) -> bool {
        self.store.is_healthy()
    }

    /// Decode and handle one text frame
    ///
    /// # Errors
    /// `RelayError::Protocol` for undecodable frames. Serialization failures
    /// surface as `RelayError::Internal`.
    pub async fn handle_frame(&self, conn: &Arc<Connection>, frame: &str) -> Result<Dispatch> {
        let event = ClientEvent::decode(frame)?;
        self.handle_event(conn, event).await
    }

    /// Handle an already-decoded event
    ///
    /// # Errors
    /// `RelayError::Protocol` when a `join` or `message` names no room.
    /// Unknown event types are logged and ignored whatever they carry.
    pub async fn handle_event(&self, conn: &Arc<Connection>, event: ClientEvent) -> Result<Dispatch> {
        match event.kind.as_str() {
            "join" => self.join(conn, event.room()?).await,
            "message" => {
                let room_id = event.room()?;
                let text = event.text.clone().unwrap_or_default();
                self.message(conn, room_id, text).await
            }
            other => {
                tracing::warn!(
                    conn_id = %conn.id(),
                    user_id = %conn.user_id(),
                    event_type = %other,
                    "Unknown event type"
                );
                Ok(Dispatch::Ignored)
            }
        }
    }

    async fn join(&self, conn: &Arc<Connection>, room_id: &str) -> Result<Dispatch> {
        let outcome = self.registry.join(room_id, conn)?;
        tracing::info!(
            conn_id = %conn.id(),
            user_id = %conn.user_id(),
            room_id = %room_id,
            ?outcome,
            "User joined room"
        );

        let event = ServerEvent::UserJoined {
            payload: conn.identity().clone(),
        };
        let report = self.broadcaster.broadcast(room_id, &event)?;

        Ok(Dispatch::Joined { outcome, report })
    }

    async fn message(&self, conn: &Arc<Connection>, room_id: &str, text: String) -> Result<Dispatch> {
        if !self.registry.is_member(room_id, conn.id()) {
            tracing::warn!(
                conn_id = %conn.id(),
                user_id = %conn.user_id(),
                room_id = %room_id,
                "Message ignored: sender has not joined room"
            );
            return Ok(Dispatch::Dropped);
        }

        let message = ChatMessage::new(room_id, conn.identity(), text);
        let persisted = self.persist(&message).await;

        let report = self
            .broadcaster
            .broadcast(room_id, &ServerEvent::Message(message.to_frame()))?;

        Ok(Dispatch::Delivered {
            message_id: message.id,
            persisted,
            report,
        })
    }

    // Failures are logged and swallowed; delivery goes ahead regardless.
    async fn persist(&self, message: &ChatMessage) -> bool {
        match tokio::time::timeout(self.persist_timeout, self.store.append(message)).await {
            Ok(Ok(())) => {
                tracing::debug!(message_id = %message.id, room_id = %message.room_id, "Message persisted");
                true
            }
            Ok(Err(e)) => {
                tracing::error!(
                    message_id = %message.id,
                    room_id = %message.room_id,
                    user_id = %message.sender_id,
                    error = %e,
                    "Failed to persist message"
                );
                false
            }
            Err(_) => {
                tracing::error!(
                    message_id = %message.id,
                    room_id = %message.room_id,
                    user_id = %message.sender_id,
                    timeout_ms = self.persist_timeout.as_millis() as u64,
                    "Timed out persisting message"
                );
                false
            }
        }
    }
}
