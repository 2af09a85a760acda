//! Fan-out of one event to every member of a room

use crate::error::{RelayError, Result};
use super::message::Message;
use super::registry::RoomRegistry;
use serde::Serialize;
use std::sync::Arc;

/// Outcome of a single broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Members whose outbound queue accepted the frame
    pub delivered: usize,
    /// Members closed and swept because the write failed
    pub evicted: usize,
}

/// Delivers serialized events to a room's members
///
/// Writes never block: each member gets a `try_send` into its outbound
/// queue. A member whose queue is full or whose writer has gone away is
/// closed and swept from every room, and the broadcast carries on with the
/// rest.
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<RoomRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    /// Serialize `event` once and deliver it to every member of `room_id`
    ///
    /// Only serialization can fail; per-member write failures are reported
    /// in the [`BroadcastReport`].
    pub fn broadcast<T: Serialize>(&self, room_id: &str, event: &T) -> Result<BroadcastReport> {
        let json = serde_json::to_string(event)
            .map_err(|e| RelayError::internal(format!("Failed to serialize event: {}", e)))?;
        Ok(self.broadcast_text(room_id, json))
    }

    /// Deliver a pre-serialized text frame to every member of `room_id`
    pub fn broadcast_text(&self, room_id: &str, text: impl Into<String>) -> BroadcastReport {
        let text = text.into();
        let members = self.registry.members(room_id);
        self.registry.record_broadcast();

        let mut report = BroadcastReport::default();
        for conn in members {
            match conn.try_send(Message::Text(text.clone())) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!(
                        room_id = %room_id,
                        conn_id = %conn.id(),
                        user_id = %conn.user_id(),
                        error = %e,
                        "Broadcast write failed, evicting connection"
                    );
                    if self.registry.evict(&conn, "write failed") {
                        report.evicted += 1;
                    }
                }
            }
        }

        tracing::debug!(
            room_id = %room_id,
            delivered = report.delivered,
            evicted = report.evicted,
            "Broadcast complete"
        );
        report
    }
}
