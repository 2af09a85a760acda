//! Real-time room relay
//!
//! Authenticated WebSocket connections join named rooms and exchange text
//! messages. Every accepted message is handed to the persistence sink and
//! then fanned out to all members of its room.
//!
//! ```text
//! client ──upgrade──▶ ws_handler ──▶ Connection ──register──▶ RoomRegistry
//!                                        │                         ▲
//!                                   read loop                      │
//!                                        ▼                         │
//!                                     Session ──join/is_member─────┤
//!                                        │                         │
//!                               MessageStore::append      Broadcaster::broadcast
//! ```
//!
//! # Wire format
//!
//! Client frames are `{ "type": "join" | "message", "room_id": "...", "text": "..." }`.
//! The relay answers with `user_joined` presence events and `message` events;
//! see [`ServerEvent`].

mod broadcast;
mod connection;
mod event;
mod message;
mod registry;
mod session;
mod socket;

#[cfg(test)]
mod tests;

pub use broadcast::{BroadcastReport, Broadcaster};
pub use connection::{Connection, ConnectionId};
pub use event::{ChatMessage, ClientEvent, MessageFrame, ServerEvent};
pub use message::{CloseFrame, Message};
pub use registry::{JoinOutcome, RegistryMetrics, RoomId, RoomRegistry};
pub use session::{DEFAULT_PERSIST_TIMEOUT, Dispatch, Session};
pub use socket::{handle_socket, ws_handler};
