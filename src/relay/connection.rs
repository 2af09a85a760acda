//! One live, authenticated WebSocket connection
//!
//! A [`Connection`] owns the sending half of its outbound queue and a
//! single-use close signal. The socket itself lives in the tasks spawned by
//! the upgrade handler; everything else (registry, broadcaster, keepalive)
//! only ever talks to the queue.

use crate::auth::Identity;
use crate::error::{RelayError, Result};
use super::message::Message;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Notify, mpsc};

/// Unique connection identifier
pub type ConnectionId = String;

pub struct Connection {
    id: ConnectionId,
    identity: Identity,
    sender: mpsc::Sender<Message>,
    closed: AtomicBool,
    close_signal: Notify,
}

impl Connection {
    /// Create a connection with a freshly generated id
    pub fn new(identity: Identity, sender: mpsc::Sender<Message>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), identity, sender)
    }

    pub fn with_id(
        id: impl Into<ConnectionId>,
        identity: Identity,
        sender: mpsc::Sender<Message>,
    ) -> Self {
        Self {
            id: id.into(),
            identity,
            sender,
            closed: AtomicBool::new(false),
            close_signal: Notify::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn user_id(&self) -> &str {
        &self.identity.id
    }

    /// Queue a message without waiting
    ///
    /// Fails when the connection is closed, the writer has gone away, or the
    /// outbound queue is full. Callers treat every failure as fatal for this
    /// connection.
    pub fn try_send(&self, msg: Message) -> Result<()> {
        if self.is_closed() {
            return Err(RelayError::write("connection is closed"));
        }
        self.sender.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => RelayError::write("outbound queue is full"),
            mpsc::error::TrySendError::Closed(_) => RelayError::write("writer has stopped"),
        })
    }

    /// Queue a text frame without waiting
    pub fn send_text(&self, text: impl Into<String>) -> Result<()> {
        self.try_send(Message::Text(text.into()))
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Mark the connection closed and wake every task waiting on it
    ///
    /// Returns `true` only for the caller that performed the transition, so
    /// cleanup guarded by this call runs exactly once no matter how many
    /// failure paths race to close.
    pub fn close(&self) -> bool {
        let first = self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if first {
            self.close_signal.notify_waiters();
        }
        first
    }

    /// Resolves once the connection has been closed
    pub async fn closed(&self) {
        let notified = self.close_signal.notified();
        if self.is_closed() {
            return;
        }
        notified.await;
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("user_id", &self.identity.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}
