//! Persistence sinks for chat messages
//!
//! The relay hands every accepted chat message to a [`MessageStore`] before
//! broadcasting it. Stores are append-only; a failed append is logged by the
//! caller and never retried.

mod in_memory;
mod jsonl;

pub use in_memory::InMemoryMessageStore;
pub use jsonl::JsonlMessageStore;

use crate::error::Result;
use crate::relay::ChatMessage;
use async_trait::async_trait;

/// Append-only writer for chat messages
#[async_trait]
pub trait MessageStore: Send + Sync + 'static {
    /// Durably record one message
    ///
    /// # Errors
    /// `RelayError::Persistence` when the message could not be written.
    async fn append(&self, message: &ChatMessage) -> Result<()>;

    /// Check if the store is healthy
    fn is_healthy(&self) -> bool {
        true
    }
}
