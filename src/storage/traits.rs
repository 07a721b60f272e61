//! Abstract storage interface for pluggable message backends

use async_trait::async_trait;
use std::sync::Arc;

use crate::core::message::ChatMessage;
use crate::error::Result;

/// Room-keyed message storage
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a message and return it with its assigned ID
    async fn append(&self, room: &str, user: &str, text: &str, ts: i64) -> Result<ChatMessage>;

    /// Up to `limit` most recent messages of a room, newest first
    async fn latest(&self, room: &str, limit: usize) -> Result<Vec<ChatMessage>>;

    /// Number of stored messages in a room
    async fn count(&self, room: &str) -> Result<usize>;

    /// Remove the `n` oldest messages of a room, returning how many were removed
    async fn delete_oldest(&self, room: &str, n: usize) -> Result<usize>;

    /// Check that the backend is reachable
    async fn ping(&self) -> Result<()>;
}

/// Thread-safe handle to a message store
pub type SharedMessageStore = Arc<dyn MessageStore>;
