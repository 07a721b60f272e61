//! In-memory storage implementation for development and testing
//!
//! Keeps every room's messages in a vector ordered by timestamp. Suitable
//! for development, tests and as the index behind the file store.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::traits::MessageStore;
use crate::core::message::ChatMessage;
use crate::error::Result;

#[derive(Default)]
pub struct MemoryMessageStore {
    /// room -> messages, oldest first
    rooms: RwLock<HashMap<String, Vec<ChatMessage>>>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from previously persisted messages
    pub fn from_messages(messages: impl IntoIterator<Item = ChatMessage>) -> Self {
        let mut rooms: HashMap<String, Vec<ChatMessage>> = HashMap::new();
        for message in messages {
            insert_ordered(rooms.entry(message.room.clone()).or_default(), message);
        }
        Self {
            rooms: RwLock::new(rooms),
        }
    }

    pub(crate) async fn insert(&self, message: ChatMessage) {
        let mut rooms = self.rooms.write().await;
        insert_ordered(rooms.entry(message.room.clone()).or_default(), message);
    }

    /// Every stored message, grouped by room and oldest first within a room
    pub async fn snapshot(&self) -> Vec<ChatMessage> {
        let rooms = self.rooms.read().await;
        rooms.values().flatten().cloned().collect()
    }
}

// Equal timestamps keep arrival order
fn insert_ordered(messages: &mut Vec<ChatMessage>, message: ChatMessage) {
    let at = messages.partition_point(|m| m.ts <= message.ts);
    messages.insert(at, message);
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn append(&self, room: &str, user: &str, text: &str, ts: i64) -> Result<ChatMessage> {
        let message = ChatMessage::new(room.to_string(), user.to_string(), text.to_string(), ts);
        self.insert(message.clone()).await;
        Ok(message)
    }

    async fn latest(&self, room: &str, limit: usize) -> Result<Vec<ChatMessage>> {
        let rooms = self.rooms.read().await;
        Ok(rooms
            .get(room)
            .map(|messages| messages.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn count(&self, room: &str) -> Result<usize> {
        let rooms = self.rooms.read().await;
        Ok(rooms.get(room).map_or(0, Vec::len))
    }

    async fn delete_oldest(&self, room: &str, n: usize) -> Result<usize> {
        let mut rooms = self.rooms.write().await;
        let Some(messages) = rooms.get_mut(room) else {
            return Ok(0);
        };

        let removed = n.min(messages.len());
        messages.drain(..removed);
        if messages.is_empty() {
            rooms.remove(room);
        }
        Ok(removed)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
