use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::SYSTEM_ID_PREFIX;

/// A message accepted into a room and persisted by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub room: String,
    pub user: String,
    pub text: String,
    /// Acceptance time in epoch milliseconds, also the trim cursor
    pub ts: i64,
}

impl ChatMessage {
    pub fn new(room: String, user: String, text: String, ts: i64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            room,
            user,
            text,
            ts,
        }
    }

    pub fn view(&self) -> MessageView {
        MessageView::from(self)
    }
}

/// Message as delivered to clients; the room travels in the envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageView {
    pub id: String,
    pub user: String,
    pub text: String,
    pub ts: i64,
}

impl From<&ChatMessage> for MessageView {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            id: msg.id.clone(),
            user: msg.user.clone(),
            text: msg.text.clone(),
            ts: msg.ts,
        }
    }
}

/// Join/leave announcement. Never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemNotice {
    pub id: String,
    pub text: String,
    pub ts: i64,
}

impl SystemNotice {
    pub fn new(text: String, ts: i64) -> Self {
        Self {
            id: format!("{}{}", SYSTEM_ID_PREFIX, Uuid::new_v4()),
            text,
            ts,
        }
    }

    pub fn joined(user: &str, ts: i64) -> Self {
        Self::new(format!("{} joined the room", user), ts)
    }

    pub fn left(user: &str, ts: i64) -> Self {
        Self::new(format!("{} left the room", user), ts)
    }
}
