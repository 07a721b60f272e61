//! Protocol events exchanged over a connection

use serde::{Deserialize, Serialize};

use crate::core::message::{ChatMessage, MessageView, SystemNotice};
use crate::error::ChatError;

/// Client-to-server events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Join a room, leaving the current one first
    JoinRoom {
        #[serde(default)]
        room: Option<String>,
        #[serde(default)]
        user: Option<String>,
    },

    /// Leave the current room
    LeaveRoom,

    /// Send text to the current room
    SendMessage {
        #[serde(default)]
        text: Option<String>,
    },
}

/// Server-to-client events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Recent room history, oldest first, sent to the joining session only
    RoomHistory {
        room: String,
        messages: Vec<MessageView>,
    },

    /// Message broadcast to every occupant, sender included
    NewMessage { room: String, message: MessageView },

    /// Join/leave notice for the other occupants
    SystemMessage(SystemNotice),

    /// Error for the originating session
    #[serde(rename_all = "camelCase")]
    ErrorMessage {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        retry_after_ms: Option<u64>,
    },
}

impl ServerEvent {
    pub fn history(room: &str, messages: &[ChatMessage]) -> Self {
        Self::RoomHistory {
            room: room.to_string(),
            messages: messages.iter().map(MessageView::from).collect(),
        }
    }

    pub fn new_message(message: &ChatMessage) -> Self {
        Self::NewMessage {
            room: message.room.clone(),
            message: message.view(),
        }
    }

    /// Plain error without code
    pub fn error(message: impl Into<String>) -> Self {
        Self::ErrorMessage {
            message: message.into(),
            code: None,
            retry_after_ms: None,
        }
    }

    pub fn from_error(err: &ChatError) -> Self {
        Self::ErrorMessage {
            message: err.client_message(),
            code: err.code().map(str::to_string),
            retry_after_ms: err.retry_after_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rate_limiter::RateWindow;
    use serde_json::json;

    #[test]
    fn test_client_events_decode() {
        let join: ClientEvent =
            serde_json::from_str(r#"{"type":"joinRoom","room":" general ","user":"bob"}"#).unwrap();
        assert_eq!(
            join,
            ClientEvent::JoinRoom {
                room: Some(" general ".to_string()),
                user: Some("bob".to_string()),
            }
        );

        let leave: ClientEvent = serde_json::from_str(r#"{"type":"leaveRoom"}"#).unwrap();
        assert_eq!(leave, ClientEvent::LeaveRoom);

        let send: ClientEvent =
            serde_json::from_str(r#"{"type":"sendMessage","text":null}"#).unwrap();
        assert_eq!(send, ClientEvent::SendMessage { text: None });
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        assert!(serde_json::from_str::<ClientEvent>(r#"{"type":"kickUser"}"#).is_err());
    }

    #[test]
    fn test_rate_limit_error_payload() {
        let err = ChatError::RateLimited {
            window: RateWindow::Short,
            limit: 5,
            window_ms: 2000,
            retry_after_ms: 1234,
        };
        let value = serde_json::to_value(ServerEvent::from_error(&err)).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "errorMessage",
                "message": "Too many messages (max 5 / 2s).",
                "code": "RATE_LIMIT_SHORT",
                "retryAfterMs": 1234
            })
        );
    }

    #[test]
    fn test_plain_error_payload_has_no_code() {
        let value = serde_json::to_value(ServerEvent::from_error(&ChatError::NotInRoom)).unwrap();
        assert_eq!(value["type"], "errorMessage");
        assert!(value.get("code").is_none());
        assert!(value.get("retryAfterMs").is_none());
    }

    #[test]
    fn test_system_message_is_flat() {
        let notice = SystemNotice::joined("alice", 7);
        let value = serde_json::to_value(ServerEvent::SystemMessage(notice.clone())).unwrap();
        assert_eq!(value["type"], "systemMessage");
        assert_eq!(value["id"], notice.id);
        assert_eq!(value["text"], "alice joined the room");
        assert_eq!(value["ts"], 7);
    }
}
