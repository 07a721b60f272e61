//! Decodes inbound frames and routes them to the chat server

use log::{debug, warn};

use crate::constants::MAX_FRAME_BYTES;
use crate::core::message_types::{ClientEvent, ServerEvent};
use crate::core::server::SharedChatServer;
use crate::core::session::{LeaveReason, Session};
use crate::error::{ChatError, Result};

/// Handles incoming client frames for one session at a time
#[derive(Clone)]
pub struct MessageHandler {
    server: SharedChatServer,
}

impl MessageHandler {
    pub fn new(server: SharedChatServer) -> Self {
        Self { server }
    }

    pub fn server(&self) -> &SharedChatServer {
        &self.server
    }

    /// Process a text frame and report any error back to the session
    pub async fn handle_frame(&self, session: &mut Session, frame: &str) {
        if let Err(e) = self.handle_client_message(session, frame).await {
            match &e {
                ChatError::RateLimited { .. } | ChatError::Validation(_) | ChatError::NotInRoom => {
                    debug!("Request from {} rejected: {}", session.id(), e);
                }
                _ => {
                    warn!("Request from {} failed: {}", session.id(), e);
                }
            }
            session.notify(ServerEvent::from_error(&e));
        }
    }

    /// Decode a frame and dispatch it
    pub async fn handle_client_message(&self, session: &mut Session, frame: &str) -> Result<()> {
        if frame.len() > MAX_FRAME_BYTES {
            return Err(ChatError::MessageTooLarge(frame.len()));
        }

        let event: ClientEvent = serde_json::from_str(frame)?;
        self.dispatch(session, event).await
    }

    pub async fn dispatch(&self, session: &mut Session, event: ClientEvent) -> Result<()> {
        match event {
            ClientEvent::JoinRoom { room, user } => {
                self.server
                    .join(session, room.as_deref(), user.as_deref())
                    .await?;
            }
            ClientEvent::LeaveRoom => {
                self.server.leave(session, LeaveReason::LeaveRoom).await;
            }
            ClientEvent::SendMessage { text } => {
                self.server.send(session, text.as_deref()).await?;
            }
        }
        Ok(())
    }

    /// Connection teardown: leave the current room, if any
    pub async fn disconnect(&self, session: &mut Session) {
        self.server.leave(session, LeaveReason::Disconnect).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::core::connection::Connection;
    use crate::core::server::ChatServer;
    use crate::storage::memory::MemoryMessageStore;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn handler() -> MessageHandler {
        let server = ChatServer::new(Arc::new(MemoryMessageStore::new()), &ServerConfig::default());
        MessageHandler::new(Arc::new(server))
    }

    #[tokio::test]
    async fn test_malformed_frame_reports_error_without_code() {
        let handler = handler();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = handler.server().open_session(Connection::new(tx));

        handler.handle_frame(&mut session, "{\"type\":").await;
        match rx.recv().await {
            Some(ServerEvent::ErrorMessage { code, .. }) => assert!(code.is_none()),
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() {
        let handler = handler();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut session = handler.server().open_session(Connection::new(tx));

        let frame = format!(
            r#"{{"type":"sendMessage","text":"{}"}}"#,
            "x".repeat(MAX_FRAME_BYTES)
        );
        let err = handler.handle_client_message(&mut session, &frame).await;
        assert!(matches!(err, Err(ChatError::MessageTooLarge(_))));
    }

    #[tokio::test]
    async fn test_join_frame_delivers_history() {
        let handler = handler();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = handler.server().open_session(Connection::new(tx));

        handler
            .handle_frame(&mut session, r#"{"type":"joinRoom","room":"general","user":"A"}"#)
            .await;
        assert_eq!(session.room(), Some("general"));
        assert_eq!(
            rx.recv().await,
            Some(ServerEvent::RoomHistory {
                room: "general".to_string(),
                messages: vec![],
            })
        );
    }
}
