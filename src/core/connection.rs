//! Outbound half of a client connection

use log::warn;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::core::message_types::ServerEvent;

/// Handle used to push events to one client
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: String,
    pub sender: mpsc::UnboundedSender<ServerEvent>,
    pub connected_at: Instant,
}

impl Connection {
    /// Create a new connection with a unique ID
    pub fn new(sender: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), sender)
    }

    pub fn with_id(id: String, sender: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self {
            id,
            sender,
            connected_at: Instant::now(),
        }
    }

    /// Queue an event for this client. Fails only once the client is gone.
    pub fn send(&self, event: ServerEvent) -> bool {
        match self.sender.send(event) {
            Ok(_) => true,
            Err(_) => {
                warn!("Failed to deliver event to client {}", self.id);
                false
            }
        }
    }

    pub fn connection_duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
