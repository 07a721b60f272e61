use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::core::connection::Connection;
use crate::core::message_types::ServerEvent;

/// Tracks which connections occupy which room.
///
/// Rooms have no lifecycle of their own: a room exists while it has at
/// least one occupant and is dropped from the map when the last one leaves.
pub struct RoomRegistry {
    /// Map of room name to occupants keyed by connection ID
    rooms: RwLock<HashMap<String, HashMap<String, Connection>>>,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Adds a connection to a room. Returns false if it was already there.
    pub async fn register(&self, room: &str, connection: &Connection) -> bool {
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(room.to_string())
            .or_default()
            .insert(connection.id.clone(), connection.clone())
            .is_none()
    }

    /// Removes a connection from a room. Returns false if it was not there.
    pub async fn deregister(&self, room: &str, connection_id: &str) -> bool {
        let mut rooms = self.rooms.write().await;
        let Some(occupants) = rooms.get_mut(room) else {
            return false;
        };

        let removed = occupants.remove(connection_id).is_some();
        if occupants.is_empty() {
            rooms.remove(room);
        }
        removed
    }

    /// Consistent copy of a room's occupants at this instant
    pub async fn occupants(&self, room: &str) -> Vec<Connection> {
        let rooms = self.rooms.read().await;
        rooms
            .get(room)
            .map(|occupants| occupants.values().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn occupant_count(&self, room: &str) -> usize {
        let rooms = self.rooms.read().await;
        rooms.get(room).map_or(0, HashMap::len)
    }

    pub async fn is_occupant(&self, room: &str, connection_id: &str) -> bool {
        let rooms = self.rooms.read().await;
        rooms
            .get(room)
            .is_some_and(|occupants| occupants.contains_key(connection_id))
    }

    /// List occupied rooms with their occupant counts
    pub async fn rooms(&self) -> Vec<(String, usize)> {
        let rooms = self.rooms.read().await;
        let mut listing: Vec<(String, usize)> = rooms
            .iter()
            .map(|(name, occupants)| (name.clone(), occupants.len()))
            .collect();
        listing.sort();
        listing
    }

    /// Deliver an event to every occupant of a room, optionally skipping one.
    ///
    /// The occupant set is snapshotted and the lock released before any
    /// delivery. A failed delivery is logged and does not affect the others.
    pub async fn broadcast(
        &self,
        room: &str,
        event: &ServerEvent,
        exclude: Option<&str>,
    ) -> usize {
        let recipients = self.occupants(room).await;

        let mut delivered = 0;
        for connection in recipients {
            if exclude == Some(connection.id.as_str()) {
                continue;
            }
            if connection.send(event.clone()) {
                log::trace!("Event delivered to {}", connection.id);
                delivered += 1;
            }
        }

        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn connection(id: &str) -> (Connection, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Connection::with_id(id.to_string(), tx), rx)
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let registry = RoomRegistry::new();
        let (a, _rx) = connection("a");

        assert!(registry.register("general", &a).await);
        assert!(!registry.register("general", &a).await);
        assert_eq!(registry.occupant_count("general").await, 1);
    }

    #[tokio::test]
    async fn test_deregister_drops_empty_room() {
        let registry = RoomRegistry::new();
        let (a, _rx) = connection("a");

        registry.register("general", &a).await;
        assert!(registry.deregister("general", "a").await);
        assert!(!registry.deregister("general", "a").await);
        assert!(registry.rooms().await.is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_excludes_sender() {
        let registry = RoomRegistry::new();
        let (a, mut rx_a) = connection("a");
        let (b, mut rx_b) = connection("b");
        registry.register("general", &a).await;
        registry.register("general", &b).await;

        let event = ServerEvent::error("ping");
        assert_eq!(registry.broadcast("general", &event, Some("a")).await, 1);
        assert_eq!(rx_b.recv().await, Some(event));
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_survives_closed_receiver() {
        let registry = RoomRegistry::new();
        let (a, rx_a) = connection("a");
        let (b, mut rx_b) = connection("b");
        registry.register("general", &a).await;
        registry.register("general", &b).await;
        drop(rx_a);

        let event = ServerEvent::error("ping");
        assert_eq!(registry.broadcast("general", &event, None).await, 1);
        assert_eq!(rx_b.recv().await, Some(event));
    }

    #[tokio::test]
    async fn test_rooms_listing() {
        let registry = RoomRegistry::new();
        let (a, _rx_a) = connection("a");
        let (b, _rx_b) = connection("b");
        registry.register("music", &a).await;
        registry.register("general", &b).await;
        registry.register("music", &b).await;

        assert_eq!(
            registry.rooms().await,
            vec![("general".to_string(), 1), ("music".to_string(), 2)]
        );
        assert!(registry.is_occupant("music", "b").await);
        assert!(!registry.is_occupant("general", "a").await);
    }
}
