//! Integrated server service that coordinates sessions, rooms and storage

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::clock::{Clock, SystemClock};
use crate::core::connection::Connection;
use crate::core::message::{ChatMessage, SystemNotice};
use crate::core::message_types::ServerEvent;
use crate::core::rate_limiter::RateLimitConfig;
use crate::core::room::RoomRegistry;
use crate::core::session::{
    normalize_display_name, normalize_room, normalize_text, JoinPlan, LeaveReason, Session,
};
use crate::error::{ChatError, Result};
use crate::storage::traits::SharedMessageStore;

/// Result of a successful join request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Same room as before; display name updated, nothing announced
    Rejoined,
    /// Entered the room. `history_delivered` is false when the history fetch failed.
    Joined { history_delivered: bool },
}

/// Runs join, leave and send for sessions against the shared room registry
pub struct ChatServer {
    rooms: RoomRegistry,
    store: SharedMessageStore,
    clock: Arc<dyn Clock>,
    rate_limits: RateLimitConfig,
    max_history: usize,
    /// Last timestamp handed out, keeps acceptance times non-decreasing
    last_ts: AtomicI64,
}

impl ChatServer {
    pub fn new(store: SharedMessageStore, config: &ServerConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: SharedMessageStore,
        config: &ServerConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            rooms: RoomRegistry::new(),
            store,
            clock,
            rate_limits: config.rate_limits,
            max_history: config.max_history,
            last_ts: AtomicI64::new(i64::MIN),
        }
    }

    /// Create the idle session for a freshly opened connection
    pub fn open_session(&self, connection: Connection) -> Session {
        Session::new(connection, self.rate_limits)
    }

    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    pub fn store(&self) -> &SharedMessageStore {
        &self.store
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    fn next_timestamp(&self) -> i64 {
        let now = self.clock.now_millis();
        let previous = self.last_ts.fetch_max(now, Ordering::SeqCst);
        previous.max(now)
    }

    /// Join a room, leaving the current one first when switching.
    ///
    /// History is delivered after registration; a failed history fetch is
    /// reported to the session but leaves the join in place.
    pub async fn join(
        &self,
        session: &mut Session,
        room: Option<&str>,
        user: Option<&str>,
    ) -> Result<JoinOutcome> {
        let room = normalize_room(room)?;
        let display_name = normalize_display_name(user);

        match session.plan_join(&room) {
            JoinPlan::Rejoin => {
                log::debug!(
                    "Client {} re-joined {} as {}",
                    session.id(),
                    room,
                    display_name
                );
                session.rename(display_name);
                return Ok(JoinOutcome::Rejoined);
            }
            JoinPlan::Switch { from } => {
                log::info!("Client {} switching from {} to {}", session.id(), from, room);
                self.leave(session, LeaveReason::Switch).await;
            }
            JoinPlan::Fresh => {}
        }

        session.enter(room.clone(), display_name.clone());
        self.rooms.register(&room, session.connection()).await;
        log::info!(
            "Client {} joined {} as {} ({} occupants)",
            session.id(),
            room,
            display_name,
            self.rooms.occupant_count(&room).await
        );

        let notice = SystemNotice::joined(&display_name, self.clock.now_millis());
        self.rooms
            .broadcast(&room, &ServerEvent::SystemMessage(notice), Some(session.id()))
            .await;

        let history_delivered = match self.history(&room).await {
            Ok(messages) => {
                session.notify(ServerEvent::history(&room, &messages));
                true
            }
            Err(e) => {
                log::error!("History fetch for {} failed: {}", room, e);
                session.notify(ServerEvent::error("Fetching room history failed."));
                false
            }
        };

        Ok(JoinOutcome::Joined { history_delivered })
    }

    /// Oldest-first window of the most recent messages in a room
    pub async fn history(&self, room: &str) -> Result<Vec<ChatMessage>> {
        let mut messages = self.store.latest(room, self.max_history).await?;
        messages.reverse();
        Ok(messages)
    }

    /// Leave the current room. Returns false when there was nothing to leave.
    pub async fn leave(&self, session: &mut Session, reason: LeaveReason) -> bool {
        let Some(departure) = session.depart() else {
            return false;
        };

        let notice = SystemNotice::left(&departure.display_name, self.clock.now_millis());
        self.rooms
            .broadcast(
                &departure.room,
                &ServerEvent::SystemMessage(notice),
                Some(session.id()),
            )
            .await;
        self.rooms.deregister(&departure.room, session.id()).await;

        log::info!(
            "Client {} left {} ({})",
            session.id(),
            departure.room,
            reason
        );
        true
    }

    /// Send text to the session's room.
    ///
    /// Whitespace-only text is dropped and yields `Ok(None)`. On success the
    /// message is stored, broadcast to every occupant including the sender,
    /// and the room is trimmed.
    pub async fn send(
        &self,
        session: &mut Session,
        text: Option<&str>,
    ) -> Result<Option<ChatMessage>> {
        let Some(room) = session.room().map(str::to_string) else {
            return Err(ChatError::NotInRoom);
        };
        let Some(text) = normalize_text(text) else {
            return Ok(None);
        };

        session.admit(self.clock.now_millis())?;

        let ts = self.next_timestamp();
        let message = self
            .store
            .append(&room, session.display_name(), &text, ts)
            .await
            .map_err(|e| {
                log::error!("Saving message from {} failed: {}", session.id(), e);
                e
            })?;

        let delivered = self
            .rooms
            .broadcast(&room, &ServerEvent::new_message(&message), None)
            .await;
        log::debug!(
            "Broadcast message {} to {} clients in {}",
            message.id,
            delivered,
            room
        );

        self.trim(&room).await;
        Ok(Some(message))
    }

    /// Drop the oldest messages once a room holds more than `max_history`.
    ///
    /// Failures are logged only; concurrent appends may briefly exceed the bound.
    pub async fn trim(&self, room: &str) -> usize {
        let count = match self.store.count(room).await {
            Ok(count) => count,
            Err(e) => {
                log::error!("Counting messages in {} failed: {}", room, e);
                return 0;
            }
        };
        if count <= self.max_history {
            return 0;
        }

        let excess = count - self.max_history;
        match self.store.delete_oldest(room, excess).await {
            Ok(removed) => {
                log::debug!("Trimmed {} messages from {}", removed, room);
                removed
            }
            Err(e) => {
                log::error!("Trimming {} failed: {}", room, e);
                0
            }
        }
    }
}

// Shared reference to the chat server
pub type SharedChatServer = Arc<ChatServer>;
