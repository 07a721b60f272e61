//! Per-connection session state
//!
//! A session is either idle (no room) or joined to exactly one room. The
//! `has_left` guard makes leaving idempotent no matter which path ends the
//! membership: an explicit leave, a room switch or a disconnect.

use crate::constants::ANONYMOUS_NAME;
use crate::core::connection::Connection;
use crate::core::message_types::ServerEvent;
use crate::core::rate_limiter::{DualWindowLimiter, RateLimitConfig};
use crate::error::{ChatError, Result};

/// Why a membership ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveReason {
    LeaveRoom,
    Switch,
    Disconnect,
}

impl std::fmt::Display for LeaveReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LeaveRoom => write!(f, "leaveRoom"),
            Self::Switch => write!(f, "switch"),
            Self::Disconnect => write!(f, "disconnect"),
        }
    }
}

/// What a join request amounts to given the current state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinPlan {
    /// Already in this room; only the display name changes
    Rejoin,
    /// Not in any room
    Fresh,
    /// In another room that must be left first
    Switch { from: String },
}

/// Membership released by a leave, used for the leave notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub room: String,
    pub display_name: String,
}

pub struct Session {
    connection: Connection,
    room: Option<String>,
    display_name: Option<String>,
    has_left: bool,
    limiter: DualWindowLimiter,
}

impl Session {
    pub fn new(connection: Connection, limits: RateLimitConfig) -> Self {
        Self {
            connection,
            room: None,
            display_name: None,
            has_left: false,
            limiter: DualWindowLimiter::new(limits),
        }
    }

    pub fn id(&self) -> &str {
        &self.connection.id
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    pub fn is_joined(&self) -> bool {
        self.room.is_some()
    }

    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(ANONYMOUS_NAME)
    }

    pub fn has_left(&self) -> bool {
        self.has_left
    }

    /// Push an event to this session's own client
    pub fn notify(&self, event: ServerEvent) -> bool {
        self.connection.send(event)
    }

    /// Classify a join to an already normalized room name
    pub fn plan_join(&self, room: &str) -> JoinPlan {
        match self.room.as_deref() {
            Some(current) if current == room => JoinPlan::Rejoin,
            Some(current) => JoinPlan::Switch {
                from: current.to_string(),
            },
            None => JoinPlan::Fresh,
        }
    }

    pub fn rename(&mut self, display_name: String) {
        self.display_name = Some(display_name);
    }

    /// Enter a room, resetting the leave guard for the new membership
    pub fn enter(&mut self, room: String, display_name: String) {
        self.has_left = false;
        self.room = Some(room);
        self.display_name = Some(display_name);
    }

    /// End the current membership. Returns `None` when there is nothing to leave.
    pub fn depart(&mut self) -> Option<Departure> {
        if self.has_left || self.room.is_none() {
            return None;
        }

        self.has_left = true;
        let display_name = self.display_name().to_string();
        let room = self.room.take()?;
        self.display_name = None;

        Some(Departure { room, display_name })
    }

    /// Run rate admission for a send attempt at `now`
    pub fn admit(&mut self, now: i64) -> Result<()> {
        if self.room.is_none() {
            return Err(ChatError::NotInRoom);
        }
        self.limiter.check(now)
    }

    pub fn limiter(&self) -> &DualWindowLimiter {
        &self.limiter
    }
}

/// Trim a requested room name; empty names are rejected
pub fn normalize_room(raw: Option<&str>) -> Result<String> {
    let room = raw.unwrap_or_default().trim();
    if room.is_empty() {
        return Err(ChatError::Validation("Room name missing.".to_string()));
    }
    Ok(room.to_string())
}

/// Trim a requested display name, falling back to the anonymous name
pub fn normalize_display_name(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => ANONYMOUS_NAME.to_string(),
    }
}

/// Trim message text; whitespace-only text is dropped
pub fn normalize_text(raw: Option<&str>) -> Option<String> {
    let text = raw.unwrap_or_default().trim();
    (!text.is_empty()).then(|| text.to_string())
}
