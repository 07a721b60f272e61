//! Rusty Rooms - room-scoped real-time group chat over WebSocket
//!
//! Clients join a named room, receive its recent history and exchange
//! messages with everyone else in the room. Sends are guarded by a
//! per-connection dual sliding-window rate limiter and each room's stored
//! history is trimmed to a fixed size.

pub mod config;
pub mod constants;
pub mod core;
pub mod error;
pub mod handlers;
pub mod storage;

// Re-export main components
pub use config::*;
pub use constants::*;
