//! Core functionality for the chat server

pub mod clock;
pub mod connection;
pub mod message;
pub mod message_handler;
pub mod message_types;
pub mod rate_limiter;
pub mod room;
pub mod server;
pub mod session;

// Re-export main components for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use connection::Connection;
pub use message::{ChatMessage, MessageView, SystemNotice};
pub use message_handler::MessageHandler;
pub use message_types::{ClientEvent, ServerEvent};
pub use rate_limiter::{DualWindowLimiter, RateLimitConfig, RateWindow, SlidingWindow};
pub use room::RoomRegistry;
pub use server::{ChatServer, JoinOutcome, SharedChatServer};
pub use session::{LeaveReason, Session};
