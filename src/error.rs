use std::error::Error;
use std::fmt;

use crate::core::rate_limiter::RateWindow;

#[derive(Debug, Clone, PartialEq)]
pub enum ChatError {
    // Input errors
    Validation(String),

    // Admission errors
    RateLimited {
        window: RateWindow,
        limit: usize,
        window_ms: u64,
        retry_after_ms: u64,
    },

    // Session errors
    NotInRoom,

    // Storage errors
    Store(String),

    // Messages errors
    MessageParseError(String),
    MessageTooLarge(usize),

    // Configuration errors
    ConfigError(String),
}

impl ChatError {
    /// Machine-readable code sent alongside the error, only for rate limit denials
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::RateLimited { window, .. } => Some(window.code()),
            _ => None,
        }
    }

    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_ms, .. } => Some(*retry_after_ms),
            _ => None,
        }
    }

    /// Text shown to the client. Storage details stay in the server log.
    pub fn client_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::RateLimited {
                limit, window_ms, ..
            } => format!(
                "Too many messages (max {} / {}s).",
                limit,
                *window_ms as f64 / 1000.0
            ),
            Self::NotInRoom => "You are not in a room.".to_string(),
            Self::Store(_) => "Saving the message failed.".to_string(),
            Self::MessageParseError(_) => "Malformed request.".to_string(),
            Self::MessageTooLarge(_) => "Request too large.".to_string(),
            Self::ConfigError(_) => "Internal server error.".to_string(),
        }
    }
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "Validation error: {}", msg),
            Self::RateLimited {
                window,
                retry_after_ms,
                ..
            } => write!(
                f,
                "Rate limited by {} window, retry after {}ms",
                window, retry_after_ms
            ),
            Self::NotInRoom => write!(f, "Session is not in a room"),
            Self::Store(msg) => write!(f, "Storage error: {}", msg),
            Self::MessageParseError(msg) => write!(f, "Message parse error: {}", msg),
            Self::MessageTooLarge(size) => write!(f, "Message too large: {} bytes", size),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for ChatError {}

impl From<std::io::Error> for ChatError {
    fn from(err: std::io::Error) -> Self {
        ChatError::Store(err.to_string())
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        ChatError::MessageParseError(err.to_string())
    }
}

// Generic result type for the chat server
pub type Result<T> = std::result::Result<T, ChatError>;
