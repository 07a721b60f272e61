// Fundamental configuration constants
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3001;
pub const WS_PATH: &str = "ws";
pub const DEFAULT_CLIENT_ORIGIN: &str = "http://localhost:5173";

// Room history retention
pub const MAX_HISTORY: usize = 50;

// Message rate limiting (burst window, then sustained window)
pub const SHORT_LIMIT: usize = 5;
pub const SHORT_WINDOW_MS: u64 = 2_000;
pub const LONG_LIMIT: usize = 10;
pub const LONG_WINDOW_MS: u64 = 30_000;

// Store calls that take longer than this fail with a storage error
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;

// Inbound frames larger than this are rejected before decoding
pub const MAX_FRAME_BYTES: usize = 8 * 1024;

pub const ANONYMOUS_NAME: &str = "Anonymous";
pub const SYSTEM_ID_PREFIX: &str = "sys-";
