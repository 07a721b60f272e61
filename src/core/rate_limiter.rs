//! Rate limiting module to prevent message flooding
//!
//! Every session carries two sliding windows: a short one for bursts and a
//! long one for sustained traffic. They are checked in that order.

use std::collections::VecDeque;
use std::fmt;

use crate::constants::{LONG_LIMIT, LONG_WINDOW_MS, SHORT_LIMIT, SHORT_WINDOW_MS};
use crate::error::{ChatError, Result};

/// Which window denied an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateWindow {
    Short,
    Long,
}

impl RateWindow {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Short => "RATE_LIMIT_SHORT",
            Self::Long => "RATE_LIMIT_LONG",
        }
    }
}

impl fmt::Display for RateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Short => write!(f, "short"),
            Self::Long => write!(f, "long"),
        }
    }
}

/// Limits for both windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub short_limit: usize,
    pub short_window_ms: u64,
    pub long_limit: usize,
    pub long_window_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            short_limit: SHORT_LIMIT,
            short_window_ms: SHORT_WINDOW_MS,
            long_limit: LONG_LIMIT,
            long_window_ms: LONG_WINDOW_MS,
        }
    }
}

impl RateLimitConfig {
    /// The short window must be the tighter one on both axes
    pub fn validate(&self) -> Result<()> {
        if self.short_limit == 0 || self.long_limit == 0 {
            return Err(ChatError::ConfigError(
                "Rate limits must be greater than zero".to_string(),
            ));
        }
        if self.short_window_ms == 0 || self.long_window_ms == 0 {
            return Err(ChatError::ConfigError(
                "Rate limit windows must be greater than zero".to_string(),
            ));
        }
        if self.short_limit >= self.long_limit {
            return Err(ChatError::ConfigError(format!(
                "Short limit ({}) must be below long limit ({})",
                self.short_limit, self.long_limit
            )));
        }
        if self.short_window_ms >= self.long_window_ms {
            return Err(ChatError::ConfigError(format!(
                "Short window ({}ms) must be below long window ({}ms)",
                self.short_window_ms, self.long_window_ms
            )));
        }
        Ok(())
    }
}

/// Timestamps of admitted events inside a trailing interval
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    limit: usize,
    window_ms: u64,
    hits: VecDeque<i64>,
}

impl SlidingWindow {
    pub fn new(limit: usize, window_ms: u64) -> Self {
        Self {
            limit,
            window_ms,
            hits: VecDeque::with_capacity(limit),
        }
    }

    /// Admit an event at `now`, or return how long until a slot frees up.
    ///
    /// Entries at or before `now - window_ms` are pruned first. A denied
    /// attempt keeps the pruned sequence but records nothing.
    pub fn try_acquire(&mut self, now: i64) -> std::result::Result<(), u64> {
        let cutoff = now - self.window_ms as i64;
        while self.hits.front().is_some_and(|&t| t <= cutoff) {
            self.hits.pop_front();
        }

        if self.hits.len() >= self.limit {
            let retry_after = self
                .hits
                .front()
                .map_or(0, |&oldest| (oldest + self.window_ms as i64 - now).max(0));
            return Err(retry_after as u64);
        }

        self.hits.push_back(now);
        Ok(())
    }

    /// Events currently recorded, including any not yet pruned
    pub fn recorded(&self) -> usize {
        self.hits.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }
}

/// Short-then-long admission control for one session
#[derive(Debug, Clone)]
pub struct DualWindowLimiter {
    short: SlidingWindow,
    long: SlidingWindow,
}

impl DualWindowLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            short: SlidingWindow::new(config.short_limit, config.short_window_ms),
            long: SlidingWindow::new(config.long_limit, config.long_window_ms),
        }
    }

    /// Check both windows for a send attempt at `now`.
    ///
    /// A short-window denial stops evaluation. When the short window admits
    /// and the long window denies, the short-window slot stays consumed.
    pub fn check(&mut self, now: i64) -> Result<()> {
        self.short
            .try_acquire(now)
            .map_err(|retry| Self::denial(RateWindow::Short, &self.short, retry))?;
        self.long
            .try_acquire(now)
            .map_err(|retry| Self::denial(RateWindow::Long, &self.long, retry))?;
        Ok(())
    }

    fn denial(window: RateWindow, state: &SlidingWindow, retry_after_ms: u64) -> ChatError {
        ChatError::RateLimited {
            window,
            limit: state.limit(),
            window_ms: state.window_ms(),
            retry_after_ms,
        }
    }

    pub fn short(&self) -> &SlidingWindow {
        &self.short
    }

    pub fn long(&self) -> &SlidingWindow {
        &self.long
    }
}
