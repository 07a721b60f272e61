//! Time-bounded wrapper around any message store

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use super::traits::{MessageStore, SharedMessageStore};
use crate::core::message::ChatMessage;
use crate::error::{ChatError, Result};

/// Fails any store call that runs longer than the configured timeout
pub struct TimeoutStore {
    inner: SharedMessageStore,
    timeout: Duration,
}

impl TimeoutStore {
    pub fn new(inner: SharedMessageStore, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T>(&self, op: &str, fut: impl Future<Output = Result<T>> + Send) -> Result<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(ChatError::Store(format!(
                "{} timed out after {}ms",
                op,
                self.timeout.as_millis()
            ))),
        }
    }
}

#[async_trait]
impl MessageStore for TimeoutStore {
    async fn append(&self, room: &str, user: &str, text: &str, ts: i64) -> Result<ChatMessage> {
        self.bounded("append", self.inner.append(room, user, text, ts))
            .await
    }

    async fn latest(&self, room: &str, limit: usize) -> Result<Vec<ChatMessage>> {
        self.bounded("latest", self.inner.latest(room, limit)).await
    }

    async fn count(&self, room: &str) -> Result<usize> {
        self.bounded("count", self.inner.count(room)).await
    }

    async fn delete_oldest(&self, room: &str, n: usize) -> Result<usize> {
        self.bounded("delete_oldest", self.inner.delete_oldest(room, n))
            .await
    }

    async fn ping(&self) -> Result<()> {
        self.bounded("ping", self.inner.ping()).await
    }
}
