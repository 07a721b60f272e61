//! Storage mechanisms for persisting and retrieving room messages

pub mod file;
pub mod memory;
pub mod timeout;
pub mod traits;

pub use file::FileMessageStore;
pub use memory::MemoryMessageStore;
pub use timeout::TimeoutStore;
pub use traits::{MessageStore, SharedMessageStore};

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::error::Result;

/// Open the configured backend, bound its calls by the store timeout and
/// check that it answers. Any error here is fatal at startup.
pub async fn open_store(config: &ServerConfig) -> Result<SharedMessageStore> {
    let backend: SharedMessageStore = match &config.store_path {
        Some(path) => {
            log::info!("Using message log at {}", path.display());
            Arc::new(FileMessageStore::open(path).await?)
        }
        None => {
            log::warn!("RUSTY_ROOMS_STORE_PATH not set, messages are kept in memory only");
            Arc::new(MemoryMessageStore::new())
        }
    };

    let store: SharedMessageStore = Arc::new(TimeoutStore::new(backend, config.store_timeout));
    store.ping().await?;
    Ok(store)
}
