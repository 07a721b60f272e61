//! Durable message store backed by a JSON-lines log
//!
//! Each line holds one serialized `ChatMessage`. The whole log is loaded at
//! startup into a `MemoryMessageStore` that serves reads; appends go to both.
//! Trimming rewrites the log through a temporary file and an atomic rename.
//!
//! Writes run on their own task so a caller that gives up (for example a
//! store timeout) never leaves the log and the index disagreeing. A failed
//! append truncates the log back to its previous length.

use async_trait::async_trait;
use std::ffi::OsString;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::memory::MemoryMessageStore;
use super::traits::MessageStore;
use crate::core::message::ChatMessage;
use crate::error::{ChatError, Result};

pub struct FileMessageStore {
    inner: Arc<LogState>,
}

struct LogState {
    path: PathBuf,
    index: MemoryMessageStore,
    /// Append handle; the lock also orders log writes with index updates
    log: Mutex<File>,
}

/// How the last line of a loaded log ended
#[derive(Debug, PartialEq)]
enum Tail {
    Clean,
    /// A complete record missing its newline
    Unterminated,
    /// An interrupted write; everything from `intact_len` on is dropped
    Torn { intact_len: u64 },
}

impl FileMessageStore {
    /// Open or create the log at `path` and load its contents
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let (messages, tail) = match fs::read_to_string(&path).await {
            Ok(contents) => parse_log(&path, &contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (Vec::new(), Tail::Clean),
            Err(e) => return Err(e.into()),
        };
        log::info!(
            "Loaded {} messages from {}",
            messages.len(),
            path.display()
        );

        let mut file = open_append(&path).await?;
        match tail {
            Tail::Clean => {}
            Tail::Unterminated => {
                file.write_all(b"\n").await?;
                file.flush().await?;
            }
            Tail::Torn { intact_len } => {
                log::warn!(
                    "Dropping incomplete final record in {} at byte {}",
                    path.display(),
                    intact_len
                );
                file.set_len(intact_len).await?;
            }
        }

        Ok(Self {
            inner: Arc::new(LogState {
                path,
                index: MemoryMessageStore::from_messages(messages),
                log: Mutex::new(file),
            }),
        })
    }
}

impl LogState {
    async fn append_line(&self, line: String, message: ChatMessage) -> Result<()> {
        let mut file = self.log.lock().await;
        let len = file.metadata().await?.len();

        if let Err(e) = write_line(&mut file, &line).await {
            if let Err(rollback) = file.set_len(len).await {
                log::error!(
                    "Failed to roll back partial write in {}: {}",
                    self.path.display(),
                    rollback
                );
            }
            return Err(e.into());
        }

        self.index.insert(message).await;
        Ok(())
    }

    /// Rewrite the log without the `n` oldest records of `room`, then drop
    /// them from the index
    async fn trim(&self, room: &str, n: usize) -> Result<usize> {
        let mut file = self.log.lock().await;

        let mut skipped = 0;
        let mut contents = String::new();
        for message in self.index.snapshot().await {
            if message.room == room && skipped < n {
                skipped += 1;
                continue;
            }
            contents.push_str(&encode_line(&message)?);
        }
        if skipped == 0 {
            return Ok(0);
        }

        let tmp = temp_path(&self.path);
        fs::write(&tmp, contents).await?;
        fs::rename(&tmp, &self.path).await?;
        let removed = self.index.delete_oldest(room, skipped).await?;
        *file = open_append(&self.path).await?;
        Ok(removed)
    }
}

#[async_trait]
impl MessageStore for FileMessageStore {
    async fn append(&self, room: &str, user: &str, text: &str, ts: i64) -> Result<ChatMessage> {
        let message = ChatMessage::new(room.to_string(), user.to_string(), text.to_string(), ts);
        let line = encode_line(&message)?;

        let state = self.inner.clone();
        let stored = message.clone();
        detached(async move { state.append_line(line, stored).await }).await?;
        Ok(message)
    }

    async fn latest(&self, room: &str, limit: usize) -> Result<Vec<ChatMessage>> {
        self.inner.index.latest(room, limit).await
    }

    async fn count(&self, room: &str) -> Result<usize> {
        self.inner.index.count(room).await
    }

    async fn delete_oldest(&self, room: &str, n: usize) -> Result<usize> {
        let state = self.inner.clone();
        let room = room.to_string();
        detached(async move { state.trim(&room, n).await }).await
    }

    async fn ping(&self) -> Result<()> {
        let _file = self.inner.log.lock().await;
        fs::metadata(&self.inner.path).await?;
        Ok(())
    }
}

/// Run `fut` to completion even if the caller stops waiting for it
async fn detached<T, F>(fut: F) -> Result<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    tokio::spawn(fut)
        .await
        .map_err(|e| ChatError::Store(format!("Store task failed: {}", e)))?
}

async fn write_line(file: &mut File, line: &str) -> std::io::Result<()> {
    file.write_all(line.as_bytes()).await?;
    file.flush().await
}

/// Parse every complete line strictly; only the final line may be cut short
fn parse_log(path: &Path, contents: &str) -> Result<(Vec<ChatMessage>, Tail)> {
    let (body, tail) = match contents.rfind('\n') {
        Some(i) => contents.split_at(i + 1),
        None => ("", contents),
    };

    let mut messages = body
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).map_err(|e| {
                ChatError::Store(format!(
                    "Corrupt record at {}:{}: {}",
                    path.display(),
                    n + 1,
                    e
                ))
            })
        })
        .collect::<Result<Vec<ChatMessage>>>()?;

    if tail.trim().is_empty() {
        return Ok((messages, Tail::Clean));
    }
    match serde_json::from_str::<ChatMessage>(tail) {
        Ok(message) => {
            messages.push(message);
            Ok((messages, Tail::Unterminated))
        }
        Err(_) => Ok((
            messages,
            Tail::Torn {
                intact_len: body.len() as u64,
            },
        )),
    }
}

fn encode_line(message: &ChatMessage) -> Result<String> {
    let mut line = serde_json::to_string(message)
        .map_err(|e| ChatError::Store(format!("Failed to encode message: {}", e)))?;
    line.push('\n');
    Ok(line)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut tmp = OsString::from(path.as_os_str());
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

async fn open_append(path: &Path) -> Result<File> {
    Ok(OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("rusty-rooms-{}", uuid::Uuid::new_v4()))
            .join(name)
    }

    async fn texts(store: &FileMessageStore, room: &str) -> Vec<String> {
        store
            .latest(room, 100)
            .await
            .unwrap()
            .into_iter()
            .rev()
            .map(|m| m.text)
            .collect()
    }

    #[tokio::test]
    async fn test_messages_survive_reopen() {
        let path = scratch_path("messages.jsonl");
        {
            let store = FileMessageStore::open(&path).await.unwrap();
            store.append("general", "alice", "hello", 1).await.unwrap();
            store.append("general", "bob", "hi", 2).await.unwrap();
            store.append("music", "bob", "la", 3).await.unwrap();
        }

        let store = FileMessageStore::open(&path).await.unwrap();
        assert_eq!(store.count("general").await.unwrap(), 2);
        let latest = store.latest("general", 1).await.unwrap();
        assert_eq!(latest[0].text, "hi");
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_trim_is_persisted() {
        let path = scratch_path("messages.jsonl");
        {
            let store = FileMessageStore::open(&path).await.unwrap();
            for i in 0..5 {
                store
                    .append("general", "alice", &format!("m{}", i), i)
                    .await
                    .unwrap();
            }
            assert_eq!(store.delete_oldest("general", 3).await.unwrap(), 3);
            // Appends after compaction land in the new log
            store.append("general", "alice", "m5", 5).await.unwrap();
        }

        let store = FileMessageStore::open(&path).await.unwrap();
        assert_eq!(texts(&store, "general").await, vec!["m3", "m4", "m5"]);
    }

    #[tokio::test]
    async fn test_corrupt_log_fails_to_open() {
        let path = scratch_path("broken.jsonl");
        fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        fs::write(&path, "{not json}\n").await.unwrap();

        let result = FileMessageStore::open(&path).await;
        assert!(matches!(result, Err(ChatError::Store(_))));
    }

    #[tokio::test]
    async fn test_torn_final_record_is_dropped() {
        let path = scratch_path("messages.jsonl");
        {
            let store = FileMessageStore::open(&path).await.unwrap();
            store.append("general", "alice", "kept", 1).await.unwrap();
        }
        let mut file = open_append(&path).await.unwrap();
        file.write_all(br#"{"id":"abc","room":"gen"#).await.unwrap();
        file.flush().await.unwrap();
        drop(file);

        {
            let store = FileMessageStore::open(&path).await.unwrap();
            assert_eq!(texts(&store, "general").await, vec!["kept"]);
            store.append("general", "bob", "after", 2).await.unwrap();
        }

        // The next append starts on a fresh line, so the log stays readable
        let store = FileMessageStore::open(&path).await.unwrap();
        assert_eq!(texts(&store, "general").await, vec!["kept", "after"]);
    }

    #[tokio::test]
    async fn test_unterminated_final_record_is_kept() {
        let path = scratch_path("messages.jsonl");
        let record = ChatMessage::new("general".into(), "alice".into(), "first".into(), 1);
        fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        fs::write(&path, serde_json::to_string(&record).unwrap())
            .await
            .unwrap();

        {
            let store = FileMessageStore::open(&path).await.unwrap();
            store.append("general", "bob", "second", 2).await.unwrap();
        }

        let store = FileMessageStore::open(&path).await.unwrap();
        assert_eq!(texts(&store, "general").await, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_abandoned_append_keeps_log_and_index_in_step() {
        let path = scratch_path("messages.jsonl");
        let store = FileMessageStore::open(&path).await.unwrap();

        // The caller gives up before the write task gets to run
        let abandoned =
            tokio::time::timeout(Duration::ZERO, store.append("general", "alice", "late", 1)).await;
        assert!(abandoned.is_err());

        let mut settled = false;
        for _ in 0..100 {
            if store.count("general").await.unwrap() == 1 {
                settled = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(settled);
        store.append("general", "bob", "next", 2).await.unwrap();

        let reopened = FileMessageStore::open(&path).await.unwrap();
        assert_eq!(texts(&reopened, "general").await, texts(&store, "general").await);
        assert_eq!(texts(&reopened, "general").await, vec!["late", "next"]);
    }

    #[tokio::test]
    async fn test_failed_compaction_leaves_index_untouched() {
        let path = scratch_path("messages.jsonl");
        let store = FileMessageStore::open(&path).await.unwrap();
        for i in 0..4 {
            store
                .append("general", "alice", &format!("m{}", i), i)
                .await
                .unwrap();
        }

        // A directory in the way of the temporary file makes the rewrite fail
        fs::create_dir_all(temp_path(&path)).await.unwrap();
        assert!(store.delete_oldest("general", 2).await.is_err());
        assert_eq!(store.count("general").await.unwrap(), 4);

        let reopened = FileMessageStore::open(&path).await.unwrap();
        assert_eq!(reopened.count("general").await.unwrap(), 4);
    }

    #[test]
    fn test_parse_log_tail_detection() {
        let path = Path::new("messages.jsonl");
        let record = serde_json::to_string(&ChatMessage::new(
            "r".into(),
            "u".into(),
            "t".into(),
            1,
        ))
        .unwrap();

        let clean = format!("{}\n", record);
        assert_eq!(parse_log(path, &clean).unwrap().1, Tail::Clean);

        let torn = format!("{}\n{{\"id\":", record);
        let (messages, tail) = parse_log(path, &torn).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(
            tail,
            Tail::Torn {
                intact_len: clean.len() as u64
            }
        );

        // Damage before the last line is still fatal
        let damaged = format!("{{\"id\":\n{}\n", record);
        assert!(parse_log(path, &damaged).is_err());
    }
}
