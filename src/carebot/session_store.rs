//! Durable, per-session persistence of conversation histories.
//!
//! Every conversation lives in its own partition keyed by [`SessionKey`], the pair of user id
//! and [`AgentKind`]. Two agents talking to the same user never share a partition.
//!
//! # Disk Format
//!
//! [`FileSessionStore`] writes one JSON document per partition:
//!
//! ```text
//! <root>/<agent_kind>/<sha256(user_id)>.json
//! {"user_id":"42","agent_kind":"chat","updated_at":"2025-07-01T12:00:00Z","turns":[...]}
//! ```
//!
//! The user id is hashed into the filename so arbitrary ids cannot escape the root directory.
//! Saves go through a temp file in the same directory followed by an atomic rename, so a
//! reader (or a crash) only ever observes the previous or the new document.
//!
//! # Example
//!
//! ```rust,no_run
//! use carebot::session_store::{AgentKind, FileSessionStore, SessionKey, SessionStore};
//! use carebot::client_wrapper::Turn;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = FileSessionStore::new("sessions");
//! let key = SessionKey::new("42", AgentKind::Chat);
//!
//! let mut history = store.load(&key).await?;
//! history.push(Turn::user("hello"));
//! store.save(&key, &history).await?;
//! # Ok(())
//! # }
//! ```

use crate::carebot::history::ConversationHistory;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Which agent a conversation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// General medical assistant with search and reminder tools.
    Chat,
    /// Symptom checker with search only.
    SymptomChecker,
}

impl AgentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Chat => "chat",
            AgentKind::SymptomChecker => "symptom_checker",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one isolated conversation partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub user_id: String,
    pub agent_kind: AgentKind,
}

impl SessionKey {
    pub fn new(user_id: impl Into<String>, agent_kind: AgentKind) -> Self {
        Self {
            user_id: user_id.into(),
            agent_kind,
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.agent_kind, self.user_id)
    }
}

/// Failure of the durable medium.
#[derive(Debug)]
pub enum StorageError {
    /// The medium could not be reached (I/O failure, connection refused, ...).
    Unavailable(String),
    /// The stored bytes exist but cannot be turned back into a valid history.
    Corrupted(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Unavailable(msg) => write!(f, "Session storage unavailable: {}", msg),
            StorageError::Corrupted(msg) => write!(f, "Session data corrupted: {}", msg),
        }
    }
}

impl Error for StorageError {}

impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        StorageError::Unavailable(err.to_string())
    }
}

/// Keyed persistence of conversation histories.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the history for `key`, or an empty history if the partition does not exist yet.
    async fn load(&self, key: &SessionKey) -> Result<ConversationHistory, StorageError>;

    /// Replace the stored history for `key`, creating the partition if needed.
    async fn save(&self, key: &SessionKey, history: &ConversationHistory)
        -> Result<(), StorageError>;
}

/// On-disk document for one partition.
#[derive(Debug, Serialize, Deserialize)]
struct SessionRecord {
    user_id: String,
    agent_kind: AgentKind,
    updated_at: DateTime<Utc>,
    turns: ConversationHistory,
}

/// One JSON file per session key under a root directory.
pub struct FileSessionStore {
    root: PathBuf,
}

impl FileSessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the document backing `key`.
    pub fn partition_path(&self, key: &SessionKey) -> PathBuf {
        self.root
            .join(key.agent_kind.as_str())
            .join(partition_filename(&key.user_id))
    }
}

/// Hex SHA-256 of the user id, suffixed `.json`.
fn partition_filename(user_id: &str) -> String {
    let digest = Sha256::digest(user_id.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    format!("{}.json", hex)
}

fn write_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "partition has no parent"))?;
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self, key: &SessionKey) -> Result<ConversationHistory, StorageError> {
        let path = self.partition_path(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("no stored history for {}, starting fresh", key);
                return Ok(ConversationHistory::new());
            }
            Err(e) => {
                log::error!("failed to read {}: {}", path.display(), e);
                return Err(e.into());
            }
        };

        let record: SessionRecord = serde_json::from_slice(&bytes).map_err(|e| {
            StorageError::Corrupted(format!("{}: {}", path.display(), e))
        })?;
        if record.user_id != key.user_id || record.agent_kind != key.agent_kind {
            return Err(StorageError::Corrupted(format!(
                "{} belongs to {}/{}",
                path.display(),
                record.agent_kind,
                record.user_id
            )));
        }
        record
            .turns
            .validate()
            .map_err(|e| StorageError::Corrupted(format!("{}: {}", path.display(), e)))?;
        Ok(record.turns)
    }

    async fn save(
        &self,
        key: &SessionKey,
        history: &ConversationHistory,
    ) -> Result<(), StorageError> {
        let record = SessionRecord {
            user_id: key.user_id.clone(),
            agent_kind: key.agent_kind,
            updated_at: Utc::now(),
            turns: history.clone(),
        };
        let bytes = serde_json::to_vec(&record)
            .map_err(|e| StorageError::Unavailable(format!("failed to encode history: {}", e)))?;
        let path = self.partition_path(key);

        tokio::task::spawn_blocking(move || write_atomically(&path, &bytes))
            .await
            .map_err(|e| StorageError::Unavailable(format!("writer task failed: {}", e)))??;
        Ok(())
    }
}

/// Process-local store, handy for tests and development.
#[derive(Default)]
pub struct InMemorySessionStore {
    partitions: RwLock<HashMap<SessionKey, ConversationHistory>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of partitions written so far.
    pub async fn partition_count(&self) -> usize {
        self.partitions.read().await.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, key: &SessionKey) -> Result<ConversationHistory, StorageError> {
        Ok(self
            .partitions
            .read()
            .await
            .get(key)
            .cloned()
            .unwrap_or_default())
    }

    async fn save(
        &self,
        key: &SessionKey,
        history: &ConversationHistory,
    ) -> Result<(), StorageError> {
        self.partitions
            .write()
            .await
            .insert(key.clone(), history.clone());
        Ok(())
    }
}

/// Hands out one async mutex per [`SessionKey`].
///
/// Holding the guard serializes load → mutate → save for that key. Entries are weak, so a key
/// nobody is processing costs nothing beyond a map slot that the next acquire prunes.
#[derive(Default)]
pub struct SessionLocks {
    locks: std::sync::Mutex<HashMap<SessionKey, Weak<Mutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn acquire(&self, key: &SessionKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.retain(|_, weak| weak.strong_count() > 0);
            match locks.get(key).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    let lock = Arc::new(Mutex::new(()));
                    locks.insert(key.clone(), Arc::downgrade(&lock));
                    lock
                }
            }
        };
        lock.lock_owned().await
    }

    /// Number of keys currently held or awaited.
    pub fn active_count(&self) -> usize {
        let locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.values().filter(|weak| weak.strong_count() > 0).count()
    }
}
