//! History store trait and its implementations.

use std::path::Path;
use std::sync::Mutex;

use ontime_core::types::ChatMessage;
use tracing::debug;

use crate::db::Database;
use crate::error::StorageError;

/// Durable storage for the chat transcript.
///
/// `save_history` always receives the complete transcript and replaces
/// whatever was stored before.
pub trait HistoryStore: Send + Sync {
    /// Load the persisted transcript; an empty store yields an empty history.
    fn load_history(&self) -> Result<Vec<ChatMessage>, StorageError>;

    /// Persist the whole transcript, overwriting the previous snapshot.
    fn save_history(&self, messages: &[ChatMessage]) -> Result<(), StorageError>;
}

fn encode(messages: &[ChatMessage]) -> Result<String, StorageError> {
    serde_json::to_string(messages).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn decode(key: &str, raw: &str) -> Result<Vec<ChatMessage>, StorageError> {
    serde_json::from_str(raw).map_err(|e| StorageError::Corrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

// =============================================================================
// SqliteHistoryStore
// =============================================================================

/// History store backed by a SQLite key-value table.
#[derive(Debug)]
pub struct SqliteHistoryStore {
    db: Database,
    key: String,
}

impl SqliteHistoryStore {
    /// Open (or create) the store at `path`, keeping history under `key`.
    pub fn open(path: &Path, key: impl Into<String>) -> Result<Self, StorageError> {
        Ok(Self {
            db: Database::new(path)?,
            key: key.into(),
        })
    }

    /// In-memory store (for testing).
    pub fn in_memory(key: impl Into<String>) -> Result<Self, StorageError> {
        Ok(Self {
            db: Database::in_memory()?,
            key: key.into(),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn load_history(&self) -> Result<Vec<ChatMessage>, StorageError> {
        match self.db.get(&self.key)? {
            Some(raw) => {
                let messages = decode(&self.key, &raw)?;
                debug!(key = %self.key, count = messages.len(), "History loaded");
                Ok(messages)
            }
            None => Ok(Vec::new()),
        }
    }

    fn save_history(&self, messages: &[ChatMessage]) -> Result<(), StorageError> {
        let raw = encode(messages)?;
        self.db.put(&self.key, &raw)?;
        debug!(key = %self.key, count = messages.len(), "History saved");
        Ok(())
    }
}

// =============================================================================
// MemoryHistoryStore
// =============================================================================

/// Process-local history store holding the serialized snapshot.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    snapshot: Mutex<Option<String>>,
    saves: Mutex<usize>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a transcript.
    pub fn with_history(messages: &[ChatMessage]) -> Result<Self, StorageError> {
        Ok(Self {
            snapshot: Mutex::new(Some(encode(messages)?)),
            saves: Mutex::new(0),
        })
    }

    /// Number of `save_history` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|n| *n).unwrap_or(0)
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn load_history(&self) -> Result<Vec<ChatMessage>, StorageError> {
        let snapshot = self
            .snapshot
            .lock()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;
        match snapshot.as_deref() {
            Some(raw) => decode("memory", raw),
            None => Ok(Vec::new()),
        }
    }

    fn save_history(&self, messages: &[ChatMessage]) -> Result<(), StorageError> {
        let raw = encode(messages)?;
        *self
            .snapshot
            .lock()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))? = Some(raw);
        if let Ok(mut n) = self.saves.lock() {
            *n += 1;
        }
        Ok(())
    }
}
