//! Durable key-value storage backing the session.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::warn;

use crate::errors::SessionError;

/// A single mutation applied by [`KeyValueStore::write_batch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvWrite<'a> {
    Set(&'a str, &'a str),
    Remove(&'a str),
}

/// Client-side durable key-value store.
///
/// `write_batch` applies all writes in one durable step so that related
/// keys never diverge on disk.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError>;

    fn write_batch(&self, writes: &[KvWrite<'_>]) -> Result<(), SessionError>;
}

fn apply(map: &mut BTreeMap<String, String>, writes: &[KvWrite<'_>]) {
    for write in writes {
        match *write {
            KvWrite::Set(key, value) => {
                map.insert(key.to_string(), value.to_string());
            }
            KvWrite::Remove(key) => {
                map.remove(key);
            }
        }
    }
}

/// JSON file store. The whole map is rewritten through a temporary file and
/// renamed into place on every batch.
pub struct FileStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    /// Default location: `<data dir>/smartfarm/session.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("smartfarm").join("session.json"))
    }

    fn load(&self) -> Result<BTreeMap<String, String>, SessionError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(SessionError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|source| SessionError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn persist(&self, map: &BTreeMap<String, String>) -> Result<(), SessionError> {
        let write_err = |source| SessionError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let content = serde_json::to_string_pretty(map).map_err(|source| SessionError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(write_err)?;
        std::fs::rename(&tmp, &self.path).map_err(write_err)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        let _lock = self.guard.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.load()?.remove(key))
    }

    fn write_batch(&self, writes: &[KvWrite<'_>]) -> Result<(), SessionError> {
        let _lock = self.guard.lock().unwrap_or_else(|e| e.into_inner());
        // A batch rewrites the whole file, so an unreadable one is replaced.
        let mut map = match self.load() {
            Ok(map) => map,
            Err(err @ SessionError::Corrupt { .. }) => {
                warn!(error = %err, "Replacing unreadable session file");
                BTreeMap::new()
            }
            Err(err) => return Err(err),
        };
        apply(&mut map, writes);
        self.persist(&map)
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    map: Mutex<BTreeMap<String, String>>,
    batches: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of batches written so far.
    pub fn batch_count(&self) -> usize {
        *self.batches.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        let map = self.map.lock().unwrap_or_else(|e| e.into_inner());
        Ok(map.get(key).cloned())
    }

    fn write_batch(&self, writes: &[KvWrite<'_>]) -> Result<(), SessionError> {
        let mut map = self.map.lock().unwrap_or_else(|e| e.into_inner());
        apply(&mut map, writes);
        *self.batches.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        Ok(())
    }
}
