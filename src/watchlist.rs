//! Persisted watchlist of favorited coin ids
//!
//! The list lives under a single key of a textual key-value store as a JSON
//! array of ids. It is read once on open and rewritten on every mutation.
//! Ids are unique; a stored value with duplicates is collapsed on load.

use crate::{constants::WATCHLIST_KEY, error::WatchlistError};
use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Textual key-value storage backing the watchlist
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, WatchlistError>;
    fn set(&self, key: &str, value: &str) -> Result<(), WatchlistError>;
}

/// Process-local storage, lost on exit
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: std::sync::RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, WatchlistError> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), WatchlistError> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `{key}.json` file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, WatchlistError> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), WatchlistError> {
        std::fs::create_dir_all(&self.dir)?;

        // Write-then-rename so a crash never leaves a truncated list
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Watchlist with set semantics over a [`KeyValueStore`]
pub struct WatchlistStore {
    backend: Arc<dyn KeyValueStore>,
    ids: RwLock<Vec<String>>,
}

impl WatchlistStore {
    /// Loads the watchlist from `backend`
    ///
    /// A missing key yields an empty list.
    pub fn open(backend: Arc<dyn KeyValueStore>) -> Result<Self, WatchlistError> {
        let ids = match backend.get(WATCHLIST_KEY)? {
            Some(raw) => {
                let stored: Vec<String> = serde_json::from_str(&raw)
                    .map_err(|e| WatchlistError::Corrupt(e.to_string()))?;
                let mut seen = HashSet::new();
                stored
                    .into_iter()
                    .filter(|id| seen.insert(id.clone()))
                    .collect()
            }
            None => Vec::new(),
        };

        tracing::debug!(count = ids.len(), "Loaded watchlist");

        Ok(Self {
            backend,
            ids: RwLock::new(ids),
        })
    }

    /// Empty watchlist backed by a [`MemoryStore`]
    pub fn in_memory() -> Self {
        Self {
            backend: Arc::new(MemoryStore::new()),
            ids: RwLock::new(Vec::new()),
        }
    }

    /// Ids in insertion order
    pub async fn ids(&self) -> Vec<String> {
        self.ids.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.ids.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.ids.read().await.is_empty()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.ids.read().await.iter().any(|existing| existing == id)
    }

    /// Adds `id`; returns false if it was already present
    pub async fn add(&self, id: &str) -> Result<bool, WatchlistError> {
        let mut ids = self.ids.write().await;
        if ids.iter().any(|existing| existing == id) {
            return Ok(false);
        }

        let mut updated = ids.clone();
        updated.push(id.to_string());
        self.persist(&updated)?;
        *ids = updated;
        Ok(true)
    }

    /// Removes `id`; returns false if it was not present
    pub async fn remove(&self, id: &str) -> Result<bool, WatchlistError> {
        let mut ids = self.ids.write().await;
        if !ids.iter().any(|existing| existing == id) {
            return Ok(false);
        }

        let updated: Vec<String> = ids.iter().filter(|existing| *existing != id).cloned().collect();
        self.persist(&updated)?;
        *ids = updated;
        Ok(true)
    }

    /// Adds `id` if absent, removes it otherwise; returns whether it is now watched
    pub async fn toggle(&self, id: &str) -> Result<bool, WatchlistError> {
        let mut ids = self.ids.write().await;
        let watched = ids.iter().any(|existing| existing == id);

        let updated: Vec<String> = if watched {
            ids.iter().filter(|existing| *existing != id).cloned().collect()
        } else {
            ids.iter().cloned().chain(std::iter::once(id.to_string())).collect()
        };
        self.persist(&updated)?;
        *ids = updated;
        Ok(!watched)
    }

    fn persist(&self, ids: &[String]) -> Result<(), WatchlistError> {
        let encoded = serde_json::to_string(ids)?;
        self.backend.set(WATCHLIST_KEY, &encoded)
    }
}

impl Default for WatchlistStore {
    fn default() -> Self {
        Self::in_memory()
    }
}
