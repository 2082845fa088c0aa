//! Local persistence for user-pinned whales and recent searches.
//!
//! Everything sits behind the small [`KvStore`] capability (get/set/
//! remove) so the higher-level stores can run against an in-memory map in
//! tests and a JSON file in the app. Read/write failures are contained
//! here: they log a warning and degrade to empty reads / dropped writes,
//! matching how the rest of the crate treats partial chain data.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::models::{SearchEntry, WhaleTransaction};

/// Saved whales kept, oldest evicted first.
pub const SAVED_WHALES_CAP: usize = 100;
/// Recent searches kept.
pub const RECENT_SEARCHES_CAP: usize = 5;

const WHALES_KEY: &str = "whale_transactions";
const SEARCHES_KEY: &str = "recent_searches";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

/// Minimal key-value capability the stores are written against.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Mutex-guarded map; the test backend and the fallback when no store
/// path is configured.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

/// A single JSON object on disk, one property per key.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn read_map(&self) -> Result<HashMap<String, String>, StoreError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(HashMap::new());
        }
        match serde_json::from_str(&raw) {
            Ok(map) => Ok(map),
            Err(err) => {
                // A corrupt file reads as empty and gets replaced by the
                // next write, like browser local storage.
                warn!(
                    "store file {} is corrupt, treating as empty: {}",
                    self.path.display(),
                    err
                );
                Ok(HashMap::new())
            }
        }
    }

    fn write_map(&self, map: &HashMap<String, String>) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let raw = serde_json::to_string(map)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

fn read_json<T: DeserializeOwned>(kv: &dyn KvStore, key: &str) -> Vec<T> {
    match kv.get(key) {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(items) => items,
            Err(err) => {
                warn!("discarding corrupt {} entry: {}", key, err);
                Vec::new()
            }
        },
        Ok(None) => Vec::new(),
        Err(err) => {
            warn!("failed reading {}: {}", key, err);
            Vec::new()
        }
    }
}

fn write_json<T: Serialize>(kv: &dyn KvStore, key: &str, items: &[T]) {
    match serde_json::to_string(items) {
        Ok(raw) => {
            if let Err(err) = kv.set(key, &raw) {
                warn!("failed writing {}: {}", key, err);
            }
        }
        Err(err) => warn!("failed serializing {}: {}", key, err),
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// User-pinned whale transactions, newest-first, capped.
#[derive(Clone)]
pub struct WhaleStore {
    kv: Arc<dyn KvStore>,
}

impl WhaleStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Idempotent upsert keyed by transaction hash: a duplicate save is a
    /// no-op, a new entry is prepended and the oldest evicted past the
    /// cap. Returns whether anything was stored.
    pub fn save(&self, whale: &WhaleTransaction) -> bool {
        let mut saved: Vec<WhaleTransaction> = read_json(self.kv.as_ref(), WHALES_KEY);
        if saved.iter().any(|w| w.hash == whale.hash) {
            return false;
        }

        let mut entry = whale.clone();
        if entry.saved_at.is_none() {
            entry.saved_at = Some(now_millis());
        }
        saved.insert(0, entry);
        saved.truncate(SAVED_WHALES_CAP);
        write_json(self.kv.as_ref(), WHALES_KEY, &saved);
        true
    }

    /// Saved whales, newest-first. Store failures read as empty.
    pub fn list(&self) -> Vec<WhaleTransaction> {
        read_json(self.kv.as_ref(), WHALES_KEY)
    }

    pub fn clear(&self) {
        if let Err(err) = self.kv.remove(WHALES_KEY) {
            warn!("failed clearing saved whales: {}", err);
        }
    }
}

/// Recent search queries, deduped by query text, newest-first, capped.
#[derive(Clone)]
pub struct SearchHistory {
    kv: Arc<dyn KvStore>,
}

impl SearchHistory {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    pub fn record(&self, query: &str, kind: &str) {
        let mut recent: Vec<SearchEntry> = read_json(self.kv.as_ref(), SEARCHES_KEY);
        recent.retain(|entry| entry.query != query);
        recent.insert(
            0,
            SearchEntry {
                query: query.to_string(),
                kind: kind.to_string(),
                searched_at: now_millis(),
            },
        );
        recent.truncate(RECENT_SEARCHES_CAP);
        write_json(self.kv.as_ref(), SEARCHES_KEY, &recent);
    }

    pub fn recent(&self) -> Vec<SearchEntry> {
        read_json(self.kv.as_ref(), SEARCHES_KEY)
    }

    pub fn clear(&self) {
        if let Err(err) = self.kv.remove(SEARCHES_KEY) {
            warn!("failed clearing recent searches: {}", err);
        }
    }
}
