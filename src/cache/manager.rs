//! Two-tier cache manager
//!
//! Provides a `CacheManager` with a bounded in-memory map in front of JSON
//! files in an XDG-compliant cache directory. The memory tier is the fast path
//! and the source of truth for the process lifetime; disk writes are
//! fire-and-forget so a slow or failing filesystem never blocks a caller.

use chrono::{DateTime, Duration, Utc};
use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::fs;
use tokio::task::JoinHandle;

/// Maximum number of entries held in the memory tier.
pub const MAX_MEMORY_CACHE_SIZE: usize = 50;

/// A single cached value with its write metadata.
///
/// The timestamp is set exactly once, when the entry is created; a later `set`
/// for the same key replaces the entry wholesale. The key is stored redundantly
/// alongside the payload for debugging and shape validation of persisted data.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    /// The cached payload, kept as JSON so one store can hold any entry type
    data: Value,
    /// When the entry was written
    timestamp: DateTime<Utc>,
    /// The key the entry was stored under
    key: String,
}

impl CacheEntry {
    fn is_fresh(&self, max_age: Duration) -> bool {
        Utc::now() - self.timestamp < max_age
    }
}

/// Bounded in-memory tier with strict FIFO eviction.
///
/// Eviction considers insertion order only, never read recency: a frequently
/// re-read old entry can still be evicted in favor of entries inserted after
/// it. Re-`set` of a key that is already present keeps its original position
/// in the eviction queue.
#[derive(Debug, Default)]
struct MemoryTier {
    entries: HashMap<String, CacheEntry>,
    insertion_order: VecDeque<String>,
}

impl MemoryTier {
    fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    fn insert(&mut self, entry: CacheEntry) {
        let key = entry.key.clone();
        if self.entries.insert(key.clone(), entry).is_none() {
            self.insertion_order.push_back(key);
        }
        while self.entries.len() > MAX_MEMORY_CACHE_SIZE {
            match self.insertion_order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.insertion_order.retain(|k| k != key);
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.insertion_order.clear();
    }
}

/// Manages a bounded in-memory cache backed by JSON files on disk.
///
/// All public operations form a failure boundary: storage errors (missing
/// files, corrupt JSON, I/O failures) degrade to cache-miss behavior and are
/// logged, never returned to the caller. Callers can treat cache
/// unavailability as equivalent to a cold cache.
///
/// Cloning is cheap and clones share the same memory tier.
#[derive(Debug, Clone)]
pub struct CacheManager {
    /// Directory where persistent entries are stored
    cache_dir: PathBuf,
    /// Bounded fast-path tier, shared between clones
    memory: Arc<Mutex<MemoryTier>>,
}

impl CacheManager {
    /// Creates a new CacheManager using an XDG-compliant cache directory
    /// (`~/.cache/skycast/` on Linux).
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no
    /// home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "skycast")?;
        Some(Self::with_dir(project_dirs.cache_dir().to_path_buf()))
    }

    /// Creates a new CacheManager with a custom cache directory.
    ///
    /// Useful for testing or when a specific cache location is needed.
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            memory: Arc::new(Mutex::new(MemoryTier::default())),
        }
    }

    /// Returns the path to the persistent file for the given key
    fn cache_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{key}.json"))
    }

    /// Reads the payload stored under `key`, ignoring any TTL.
    ///
    /// Checks the memory tier first; on a memory miss the persistent tier is
    /// consulted and a structurally valid entry is promoted into memory.
    /// Returns `None` on a miss in both tiers, when the persisted entry fails
    /// validation, or when the read itself fails.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let cached = self.memory.lock().unwrap().get(key).cloned();
        if let Some(entry) = cached {
            return decode_payload(key, entry.data);
        }

        let entry = self.read_persistent(key).await?;
        self.memory.lock().unwrap().insert(entry.clone());
        decode_payload(key, entry.data)
    }

    /// Stores `data` under `key` in both tiers.
    ///
    /// The memory write (including FIFO eviction) completes before this
    /// returns; the disk write runs in a spawned task whose handle is
    /// returned so callers that need durability can await it. A failed disk
    /// write is logged and does not roll back the memory tier.
    pub fn set<T: Serialize>(&self, key: &str, data: &T) -> JoinHandle<()> {
        self.store(key, data, Utc::now())
    }

    /// Stores an entry with a caller-supplied timestamp. Backdated timestamps
    /// let tests exercise TTL expiry without a mocked clock.
    #[cfg(test)]
    pub(crate) fn set_with_timestamp<T: Serialize>(
        &self,
        key: &str,
        data: &T,
        timestamp: DateTime<Utc>,
    ) -> JoinHandle<()> {
        self.store(key, data, timestamp)
    }

    fn store<T: Serialize>(&self, key: &str, data: &T, timestamp: DateTime<Utc>) -> JoinHandle<()> {
        let data = match serde_json::to_value(data) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to serialize cache payload");
                return tokio::spawn(async {});
            }
        };
        let entry = CacheEntry {
            data,
            timestamp,
            key: key.to_string(),
        };

        self.memory.lock().unwrap().insert(entry.clone());

        let manager = self.clone();
        tokio::spawn(async move { manager.write_persistent(entry).await })
    }

    /// Returns true if an entry exists for `key` and was written less than
    /// `max_age` ago.
    ///
    /// A persistent-tier entry found valid is promoted into memory, matching
    /// `get`'s read-through behavior. Any storage or parse failure counts as
    /// "not valid".
    pub async fn is_valid(&self, key: &str, max_age: Duration) -> bool {
        let cached = self.memory.lock().unwrap().get(key).cloned();
        if let Some(entry) = cached {
            return entry.is_fresh(max_age);
        }

        match self.read_persistent(key).await {
            Some(entry) if entry.is_fresh(max_age) => {
                self.memory.lock().unwrap().insert(entry);
                true
            }
            _ => false,
        }
    }

    /// Returns the payload stored under `key` only if the entry is younger
    /// than `max_age`. This is the normal read path for non-forced fetches.
    pub async fn get_if_valid<T: DeserializeOwned>(
        &self,
        key: &str,
        max_age: Duration,
    ) -> Option<T> {
        if self.is_valid(key, max_age).await {
            self.get(key).await
        } else {
            None
        }
    }

    /// Removes the entry for `key` from both tiers. Clearing an absent key is
    /// a no-op.
    pub async fn clear(&self, key: &str) {
        self.memory.lock().unwrap().remove(key);

        if let Err(e) = fs::remove_file(self.cache_path(key)).await {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!(key, error = %e, "failed to remove persistent cache entry");
            }
        }
    }

    /// Empties the memory tier and deletes every persistent entry belonging
    /// to one of the application's namespaces, leaving unrelated files in the
    /// cache directory untouched.
    pub async fn clear_all(&self) {
        self.memory.lock().unwrap().clear();

        let mut dir = match fs::read_dir(&self.cache_dir).await {
            Ok(dir) => dir,
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    tracing::warn!(error = %e, "failed to list cache directory for clear_all");
                }
                return;
            }
        };

        loop {
            let dir_entry = match dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to walk cache directory for clear_all");
                    break;
                }
            };

            let path = dir_entry.path();
            let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !super::namespace::contains(key) {
                continue;
            }
            if let Err(e) = fs::remove_file(&path).await {
                tracing::warn!(key, error = %e, "failed to remove persistent cache entry");
            }
        }
    }

    /// Warms the memory tier from the persistent tier in one directory pass.
    ///
    /// Intended to run once at startup, before other cache consumers are in
    /// use. Entries that fail to parse are skipped; if the walk loads more
    /// entries than the memory tier holds, the usual FIFO bound applies.
    pub async fn preload(&self) {
        let mut dir = match fs::read_dir(&self.cache_dir).await {
            Ok(dir) => dir,
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    tracing::warn!(error = %e, "failed to list cache directory for preload");
                }
                return;
            }
        };

        let mut loaded = 0usize;
        loop {
            let dir_entry = match dir.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to walk cache directory for preload");
                    break;
                }
            };

            let path = dir_entry.path();
            let Some(key) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string)
            else {
                continue;
            };
            if !super::namespace::contains(&key) {
                continue;
            }
            if let Some(entry) = self.read_persistent(&key).await {
                self.memory.lock().unwrap().insert(entry);
                loaded += 1;
            }
        }

        tracing::debug!(loaded, "cache preload complete");
    }

    /// Reads and validates one entry from the persistent tier.
    ///
    /// An entry that is missing, unreadable, or fails typed deserialization
    /// (wrong shape, missing timestamp) is treated as absent. Malformed
    /// entries are not deleted; they keep failing validation until
    /// overwritten.
    async fn read_persistent(&self, key: &str) -> Option<CacheEntry> {
        let path = self.cache_path(key);
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    tracing::warn!(key, error = %e, "persistent cache read failed");
                }
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!(key, error = %e, "discarding malformed persistent cache entry");
                None
            }
        }
    }

    async fn write_persistent(&self, entry: CacheEntry) {
        if let Err(e) = fs::create_dir_all(&self.cache_dir).await {
            tracing::warn!(key = %entry.key, error = %e, "failed to create cache directory");
            return;
        }

        let json = match serde_json::to_string(&entry) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(key = %entry.key, error = %e, "failed to serialize cache entry");
                return;
            }
        };

        if let Err(e) = fs::write(self.cache_path(&entry.key), json).await {
            tracing::warn!(key = %entry.key, error = %e, "persistent cache write failed");
        }
    }

    /// Returns the keys currently held in the memory tier, oldest first.
    #[cfg(test)]
    pub(crate) fn memory_keys(&self) -> Vec<String> {
        let memory = self.memory.lock().unwrap();
        memory.insertion_order.iter().cloned().collect()
    }
}

fn decode_payload<T: DeserializeOwned>(key: &str, data: Value) -> Option<T> {
    match serde_json::from_value(data) {
        Ok(data) => Some(data),
        Err(e) => {
            tracing::debug!(key, error = %e, "cached payload does not match requested type");
            None
        }
    }
}
