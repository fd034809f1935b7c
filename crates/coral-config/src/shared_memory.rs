//! The shared-memory id store: bookkeeping for large raw payloads handed off via shared memory
//! (`SHARED_DATA_TYPE = "shm://"` in the wire type catalog) instead of over the transport, plus the
//! background reaper that removes ids past their expiration.
//!
//! Actually creating/attaching the underlying shared-memory segment is an external collaborator
//! (an OS-level shared-memory library); this store only tracks which ids are live and when they
//! were last touched, persists that to a JSON file, and removes expired entries under a file lock.

use crate::error::ConfigError;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile(HashMap<String, u64>);

/// Tracks live shared-memory ids for one manager (one node, typically) and reaps expired ones.
pub struct SharedMemoryIdStore {
    manager_id: String,
    data_path: PathBuf,
    lock_path: PathBuf,
    expire: Duration,
    ids: Mutex<HashMap<String, u64>>,
}

impl SharedMemoryIdStore {
    /// Opens the store for `manager_id` under `store_dir`, loading any persisted ids and
    /// immediately reaping ones already past `expire`.
    pub fn open(store_dir: &Path, manager_id: impl Into<String>, expire: Duration) -> Result<Self, ConfigError> {
        let manager_id = manager_id.into();
        std::fs::create_dir_all(store_dir).map_err(|e| ConfigError::Io {
            path: store_dir.to_path_buf(),
            source: e,
        })?;
        let data_path = store_dir.join(format!("{manager_id}.json"));
        let lock_path = store_dir.join(format!("{manager_id}.delete.lock"));

        let loaded = if data_path.exists() {
            let text = std::fs::read_to_string(&data_path).map_err(|e| ConfigError::Io {
                path: data_path.clone(),
                source: e,
            })?;
            serde_json::from_str::<StoreFile>(&text).unwrap_or_else(|err| {
                tracing::warn!(path = %data_path.display(), error = %err, "shared-memory id store is malformed, starting fresh");
                StoreFile::default()
            })
        } else {
            StoreFile::default()
        };

        let store = Self {
            manager_id,
            data_path,
            lock_path,
            expire,
            ids: Mutex::new(loaded.0),
        };
        store.remove_expired(now_unix());
        Ok(store)
    }

    /// Records that `memory_id` was attached (read) just now.
    pub fn attach(&self, memory_id: &str) {
        let mut ids = self.ids.lock().expect("lock poisoned");
        let _ = ids.entry(memory_id.to_owned()).or_insert_with(now_unix);
        tracing::debug!(memory_id, "attached shared memory");
    }

    /// Records that `memory_id` was freshly created just now, overwriting any existing timestamp.
    pub fn add(&self, memory_id: &str) {
        let mut ids = self.ids.lock().expect("lock poisoned");
        let _ = ids.insert(memory_id.to_owned(), now_unix());
        tracing::debug!(memory_id, "created shared memory");
    }

    /// Forgets `memory_id`. Returns whether it was present.
    pub fn remove(&self, memory_id: &str) -> bool {
        let mut ids = self.ids.lock().expect("lock poisoned");
        let removed = ids.remove(memory_id).is_some();
        if removed {
            tracing::debug!(memory_id, "released shared memory");
        }
        removed
    }

    /// Removes every id whose last-touched timestamp is older than `expire`, relative to `now`.
    /// Returns the ids removed.
    pub fn remove_expired(&self, now: u64) -> Vec<String> {
        let mut ids = self.ids.lock().expect("lock poisoned");
        let expire_secs = self.expire.as_secs();
        let expired: Vec<String> = ids
            .iter()
            .filter(|(_, &ts)| now.saturating_sub(ts) > expire_secs)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            let _ = ids.remove(id);
        }
        if !expired.is_empty() {
            tracing::info!(manager_id = %self.manager_id, count = expired.len(), "removed expired shared memory ids");
        }
        expired
    }

    /// Persists the current id table to disk under the delete lock.
    pub fn dump(&self) -> Result<(), ConfigError> {
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&self.lock_path)
            .map_err(|e| ConfigError::GlobalNodesData(e.to_string()))?;
        lock_file
            .lock_exclusive()
            .map_err(|e| ConfigError::GlobalNodesData(e.to_string()))?;

        let table = StoreFile(self.ids.lock().expect("lock poisoned").clone());
        let serialized =
            serde_json::to_string(&table).map_err(|e| ConfigError::GlobalNodesData(e.to_string()))?;
        let result = File::create(&self.data_path)
            .and_then(|mut f| f.write_all(serialized.as_bytes()))
            .map_err(|e| ConfigError::Io {
                path: self.data_path.clone(),
                source: e,
            });

        let _ = FileExt::unlock(&lock_file);
        result
    }

    /// Runs the reap-then-dump loop forever on `interval`, matching the original's
    /// `expire * 3` polling cadence. Intended to be spawned as its own background task.
    pub async fn run_reaper(self: std::sync::Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let _ = self.remove_expired(now_unix());
            if let Err(err) = self.dump() {
                tracing::warn!(manager_id = %self.manager_id, error = %err, "failed to persist shared memory id store");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_then_expire_removes_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = SharedMemoryIdStore::open(dir.path(), "node1", Duration::from_secs(60)).unwrap();
        store.attach("frame-1");

        let expired = store.remove_expired(now_unix() + 3600);
        assert_eq!(expired, vec!["frame-1".to_owned()]);
        assert!(store.ids.lock().unwrap().is_empty());
    }

    #[test]
    fn fresh_ids_are_not_expired() {
        let dir = tempfile::tempdir().unwrap();
        let store = SharedMemoryIdStore::open(dir.path(), "node1", Duration::from_secs(60)).unwrap();
        store.add("frame-1");
        assert!(store.remove_expired(now_unix()).is_empty());
    }

    #[test]
    fn dump_then_reopen_reloads_ids() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store =
                SharedMemoryIdStore::open(dir.path(), "node1", Duration::from_secs(60)).unwrap();
            store.add("frame-1");
            store.dump().unwrap();
        }
        let reopened = SharedMemoryIdStore::open(dir.path(), "node1", Duration::from_secs(60)).unwrap();
        assert!(reopened.ids.lock().unwrap().contains_key("frame-1"));
    }

    #[test]
    fn remove_forgets_an_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = SharedMemoryIdStore::open(dir.path(), "node1", Duration::from_secs(60)).unwrap();
        store.add("frame-1");
        assert!(store.remove("frame-1"));
        assert!(!store.remove("frame-1"));
    }
}
