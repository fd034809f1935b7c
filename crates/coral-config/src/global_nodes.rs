//! The shared global-nodes-data file: a process-external JSON map from `node_id` to its derived
//! topic and port assignment, protected by an advisory file lock so concurrently starting
//! processes never race each other onto the same ephemeral port.

use crate::error::ConfigError;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};

/// One node's derived endpoint, as recorded in the global-nodes-data file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeEndpoint {
    /// The topic this node publishes/subscribes on.
    pub topic: String,
    /// Ephemeral TCP port bound for the subscribe side.
    pub socket_sub_port: u16,
    /// Ephemeral TCP port bound for the publish side.
    pub socket_pub_port: u16,
}

/// Picks an unused TCP port by binding to port 0 and immediately releasing it.
///
/// There is an inherent TOCTOU race (the port could be taken again before the caller binds it for
/// real), matching the same race present in the original bind-and-close technique; callers that
/// need a hard guarantee should retry on bind failure.
pub fn pick_unused_port() -> std::io::Result<u16> {
    let listener = TcpListener::bind(("0.0.0.0", 0))?;
    listener.local_addr().map(|addr| addr.port())
}

/// Handle to the shared global-nodes-data file plus its advisory lock file.
pub struct GlobalNodesStore {
    data_path: PathBuf,
    lock_path: PathBuf,
}

impl GlobalNodesStore {
    /// Opens (creating if absent) the store at `data_path`, locking via a sibling `.lock` file.
    pub fn open(data_path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let data_path = data_path.into();
        if let Some(parent) = data_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        if !data_path.exists() {
            File::create(&data_path).map_err(|e| ConfigError::Io {
                path: data_path.clone(),
                source: e,
            })?;
        }
        let lock_path = Self::lock_path_for(&data_path);
        Ok(Self {
            data_path,
            lock_path,
        })
    }

    fn lock_path_for(data_path: &Path) -> PathBuf {
        let mut s = data_path.as_os_str().to_owned();
        s.push(".lock");
        PathBuf::from(s)
    }

    /// Returns the endpoint recorded for `node_id`, allocating and persisting a fresh one (with
    /// the given default topic) if this is the first time this node has started.
    ///
    /// Runs under an exclusive advisory lock held for the duration of the read-modify-write, so
    /// concurrently starting sibling processes never allocate the same port.
    pub fn get_or_assign(
        &self,
        node_id: &str,
        default_topic: impl FnOnce() -> String,
    ) -> Result<NodeEndpoint, ConfigError> {
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&self.lock_path)
            .map_err(|e| ConfigError::GlobalNodesData(e.to_string()))?;
        lock_file
            .lock_exclusive()
            .map_err(|e| ConfigError::GlobalNodesData(e.to_string()))?;

        let result = self.get_or_assign_locked(node_id, default_topic);

        let _ = fs2::FileExt::unlock(&lock_file);
        result
    }

    fn get_or_assign_locked(
        &self,
        node_id: &str,
        default_topic: impl FnOnce() -> String,
    ) -> Result<NodeEndpoint, ConfigError> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.data_path)
            .map_err(|e| ConfigError::Io {
                path: self.data_path.clone(),
                source: e,
            })?;

        let mut contents = String::new();
        let _ = file
            .read_to_string(&mut contents)
            .map_err(|e| ConfigError::Io {
                path: self.data_path.clone(),
                source: e,
            })?;

        let mut table: HashMap<String, NodeEndpoint> = if contents.trim().is_empty() {
            HashMap::new()
        } else {
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                tracing::warn!(path = %self.data_path.display(), error = %err, "global-nodes-data file is malformed, starting fresh");
                HashMap::new()
            })
        };

        if let Some(existing) = table.get(node_id) {
            return Ok(existing.clone());
        }

        let endpoint = NodeEndpoint {
            topic: default_topic(),
            socket_sub_port: pick_unused_port()
                .map_err(|e| ConfigError::GlobalNodesData(e.to_string()))?,
            socket_pub_port: pick_unused_port()
                .map_err(|e| ConfigError::GlobalNodesData(e.to_string()))?,
        };
        let _ = table.insert(node_id.to_owned(), endpoint.clone());

        let serialized =
            serde_json::to_string(&table).map_err(|e| ConfigError::GlobalNodesData(e.to_string()))?;
        file.seek(SeekFrom::Start(0))
            .map_err(|e| ConfigError::Io {
                path: self.data_path.clone(),
                source: e,
            })?;
        file.set_len(0).map_err(|e| ConfigError::Io {
            path: self.data_path.clone(),
            source: e,
        })?;
        file.write_all(serialized.as_bytes())
            .map_err(|e| ConfigError::Io {
                path: self.data_path.clone(),
                source: e,
            })?;

        Ok(endpoint)
    }
}
