//! JSON-file backed key/value map with an in-memory mirror
//!
//! The whole file is loaded at open time. Every mutation re-reads the file,
//! applies the change, writes the full map back (temp file + rename) and then
//! replaces the mirror, so reads never touch the disk. Mutations within this
//! process are serialised; separate processes writing the same file still race
//! (last write wins).
//!
//! A missing or unparsable file is an empty map. A file that exists but cannot
//! be read is not: mutations then start from the mirror so a transient I/O
//! error never wipes stored entries. Entries that fail to deserialise as `V`
//! are dropped with a warning instead of poisoning the file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use super::{CacheError, CacheResult};

pub struct JsonStore<V> {
    path: PathBuf,
    /// Short name used in log messages ("transcripts", "summaries", ...)
    label: &'static str,
    mirror: RwLock<BTreeMap<String, V>>,
    write_lock: Mutex<()>,
}

impl<V> JsonStore<V>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    /// Open (or lazily create) the store at `path`
    ///
    /// The parent directory is created if absent. Failure to create it is
    /// logged; the store then behaves as an empty map whose writes fail.
    pub async fn open(path: impl Into<PathBuf>, label: &'static str) -> Self {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent).await {
                warn!(label, dir = %parent.display(), error = %e, "Failed to create cache directory");
            }
        }

        let initial = read_map::<V>(&path, label).await.unwrap_or_else(|e| {
            warn!(label, path = %path.display(), error = %e, "Failed to read cache file, starting empty");
            BTreeMap::new()
        });
        debug!(label, entries = initial.len(), path = %path.display(), "Loaded cache file");

        Self {
            path,
            label,
            mirror: RwLock::new(initial),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        self.mirror.read().await.get(key).cloned()
    }

    /// Copy of every entry currently held
    pub async fn snapshot(&self) -> BTreeMap<String, V> {
        self.mirror.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.mirror.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.mirror.read().await.is_empty()
    }

    pub async fn set(&self, key: impl Into<String>, value: V) -> CacheResult<()> {
        let key = key.into();
        self.mutate(move |map| {
            map.insert(key, value);
        })
        .await
    }

    /// Remove one key; returns whether it was present
    pub async fn delete(&self, key: &str) -> CacheResult<bool> {
        let mut removed = false;
        self.mutate(|map| {
            removed = map.remove(key).is_some();
        })
        .await?;
        Ok(removed)
    }

    /// Equivalent to writing an empty object
    pub async fn clear_all(&self) -> CacheResult<()> {
        self.mutate(|map| map.clear()).await
    }

    /// Keep only entries matching `keep`; returns how many were removed
    pub async fn retain<F>(&self, mut keep: F) -> CacheResult<usize>
    where
        F: FnMut(&str, &V) -> bool,
    {
        let mut removed = 0;
        self.mutate(|map| {
            let before = map.len();
            map.retain(|k, v| keep(k, v));
            removed = before - map.len();
        })
        .await?;
        Ok(removed)
    }

    /// Read-modify-write cycle shared by all mutations
    ///
    /// The mirror is updated even when the file write fails, so the running
    /// process keeps serving the new state; the error is returned for logging.
    async fn mutate<F>(&self, apply: F) -> CacheResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, V>),
    {
        let _guard = self.write_lock.lock().await;

        let mut map = match read_map::<V>(&self.path, self.label).await {
            Ok(map) => map,
            Err(e) => {
                warn!(
                    label = self.label,
                    path = %self.path.display(),
                    error = %e,
                    "Failed to re-read cache file, using in-memory copy"
                );
                self.mirror.read().await.clone()
            }
        };
        apply(&mut map);

        let write_result = write_map(&self.path, &map).await;
        *self.mirror.write().await = map;

        if let Err(e) = &write_result {
            warn!(label = self.label, path = %self.path.display(), error = %e, "Failed to write cache file");
        }
        write_result
    }
}

/// Current file contents; missing or non-object files read as empty
async fn read_map<V: DeserializeOwned>(path: &Path, label: &str) -> std::io::Result<BTreeMap<String, V>> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(e),
    };

    let raw: serde_json::Map<String, serde_json::Value> = match serde_json::from_str(&content) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(label, path = %path.display(), error = %e, "Cache file is not a JSON object, treating as empty");
            return Ok(BTreeMap::new());
        }
    };

    Ok(raw
        .into_iter()
        .filter_map(|(key, value)| match serde_json::from_value::<V>(value) {
            Ok(v) => Some((key, v)),
            Err(e) => {
                warn!(label, key = %key, error = %e, "Dropping malformed cache entry");
                None
            }
        })
        .collect())
}

async fn write_map<V: Serialize>(path: &Path, map: &BTreeMap<String, V>) -> CacheResult<()> {
    let json = serde_json::to_string_pretty(map).map_err(CacheError::Json)?;

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    fs::write(&tmp_path, json).await?;
    fs::rename(&tmp_path, path).await?;
    Ok(())
}
