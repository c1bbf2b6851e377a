use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::error::{StoreError, StoreResult};

pub type Version = u64;

/// A stored value together with the version the store assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioned {
    pub value: String,
    pub version: Version,
}

/// Condition a write must satisfy to be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// Unconditional overwrite.
    Any,
    /// Only write if the key does not exist yet.
    Absent,
    /// Only write if the key is still at this version.
    Version(Version),
}

impl Precondition {
    /// Precondition that holds as long as nobody wrote since `current` was read.
    pub fn unchanged_since(current: Option<&Versioned>) -> Self {
        match current {
            Some(stored) => Precondition::Version(stored.version),
            None => Precondition::Absent,
        }
    }

    fn holds_for(&self, current: Option<&Versioned>) -> bool {
        match (self, current) {
            (Precondition::Any, _) => true,
            (Precondition::Absent, None) => true,
            (Precondition::Version(v), Some(stored)) => *v == stored.version,
            _ => false,
        }
    }
}

/// String key-value store holding serialized values.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Returns `None` when the key was never written.
    async fn get(&self, key: &str) -> StoreResult<Option<Versioned>>;

    /// Writes `value` under `key` if `precondition` holds, returning the new version.
    ///
    /// Fails with `StoreError::Conflict` when the precondition does not hold.
    async fn put(&self, key: &str, value: String, precondition: Precondition)
        -> StoreResult<Version>;
}

/// Read `key` and decode its JSON value.
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn KvStore,
    key: &str,
) -> StoreResult<Option<(T, Versioned)>> {
    match store.get(key).await? {
        Some(stored) => {
            let decoded = serde_json::from_str::<T>(&stored.value)?;
            Ok(Some((decoded, stored)))
        }
        None => Ok(None),
    }
}

type Records = HashMap<String, Versioned>;

fn apply_put(
    records: &mut Records,
    key: &str,
    value: String,
    precondition: Precondition,
) -> StoreResult<Version> {
    let current = records.get(key);
    if !precondition.holds_for(current) {
        return Err(StoreError::Conflict(key.to_string()));
    }
    let version = current.map_or(1, |stored| stored.version + 1);
    records.insert(key.to_string(), Versioned { value, version });
    Ok(version)
}

/// Process-local store. Clones share the same records.
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<Records>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Versioned>> {
        let data = self
            .data
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(data.get(key).cloned())
    }

    async fn put(
        &self,
        key: &str,
        value: String,
        precondition: Precondition,
    ) -> StoreResult<Version> {
        let mut data = self
            .data
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        apply_put(&mut data, key, value, precondition)
    }
}

/// Store persisted as a single JSON document on disk.
///
/// Writes go through a temp file followed by a rename, and are serialized
/// within the process. Several processes sharing one file are not coordinated.
pub struct FileStore {
    path: PathBuf,
    lock: tokio::sync::Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> FileStore {
        FileStore {
            path: path.into(),
            lock: tokio::sync::Mutex::new(()),
        }
    }

    async fn read_records(&self) -> StoreResult<Records> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Records::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_records(&self, records: &Records) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(records)?;

        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, json).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for FileStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Versioned>> {
        let _guard = self.lock.lock().await;
        let mut records = self.read_records().await?;
        Ok(records.remove(key))
    }

    async fn put(
        &self,
        key: &str,
        value: String,
        precondition: Precondition,
    ) -> StoreResult<Version> {
        let _guard = self.lock.lock().await;
        let mut records = self.read_records().await?;
        let version = apply_put(&mut records, key, value, precondition)?;
        self.write_records(&records).await?;
        debug!("Persisted '{}' at version {} to {:?}", key, version, self.path);
        Ok(version)
    }
}
