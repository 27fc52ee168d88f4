// SPDX-License-Identifier: Apache-2.0
//! `DbConfig` and the storage port it is loaded/saved through.
//!
//! Mirrors the source's config-port split: a small serializable value type
//! plus a `ConfigStore` trait an embedding application implements for its
//! own backing medium, so the facade itself depends on no concrete file
//! format.

use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

/// Tunables for one `Db` instance.
#[derive(Clone, Debug, Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct DbConfig {
    /// This writer's instance id — the `iid` half of every `Eid` this
    /// process allocates and every node `Source` it produces.
    pub writer_iid: u32,
    /// Root directory for an `FsStorage`-backed `Db`; `None` when the
    /// embedding application supplies its own storage handle (e.g. an
    /// in-memory store for tests).
    pub storage_root: Option<PathBuf>,
    /// Advisory byte budget for an in-memory storage backend; informational
    /// only, never enforced by this crate.
    pub memory_byte_budget: Option<u64>,
}

impl DbConfig {
    /// A config for writer `iid` with no storage root and no budget set.
    pub fn new(writer_iid: u32) -> Self {
        Self { writer_iid, storage_root: None, memory_byte_budget: None }
    }

    /// Builder: set the filesystem storage root.
    pub fn with_storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage_root = Some(root.into());
        self
    }

    /// Builder: set the advisory in-memory byte budget.
    pub fn with_memory_byte_budget(mut self, budget: u64) -> Self {
        self.memory_byte_budget = Some(budget);
        self
    }
}

/// Errors raised while loading or saving config values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No value stored for the requested key.
    #[error("[CONFIG_NOT_FOUND] no config stored for key {0:?}")]
    NotFound(String),
    /// The underlying medium failed.
    #[error("[CONFIG_IO] {0}")]
    Io(#[from] std::io::Error),
    /// Stored bytes did not deserialize as the requested type.
    #[error("[CONFIG_SERDE] {0}")]
    Serde(#[from] serde_json::Error),
}

/// Storage port for raw, JSON-serialized config blobs keyed by a logical
/// name (e.g. `"default"` for the one `Db`'s config).
pub trait ConfigStore {
    /// Load the raw bytes stored for `key`.
    ///
    /// # Errors
    /// [`ConfigError::NotFound`] if nothing is stored for `key`, or an
    /// implementation-specific I/O error.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;

    /// Persist raw bytes for `key`, replacing any prior value.
    ///
    /// # Errors
    /// An implementation-specific I/O error.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Serializes [`DbConfig`] (or any `Serialize + DeserializeOwned` value)
/// through a [`ConfigStore`].
pub struct ConfigService<S> {
    store: S,
}

impl<S> ConfigService<S> {
    /// Wrap `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Consume the service, returning the inner store.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S: ConfigStore> ConfigService<S> {
    /// Load and deserialize the value stored for `key`.
    ///
    /// # Errors
    /// Propagates the store's [`ConfigError`], or a deserialization
    /// failure.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<T, ConfigError> {
        let bytes = self.store.load_raw(key)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Serialize and persist `value` for `key`.
    ///
    /// # Errors
    /// Propagates the store's [`ConfigError`].
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ConfigError> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.store.save_raw(key, &bytes)
    }
}

/// In-memory [`ConfigStore`], for tests and embedding without a filesystem.
#[derive(Default)]
pub struct MemoryConfigStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryConfigStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        let entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.get(key).cloned().ok_or_else(|| ConfigError::NotFound(key.to_string()))
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let mut entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.insert(key.to_string(), data.to_vec());
        Ok(())
    }
}

/// JSON-file-backed [`ConfigStore`], one file per key under a directory.
pub struct JsonFileConfigStore {
    dir: PathBuf,
}

impl JsonFileConfigStore {
    /// Open (creating if absent) a config directory at `dir`.
    ///
    /// # Errors
    /// [`ConfigError::Io`] if `dir` cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl ConfigStore for JsonFileConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(ConfigError::NotFound(key.to_string()))
            }
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        fs::write(self.path_for(key), data)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips_a_config() {
        let service = ConfigService::new(MemoryConfigStore::new());
        let cfg = DbConfig::new(7).with_memory_byte_budget(1024);
        service.save("default", &cfg).unwrap();
        let loaded: DbConfig = service.load("default").unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn memory_store_missing_key_is_not_found() {
        let service: ConfigService<MemoryConfigStore> = ConfigService::new(MemoryConfigStore::new());
        let err = service.load::<DbConfig>("absent").unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn json_file_store_round_trips_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = DbConfig::new(3).with_storage_root("/data/factdb");
        {
            let service = ConfigService::new(JsonFileConfigStore::open(dir.path()).unwrap());
            service.save("default", &cfg).unwrap();
        }
        let service = ConfigService::new(JsonFileConfigStore::open(dir.path()).unwrap());
        let loaded: DbConfig = service.load("default").unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn json_file_store_missing_key_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let service = ConfigService::new(JsonFileConfigStore::open(dir.path()).unwrap());
        let err = service.load::<DbConfig>("absent").unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
