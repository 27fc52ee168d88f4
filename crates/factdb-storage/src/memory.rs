// SPDX-License-Identifier: Apache-2.0
//! In-memory [`Storage`] backend — a tree of maps, for tests and embedding
//! without a filesystem.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use crate::{Key, Namespace, Storage, StorageError};

#[derive(Default)]
struct Inner {
    entries: BTreeMap<Key, Vec<u8>>,
    namespaces: BTreeSet<Namespace>,
}

/// In-memory storage backend. Cheap to construct; state does not outlive
/// the process.
#[derive(Default)]
pub struct MemoryStorage {
    inner: Mutex<Inner>,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn register_namespace(inner: &mut Inner, ns: &Namespace) {
        for ancestor in ns.ancestors() {
            inner.namespaces.insert(ancestor);
        }
    }
}

impl Storage for MemoryStorage {
    fn add(&self, key: &Key, bytes: &[u8]) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if inner.entries.contains_key(key) {
            return Err(StorageError::AlreadyExists(key.to_string()));
        }
        Self::register_namespace(&mut inner, &key.namespace);
        inner.entries.insert(key.clone(), bytes.to_vec());
        tracing::debug!(%key, bytes = bytes.len(), "storage.add");
        Ok(())
    }

    fn overwrite(&self, key: &Key, bytes: &[u8]) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !inner.entries.contains_key(key) {
            return Err(StorageError::NotFound(key.to_string()));
        }
        inner.entries.insert(key.clone(), bytes.to_vec());
        tracing::debug!(%key, bytes = bytes.len(), "storage.overwrite");
        Ok(())
    }

    fn load(&self, key: &Key) -> Result<Option<Vec<u8>>, StorageError> {
        let inner = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(inner.entries.get(key).cloned())
    }

    fn keys(&self, ns: &Namespace) -> Result<Vec<String>, StorageError> {
        let inner = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(inner
            .entries
            .keys()
            .filter(|k| &k.namespace == ns)
            .map(|k| k.name.clone())
            .collect())
    }

    fn sub_namespaces(&self, ns: &Namespace) -> Result<Vec<String>, StorageError> {
        let inner = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(inner
            .namespaces
            .iter()
            .filter(|candidate| candidate.parent().as_ref() == Some(ns))
            .filter_map(Namespace::leaf_segment)
            .map(str::to_string)
            .collect())
    }
}
