// SPDX-License-Identifier: Apache-2.0
//! Filesystem-backed [`Storage`]: namespaces map to directories, entry
//! names map to files. `overwrite` writes to a temp file and renames it
//! into place so concurrent readers never observe a partial write.

use std::fs;
use std::path::{Path, PathBuf};

use crate::{Key, Namespace, Storage, StorageError};

/// Storage backend rooted at a directory on disk.
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    /// Open (creating if absent) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn dir_for(&self, ns: &Namespace) -> PathBuf {
        let mut path = self.root.clone();
        for segment in ns.segments() {
            path.push(segment);
        }
        path
    }

    fn path_for(&self, key: &Key) -> PathBuf {
        self.dir_for(&key.namespace).join(&key.name)
    }
}

impl Storage for FsStorage {
    fn add(&self, key: &Key, bytes: &[u8]) -> Result<(), StorageError> {
        let dir = self.dir_for(&key.namespace);
        fs::create_dir_all(&dir)?;
        let path = self.path_for(key);
        if path.exists() {
            return Err(StorageError::AlreadyExists(key.to_string()));
        }
        // Write-temp-then-rename keeps `add` atomic against concurrent
        // readers even though it doesn't need overwrite's must-exist check.
        write_via_temp(&dir, &path, bytes)?;
        tracing::debug!(%key, bytes = bytes.len(), "storage.add");
        Ok(())
    }

    fn overwrite(&self, key: &Key, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Err(StorageError::NotFound(key.to_string()));
        }
        let dir = self.dir_for(&key.namespace);
        write_via_temp(&dir, &path, bytes)?;
        tracing::debug!(%key, bytes = bytes.len(), "storage.overwrite");
        Ok(())
    }

    fn load(&self, key: &Key) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    fn keys(&self, ns: &Namespace) -> Result<Vec<String>, StorageError> {
        let dir = self.dir_for(ns);
        list_dir(&dir, |entry_path| entry_path.is_file())
    }

    fn sub_namespaces(&self, ns: &Namespace) -> Result<Vec<String>, StorageError> {
        let dir = self.dir_for(ns);
        list_dir(&dir, |entry_path| entry_path.is_dir())
    }
}

fn list_dir(dir: &Path, keep: impl Fn(&Path) -> bool) -> Result<Vec<String>, StorageError> {
    let read_dir = match fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(StorageError::Io(err)),
    };
    let mut names = Vec::new();
    for entry in read_dir {
        let entry = entry?;
        if keep(&entry.path()) {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    Ok(names)
}

fn write_via_temp(dir: &Path, path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("entry");
    let tmp_path = dir.join(format!(".{file_name}.tmp"));
    fs::write(&tmp_path, bytes)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, FsStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::open(dir.path()).unwrap();
        (dir, storage)
    }

    fn node_key(name: &str) -> Key {
        Key::new(Namespace::root().child("nodes"), name)
    }

    #[test]
    fn add_then_load_round_trip() {
        let (_dir, storage) = store();
        storage.add(&node_key("abc"), b"payload").unwrap();
        assert_eq!(storage.load(&node_key("abc")).unwrap(), Some(b"payload".to_vec()));
    }

    #[test]
    fn add_twice_fails_already_exists() {
        let (_dir, storage) = store();
        storage.add(&node_key("abc"), b"v1").unwrap();
        let err = storage.add(&node_key("abc"), b"v2").unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
        assert_eq!(storage.load(&node_key("abc")).unwrap(), Some(b"v1".to_vec()));
    }

    #[test]
    fn overwrite_missing_fails_not_found() {
        let (_dir, storage) = store();
        let err = storage.overwrite(&node_key("nope"), b"x").unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[test]
    fn overwrite_replaces_head_ref() {
        let (_dir, storage) = store();
        let head = Key::new(Namespace::root().child("refs"), "head");
        storage.add(&head, b"hash-1").unwrap();
        storage.overwrite(&head, b"hash-2").unwrap();
        assert_eq!(storage.load(&head).unwrap(), Some(b"hash-2".to_vec()));
    }

    #[test]
    fn keys_and_sub_namespaces_are_non_recursive() {
        let (_dir, storage) = store();
        storage.add(&node_key("a"), b"1").unwrap();
        storage
            .add(&Key::new(Namespace::root().child("nodes").child("x"), "b"), b"2")
            .unwrap();
        let keys = storage.keys(&Namespace::root().child("nodes")).unwrap();
        assert_eq!(keys, vec!["a".to_string()]);
        let subs = storage.sub_namespaces(&Namespace::root().child("nodes")).unwrap();
        assert_eq!(subs, vec!["x".to_string()]);
    }

    #[test]
    fn listing_an_absent_namespace_is_empty_not_an_error() {
        let (_dir, storage) = store();
        assert_eq!(storage.keys(&Namespace::root().child("absent")).unwrap(), Vec::<String>::new());
    }
}
