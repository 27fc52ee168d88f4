// SPDX-License-Identifier: Apache-2.0
//! Namespaced key/value storage abstraction.
//!
//! [`Storage`] is the write/read surface the database facade drives: `add`
//! is the create-only path used for immutable nodes, `overwrite` is the
//! must-already-exist path used only for mutable pointers like `refs/head`.

#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]

mod fs;
mod memory;
mod namespace;

pub use fs::FsStorage;
pub use memory::MemoryStorage;
pub use namespace::{Key, Namespace};

/// Errors raised by a [`Storage`] backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// `add` was called for a key that already exists.
    #[error("[STORAGE_ALREADY_EXISTS] key already exists: {0}")]
    AlreadyExists(String),
    /// `overwrite` was called for a key that does not exist.
    #[error("[STORAGE_NOT_FOUND] key does not exist: {0}")]
    NotFound(String),
    /// The underlying medium (filesystem, etc.) failed.
    #[error("[STORAGE_IO] {0}")]
    Io(#[from] std::io::Error),
}

/// Content-addressed and pointer storage over a hierarchical namespace.
///
/// Implementations must make `add` atomic against concurrent readers (a
/// key is either fully present or absent) and `overwrite` of the same key
/// atomic with respect to readers, since `overwrite` is the only write path
/// used for the mutable `head` pointer.
pub trait Storage: Send + Sync {
    /// Create a new entry. Fails with [`StorageError::AlreadyExists`] if
    /// `key` is already present.
    fn add(&self, key: &Key, bytes: &[u8]) -> Result<(), StorageError>;

    /// Replace an existing entry. Fails with [`StorageError::NotFound`] if
    /// `key` is absent.
    fn overwrite(&self, key: &Key, bytes: &[u8]) -> Result<(), StorageError>;

    /// Load the bytes at `key`, or `None` if absent.
    fn load(&self, key: &Key) -> Result<Option<Vec<u8>>, StorageError>;

    /// `true` if `key` is present.
    fn has_key(&self, key: &Key) -> Result<bool, StorageError> {
        Ok(self.load(key)?.is_some())
    }

    /// Non-recursive listing of entry names directly under `ns`.
    fn keys(&self, ns: &Namespace) -> Result<Vec<String>, StorageError>;

    /// Non-recursive listing of direct child namespace segments under `ns`.
    fn sub_namespaces(&self, ns: &Namespace) -> Result<Vec<String>, StorageError>;
}
