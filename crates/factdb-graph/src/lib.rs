// SPDX-License-Identifier: Apache-2.0
//! The content-addressed transaction DAG.
//!
//! A [`Node`] is one of `Root` (no parents), `Leaf` (one parent, a linear
//! commit), or `Merge` (two parents). Every node's hash is the BLAKE3
//! digest of its canonical serialization ([`Node::canonical_bytes`]); since
//! a new node can only reference an *existing* hash, the DAG is acyclic by
//! construction.

#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]

mod node;
mod replay;
mod wire;

pub use node::{Node, Source};
pub use replay::collect_facts;

use factdb_codec::ContentHash;
use factdb_storage::{Key, Namespace};

/// Errors raised while (de)serializing or replaying the node DAG.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The stored bytes did not parse as a well-formed node.
    #[error("[GRAPH_CORRUPTED_NODE] {0}")]
    CorruptedNode(String),
    /// A scalar inside the node failed to decode.
    #[error(transparent)]
    Codec(#[from] factdb_codec::CodecError),
    /// The underlying storage backend failed.
    #[error(transparent)]
    Storage(#[from] factdb_storage::StorageError),
    /// `replay` followed a parent hash that storage does not have.
    #[error("[GRAPH_MISSING_NODE] node {0} referenced but not found in storage")]
    MissingNode(ContentHash),
}

/// The storage namespace nodes live under (`nodes/<hex-hash>`).
pub fn nodes_namespace() -> Namespace {
    Namespace::root().child("nodes")
}

/// The storage key for the node with content hash `hash`.
pub fn node_key(hash: &ContentHash) -> Key {
    Key::new(nodes_namespace(), hash.to_string())
}

/// The storage namespace holding the mutable `head` ref (`refs/head`).
pub fn refs_namespace() -> Namespace {
    Namespace::root().child("refs")
}

/// The storage key for the mutable head pointer.
pub fn head_key() -> Key {
    Key::new(refs_namespace(), "head")
}
