// SPDX-License-Identifier: Apache-2.0
//! The `Root`/`Leaf`/`Merge` node variants and their canonical wire format.

use factdb_codec::ContentHash;
use factdb_index::Fact;

use crate::wire;
use crate::GraphError;

/// Identifies the writer that produced a node.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Source {
    /// Writer/instance id (matches the `iid` half of an `Eid`).
    pub iid: u32,
    /// Opaque per-instance bits the writer may use to disambiguate
    /// concurrent sessions of the same `iid`.
    pub instance_bits: u8,
}

/// One vertex of the transaction DAG.
///
/// Dispatch on the variant tag, not inheritance: a node is either a `Root`
/// with no parents, a `Leaf` with one, or a `Merge` with two.
#[derive(Clone, Debug)]
pub enum Node {
    /// No parents — the first commit of a fresh database.
    Root {
        /// Writer that produced this node.
        source: Source,
        /// Commit timestamp, epoch-milliseconds.
        timestamp: i64,
        /// Facts committed at this node.
        facts: Vec<Fact>,
    },
    /// One parent — a linear commit.
    Leaf {
        /// Hash of the preceding node.
        parent: ContentHash,
        /// Writer that produced this node.
        source: Source,
        /// Commit timestamp, epoch-milliseconds.
        timestamp: i64,
        /// Facts committed at this node.
        facts: Vec<Fact>,
    },
    /// Two parents — reconciles divergent histories.
    Merge {
        /// Hash of the first parent.
        parent1: ContentHash,
        /// Hash of the second parent.
        parent2: ContentHash,
        /// Writer that produced this node.
        source: Source,
        /// Commit timestamp, epoch-milliseconds.
        timestamp: i64,
        /// Facts reconciling the two parent histories.
        facts: Vec<Fact>,
    },
}

impl Node {
    /// The facts carried by this node, regardless of variant.
    pub fn facts(&self) -> &[Fact] {
        match self {
            Self::Root { facts, .. } | Self::Leaf { facts, .. } | Self::Merge { facts, .. } => facts,
        }
    }

    /// The writer that produced this node.
    pub fn source(&self) -> Source {
        match self {
            Self::Root { source, .. } | Self::Leaf { source, .. } | Self::Merge { source, .. } => *source,
        }
    }

    /// Commit timestamp, epoch-milliseconds.
    pub fn timestamp(&self) -> i64 {
        match self {
            Self::Root { timestamp, .. } | Self::Leaf { timestamp, .. } | Self::Merge { timestamp, .. } => *timestamp,
        }
    }

    /// Parent hashes, in traversal order (empty for `Root`, one entry for
    /// `Leaf`, two for `Merge`).
    pub fn parents(&self) -> Vec<ContentHash> {
        match self {
            Self::Root { .. } => Vec::new(),
            Self::Leaf { parent, .. } => vec![*parent],
            Self::Merge { parent1, parent2, .. } => vec![*parent1, *parent2],
        }
    }

    /// Canonical bytes for hashing/storage: facts are sorted by
    /// `(eid, attr)` first so equal fact sets with equal headers always
    /// serialize identically.
    ///
    /// The wire format stores the single `Leaf` parent in the `parent2`
    /// slot with `parent1` null — an intentional asymmetry this
    /// implementation preserves exactly rather than "fixing", since
    /// `Merge`'s two real parents and `Leaf`'s one real parent must stay
    /// distinguishable by null-ness alone for deserialization to classify
    /// the variant.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let (parent1, parent2) = match self {
            Self::Root { .. } => (ContentHash::NULL, ContentHash::NULL),
            Self::Leaf { parent, .. } => (ContentHash::NULL, *parent),
            Self::Merge { parent1, parent2, .. } => (*parent1, *parent2),
        };
        wire::encode_node(parent1, parent2, self.source(), self.timestamp(), self.facts())
    }

    /// The content hash of this node's canonical bytes.
    pub fn hash(&self) -> ContentHash {
        factdb_codec::hash_bytes(&self.canonical_bytes())
    }

    /// Deserialize a node from its canonical bytes, classifying the
    /// variant by parent null-ness.
    ///
    /// # Errors
    /// [`GraphError::Codec`] on a malformed scalar, or
    /// [`GraphError::CorruptedNode`] for the illegal
    /// `(parent1 non-null, parent2 null)` combination.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, GraphError> {
        wire::decode_node(bytes)
    }
}
