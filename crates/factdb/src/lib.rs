// SPDX-License-Identifier: Apache-2.0
//! Embeddable, append-only, content-addressed fact database.
//!
//! [`Db`] composes `factdb-storage` (bytes in/out), `factdb-graph` (the
//! commit DAG), `factdb-index` (the materialized EAV/AVE/VAE view), and
//! `factdb-mapping` (value-object translation) behind one error type.
//! `Db::transact` is the only write path, and follows the commit pipeline
//! exactly: validate against an in-memory copy of the index, build a node,
//! hash it, store it (idempotent on a hash collision), then advance the
//! mutable `head` pointer. A crash between those last two steps leaves a
//! stored-but-unreferenced node — harmless garbage, never a corrupted head.

#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]

pub mod config;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use factdb_codec::{CodecError, ContentHash, Eid, Value};
use factdb_graph::{collect_facts, head_key, node_key, GraphError, Node, Source};
use factdb_index::{schema_to_facts, EidAllocator, Fact, Index, IndexError};
use factdb_mapping::{destruct, reconstruct, Destruct, MappingError, Query, Reconstruct};
use factdb_schema::{Schema, SchemaError};
use factdb_storage::{Storage, StorageError};

pub use config::{ConfigError, ConfigService, ConfigStore, DbConfig, JsonFileConfigStore, MemoryConfigStore};
pub use factdb_codec as codec;
pub use factdb_graph as graph;
pub use factdb_index as index;
pub use factdb_mapping as mapping;
pub use factdb_schema as schema;
pub use factdb_storage as storage;

/// Errors raised by any `Db` operation.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// The storage backend failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The commit DAG was corrupted or a referenced node was missing.
    #[error(transparent)]
    Graph(#[from] GraphError),
    /// A fact batch violated a schema, uniqueness, or cardinality
    /// invariant.
    #[error(transparent)]
    Index(#[from] IndexError),
    /// A schema declaration was invalid.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// Destructuring or reconstructing a value object failed.
    #[error(transparent)]
    Mapping(#[from] MappingError),
    /// A scalar failed to encode or decode.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// The `refs/head` pointer held bytes that do not parse as a hash.
    #[error("[DB_CORRUPTED_HEAD] {0}")]
    CorruptedHead(String),
}

/// An open, embeddable fact database.
///
/// Write access is single-writer: `&mut self` on [`Db::transact`] and
/// [`Db::put`] enforces at compile time that only one in-flight writer
/// exists per `Db` handle, matching the one-writer/many-readers model the
/// node DAG's crash-safety argument depends on. Readers needing
/// concurrent access to a stable index should hold a cloned
/// [`factdb_index::Index`] (cheap: it is structurally shared) rather than
/// a reference to `Db` itself.
pub struct Db {
    storage: Arc<dyn Storage>,
    index: Index,
    alloc: EidAllocator,
    head: ContentHash,
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db").field("head", &self.head).field("alloc", &self.alloc).finish_non_exhaustive()
    }
}

impl Db {
    /// Open (or initialize) a database over `storage`, validating its
    /// schema against `schema` and resuming EID allocation for
    /// `config.writer_iid` past every EID that writer has already used.
    ///
    /// If `refs/head` is absent, the database starts empty at the null
    /// head. Otherwise every committed fact is replayed from the stored
    /// DAG and folded into the initial [`Index`].
    ///
    /// `schema` is always augmented with the four reserved meta-attributes
    /// that let [`Db::persist_schema`] write a schema's own
    /// attribute declarations back as facts, so every `Db` can validate
    /// those facts regardless of whether the embedding application ever
    /// calls `persist_schema`.
    ///
    /// # Errors
    /// [`DbError::CorruptedHead`] if a stored head pointer is not a
    /// well-formed hash; [`DbError::Graph`] if the DAG cannot be replayed;
    /// [`DbError::Index`] if the replayed facts violate `schema`;
    /// [`DbError::Schema`] if `schema` conflicts with a reserved
    /// meta-attribute name.
    pub fn open(storage: Arc<dyn Storage>, schema: Schema, config: &DbConfig) -> Result<Self, DbError> {
        let schema = schema.with_system_attributes()?;
        let head = match storage.load(&head_key())? {
            Some(bytes) => {
                let hex = String::from_utf8_lossy(&bytes).into_owned();
                ContentHash::parse_hex(&hex).map_err(|err| DbError::CorruptedHead(err.to_string()))?
            }
            None => ContentHash::NULL,
        };

        let facts = if head.is_null() { Vec::new() } else { collect_facts(storage.as_ref(), head)? };
        let next_local = next_local_after(&facts, config.writer_iid);
        let fact_count = facts.len();
        let index = Index::new(schema).add_facts(facts)?;
        let alloc = EidAllocator::resume(config.writer_iid, next_local);

        tracing::info!(head = %head, facts = fact_count, "opened database");

        Ok(Self { storage, index, alloc, head })
    }

    /// The current head of the commit DAG; [`ContentHash::NULL`] for a
    /// freshly initialized, empty database.
    pub fn head(&self) -> ContentHash {
        self.head
    }

    /// The live, materialized index as of the last successful
    /// [`Db::transact`].
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Allocate a fresh [`Eid`] for this database's writer instance
    /// without committing anything.
    ///
    /// # Errors
    /// [`DbError::Index`] (`EidSpaceExhausted`) if this instance's local
    /// counter has been exhausted.
    pub fn alloc_eid(&mut self) -> Result<Eid, DbError> {
        Ok(self.alloc.alloc()?)
    }

    /// Commit `facts` as one new DAG node, advancing `head`.
    ///
    /// Facts are validated against a trial copy of the index before
    /// anything is written, so a rejected batch leaves `self` completely
    /// unchanged. On success, returns the new node's content hash.
    ///
    /// # Errors
    /// [`DbError::Index`] if `facts` violates schema, uniqueness, or
    /// cardinality; [`DbError::Storage`] if the backend fails to persist
    /// the node or advance the head.
    pub fn transact(&mut self, facts: Vec<Fact>) -> Result<ContentHash, DbError> {
        let candidate = self.index.clone().add_facts(facts.clone())?;

        let source = Source { iid: self.alloc.iid(), instance_bits: 0 };
        let timestamp = now_millis();
        let node = if self.head.is_null() {
            Node::Root { source, timestamp, facts }
        } else {
            Node::Leaf { parent: self.head, source, timestamp, facts }
        };
        let hash = node.hash();

        match self.storage.add(&node_key(&hash), &node.canonical_bytes()) {
            Ok(()) | Err(StorageError::AlreadyExists(_)) => {}
            Err(err) => return Err(err.into()),
        }

        let head_bytes = hash.to_string().into_bytes();
        if self.head.is_null() {
            self.storage.add(&head_key(), &head_bytes)?;
        } else {
            self.storage.overwrite(&head_key(), &head_bytes)?;
        }

        tracing::debug!(node = %hash, "committed transaction");
        self.index = candidate;
        self.head = hash;
        Ok(hash)
    }

    /// Write this database's current schema as facts under the reserved
    /// system `Eid` range, committing them in one transaction.
    ///
    /// Safe to call more than once (e.g. after [`Db::open`] on every
    /// startup): re-asserting the same attribute facts is a normal
    /// transaction like any other, not a special bootstrap step.
    ///
    /// # Errors
    /// [`DbError::Index`] if the schema has more non-system attributes than
    /// fit in the reserved range (`EidSpaceExhausted`); any error
    /// [`Db::transact`] can raise while committing the resulting facts.
    pub fn persist_schema(&mut self) -> Result<ContentHash, DbError> {
        let facts = schema_to_facts(self.index.schema())?;
        self.transact(facts)
    }

    /// Destructure `value` into facts and commit them in one transaction,
    /// returning the entity id it was stored under.
    ///
    /// # Errors
    /// Propagates [`MappingError`]s from destructuring and any
    /// [`DbError`] raised by the underlying [`Db::transact`].
    pub fn put<T: Destruct>(&mut self, value: &T) -> Result<Eid, DbError> {
        let writer_iid = self.alloc.iid();
        let timestamp = now_millis();
        let (eid, facts) = destruct(value, &mut self.alloc, timestamp)?;
        debug_assert_eq!(eid.iid, writer_iid, "destructuring must allocate from this database's own instance");
        self.transact(facts)?;
        Ok(eid)
    }

    /// Reconstruct a value object of type `T` rooted at `eid`, resolving
    /// nested references as steered by `query`.
    ///
    /// # Errors
    /// Propagates [`MappingError`]s: a required reference with no live
    /// fact, or a fact whose value does not match the expected scalar
    /// type.
    pub fn pull<T: Reconstruct>(&self, eid: Eid, query: Query) -> Result<T, DbError> {
        Ok(reconstruct(&self.index, eid, query)?)
    }

    /// Look up the single entity currently holding `value` for the
    /// `unique` attribute `attr`, if any.
    ///
    /// Returns `None` both when no entity holds the value and (should the
    /// index ever momentarily disagree with schema) when more than one
    /// does; callers needing the full holder set should use
    /// [`Index::entities_by_attr_value`] directly.
    pub fn entity(&self, attr: &str, value: &Value) -> Option<Eid> {
        let holders = self.index.entities_by_attr_value(attr, value);
        if holders.len() == 1 {
            holders.into_iter().next()
        } else {
            None
        }
    }
}

/// Resume an allocator one past the highest local id `writer_iid` has ever
/// used, whether as a fact's own entity or as an `Eid`-valued fact value
/// (a reference assigned by this writer to some other entity) — scanning
/// the replayed fact log directly rather than the folded index, since
/// retracted assertions still count toward ids this instance has already
/// handed out and must never reissue.
fn next_local_after(facts: &[Fact], writer_iid: u32) -> u64 {
    let mut max_seen: Option<u64> = None;
    let mut bump = |local: u64| max_seen = Some(max_seen.map_or(local, |m| m.max(local)));
    for fact in facts {
        if fact.eid.iid == writer_iid {
            bump(fact.eid.local);
        }
        if let Value::Eid(target) = fact.value {
            if target.iid == writer_iid {
                bump(target.local);
            }
        }
    }
    max_seen.map_or(Eid::RESERVED_LOCAL_CEILING, |m| m.saturating_add(1))
}

#[allow(clippy::cast_possible_wrap)]
fn now_millis() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}
