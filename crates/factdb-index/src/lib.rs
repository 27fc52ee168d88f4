// SPDX-License-Identifier: Apache-2.0
//! The fact model and materialized index.
//!
//! [`Index`] folds a fact multiset into three maps — EAV, AVE, VAE — and
//! enforces the uniqueness and cardinality invariants declared by a
//! [`factdb_schema::Schema`] while doing so.

#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]

mod eid_allocator;
mod fact;
mod schema_facts;

pub use eid_allocator::EidAllocator;
pub use fact::Fact;
pub use schema_facts::{schema_from_index, schema_to_facts};

use std::collections::{BTreeMap, BTreeSet};

use factdb_codec::{Eid, Value};
use factdb_schema::{Schema, SchemaError};

/// Errors raised while folding facts into an [`Index`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    /// Two live facts assert the same value for a `unique` attribute under
    /// different entities.
    #[error("[INDEX_UNIQUENESS_VIOLATION] attribute {attr} value already held by {existing}, cannot also assign to {new}")]
    UniquenessViolation {
        /// The attribute whose uniqueness was violated.
        attr: String,
        /// A rendering of the conflicting value.
        value: String,
        /// The entity already holding `value`.
        existing: Eid,
        /// The entity the new fact tried to assign `value` to.
        new: Eid,
    },
    /// A non-list attribute already has a live value for this entity and a
    /// second assertion arrived without a prior retraction.
    #[error("[INDEX_CARDINALITY_VIOLATION] attribute {attr} is not list-valued but entity {eid} already has a live value")]
    CardinalityViolation {
        /// The entity with the conflicting second assertion.
        eid: Eid,
        /// The non-list attribute.
        attr: String,
    },
    /// A fact referenced an attribute not present in the index's schema.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// The EID allocator for this instance has no `local` values left.
    #[error("[INDEX_EID_SPACE_EXHAUSTED] no local ids remain for this instance")]
    EidSpaceExhausted,
}

fn render_value(v: &Value) -> String {
    format!("{v:?}")
}

/// The materialized, queryable projection of a fact multiset.
///
/// `Index` has value semantics: [`Index::add_facts`] consumes one index and
/// produces another, so a reader holding an `Index` never observes a write
/// in progress (the single-writer/many-reader model this store assumes).
#[derive(Clone, Debug)]
pub struct Index {
    schema: Schema,
    eav: BTreeMap<Eid, BTreeMap<String, Vec<Value>>>,
    ave: BTreeMap<String, BTreeMap<Value, BTreeSet<Eid>>>,
    vae: BTreeMap<Eid, BTreeMap<String, BTreeSet<Eid>>>,
}

impl Index {
    /// An empty index over `schema`.
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            eav: BTreeMap::new(),
            ave: BTreeMap::new(),
            vae: BTreeMap::new(),
        }
    }

    /// The schema this index validates facts against.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Fold `facts` into a new `Index`, leaving `self` consumed.
    ///
    /// Input order does not matter except that, for a given
    /// `(eid, attr, value)`, an assertion must be reachable before its
    /// retraction — this method stably reorders by `(eid, attr, deleted)`
    /// before folding so callers do not have to pre-sort.
    ///
    /// # Errors
    /// [`IndexError::Schema`] for an undeclared attribute,
    /// [`IndexError::UniquenessViolation`] for a `unique` conflict, or
    /// [`IndexError::CardinalityViolation`] for a non-list attribute
    /// receiving a second live assertion.
    pub fn add_facts(mut self, mut facts: Vec<Fact>) -> Result<Self, IndexError> {
        facts.sort_by(|a, b| {
            (&a.eid, a.attr.as_str(), a.deleted).cmp(&(&b.eid, b.attr.as_str(), b.deleted))
        });

        for fact in facts {
            let attr = self.schema.require(&fact.attr)?.clone();
            if fact.deleted {
                self.retract(&fact, &attr);
            } else {
                self.assert(&fact, &attr)?;
            }
        }
        Ok(self)
    }

    fn assert(&mut self, fact: &Fact, attr: &factdb_schema::Attribute) -> Result<(), IndexError> {
        let live = self.eav.entry(fact.eid).or_default().entry(fact.attr.clone()).or_default();

        if !attr.list && !live.is_empty() {
            return Err(IndexError::CardinalityViolation {
                eid: fact.eid,
                attr: fact.attr.clone(),
            });
        }

        if attr.unique {
            if let Some(holders) = self.ave.get(&fact.attr).and_then(|m| m.get(&fact.value)) {
                if let Some(&existing) = holders.iter().find(|&&e| e != fact.eid) {
                    return Err(IndexError::UniquenessViolation {
                        attr: fact.attr.clone(),
                        value: render_value(&fact.value),
                        existing,
                        new: fact.eid,
                    });
                }
            }
        }

        self.eav
            .entry(fact.eid)
            .or_default()
            .entry(fact.attr.clone())
            .or_default()
            .push(fact.value.clone());

        self.ave
            .entry(fact.attr.clone())
            .or_default()
            .entry(fact.value.clone())
            .or_default()
            .insert(fact.eid);

        if let Value::Eid(target) = fact.value {
            self.vae
                .entry(target)
                .or_default()
                .entry(fact.attr.clone())
                .or_default()
                .insert(fact.eid);
        }

        Ok(())
    }

    /// `attr.list` attributes retract only the exact `(eid, attr, value)`
    /// match; non-list attributes retract whatever single live value is
    /// present regardless of whether it equals `fact.value`, since
    /// cardinality one means at most one value can ever be live.
    fn retract(&mut self, fact: &Fact, attr: &factdb_schema::Attribute) {
        let Some(values) = self.eav.get_mut(&fact.eid).and_then(|m| m.get_mut(&fact.attr)) else {
            return;
        };
        let pos = if attr.list {
            values.iter().position(|v| v == &fact.value)
        } else {
            (!values.is_empty()).then_some(0)
        };
        let Some(removed) = pos.map(|pos| values.remove(pos)) else {
            return;
        };

        if let Some(holders) = self.ave.get_mut(&fact.attr).and_then(|m| m.get_mut(&removed)) {
            holders.remove(&fact.eid);
        }

        if let Value::Eid(target) = removed {
            if let Some(holders) = self.vae.get_mut(&target).and_then(|m| m.get_mut(&fact.attr)) {
                holders.remove(&fact.eid);
            }
        }
    }

    /// Entities currently holding `value` for `attr`.
    pub fn entities_by_attr_value(&self, attr: &str, value: &Value) -> BTreeSet<Eid> {
        self.ave
            .get(attr)
            .and_then(|m| m.get(value))
            .cloned()
            .unwrap_or_default()
    }

    /// Live values of `attr` on `eid`, in assertion order.
    pub fn values_of(&self, eid: Eid, attr: &str) -> &[Value] {
        self.eav
            .get(&eid)
            .and_then(|m| m.get(attr))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// `true` if `eid` holds any live fact at all.
    pub fn exists(&self, eid: Eid) -> bool {
        self.eav.get(&eid).is_some_and(|attrs| attrs.values().any(|v| !v.is_empty()))
    }

    /// Entities that hold a live reference to `target` via `attr`, walking
    /// the reverse (VAE) index.
    pub fn referrers(&self, target: Eid, attr: &str) -> BTreeSet<Eid> {
        self.vae
            .get(&target)
            .and_then(|m| m.get(attr))
            .cloned()
            .unwrap_or_default()
    }

    /// Every entity this index has any EAV entry for, in `Eid` order
    /// (`(iid, local)`). An entity with only retracted facts still appears
    /// here with an empty value set; pair with [`Index::exists`] to filter
    /// those out.
    pub fn entities(&self) -> impl Iterator<Item = Eid> + '_ {
        self.eav.keys().copied()
    }
}
