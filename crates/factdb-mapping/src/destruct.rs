// SPDX-License-Identifier: Apache-2.0
//! Destructuring: value object -> fact batch.

use factdb_codec::{Eid, Value};
use factdb_index::{EidAllocator, Fact};

use crate::scalar::ScalarValue;
use crate::MappingError;

/// Implemented by application value types that can be destructured into
/// facts.
///
/// `TYPE_NAME` is the `<Type>` half of this value's attribute names (the
/// `Type.prop` convention). `id` lets a value that already has a known
/// `Eid` reuse it instead of allocating a fresh one.
pub trait Destruct {
    /// `<Type>` prefix for this value's attribute names.
    const TYPE_NAME: &'static str;

    /// This value's own id, if it is already known to the database.
    fn id(&self) -> Option<Eid>;

    /// Emit this value's own facts (not counting nested values, which
    /// [`Destructor`] recurses into) under `eid`.
    fn destruct_into(&self, eid: Eid, sink: &mut Destructor<'_>) -> Result<(), MappingError>;
}

/// Accumulates facts and allocates EIDs while a value object (and
/// everything it references) is destructured.
pub struct Destructor<'a> {
    alloc: &'a mut EidAllocator,
    timestamp: i64,
    facts: Vec<Fact>,
}

impl<'a> Destructor<'a> {
    /// Start a fresh destructuring pass. `timestamp` is stamped onto every
    /// fact this batch emits (epoch-milliseconds).
    pub fn new(alloc: &'a mut EidAllocator, timestamp: i64) -> Self {
        Self { alloc, timestamp, facts: Vec::new() }
    }

    /// The timestamp this batch stamps onto every fact.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Reuse `existing` if present, else allocate a fresh `Eid`.
    ///
    /// # Errors
    /// [`MappingError::Index`] wrapping [`factdb_index::IndexError::EidSpaceExhausted`].
    pub fn assign_eid(&mut self, existing: Option<Eid>) -> Result<Eid, MappingError> {
        match existing {
            Some(eid) => Ok(eid),
            None => Ok(self.alloc.alloc()?),
        }
    }

    /// Emit a scalar assertion.
    pub fn scalar<V: ScalarValue>(&mut self, eid: Eid, attr: &str, value: &V) {
        self.facts.push(Fact::assert(eid, attr, value.to_value()));
    }

    /// Emit a scalar assertion only if `value` is `Some` — an absent
    /// optional scalar emits no fact.
    pub fn optional_scalar<V: ScalarValue>(&mut self, eid: Eid, attr: &str, value: Option<&V>) {
        if let Some(v) = value {
            self.scalar(eid, attr, v);
        }
    }

    /// Emit one assertion per element of a scalar list, in order.
    pub fn list_scalar<'v, V: ScalarValue + 'v>(
        &mut self,
        eid: Eid,
        attr: &str,
        values: impl IntoIterator<Item = &'v V>,
    ) {
        for v in values {
            self.scalar(eid, attr, v);
        }
    }

    /// Recursively destruct `value` and return the `Eid` it was assigned.
    ///
    /// # Errors
    /// Propagates any error from destructuring `value` or its nested
    /// values.
    pub fn destruct<T: Destruct>(&mut self, value: &T) -> Result<Eid, MappingError> {
        let eid = self.assign_eid(value.id())?;
        value.destruct_into(eid, self)?;
        Ok(eid)
    }

    /// Emit a reference fact from `eid` to the destructured `child`.
    ///
    /// # Errors
    /// Propagates any error from destructuring `child`.
    pub fn reference<T: Destruct>(&mut self, eid: Eid, attr: &str, child: &T) -> Result<(), MappingError> {
        let child_eid = self.destruct(child)?;
        self.facts.push(Fact::assert(eid, attr, Value::Eid(child_eid)));
        Ok(())
    }

    /// Emit a reference fact for an optional nested object.
    ///
    /// A documented asymmetry: unlike an absent optional *scalar*, an
    /// absent optional *nested object* is not simply omitted here — it is
    /// destructured as `T::default()` and a fact **is** written for it,
    /// even though [`crate::Reconstruct`]'s default policy will not
    /// traverse that reference back without a [`crate::Query`] opting in.
    /// Deliberate, not a bug: kept asymmetric rather than "fixed" to a
    /// symmetric omit-when-absent rule.
    ///
    /// # Errors
    /// Propagates any error from destructuring `child` (or the default
    /// instance used in its place).
    pub fn optional_reference<T: Destruct + Default>(
        &mut self,
        eid: Eid,
        attr: &str,
        child: Option<&T>,
    ) -> Result<(), MappingError> {
        match child {
            Some(c) => self.reference(eid, attr, c),
            None => {
                let default = T::default();
                self.reference(eid, attr, &default)
            }
        }
    }

    /// Emit one reference fact per element of a list of nested objects, in
    /// order.
    ///
    /// # Errors
    /// Propagates any error from destructuring an element.
    pub fn list_reference<T: Destruct>(&mut self, eid: Eid, attr: &str, children: &[T]) -> Result<(), MappingError> {
        for child in children {
            self.reference(eid, attr, child)?;
        }
        Ok(())
    }

    /// Consume this destructuring pass, returning every fact emitted.
    pub fn finish(self) -> Vec<Fact> {
        self.facts
    }
}

/// Destruct `value`, allocating a root `Eid` (or reusing `value.id()`) and
/// returning it alongside the full fact batch for `value` and everything
/// it transitively references.
///
/// # Errors
/// [`MappingError::Index`] on EID allocator exhaustion, or any error
/// `value`'s [`Destruct`] implementation propagates.
pub fn destruct<T: Destruct>(
    value: &T,
    alloc: &mut EidAllocator,
    timestamp: i64,
) -> Result<(Eid, Vec<Fact>), MappingError> {
    let mut sink = Destructor::new(alloc, timestamp);
    let eid = sink.destruct(value)?;
    Ok((eid, sink.finish()))
}
