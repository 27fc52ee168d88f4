// SPDX-License-Identifier: Apache-2.0
//! Reconstruction: facts -> value object, steered by a [`Query`].

use factdb_codec::{Eid, Value};
use factdb_index::Index;

use crate::query::Query;
use crate::scalar::ScalarValue;
use crate::MappingError;

/// Implemented by application value types that can be reconstructed from
/// facts.
pub trait Reconstruct: Sized {
    /// `<Type>` prefix for this value's attribute names.
    const TYPE_NAME: &'static str;

    /// Fully reconstruct the value identified by `eid`, resolving any
    /// nested reference [`ReconstructCtx::query`] opts into.
    ///
    /// # Errors
    /// Any [`MappingError`] reading or converting one of this value's facts.
    fn reconstruct(eid: Eid, ctx: &ReconstructCtx<'_>) -> Result<Self, MappingError>;

    /// A stub identified by `eid` with every other field at its zero
    /// value — what a nested, non-optional reference reconstructs as when
    /// [`ReconstructCtx::query`] does not opt into traversing it (a stub
    /// or `None`).
    fn stub(eid: Eid) -> Self;
}

/// Carries the [`Index`] being read and the [`Query`] steering which
/// nested references get traversed.
pub struct ReconstructCtx<'a> {
    index: &'a Index,
    query: Query,
}

impl<'a> ReconstructCtx<'a> {
    /// Start reconstructing against `index`, steered by `query`.
    pub fn new(index: &'a Index, query: Query) -> Self {
        Self { index, query }
    }

    /// The index backing this reconstruction.
    pub fn index(&self) -> &'a Index {
        self.index
    }

    /// The query steering this reconstruction.
    pub fn query(&self) -> &Query {
        &self.query
    }

    fn first_value(&self, eid: Eid, attr: &str) -> Option<&Value> {
        self.index.values_of(eid, attr).first()
    }

    /// Read a required scalar, falling back to `V::zero()` if no live fact
    /// asserts it (the default policy for absent non-optional scalars).
    ///
    /// # Errors
    /// [`MappingError::TypeMismatch`] if a live value exists but is not a
    /// `V`.
    pub fn scalar<V: ScalarValue>(&self, eid: Eid, attr: &str) -> Result<V, MappingError> {
        match self.first_value(eid, attr) {
            Some(v) => V::from_value(v),
            None => Ok(V::zero()),
        }
    }

    /// Read an optional scalar: `None` if no live fact asserts it.
    ///
    /// # Errors
    /// [`MappingError::TypeMismatch`] if a live value exists but is not a
    /// `V`.
    pub fn optional_scalar<V: ScalarValue>(&self, eid: Eid, attr: &str) -> Result<Option<V>, MappingError> {
        self.first_value(eid, attr).map(V::from_value).transpose()
    }

    /// Read every live value of a scalar list attribute, in stored order.
    ///
    /// # Errors
    /// [`MappingError::TypeMismatch`] if any element is not a `V`.
    pub fn list_scalar<V: ScalarValue>(&self, eid: Eid, attr: &str) -> Result<Vec<V>, MappingError> {
        self.index.values_of(eid, attr).iter().map(V::from_value).collect()
    }

    /// Resolve a required (non-optional) nested reference held by `attr`.
    ///
    /// Without `prop` present in [`Self::query`], returns `T::stub(eid)`
    /// without reading any of the referenced entity's own facts. With
    /// `prop` present, fully reconstructs the referenced entity using
    /// `prop`'s sub-query.
    ///
    /// # Errors
    /// [`MappingError::MissingReference`] if `attr` holds no live eid
    /// value, or any error from reconstructing the referenced entity.
    pub fn reference<T: Reconstruct>(&self, eid: Eid, attr: &str, prop: &str) -> Result<T, MappingError> {
        let child_eid = self.required_ref(eid, attr)?;
        if self.query.wants(prop) {
            let child_ctx = ReconstructCtx::new(self.index, self.query.sub_query(prop));
            T::reconstruct(child_eid, &child_ctx)
        } else {
            Ok(T::stub(child_eid))
        }
    }

    /// Resolve an optional nested reference held by `attr`.
    ///
    /// A documented asymmetry: without `prop` present in [`Self::query`],
    /// this returns `None` even if destructuring wrote a fact for it
    /// (optional references never auto-stub the way required ones do) —
    /// only an explicit query entry resolves it to `Some`.
    ///
    /// # Errors
    /// Any error from reconstructing the referenced entity, once `prop` is
    /// opted in.
    pub fn optional_reference<T: Reconstruct>(
        &self,
        eid: Eid,
        attr: &str,
        prop: &str,
    ) -> Result<Option<T>, MappingError> {
        if !self.query.wants(prop) {
            return Ok(None);
        }
        match self.first_value(eid, attr).cloned() {
            Some(Value::Eid(child_eid)) => {
                let child_ctx = ReconstructCtx::new(self.index, self.query.sub_query(prop));
                Ok(Some(T::reconstruct(child_eid, &child_ctx)?))
            }
            _ => Ok(None),
        }
    }

    /// Resolve a list of nested references held by `attr`, in stored
    /// order. Each element is `T::stub` unless `prop` is present in
    /// [`Self::query`], in which case every element is fully
    /// reconstructed using `prop`'s sub-query.
    ///
    /// # Errors
    /// Any error from reconstructing an opted-in element.
    pub fn list_reference<T: Reconstruct>(&self, eid: Eid, attr: &str, prop: &str) -> Result<Vec<T>, MappingError> {
        let eids: Vec<Eid> = self
            .index
            .values_of(eid, attr)
            .iter()
            .filter_map(|v| match v {
                Value::Eid(e) => Some(*e),
                _ => None,
            })
            .collect();
        if self.query.wants(prop) {
            let sub = self.query.sub_query(prop);
            eids.into_iter()
                .map(|child_eid| {
                    let child_ctx = ReconstructCtx::new(self.index, sub.clone());
                    T::reconstruct(child_eid, &child_ctx)
                })
                .collect()
        } else {
            Ok(eids.into_iter().map(T::stub).collect())
        }
    }

    fn required_ref(&self, eid: Eid, attr: &str) -> Result<Eid, MappingError> {
        match self.first_value(eid, attr) {
            Some(Value::Eid(child_eid)) => Ok(*child_eid),
            _ => Err(MappingError::MissingReference { eid, attr: attr.to_string() }),
        }
    }
}

/// Pull a value of type `T` out of `index`, rooted at `eid`, with `query`
/// steering which nested references resolve.
///
/// # Errors
/// Any [`MappingError`] from `T::reconstruct`.
pub fn reconstruct<T: Reconstruct>(index: &Index, eid: Eid, query: Query) -> Result<T, MappingError> {
    let ctx = ReconstructCtx::new(index, query);
    T::reconstruct(eid, &ctx)
}
