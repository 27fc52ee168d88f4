// SPDX-License-Identifier: Apache-2.0
//! A fact (datom): `(entity, attribute, value, deleted)`.

use factdb_codec::{Eid, Value};

/// One fact: an entity, an attribute it holds a value for, the value, and
/// whether this is an assertion or a retraction.
///
/// `deleted = true` retracts an earlier assertion of the same
/// `(eid, attr, value?)` — which part of the tuple must match depends on
/// the attribute's cardinality (exact `value` match for list attributes,
/// any live value for non-list attributes).
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Fact {
    /// Entity this fact is about.
    pub eid: Eid,
    /// Attribute name (`<Type>.<prop>`).
    pub attr: String,
    /// The value asserted or retracted.
    pub value: Value,
    /// `true` for a retraction, `false` for an assertion.
    pub deleted: bool,
}

impl Fact {
    /// Build an assertion.
    pub fn assert(eid: Eid, attr: impl Into<String>, value: Value) -> Self {
        Self {
            eid,
            attr: attr.into(),
            value,
            deleted: false,
        }
    }

    /// Build a retraction of the given triple.
    pub fn retract(eid: Eid, attr: impl Into<String>, value: Value) -> Self {
        Self {
            eid,
            attr: attr.into(),
            value,
            deleted: true,
        }
    }
}
