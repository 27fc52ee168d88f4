// SPDX-License-Identifier: Apache-2.0
//! Value-object <-> fact translation.
//!
//! [`Destruct`] walks an application value object into a batch of facts
//! under a freshly-allocated (or reused) `Eid`; [`Reconstruct`] walks facts
//! back into a value object, steered by a [`Query`] that decides which
//! nested references to resolve versus leave as a stub.

#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]

mod destruct;
mod query;
mod reconstruct;
mod scalar;

pub use destruct::{destruct, Destruct, Destructor};
pub use query::Query;
pub use reconstruct::{reconstruct, Reconstruct, ReconstructCtx};
pub use scalar::ScalarValue;

use factdb_codec::{Eid, Value};

/// Errors raised while destructuring or reconstructing a value object.
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    /// A fact's value was not the type the caller asked to read it as.
    #[error("[MAPPING_TYPE_MISMATCH] expected {expected}, found {actual:?}")]
    TypeMismatch {
        /// The `Value` variant name expected.
        expected: &'static str,
        /// The value actually found.
        actual: Value,
    },
    /// A required nested reference had no live fact to resolve.
    #[error("[MAPPING_MISSING_REFERENCE] entity {eid} has no live fact for attribute {attr}")]
    MissingReference {
        /// The entity the reference was read from.
        eid: Eid,
        /// The attribute expected to hold the reference.
        attr: String,
    },
    /// The underlying fact index rejected the write (uniqueness,
    /// cardinality, schema, or EID-space-exhaustion violation).
    #[error(transparent)]
    Index(#[from] factdb_index::IndexError),
}

impl MappingError {
    pub(crate) fn type_mismatch(expected: &'static str, actual: &Value) -> Self {
        Self::TypeMismatch { expected, actual: actual.clone() }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use factdb_index::{EidAllocator, Index};
    use factdb_schema::{Attribute, Schema, ValueType};

    #[derive(Clone, Debug, Default, PartialEq, Eq)]
    struct Addr {
        id: Option<Eid>,
        addr: String,
    }

    impl Destruct for Addr {
        const TYPE_NAME: &'static str = "Addr";

        fn id(&self) -> Option<Eid> {
            self.id
        }

        fn destruct_into(&self, eid: Eid, sink: &mut Destructor<'_>) -> Result<(), MappingError> {
            sink.scalar(eid, "Addr.addr", &self.addr);
            Ok(())
        }
    }

    impl Reconstruct for Addr {
        const TYPE_NAME: &'static str = "Addr";

        fn reconstruct(eid: Eid, ctx: &ReconstructCtx<'_>) -> Result<Self, MappingError> {
            Ok(Self { id: Some(eid), addr: ctx.scalar(eid, "Addr.addr")? })
        }

        fn stub(eid: Eid) -> Self {
            Self { id: Some(eid), addr: String::zero() }
        }
    }

    #[derive(Clone, Debug, Default, PartialEq, Eq)]
    struct User {
        id: Option<Eid>,
        login: String,
        strs: Vec<String>,
        addr: Addr,
        opt_addr: Option<Addr>,
        addrs: Vec<Addr>,
    }

    impl Destruct for User {
        const TYPE_NAME: &'static str = "User";

        fn id(&self) -> Option<Eid> {
            self.id
        }

        fn destruct_into(&self, eid: Eid, sink: &mut Destructor<'_>) -> Result<(), MappingError> {
            sink.scalar(eid, "User.login", &self.login);
            sink.list_scalar(eid, "User.strs", &self.strs);
            sink.reference(eid, "User.addr", &self.addr)?;
            sink.optional_reference(eid, "User.optAddr", self.opt_addr.as_ref())?;
            sink.list_reference(eid, "User.addrs", &self.addrs)?;
            Ok(())
        }
    }

    impl Reconstruct for User {
        const TYPE_NAME: &'static str = "User";

        fn reconstruct(eid: Eid, ctx: &ReconstructCtx<'_>) -> Result<Self, MappingError> {
            Ok(Self {
                id: Some(eid),
                login: ctx.scalar(eid, "User.login")?,
                strs: ctx.list_scalar(eid, "User.strs")?,
                addr: ctx.reference(eid, "User.addr", "addr")?,
                opt_addr: ctx.optional_reference(eid, "User.optAddr", "optAddr")?,
                addrs: ctx.list_reference(eid, "User.addrs", "addrs")?,
            })
        }

        fn stub(eid: Eid) -> Self {
            Self { id: Some(eid), ..Default::default() }
        }
    }

    fn schema() -> Schema {
        let mut s = Schema::new();
        s.register(Attribute::new("User.login", ValueType::Str).unique()).unwrap();
        s.register(Attribute::new("User.strs", ValueType::Str).list()).unwrap();
        s.register(Attribute::new("User.addr", ValueType::Eid)).unwrap();
        s.register(Attribute::new("User.optAddr", ValueType::Eid)).unwrap();
        s.register(Attribute::new("User.addrs", ValueType::Eid).list()).unwrap();
        s.register(Attribute::new("Addr.addr", ValueType::Str)).unwrap();
        s
    }

    fn user_fixture() -> User {
        User {
            id: None,
            login: "a".into(),
            strs: vec!["x".into(), "y".into()],
            addr: Addr { id: None, addr: "h".into() },
            opt_addr: None,
            addrs: vec![Addr { id: None, addr: "l".into() }],
        }
    }

    // ── S1: basic round trip ─────────────────────────────────────────────

    #[test]
    fn destruct_then_reconstruct_scalars_and_lists_round_trip() {
        let mut alloc = EidAllocator::new(1);
        let (root, facts) = destruct(&user_fixture(), &mut alloc, 1).unwrap();
        let index = Index::new(schema()).add_facts(facts).unwrap();

        let got: User = reconstruct(&index, root, Query::new()).unwrap();
        assert_eq!(got.login, "a");
        assert_eq!(got.strs, vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn required_reference_without_query_is_a_stub() {
        let mut alloc = EidAllocator::new(1);
        let (root, facts) = destruct(&user_fixture(), &mut alloc, 1).unwrap();
        let index = Index::new(schema()).add_facts(facts).unwrap();

        let got: User = reconstruct(&index, root, Query::new()).unwrap();
        // A stub carries identity but none of its own facts were read.
        assert_eq!(got.addr.addr, String::new());
        assert!(got.addr.id.is_some());
    }

    #[test]
    fn required_reference_with_query_resolves_fully() {
        let mut alloc = EidAllocator::new(1);
        let (root, facts) = destruct(&user_fixture(), &mut alloc, 1).unwrap();
        let index = Index::new(schema()).add_facts(facts).unwrap();

        let query = Query::new().resolve("addr", None);
        let got: User = reconstruct(&index, root, query).unwrap();
        assert_eq!(got.addr.addr, "h");
    }

    #[test]
    fn optional_reference_is_none_with_empty_query_even_though_a_fact_was_written() {
        let mut alloc = EidAllocator::new(1);
        let (root, facts) = destruct(&user_fixture(), &mut alloc, 1).unwrap();
        let index = Index::new(schema()).add_facts(facts).unwrap();

        // destructuring wrote a fact for optAddr (it defaulted the absent
        // Addr), but reconstruction with the empty query still reports
        // None — the asymmetry is intentional.
        assert!(index.values_of(root, "User.optAddr").first().is_some());
        let got: User = reconstruct(&index, root, Query::new()).unwrap();
        assert_eq!(got.opt_addr, None);
    }

    #[test]
    fn optional_reference_resolves_when_query_opts_in() {
        let mut alloc = EidAllocator::new(1);
        let (root, facts) = destruct(&user_fixture(), &mut alloc, 1).unwrap();
        let index = Index::new(schema()).add_facts(facts).unwrap();

        let query = Query::new().resolve("optAddr", None);
        let got: User = reconstruct(&index, root, query).unwrap();
        // The default Addr written in place of the absent optional.
        assert_eq!(got.opt_addr, Some(Addr { id: got.opt_addr.as_ref().unwrap().id, addr: String::new() }));
    }

    #[test]
    fn list_reference_is_stubs_without_query_and_resolved_with_it() {
        let mut alloc = EidAllocator::new(1);
        let (root, facts) = destruct(&user_fixture(), &mut alloc, 1).unwrap();
        let index = Index::new(schema()).add_facts(facts).unwrap();

        let got: User = reconstruct(&index, root, Query::new()).unwrap();
        assert_eq!(got.addrs.len(), 1);
        assert_eq!(got.addrs[0].addr, String::new());

        let query = Query::new().resolve("addrs", None);
        let got: User = reconstruct(&index, root, query).unwrap();
        assert_eq!(got.addrs[0].addr, "l");
    }

    #[test]
    fn required_reference_with_no_fact_at_all_is_a_missing_reference_error() {
        let mut alloc = EidAllocator::new(1);
        let e = alloc.alloc().unwrap();
        // No `User.addr` fact was ever asserted for `e`.
        let index = Index::new(schema()).add_facts(vec![]).unwrap();
        let query = Query::new().resolve("addr", None);
        let err = reconstruct::<User>(&index, e, query).unwrap_err();
        assert!(matches!(err, MappingError::MissingReference { .. }));
    }

    #[test]
    fn reusing_an_existing_id_does_not_allocate_a_fresh_eid() {
        let mut alloc = EidAllocator::new(1);
        let existing = alloc.alloc().unwrap();
        let user = User { id: Some(existing), ..user_fixture() };
        let (root, _facts) = destruct(&user, &mut alloc, 1).unwrap();
        assert_eq!(root, existing);
    }
}
