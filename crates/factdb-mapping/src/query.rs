// SPDX-License-Identifier: Apache-2.0
//! A `Query` steers which nested references [`crate::Reconstruct`] resolves.

use std::collections::BTreeMap;

/// A mapping from property name to sub-query, steering which nested
/// references reconstruction resolves.
///
/// Reconstruction's default policy does not recurse into nested
/// references; a `Query` opts specific property paths back in. An
/// entry of `None` means "resolve this reference fully using default
/// policy beneath it"; `Some(sub)` steers that reference's own nested
/// properties with `sub`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query {
    paths: BTreeMap<String, Option<Query>>,
}

impl Query {
    /// The empty query — no references are resolved, only scalars and
    /// lists of scalars.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opt into resolving `prop`. `sub` steers what `prop`'s own nested
    /// properties resolve to; pass `None` to resolve fully beneath it.
    pub fn resolve(mut self, prop: impl Into<String>, sub: Option<Query>) -> Self {
        self.paths.insert(prop.into(), sub);
        self
    }

    /// `true` if `prop` is present in this query and should be traversed.
    pub fn wants(&self, prop: &str) -> bool {
        self.paths.contains_key(prop)
    }

    /// The sub-query steering `prop`'s own nested properties. A `prop`
    /// entry of `None` ("resolve fully") yields the empty query, so
    /// nothing beneath it is forced to recurse further than one level.
    pub fn sub_query(&self, prop: &str) -> Query {
        self.paths.get(prop).and_then(Clone::clone).unwrap_or_default()
    }
}
