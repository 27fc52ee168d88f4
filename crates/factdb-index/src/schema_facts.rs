// SPDX-License-Identifier: Apache-2.0
//! Encoding a [`Schema`]'s own attribute declarations as facts under the
//! reserved system `Eid` range, so schema evolves as versioned data rather
//! than out-of-band configuration.

use factdb_codec::{Eid, Value};
use factdb_schema::{
    Attribute, Schema, SchemaError, ValueType, SYSTEM_ATTR_LIST, SYSTEM_ATTR_NAME, SYSTEM_ATTR_TYPE,
    SYSTEM_ATTR_UNIQUE,
};

use crate::{Fact, Index, IndexError};

fn is_system_attr(name: &str) -> bool {
    matches!(name, SYSTEM_ATTR_NAME | SYSTEM_ATTR_TYPE | SYSTEM_ATTR_UNIQUE | SYSTEM_ATTR_LIST)
}

/// Encode every declared attribute of `schema` — other than the system
/// meta-attributes themselves — as four facts (name, type, unique, list)
/// under a fresh reserved `Eid` (`iid = 0`), one attribute per entity, in
/// attribute-name order (`Schema::attributes` iterates a `BTreeMap`, so
/// this ordering is deterministic for a given attribute set).
///
/// # Errors
/// [`IndexError::EidSpaceExhausted`] if `schema` declares more
/// non-system attributes than fit in the reserved range
/// (`Eid::RESERVED_LOCAL_CEILING`).
pub fn schema_to_facts(schema: &Schema) -> Result<Vec<Fact>, IndexError> {
    let mut facts = Vec::new();
    let mut local = 0u64;

    for attr in schema.attributes() {
        if is_system_attr(&attr.name) {
            continue;
        }
        if local >= Eid::RESERVED_LOCAL_CEILING {
            return Err(IndexError::EidSpaceExhausted);
        }
        let attr_eid = Eid::new(0, local);
        local += 1;

        facts.push(Fact::assert(attr_eid, SYSTEM_ATTR_NAME, Value::Str(attr.name.clone())));
        facts.push(Fact::assert(attr_eid, SYSTEM_ATTR_TYPE, Value::Byte(attr.value_type.tag())));
        facts.push(Fact::assert(attr_eid, SYSTEM_ATTR_UNIQUE, Value::Bool(attr.unique)));
        facts.push(Fact::assert(attr_eid, SYSTEM_ATTR_LIST, Value::Bool(attr.list)));
    }

    Ok(facts)
}

/// Decode the schema previously written by [`schema_to_facts`] back out of
/// `index`, by scanning every reserved-range entity (`Eid::is_reserved`)
/// that carries a live [`SYSTEM_ATTR_NAME`] fact.
///
/// # Errors
/// [`SchemaError::InvalidSystemFact`] if a reserved entity's type tag does
/// not decode, or any [`SchemaError`] from re-registering a decoded
/// attribute (e.g. a type conflict between two reserved entities claiming
/// the same name, which should never happen for facts this module wrote).
pub fn schema_from_index(index: &Index) -> Result<Schema, SchemaError> {
    let mut schema = Schema::new();

    for eid in index.entities() {
        if !eid.is_reserved() {
            continue;
        }
        let Some(Value::Str(name)) = index.values_of(eid, SYSTEM_ATTR_NAME).first() else {
            continue;
        };
        let Some(Value::Byte(tag)) = index.values_of(eid, SYSTEM_ATTR_TYPE).first() else {
            return Err(SchemaError::InvalidSystemFact(format!(
                "reserved entity {eid} has a name but no type tag"
            )));
        };
        let value_type = ValueType::from_tag(*tag)
            .ok_or_else(|| SchemaError::InvalidSystemFact(format!("reserved entity {eid} has unknown type tag {tag:#04x}")))?;
        let unique = matches!(index.values_of(eid, SYSTEM_ATTR_UNIQUE).first(), Some(Value::Bool(true)));
        let list = matches!(index.values_of(eid, SYSTEM_ATTR_LIST).first(), Some(Value::Bool(true)));

        let mut attr = Attribute::new(name.clone(), value_type);
        if unique {
            attr = attr.unique();
        }
        if list {
            attr = attr.list();
        }
        schema.register(attr)?;
    }

    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use factdb_schema::ValueType;

    fn app_schema() -> Schema {
        let mut s = Schema::new();
        s.register(Attribute::new("User.login", ValueType::Str).unique()).unwrap();
        s.register(Attribute::new("User.tags", ValueType::Str).list()).unwrap();
        s.register(Attribute::new("User.age", ValueType::I32)).unwrap();
        s
    }

    #[test]
    fn encoded_facts_live_in_the_reserved_range() {
        let facts = schema_to_facts(&app_schema()).unwrap();
        assert!(facts.iter().all(|f| f.eid.is_reserved()));
        // 3 attributes * 4 facts each.
        assert_eq!(facts.len(), 12);
    }

    #[test]
    fn schema_round_trips_through_facts_and_index() {
        let original = app_schema();
        let facts = schema_to_facts(&original).unwrap();

        let indexing_schema = original.with_system_attributes().unwrap();
        let index = Index::new(indexing_schema).add_facts(facts).unwrap();

        let decoded = schema_from_index(&index).unwrap();
        for attr in original.attributes() {
            let found = decoded.get(&attr.name).unwrap();
            assert_eq!(found.value_type, attr.value_type);
            assert_eq!(found.unique, attr.unique);
            assert_eq!(found.list, attr.list);
        }
    }

    #[test]
    fn system_meta_attributes_are_not_re_encoded_as_their_own_entities() {
        let schema = app_schema().with_system_attributes().unwrap();
        let facts = schema_to_facts(&schema).unwrap();
        // Still only the 3 application attributes, not the 4 system ones.
        assert_eq!(facts.len(), 12);
    }
}
