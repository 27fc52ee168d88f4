// SPDX-License-Identifier: Apache-2.0
//! Raw wire encode/decode for node headers and fact lists.
//!
//! ```text
//! bytes(parent1_hash) bytes(parent2_hash)
//! i(iid) b(instance_bits) l(timestamp)
//! i(fact_count) { e(eid) s(attr) <value> B(deleted) }*
//! ```
//!
//! Parent hashes are fixed-width raw bytes (not the length-prefixed `a`
//! tag); every other field goes through `factdb_codec`'s tagged scalar
//! encoding.

use factdb_codec::{decode_value, encode_value, ContentHash, Value};
use factdb_index::Fact;

use crate::node::{Node, Source};
use crate::GraphError;

pub(crate) fn encode_node(
    parent1: ContentHash,
    parent2: ContentHash,
    source: Source,
    timestamp: i64,
    facts: &[Fact],
) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(parent1.as_bytes());
    out.extend_from_slice(parent2.as_bytes());

    #[allow(clippy::cast_possible_wrap)]
    let iid_value = Value::I32(source.iid as i32);
    encode_value(&iid_value, &mut out);
    encode_value(&Value::Byte(source.instance_bits), &mut out);
    encode_value(&Value::I64(timestamp), &mut out);

    let mut sorted: Vec<&Fact> = facts.iter().collect();
    sorted.sort_by(|a, b| (&a.eid, a.attr.as_str()).cmp(&(&b.eid, b.attr.as_str())));

    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    let fact_count = Value::I32(sorted.len() as i32);
    encode_value(&fact_count, &mut out);

    for fact in sorted {
        encode_value(&Value::Eid(fact.eid), &mut out);
        encode_value(&Value::Str(fact.attr.clone()), &mut out);
        encode_value(&fact.value, &mut out);
        encode_value(&Value::Bool(fact.deleted), &mut out);
    }

    out
}

pub(crate) fn decode_node(bytes: &[u8]) -> Result<Node, GraphError> {
    if bytes.len() < 64 {
        return Err(GraphError::CorruptedNode("buffer shorter than two parent hashes".into()));
    }
    let mut parent1 = [0u8; 32];
    parent1.copy_from_slice(&bytes[0..32]);
    let mut parent2 = [0u8; 32];
    parent2.copy_from_slice(&bytes[32..64]);
    let parent1 = ContentHash(parent1);
    let parent2 = ContentHash(parent2);

    let mut pos = 64usize;

    let iid = match decode_value(bytes, &mut pos)? {
        #[allow(clippy::cast_sign_loss)]
        Value::I32(v) => v as u32,
        _ => return Err(GraphError::CorruptedNode("expected i32 iid".into())),
    };
    let instance_bits = match decode_value(bytes, &mut pos)? {
        Value::Byte(b) => b,
        _ => return Err(GraphError::CorruptedNode("expected byte instance_bits".into())),
    };
    let timestamp = match decode_value(bytes, &mut pos)? {
        Value::I64(v) => v,
        _ => return Err(GraphError::CorruptedNode("expected i64 timestamp".into())),
    };
    let fact_count = match decode_value(bytes, &mut pos)? {
        Value::I32(v) => v,
        _ => return Err(GraphError::CorruptedNode("expected i32 fact_count".into())),
    };
    let fact_count = usize::try_from(fact_count)
        .map_err(|_| GraphError::CorruptedNode("negative fact_count".into()))?;

    let mut facts = Vec::with_capacity(fact_count);
    for _ in 0..fact_count {
        let eid = match decode_value(bytes, &mut pos)? {
            Value::Eid(e) => e,
            _ => return Err(GraphError::CorruptedNode("expected eid".into())),
        };
        let attr = match decode_value(bytes, &mut pos)? {
            Value::Str(s) => s,
            _ => return Err(GraphError::CorruptedNode("expected string attr".into())),
        };
        let value = decode_value(bytes, &mut pos)?;
        let deleted = match decode_value(bytes, &mut pos)? {
            Value::Bool(b) => b,
            _ => return Err(GraphError::CorruptedNode("expected bool deleted".into())),
        };
        facts.push(Fact { eid, attr, value, deleted });
    }

    let source = Source { iid, instance_bits };

    match (parent1.is_null(), parent2.is_null()) {
        (true, true) => Ok(Node::Root { source, timestamp, facts }),
        (true, false) => Ok(Node::Leaf { parent: parent2, source, timestamp, facts }),
        (false, false) => Ok(Node::Merge { parent1, parent2, source, timestamp, facts }),
        (false, true) => Err(GraphError::CorruptedNode(
            "parent1 set without parent2 is not a legal node".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use factdb_codec::{Eid, Value};

    fn source() -> Source {
        Source { iid: 7, instance_bits: 3 }
    }

    #[test]
    fn root_round_trips() {
        let facts = vec![Fact::assert(Eid::new(1, 1000), "User.login", Value::Str("a".into()))];
        let bytes = encode_node(ContentHash::NULL, ContentHash::NULL, source(), 42, &facts);
        let node = decode_node(&bytes).unwrap();
        assert!(matches!(node, Node::Root { .. }));
        assert_eq!(node.facts().len(), 1);
        assert_eq!(node.timestamp(), 42);
    }

    #[test]
    fn leaf_round_trips_with_parent_in_slot_two() {
        let parent = ContentHash([9u8; 32]);
        let facts = Vec::new();
        let bytes = encode_node(ContentHash::NULL, parent, source(), 1, &facts);
        // parent1 slot is null, parent2 holds the real parent.
        assert_eq!(&bytes[0..32], ContentHash::NULL.as_bytes());
        assert_eq!(&bytes[32..64], parent.as_bytes());
        let node = decode_node(&bytes).unwrap();
        match node {
            Node::Leaf { parent: p, .. } => assert_eq!(p, parent),
            _ => panic!("expected Leaf"),
        }
    }

    #[test]
    fn merge_round_trips_with_both_parents() {
        let p1 = ContentHash([1u8; 32]);
        let p2 = ContentHash([2u8; 32]);
        let bytes = encode_node(p1, p2, source(), 1, &[]);
        let node = decode_node(&bytes).unwrap();
        match node {
            Node::Merge { parent1, parent2, .. } => {
                assert_eq!(parent1, p1);
                assert_eq!(parent2, p2);
            }
            _ => panic!("expected Merge"),
        }
    }

    #[test]
    fn illegal_parent_combination_is_corrupted() {
        let p1 = ContentHash([1u8; 32]);
        let bytes = encode_node(p1, ContentHash::NULL, source(), 1, &[]);
        let err = decode_node(&bytes).unwrap_err();
        assert!(matches!(err, GraphError::CorruptedNode(_)));
    }

    #[test]
    fn facts_serialize_in_canonical_eid_attr_order_regardless_of_input_order() {
        let e1 = Eid::new(1, 1000);
        let e2 = Eid::new(1, 1001);
        let in_order = vec![
            Fact::assert(e2, "User.login", Value::Str("b".into())),
            Fact::assert(e1, "User.login", Value::Str("a".into())),
        ];
        let reversed = {
            let mut v = in_order.clone();
            v.reverse();
            v
        };
        let a = encode_node(ContentHash::NULL, ContentHash::NULL, source(), 1, &in_order);
        let b = encode_node(ContentHash::NULL, ContentHash::NULL, source(), 1, &reversed);
        assert_eq!(a, b);
    }
}
