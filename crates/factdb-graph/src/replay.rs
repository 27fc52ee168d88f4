// SPDX-License-Identifier: Apache-2.0
//! Replay: walk the node DAG from a head hash, accumulating facts in
//! reverse-post-order so every node's facts are collected only after all
//! of its ancestors'.

use std::collections::HashMap;

use factdb_codec::ContentHash;
use factdb_index::Fact;
use factdb_storage::Storage;

use crate::node::Node;
use crate::{node_key, GraphError};

/// Walk the node DAG rooted at `head`, deserializing each node and
/// accumulating its facts in reverse-post-order — every ancestor's facts
/// before its descendants', and each node visited at most once even when
/// two branches of a `Merge` share history — so replay is independent of
/// how the DAG branched.
///
/// Returns an empty `Vec` if `head` is the null hash (a fresh database
/// with no commits yet).
///
/// # Errors
/// [`GraphError::MissingNode`] if a referenced parent hash is absent from
/// storage, or [`GraphError::Codec`]/[`GraphError::CorruptedNode`] if a
/// stored node fails to deserialize.
pub fn collect_facts(storage: &dyn Storage, head: ContentHash) -> Result<Vec<Fact>, GraphError> {
    let order = post_order(storage, head)?;
    let mut facts = Vec::new();
    for (_, node) in order {
        facts.extend(node.facts().iter().cloned());
    }
    Ok(facts)
}

/// Depth-first post-order traversal of the DAG reachable from `head`,
/// explicit-stack so arbitrarily long commit chains don't grow the call
/// stack. Each hash appears at most once, after all of its parents.
fn post_order(
    storage: &dyn Storage,
    head: ContentHash,
) -> Result<Vec<(ContentHash, Node)>, GraphError> {
    let mut loaded: HashMap<ContentHash, Node> = HashMap::new();
    let mut order: Vec<ContentHash> = Vec::new();
    let mut emitted: HashMap<ContentHash, bool> = HashMap::new();

    if head.is_null() {
        return Ok(Vec::new());
    }

    // Each stack frame is `(hash, parents-already-pushed)`.
    let mut stack = vec![(head, false)];

    while let Some((hash, expanded)) = stack.pop() {
        if emitted.contains_key(&hash) {
            continue;
        }
        if !loaded.contains_key(&hash) {
            let node = load_node(storage, hash)?;
            loaded.insert(hash, node);
        }
        if expanded {
            emitted.insert(hash, true);
            order.push(hash);
            continue;
        }
        stack.push((hash, true));
        #[allow(clippy::unwrap_used)]
        let parents = loaded.get(&hash).unwrap().parents();
        for parent in parents {
            if !parent.is_null() && !emitted.contains_key(&parent) {
                stack.push((parent, false));
            }
        }
    }

    let mut result = Vec::with_capacity(order.len());
    for hash in order {
        if let Some(node) = loaded.remove(&hash) {
            result.push((hash, node));
        }
    }
    Ok(result)
}

fn load_node(storage: &dyn Storage, hash: ContentHash) -> Result<Node, GraphError> {
    let bytes = storage.load(&node_key(&hash))?.ok_or(GraphError::MissingNode(hash))?;
    Node::deserialize(&bytes)
}
