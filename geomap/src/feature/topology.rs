//! Node list partitioning used by way division and deletion.

use std::collections::BTreeSet;

use crate::id::NodeId;

/// Splits the node list at every cut node. Cut nodes are included into both adjacent pieces.
///
/// A closed list (first node equal to the last one) is first rotated to start at the first cut node,
/// so that cutting a loop at `k` nodes produces `k` pieces. Cuts at the ends of an open list do not
/// split it. The result always contains at least one piece.
pub(crate) fn split_at(nodes: &[NodeId], cuts: &BTreeSet<NodeId>) -> Vec<Vec<NodeId>> {
    let nodes = match rotate_loop(nodes, true, |ring, i| cuts.contains(&ring[i])) {
        Some(rotated) => rotated,
        None => nodes.to_vec(),
    };

    let mut pieces = vec![];
    let mut current = vec![];
    let last = nodes.len().saturating_sub(1);
    for (index, node) in nodes.iter().enumerate() {
        current.push(*node);
        if index != 0 && index != last && cuts.contains(node) {
            pieces.push(std::mem::take(&mut current));
            current.push(*node);
        }
    }
    pieces.push(current);

    pieces
}

/// Splits the node list between the given consecutive pairs, so that no piece contains any of the
/// pairs as a segment.
///
/// A closed list is first opened right after the first excluded pair.
pub(crate) fn split_between(
    nodes: &[NodeId],
    pairs: &BTreeSet<(NodeId, NodeId)>,
) -> Vec<Vec<NodeId>> {
    let nodes = match rotate_loop(nodes, false, |ring, i| {
        let previous = ring[(i + ring.len() - 1) % ring.len()];
        pairs.contains(&(previous, ring[i]))
    }) {
        Some(rotated) => rotated,
        None => nodes.to_vec(),
    };

    let Some((&first, rest)) = nodes.split_first() else {
        return vec![vec![]];
    };

    let mut pieces = vec![];
    let mut current = vec![first];
    let mut previous = first;
    for &node in rest {
        if pairs.contains(&(previous, node)) {
            pieces.push(std::mem::take(&mut current));
        }
        current.push(node);
        previous = node;
    }
    pieces.push(current);

    pieces
}

/// If `nodes` is a closed loop and `is_start(ring, i)` holds for some position of the ring, returns
/// the loop started at the first such position: `ring[i..] + ring[..i]`, followed by `ring[i]` again
/// if `close` is set.
fn rotate_loop(
    nodes: &[NodeId],
    close: bool,
    is_start: impl Fn(&[NodeId], usize) -> bool,
) -> Option<Vec<NodeId>> {
    if nodes.len() < 3 || nodes.first() != nodes.last() {
        return None;
    }

    let ring = &nodes[..nodes.len() - 1];
    let start = (0..ring.len()).find(|&i| is_start(ring, i))?;

    let mut rotated = Vec::with_capacity(nodes.len());
    rotated.extend_from_slice(&ring[start..]);
    rotated.extend_from_slice(&ring[..start]);
    if close {
        rotated.push(ring[start]);
    }
    Some(rotated)
}

/// Removes the nodes from every piece.
pub(crate) fn strip(pieces: Vec<Vec<NodeId>>, removed: &BTreeSet<NodeId>) -> Vec<Vec<NodeId>> {
    pieces
        .into_iter()
        .map(|mut piece| {
            piece.retain(|node| !removed.contains(node));
            piece
        })
        .collect()
}

/// Replaces every occurrence of `from` with `into` and collapses consecutive duplicates.
pub(crate) fn substitute(nodes: &[NodeId], from: NodeId, into: NodeId) -> Vec<NodeId> {
    let mut result: Vec<NodeId> = nodes
        .iter()
        .map(|&node| if node == from { into } else { node })
        .collect();
    result.dedup();
    result
}
