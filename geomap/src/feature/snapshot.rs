use std::collections::BTreeMap;

use geomap_types::{LatLng, LatLngBounds};
use serde::{Deserialize, Serialize};

use crate::feature::{NodeOptions, Tags};
use crate::id::{NodeId, WayId};

/// Persistent state of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    /// Node id.
    pub id: NodeId,
    /// Committed position.
    pub position: LatLng,
    /// Editing flags.
    pub options: NodeOptions,
    /// Semantic attributes.
    pub tags: Tags,
}

/// Persistent state of a way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaySnapshot {
    /// Way id.
    pub id: WayId,
    /// Ordered node ids.
    pub nodes: Vec<NodeId>,
    /// Semantic attributes.
    pub tags: Tags,
}

/// State of a part of the graph.
///
/// `None` means that the feature with the id did not exist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Node states.
    pub nodes: BTreeMap<NodeId, Option<NodeSnapshot>>,
    /// Way states.
    pub ways: BTreeMap<WayId, Option<WaySnapshot>>,
}

impl GraphSnapshot {
    /// Returns true if the snapshot does not describe any feature.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.ways.is_empty()
    }

    /// Positions of the nodes that existed.
    pub fn positions(&self) -> impl Iterator<Item = &LatLng> + '_ {
        self.nodes.values().flatten().map(|node| &node.position)
    }

    /// Adds entries of `other` that are not yet in `self`.
    fn fill_from(&mut self, other: GraphSnapshot) {
        for (id, node) in other.nodes {
            self.nodes.entry(id).or_insert(node);
        }
        for (id, way) in other.ways {
            self.ways.entry(id).or_insert(way);
        }
    }
}

/// State of the graph before and after an edit.
///
/// Both sides describe the same set of features, so restoring either side brings every touched
/// feature into the corresponding state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphChange {
    /// State before the edit.
    pub before: GraphSnapshot,
    /// State after the edit.
    pub after: GraphSnapshot,
}

impl GraphChange {
    /// Creates a new change.
    pub fn new(before: GraphSnapshot, after: GraphSnapshot) -> Self {
        Self { before, after }
    }

    /// Returns true if nothing was touched.
    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }

    /// Returns true if the edit did not change anything.
    pub fn is_noop(&self) -> bool {
        self.before == self.after
    }

    /// Combines this change with one made right after it.
    pub fn then(mut self, later: GraphChange) -> GraphChange {
        let GraphChange { before, after } = later;

        self.before.fill_from(before);

        let mut merged_after = after;
        merged_after.fill_from(self.after);

        GraphChange {
            before: self.before,
            after: merged_after,
        }
    }

    /// Center of the area affected by the edit.
    pub fn center(&self) -> Option<LatLng> {
        LatLngBounds::from_points(self.after.positions().chain(self.before.positions()))
            .map(|bounds| bounds.center())
    }
}

#[cfg(test)]
mod tests {
    use geomap_types::latlng;

    use super::*;

    fn node(id: u64, lat: f64) -> Option<NodeSnapshot> {
        Some(NodeSnapshot {
            id: NodeId::from(id),
            position: latlng!(lat, 0.0),
            options: NodeOptions::default(),
            tags: Tags::new(),
        })
    }

    #[test]
    fn then_keeps_earliest_before_and_latest_after() {
        let mut first = GraphChange::default();
        first.before.nodes.insert(NodeId::from(1), None);
        first.after.nodes.insert(NodeId::from(1), node(1, 1.0));

        let mut second = GraphChange::default();
        second.before.nodes.insert(NodeId::from(1), node(1, 1.0));
        second.before.nodes.insert(NodeId::from(2), None);
        second.after.nodes.insert(NodeId::from(1), node(1, 2.0));
        second.after.nodes.insert(NodeId::from(2), node(2, 3.0));

        let merged = first.then(second);
        assert_eq!(merged.before.nodes[&NodeId::from(1)], None);
        assert_eq!(merged.before.nodes[&NodeId::from(2)], None);
        assert_eq!(merged.after.nodes[&NodeId::from(1)], node(1, 2.0));
        assert_eq!(merged.after.nodes[&NodeId::from(2)], node(2, 3.0));
    }

    #[test]
    fn center_covers_both_sides() {
        let mut change = GraphChange::default();
        change.before.nodes.insert(NodeId::from(1), node(1, 10.0));
        change.after.nodes.insert(NodeId::from(1), node(1, 20.0));
        let center = change.center().expect("has nodes");
        assert_eq!(center.lat(), 15.0);
        assert_eq!(GraphChange::default().center(), None);
    }
}
