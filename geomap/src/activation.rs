//! Selection state of the layer.

use std::collections::BTreeSet;

use crate::feature::{FeatureGraph, LineSegment};
use crate::id::{MarkerId, NodeId, WayId};
use crate::marker::MarkerSource;

/// Features whose selection state flipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationChange {
    /// Nodes.
    pub nodes: Vec<NodeId>,
    /// Ways.
    pub ways: Vec<WayId>,
    /// Line segments.
    pub segments: Vec<LineSegment>,
    /// Markers.
    pub markers: Vec<MarkerId>,
}

impl ActivationChange {
    /// Returns true if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.ways.is_empty() && self.segments.is_empty() && self.markers.is_empty()
    }

    /// Appends the other change.
    pub fn merge(&mut self, other: ActivationChange) {
        self.nodes.extend(other.nodes);
        self.ways.extend(other.ways);
        self.segments.extend(other.segments);
        self.markers.extend(other.markers);
    }
}

fn toggle<T: Ord + Copy>(set: &mut BTreeSet<T>, ids: impl IntoIterator<Item = T>, active: bool) -> Vec<T> {
    ids.into_iter()
        .filter(|id| if active { set.insert(*id) } else { set.remove(id) })
        .collect()
}

/// Selected nodes, ways, line segments and markers.
///
/// Every method returns the ids whose state actually changed, so the caller can restyle only those
/// features and notify about the change.
#[derive(Debug, Clone, Default)]
pub struct GeoFeatureActivationManager {
    nodes: BTreeSet<NodeId>,
    ways: BTreeSet<WayId>,
    segments: BTreeSet<LineSegment>,
    markers: BTreeSet<MarkerId>,
}

impl GeoFeatureActivationManager {
    /// Creates an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the nodes.
    pub fn activate_nodes(&mut self, ids: impl IntoIterator<Item = NodeId>) -> Vec<NodeId> {
        toggle(&mut self.nodes, ids, true)
    }

    /// Deselects the nodes.
    pub fn deactivate_nodes(&mut self, ids: impl IntoIterator<Item = NodeId>) -> Vec<NodeId> {
        toggle(&mut self.nodes, ids, false)
    }

    /// Selects the ways.
    pub fn activate_ways(&mut self, ids: impl IntoIterator<Item = WayId>) -> Vec<WayId> {
        toggle(&mut self.ways, ids, true)
    }

    /// Deselects the ways.
    pub fn deactivate_ways(&mut self, ids: impl IntoIterator<Item = WayId>) -> Vec<WayId> {
        toggle(&mut self.ways, ids, false)
    }

    /// Selects the line segments.
    pub fn activate_segments(&mut self, segments: impl IntoIterator<Item = LineSegment>) -> Vec<LineSegment> {
        toggle(&mut self.segments, segments, true)
    }

    /// Deselects the line segments.
    pub fn deactivate_segments(&mut self, segments: impl IntoIterator<Item = LineSegment>) -> Vec<LineSegment> {
        toggle(&mut self.segments, segments, false)
    }

    /// Selects the markers.
    pub fn activate_markers(&mut self, ids: impl IntoIterator<Item = MarkerId>) -> Vec<MarkerId> {
        toggle(&mut self.markers, ids, true)
    }

    /// Deselects the markers.
    pub fn deactivate_markers(&mut self, ids: impl IntoIterator<Item = MarkerId>) -> Vec<MarkerId> {
        toggle(&mut self.markers, ids, false)
    }

    /// Deselects everything.
    pub fn clear(&mut self) -> ActivationChange {
        ActivationChange {
            nodes: std::mem::take(&mut self.nodes).into_iter().collect(),
            ways: std::mem::take(&mut self.ways).into_iter().collect(),
            segments: std::mem::take(&mut self.segments).into_iter().collect(),
            markers: std::mem::take(&mut self.markers).into_iter().collect(),
        }
    }

    /// Deselects features that do not exist anymore, and segments whose nodes are not consecutive in
    /// their way anymore.
    pub fn retain(&mut self, graph: &impl FeatureGraph, markers: &impl MarkerSource) -> ActivationChange {
        let mut change = ActivationChange::default();

        self.nodes.retain(|id| {
            let keep = graph.node(*id).is_some();
            if !keep {
                change.nodes.push(*id);
            }
            keep
        });
        self.ways.retain(|id| {
            let keep = graph.way(*id).is_some();
            if !keep {
                change.ways.push(*id);
            }
            keep
        });
        self.segments.retain(|segment| {
            let keep = graph
                .way(segment.way)
                .is_some_and(|way| way.segment_index(segment.start, segment.end).is_some());
            if !keep {
                change.segments.push(*segment);
            }
            keep
        });
        self.markers.retain(|id| {
            let keep = markers.marker(*id).is_some();
            if !keep {
                change.markers.push(*id);
            }
            keep
        });

        change
    }

    /// Whether the node is selected.
    pub fn is_node_active(&self, id: NodeId) -> bool {
        self.nodes.contains(&id)
    }

    /// Whether the way is selected.
    pub fn is_way_active(&self, id: WayId) -> bool {
        self.ways.contains(&id)
    }

    /// Whether the segment is selected.
    pub fn is_segment_active(&self, segment: &LineSegment) -> bool {
        self.segments.contains(segment)
    }

    /// Whether the marker is selected.
    pub fn is_marker_active(&self, id: MarkerId) -> bool {
        self.markers.contains(&id)
    }

    /// Selected nodes.
    pub fn nodes(&self) -> &BTreeSet<NodeId> {
        &self.nodes
    }

    /// Selected ways.
    pub fn ways(&self) -> &BTreeSet<WayId> {
        &self.ways
    }

    /// Selected segments.
    pub fn segments(&self) -> &BTreeSet<LineSegment> {
        &self.segments
    }

    /// Selected markers.
    pub fn markers(&self) -> &BTreeSet<MarkerId> {
        &self.markers
    }

    /// Returns true if nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.ways.is_empty() && self.segments.is_empty() && self.markers.is_empty()
    }

    /// Features whose selection differs between the two states.
    pub fn difference(&self, other: &Self) -> ActivationChange {
        ActivationChange {
            nodes: self.nodes.symmetric_difference(&other.nodes).copied().collect(),
            ways: self.ways.symmetric_difference(&other.ways).copied().collect(),
            segments: self
                .segments
                .symmetric_difference(&other.segments)
                .copied()
                .collect(),
            markers: self
                .markers
                .symmetric_difference(&other.markers)
                .copied()
                .collect(),
        }
    }

    /// Nodes moved together when a selected node is dragged: selected nodes, all nodes of selected
    /// ways, and the ends of selected segments.
    pub fn drag_group(&self, graph: &impl FeatureGraph) -> BTreeSet<NodeId> {
        let mut group = self.nodes.clone();
        for way in self.ways.iter().filter_map(|id| graph.way(*id)) {
            group.extend(way.nodes().iter().copied());
        }
        for segment in &self.segments {
            group.insert(segment.start);
            group.insert(segment.end);
        }
        group.retain(|id| graph.node(*id).is_some());
        group
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_flipped_ids_are_reported() {
        let mut activation = GeoFeatureActivationManager::new();
        let a = NodeId::from(1);
        let b = NodeId::from(2);

        assert_eq!(activation.activate_nodes([a, b]), vec![a, b]);
        assert!(activation.activate_nodes([a]).is_empty());
        assert_eq!(activation.deactivate_nodes([a, NodeId::from(3)]), vec![a]);
        assert!(activation.is_node_active(b));

        let cleared = activation.clear();
        assert_eq!(cleared.nodes, vec![b]);
        assert!(activation.is_empty());
    }

    #[test]
    fn difference_lists_flipped_ids() {
        let mut before = GeoFeatureActivationManager::new();
        before.activate_nodes([NodeId::from(1), NodeId::from(2)]);
        before.activate_markers([MarkerId::from(9)]);

        let mut after = before.clone();
        after.deactivate_nodes([NodeId::from(1)]);
        after.activate_ways([WayId::from(5)]);

        let change = before.difference(&after);
        assert_eq!(change.nodes, vec![NodeId::from(1)]);
        assert_eq!(change.ways, vec![WayId::from(5)]);
        assert!(change.markers.is_empty());
        assert!(before.difference(&before).is_empty());
    }
}
