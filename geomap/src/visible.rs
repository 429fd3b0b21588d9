//! Viewport culling and hit-testing.

use std::collections::BTreeSet;

use geomap_types::{GeoSegment, LatLng, LatLngBounds};

use crate::error::invariant_violation;
use crate::feature::{FeatureGraph, FeatureVisibility, GeoNode, GeoWay, LineSegment};
use crate::id::{MarkerId, NodeId, WayId};
use crate::marker::MarkerSource;
use crate::policy::{InteractionPolicy, VisibilityPolicy};
use crate::view::MapView;

/// Features that were shown (`true`) or hidden (`false`) by a visibility update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityChange {
    /// Nodes.
    pub nodes: Vec<(NodeId, bool)>,
    /// Ways.
    pub ways: Vec<(WayId, bool)>,
    /// Markers.
    pub markers: Vec<(MarkerId, bool)>,
}

impl VisibilityChange {
    /// Returns true if nothing was shown or hidden.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.ways.is_empty() && self.markers.is_empty()
    }

    /// Appends the other change.
    pub fn merge(&mut self, other: VisibilityChange) {
        self.nodes.extend(other.nodes);
        self.ways.extend(other.ways);
        self.markers.extend(other.markers);
    }
}

/// Keeps track of the features that are inside the viewport and allowed by the visibility policy,
/// shows and hides them accordingly, and answers "what is under the pointer" queries.
///
/// A node is visible if
/// * its committed position is inside the viewport,
/// * the zoom level is at or above [`VisibilityPolicy::hide_zoom`], or the node connects several
///   ways (junctions stay visible when zoomed out),
/// * the policy allows its classification.
///
/// A way is visible if it has at least two nodes and its bounding box intersects the viewport. A
/// marker is visible if it is shown and inside the viewport.
///
/// All spatial queries scan the visible features in ascending id order and return the closest one
/// within the radius. On exactly equal distances the lowest id wins.
#[derive(Debug, Clone)]
pub struct GeoFeatureVisibleManager {
    view: MapView,
    policy: VisibilityPolicy,
    strict: bool,
    nodes_in_bounds: BTreeSet<NodeId>,
    visible_nodes: BTreeSet<NodeId>,
    visible_ways: BTreeSet<WayId>,
    visible_markers: BTreeSet<MarkerId>,
}

impl GeoFeatureVisibleManager {
    /// Creates a manager with nothing visible.
    pub fn new(view: MapView, policy: VisibilityPolicy, strict: bool) -> Self {
        Self {
            view,
            policy,
            strict,
            nodes_in_bounds: BTreeSet::new(),
            visible_nodes: BTreeSet::new(),
            visible_ways: BTreeSet::new(),
            visible_markers: BTreeSet::new(),
        }
    }

    /// Current viewport.
    pub fn view(&self) -> &MapView {
        &self.view
    }

    /// Current policy.
    pub fn policy(&self) -> &VisibilityPolicy {
        &self.policy
    }

    /// Recomputes visibility of every feature for the new viewport.
    pub fn on_view_changed(
        &mut self,
        view: MapView,
        graph: &mut impl FeatureVisibility,
        markers: &mut impl MarkerSource,
    ) -> VisibilityChange {
        self.view = view;
        let bounds = view.bounds();

        self.nodes_in_bounds = graph
            .nodes()
            .filter(|node| bounds.contains(&node.position()))
            .map(GeoNode::id)
            .collect();

        let mut change = VisibilityChange::default();
        let nodes: Vec<NodeId> = graph.nodes().map(GeoNode::id).collect();
        for id in nodes {
            let visible = self.node_should_be_visible(graph, id);
            self.apply_node(graph, id, visible, &mut change);
        }

        let ways: Vec<WayId> = graph.ways().map(GeoWay::id).collect();
        for id in ways {
            let visible = self.way_should_be_visible(graph, id);
            self.apply_way(graph, id, visible, &mut change);
        }

        let ids: Vec<MarkerId> = markers.markers().map(|marker| marker.id()).collect();
        for id in ids {
            let visible = self.marker_should_be_visible(markers, id);
            self.apply_marker(markers, id, visible, &mut change);
        }

        log::trace!(
            "View changed to zoom {}: {} nodes, {} ways, {} markers visible",
            view.zoom(),
            self.visible_nodes.len(),
            self.visible_ways.len(),
            self.visible_markers.len()
        );
        change
    }

    /// Replaces the policy. Only the nodes inside the viewport are re-evaluated, nodes outside of it
    /// stay hidden regardless of the policy.
    pub fn set_policy(
        &mut self,
        policy: VisibilityPolicy,
        graph: &mut impl FeatureVisibility,
    ) -> VisibilityChange {
        self.policy = policy;

        let mut change = VisibilityChange::default();
        let nodes: Vec<NodeId> = self.nodes_in_bounds.iter().copied().collect();
        for id in nodes {
            let visible = self.node_should_be_visible(graph, id);
            self.apply_node(graph, id, visible, &mut change);
        }
        change
    }

    /// Re-evaluates the given nodes after they were added, moved, reclassified or deleted.
    pub fn refresh_nodes(
        &mut self,
        graph: &mut impl FeatureVisibility,
        ids: impl IntoIterator<Item = NodeId>,
    ) -> VisibilityChange {
        let bounds = self.view.bounds();
        let mut change = VisibilityChange::default();

        for id in ids {
            let Some(node) = graph.node(id) else {
                self.nodes_in_bounds.remove(&id);
                if self.visible_nodes.remove(&id) {
                    change.nodes.push((id, false));
                }
                continue;
            };

            if bounds.contains(&node.position()) {
                self.nodes_in_bounds.insert(id);
            } else {
                self.nodes_in_bounds.remove(&id);
            }

            let visible = self.node_should_be_visible(graph, id);
            self.apply_node(graph, id, visible, &mut change);
        }

        change
    }

    /// Re-evaluates the given ways after they were added, changed or deleted.
    pub fn refresh_ways(
        &mut self,
        graph: &mut impl FeatureVisibility,
        ids: impl IntoIterator<Item = WayId>,
    ) -> VisibilityChange {
        let mut change = VisibilityChange::default();
        for id in ids {
            if graph.way(id).is_none() {
                if self.visible_ways.remove(&id) {
                    change.ways.push((id, false));
                }
                continue;
            }

            let visible = self.way_should_be_visible(graph, id);
            self.apply_way(graph, id, visible, &mut change);
        }
        change
    }

    /// Re-evaluates the given markers after they were added, moved, shown, hidden or deleted.
    pub fn refresh_markers(
        &mut self,
        markers: &mut impl MarkerSource,
        ids: impl IntoIterator<Item = MarkerId>,
    ) -> VisibilityChange {
        let mut change = VisibilityChange::default();
        for id in ids {
            if markers.marker(id).is_none() {
                if self.visible_markers.remove(&id) {
                    change.markers.push((id, false));
                }
                continue;
            }

            let visible = self.marker_should_be_visible(markers, id);
            self.apply_marker(markers, id, visible, &mut change);
        }
        change
    }

    fn node_should_be_visible(&self, graph: &impl FeatureGraph, id: NodeId) -> bool {
        self.nodes_in_bounds.contains(&id)
            && (self.view.zoom() >= self.policy.hide_zoom() || graph.is_multiple_ways(id))
            && self.policy.allows(graph.node_types(id))
    }

    fn way_should_be_visible(&self, graph: &impl FeatureGraph, id: WayId) -> bool {
        let Some(way) = graph.way(id) else {
            return false;
        };
        if !way.is_available() {
            return false;
        }

        let positions: Vec<LatLng> = way
            .nodes()
            .iter()
            .filter_map(|node| graph.node(*node))
            .map(GeoNode::position)
            .collect();
        LatLngBounds::from_points(positions.iter())
            .is_some_and(|bbox| bbox.intersects(&self.view.bounds()))
    }

    fn marker_should_be_visible(&self, markers: &impl MarkerSource, id: MarkerId) -> bool {
        markers.marker(id).is_some_and(|marker| {
            marker.is_shown() && self.view.bounds().contains(&marker.position())
        })
    }

    fn apply_node(
        &mut self,
        graph: &mut impl FeatureVisibility,
        id: NodeId,
        visible: bool,
        change: &mut VisibilityChange,
    ) {
        let Some(actual) = graph.node(id).map(GeoNode::is_visible) else {
            return;
        };

        if visible {
            self.visible_nodes.insert(id);
        } else {
            self.visible_nodes.remove(&id);
        }

        if actual != visible {
            graph.set_node_visible(id, visible);
            change.nodes.push((id, visible));
        }

        if graph.node(id).map(GeoNode::is_visible) != Some(visible) {
            invariant_violation(
                self.strict,
                format!("visibility of {id} disagrees with the visible set"),
            );
        }
    }

    fn apply_way(
        &mut self,
        graph: &mut impl FeatureVisibility,
        id: WayId,
        visible: bool,
        change: &mut VisibilityChange,
    ) {
        let Some(actual) = graph.way(id).map(GeoWay::is_visible) else {
            return;
        };

        if visible {
            self.visible_ways.insert(id);
        } else {
            self.visible_ways.remove(&id);
        }

        if actual != visible {
            graph.set_way_visible(id, visible);
            change.ways.push((id, visible));
        }

        if graph.way(id).map(GeoWay::is_visible) != Some(visible) {
            invariant_violation(
                self.strict,
                format!("visibility of {id} disagrees with the visible set"),
            );
        }
    }

    fn apply_marker(
        &mut self,
        markers: &mut impl MarkerSource,
        id: MarkerId,
        visible: bool,
        change: &mut VisibilityChange,
    ) {
        let Some(actual) = markers.marker(id).map(|marker| marker.is_visible()) else {
            return;
        };

        if visible {
            self.visible_markers.insert(id);
        } else {
            self.visible_markers.remove(&id);
        }

        if actual != visible {
            markers.set_marker_visible(id, visible);
            change.markers.push((id, visible));
        }
    }

    /// Checks that every feature agrees with the visible sets. Reports mismatches through the
    /// invariant handler and returns false if any were found.
    pub fn verify(&self, graph: &impl FeatureGraph, markers: &impl MarkerSource) -> bool {
        let mut consistent = true;
        for node in graph.nodes() {
            if node.is_visible() != self.visible_nodes.contains(&node.id()) {
                invariant_violation(self.strict, format!("{} visibility is out of sync", node.id()));
                consistent = false;
            }
        }
        for way in graph.ways() {
            if way.is_visible() != self.visible_ways.contains(&way.id()) {
                invariant_violation(self.strict, format!("{} visibility is out of sync", way.id()));
                consistent = false;
            }
        }
        for marker in markers.markers() {
            if marker.is_visible() != self.visible_markers.contains(&marker.id()) {
                invariant_violation(self.strict, format!("{} visibility is out of sync", marker.id()));
                consistent = false;
            }
        }
        consistent
    }

    /// Returns true if the node is in the visible set.
    pub fn is_node_visible(&self, id: NodeId) -> bool {
        self.visible_nodes.contains(&id)
    }

    /// Returns true if the way is in the visible set.
    pub fn is_way_visible(&self, id: WayId) -> bool {
        self.visible_ways.contains(&id)
    }

    /// Returns true if the marker is in the visible set.
    pub fn is_marker_visible(&self, id: MarkerId) -> bool {
        self.visible_markers.contains(&id)
    }

    /// Visible nodes in ascending id order.
    pub fn visible_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.visible_nodes.iter().copied()
    }

    /// Visible ways in ascending id order.
    pub fn visible_ways(&self) -> impl Iterator<Item = WayId> + '_ {
        self.visible_ways.iter().copied()
    }

    /// Visible markers in ascending id order.
    pub fn visible_markers(&self) -> impl Iterator<Item = MarkerId> + '_ {
        self.visible_markers.iter().copied()
    }

    /// Converts a pixel radius around the point into meters at the current zoom.
    pub fn radius_m(&self, point: &LatLng, px: f64) -> f64 {
        self.view.px_to_meters(px, point)
    }

    /// Closest visible node within `px` pixels of the point.
    pub fn node_visible_within_px(
        &self,
        graph: &impl FeatureGraph,
        point: &LatLng,
        px: f64,
    ) -> Option<NodeId> {
        self.node_visible_within_px_excluding(graph, point, px, &BTreeSet::new())
    }

    /// Closest visible node within `px` pixels of the point, ignoring the excluded nodes. Used to find
    /// snap targets for nodes that are being moved.
    pub fn node_visible_within_px_excluding(
        &self,
        graph: &impl FeatureGraph,
        point: &LatLng,
        px: f64,
        excluded: &BTreeSet<NodeId>,
    ) -> Option<NodeId> {
        let radius = self.radius_m(point, px);
        nearest(
            self.visible_nodes
                .iter()
                .filter(|id| !excluded.contains(id))
                .filter_map(|id| graph.node(*id))
                .map(|node| (node.id(), node.position().distance_to(point))),
            radius,
        )
    }

    /// Closest clickable and closest draggable visible nodes within `px` pixels of the point. The two
    /// results are independent and can be different nodes.
    pub fn node_clickable_and_draggable_within_px(
        &self,
        graph: &impl FeatureGraph,
        interaction: &InteractionPolicy,
        point: &LatLng,
        px: f64,
    ) -> (Option<NodeId>, Option<NodeId>) {
        let radius = self.radius_m(point, px);
        let candidates: Vec<(&GeoNode, f64)> = self
            .visible_nodes
            .iter()
            .filter_map(|id| graph.node(*id))
            .map(|node| (node, node.position().distance_to(point)))
            .collect();

        let clickable = nearest(
            candidates
                .iter()
                .filter(|(node, _)| interaction.is_clickable(node, graph.node_types(node.id())))
                .map(|(node, d)| (node.id(), *d)),
            radius,
        );
        let draggable = nearest(
            candidates
                .iter()
                .filter(|(node, _)| interaction.is_draggable(node, graph.node_types(node.id())))
                .map(|(node, d)| (node.id(), *d)),
            radius,
        );

        (clickable, draggable)
    }

    /// Closest visible marker within `px` pixels of the point.
    pub fn marker_visible_within_px(
        &self,
        markers: &impl MarkerSource,
        point: &LatLng,
        px: f64,
    ) -> Option<MarkerId> {
        let radius = self.radius_m(point, px);
        nearest(
            self.visible_markers
                .iter()
                .filter_map(|id| markers.marker(*id))
                .map(|marker| (marker.id(), marker.position().distance_to(point))),
            radius,
        )
    }

    /// Closest segment of a visible enabled way within `px` pixels of the point.
    pub fn line_segment_visible_within_px(
        &self,
        graph: &impl FeatureGraph,
        point: &LatLng,
        px: f64,
    ) -> Option<LineSegment> {
        let radius = self.radius_m(point, px);
        let candidates = self
            .visible_ways
            .iter()
            .filter_map(|id| graph.way(*id))
            .filter(|way| way.is_enabled())
            .flat_map(|way| way.segments())
            .filter_map(|segment| {
                let start = graph.node(segment.start)?.position();
                let end = graph.node(segment.end)?.position();
                Some((segment, GeoSegment(&start, &end).distance_to_point(point)))
            });

        nearest(candidates, radius)
    }

    /// Visible nodes inside the rectangle, in ascending id order.
    pub fn nodes_visible_in_bounds(
        &self,
        graph: &impl FeatureGraph,
        bounds: &LatLngBounds,
    ) -> Vec<NodeId> {
        self.visible_nodes
            .iter()
            .filter_map(|id| graph.node(*id))
            .filter(|node| bounds.contains(&node.position()))
            .map(GeoNode::id)
            .collect()
    }

    /// Forgets every feature. Used when the layer is cleared.
    pub fn clear(&mut self) {
        self.nodes_in_bounds.clear();
        self.visible_nodes.clear();
        self.visible_ways.clear();
        self.visible_markers.clear();
    }
}

/// First candidate with the smallest distance not exceeding the radius.
fn nearest<I>(candidates: impl Iterator<Item = (I, f64)>, radius: f64) -> Option<I> {
    let mut best: Option<(I, f64)> = None;
    for (id, distance) in candidates {
        if distance > radius {
            continue;
        }
        if best.as_ref().map_or(true, |(_, d)| distance < *d) {
            best = Some((id, distance));
        }
    }

    best.map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use geomap_types::latlng;

    use super::*;
    use crate::feature::{GeoFeatureManager, NodeTypes};
    use crate::marker::{GeoMarkerManager, MarkerOptions};
    use crate::tests::{features, path, view_at};

    #[test]
    fn nodes_outside_of_viewport_are_hidden() {
        let (mut graph, host) = features();
        let mut markers = GeoMarkerManager::new(graph.ids().clone(), host.clone());
        let (nodes, way) = path(&mut graph, &[latlng!(10.0, 20.0), latlng!(10.0, 20.001)]);
        let far = graph.create_node(latlng!(-30.0, 100.0), Default::default(), Default::default());

        let mut visible = GeoFeatureVisibleManager::new(MapView::default(), Default::default(), true);
        let change = visible.on_view_changed(view_at(latlng!(10.0, 20.0005), 18.0), &mut graph, &mut markers);

        assert!(change.nodes.contains(&(nodes[0], true)));
        assert!(change.ways.contains(&(way, true)));
        assert!(visible.is_node_visible(nodes[1]));
        assert!(!visible.is_node_visible(far));
        assert!(graph.node(nodes[0]).is_some_and(GeoNode::is_visible));
        assert!(visible.verify(&graph, &markers));
        assert_eq!(host.borrow().polyline_count(), 1);
    }

    #[test]
    fn junctions_stay_visible_when_zoomed_out() {
        let (mut graph, host) = features();
        let mut markers = GeoMarkerManager::new(graph.ids().clone(), host);
        let (first, _) = path(&mut graph, &[latlng!(10.0, 20.0), latlng!(10.0, 20.001)]);
        let junction = first[1];
        let end = graph.create_node(latlng!(10.001, 20.001), Default::default(), Default::default());
        graph.add_way(vec![junction, end], Default::default());

        let mut visible = GeoFeatureVisibleManager::new(MapView::default(), Default::default(), true);
        visible.on_view_changed(view_at(latlng!(10.0, 20.0), 14.0), &mut graph, &mut markers);

        assert!(visible.is_node_visible(junction));
        assert!(!visible.is_node_visible(first[0]));
        assert!(!visible.is_node_visible(end));
        assert!(visible.verify(&graph, &markers));
    }

    #[test]
    fn policy_change_hides_endpoints() {
        let (mut graph, host) = features();
        let mut markers = GeoMarkerManager::new(graph.ids().clone(), host);
        let (nodes, _) = path(
            &mut graph,
            &[latlng!(10.0, 20.0), latlng!(10.0, 20.001), latlng!(10.0, 20.002)],
        );

        let mut visible = GeoFeatureVisibleManager::new(MapView::default(), Default::default(), true);
        visible.on_view_changed(view_at(latlng!(10.0, 20.001), 18.0), &mut graph, &mut markers);
        assert_eq!(visible.visible_nodes().count(), 3);

        let change = visible.set_policy(
            VisibilityPolicy::default().with_endpoint_visible(false),
            &mut graph,
        );
        assert_eq!(change.nodes, vec![(nodes[0], false), (nodes[2], false)]);
        assert!(graph.node_types(nodes[1]).contains(NodeTypes::SEGMENTAL));
        assert!(visible.verify(&graph, &markers));
    }

    #[test]
    fn sets_stay_consistent_across_a_sequence_of_changes() {
        fn refresh(visible: &mut GeoFeatureVisibleManager, graph: &mut GeoFeatureManager) {
            let changes = graph.take_changes();
            visible.refresh_nodes(graph, changes.nodes.iter().chain(&changes.removed_nodes).copied());
            visible.refresh_ways(graph, changes.ways.iter().chain(&changes.removed_ways).copied());
        }

        let (mut graph, host) = features();
        let mut markers = GeoMarkerManager::new(graph.ids().clone(), host);
        let (nodes, way) = path(
            &mut graph,
            &[latlng!(10.0, 20.0), latlng!(10.0, 20.001), latlng!(10.0, 20.002)],
        );
        markers.add_marker(latlng!(10.0, 20.001), MarkerOptions::default());

        let near = view_at(latlng!(10.0, 20.001), 18.0);
        let mut visible = GeoFeatureVisibleManager::new(MapView::default(), Default::default(), true);

        visible.on_view_changed(near, &mut graph, &mut markers);
        assert!(visible.verify(&graph, &markers));
        assert_eq!(visible.visible_nodes().count(), 3);

        visible.on_view_changed(view_at(latlng!(-30.0, 100.0), 18.0), &mut graph, &mut markers);
        assert!(visible.verify(&graph, &markers));
        assert_eq!(visible.visible_nodes().count(), 0);
        assert_eq!(visible.visible_ways().count(), 0);
        assert_eq!(visible.visible_markers().count(), 0);

        visible.on_view_changed(view_at(latlng!(10.0, 20.001), 14.0), &mut graph, &mut markers);
        assert!(visible.verify(&graph, &markers));
        assert_eq!(visible.visible_nodes().count(), 0);
        assert!(visible.is_way_visible(way));

        visible.set_policy(VisibilityPolicy::default().with_endpoint_visible(false), &mut graph);
        assert!(visible.verify(&graph, &markers));

        visible.on_view_changed(near, &mut graph, &mut markers);
        assert!(visible.verify(&graph, &markers));
        assert_eq!(visible.visible_nodes().collect::<Vec<_>>(), vec![nodes[1]]);

        let added = graph.create_node(latlng!(10.0, 20.0015), Default::default(), Default::default());
        graph.add_node_to_way(added, way, 3);
        refresh(&mut visible, &mut graph);
        assert!(visible.verify(&graph, &markers));
        assert!(visible.is_node_visible(nodes[2]));
        assert!(!visible.is_node_visible(added));

        graph.delete_node_from_way_by_index(way, 1);
        graph.delete_node(nodes[1]);
        refresh(&mut visible, &mut graph);
        assert!(visible.verify(&graph, &markers));
        assert!(!visible.is_node_visible(nodes[1]));

        visible.set_policy(VisibilityPolicy::default(), &mut graph);
        assert!(visible.verify(&graph, &markers));
        assert_eq!(
            visible.visible_nodes().collect::<Vec<_>>(),
            vec![nodes[0], nodes[2], added]
        );
    }

    #[test]
    fn queries_respect_radius_and_prefer_lowest_id() {
        let (mut graph, host) = features();
        let mut markers = GeoMarkerManager::new(graph.ids().clone(), host);
        let a = graph.create_node(latlng!(10.0, 20.0), Default::default(), Default::default());
        let b = graph.create_node(latlng!(10.0, 20.0), Default::default(), Default::default());
        let c = graph.create_node(latlng!(10.0, 20.001), Default::default(), Default::default());
        let marker = markers.add_marker(latlng!(10.0, 20.001), MarkerOptions::default());

        let mut visible = GeoFeatureVisibleManager::new(MapView::default(), Default::default(), true);
        visible.on_view_changed(view_at(latlng!(10.0, 20.0005), 18.0), &mut graph, &mut markers);

        let query = latlng!(10.0, 20.00002);
        assert_eq!(visible.node_visible_within_px(&graph, &query, 12.0), Some(a));
        assert_eq!(
            visible.node_visible_within_px_excluding(&graph, &query, 12.0, &BTreeSet::from([a])),
            Some(b)
        );

        let near_c = latlng!(10.0, 20.00098);
        let found = visible.node_visible_within_px(&graph, &near_c, 12.0);
        assert_eq!(found, Some(c));
        let radius = visible.radius_m(&near_c, 12.0);
        assert!(latlng!(10.0, 20.001).distance_to(&near_c) <= radius);

        let empty = latlng!(10.0, 20.0005);
        assert_eq!(visible.node_visible_within_px(&graph, &empty, 12.0), None);
        assert_eq!(visible.marker_visible_within_px(&markers, &near_c, 16.0), Some(marker));
    }

    #[test]
    fn segment_query_finds_the_closest_segment() {
        let (mut graph, host) = features();
        let mut markers = GeoMarkerManager::new(graph.ids().clone(), host);
        let (nodes, way) = path(
            &mut graph,
            &[latlng!(10.0, 20.0), latlng!(10.0, 20.002), latlng!(10.002, 20.002)],
        );

        let mut visible = GeoFeatureVisibleManager::new(MapView::default(), Default::default(), true);
        visible.on_view_changed(view_at(latlng!(10.001, 20.001), 17.0), &mut graph, &mut markers);

        let segment = visible.line_segment_visible_within_px(&graph, &latlng!(10.00001, 20.001), 8.0);
        assert_eq!(segment, Some(LineSegment::new(way, nodes[0], nodes[1])));
        assert_eq!(
            visible.line_segment_visible_within_px(&graph, &latlng!(10.001, 20.0), 8.0),
            None
        );
    }
}
