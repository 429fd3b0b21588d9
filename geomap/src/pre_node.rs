//! Midpoint handles for inserting nodes into existing ways.

use std::collections::{BTreeMap, BTreeSet};

use geomap_types::LatLng;

use crate::feature::{FeatureGraph, GeoNode, GeoWay, LineSegment, RenderState};
use crate::host::{MarkerPrimitive, SharedHost};
use crate::id::{IdGenerator, PreNodeId, WayId};
use crate::policy::PreNodePolicy;
use crate::style::NodeAppearance;
use crate::view::MapView;

/// Handle drawn in the middle of a segment. Pressing it inserts a real node there.
#[derive(Debug)]
pub struct PreNode {
    id: PreNodeId,
    segment: LineSegment,
    position: LatLng,
    render: RenderState<MarkerPrimitive>,
}

impl PreNode {
    /// Id of the pre-node.
    pub fn id(&self) -> PreNodeId {
        self.id
    }

    /// Segment the pre-node splits.
    pub fn segment(&self) -> LineSegment {
        self.segment
    }

    /// Position of the pre-node.
    pub fn position(&self) -> LatLng {
        self.position
    }

    /// Whether the pre-node is drawn.
    pub fn is_visible(&self) -> bool {
        self.render.is_materialized()
    }
}

/// Owner of the pre-nodes of a layer.
///
/// There is at most one pre-node per segment. A pre-node is keyed by its segment, so when the ends of
/// a segment change the old pre-node is destroyed and a new one is created for the new segment.
/// Pre-nodes exist only on visible enabled ways, and only at zoom levels allowed by the policy.
#[derive(Debug)]
pub struct GeoPreNodeManager {
    pre_nodes: BTreeMap<PreNodeId, PreNode>,
    by_segment: BTreeMap<LineSegment, PreNodeId>,
    ids: IdGenerator,
    policy: PreNodePolicy,
    zoom: f64,
    appearance: NodeAppearance,
    host: SharedHost,
}

impl GeoPreNodeManager {
    /// Creates a manager without pre-nodes.
    pub fn new(policy: PreNodePolicy, appearance: NodeAppearance, host: SharedHost) -> Self {
        Self {
            pre_nodes: BTreeMap::new(),
            by_segment: BTreeMap::new(),
            ids: IdGenerator::new(),
            policy,
            zoom: 0.0,
            appearance,
            host,
        }
    }

    /// Current policy.
    pub fn policy(&self) -> &PreNodePolicy {
        &self.policy
    }

    /// Replaces the policy and updates every pre-node.
    pub fn set_policy(&mut self, policy: PreNodePolicy, graph: &impl FeatureGraph) {
        self.policy = policy;
        self.sync_all(graph);
    }

    /// Updates pre-nodes for the new zoom level.
    pub fn set_zoom(&mut self, zoom: f64, graph: &impl FeatureGraph) {
        let was_shown = self.policy.shown_at(self.zoom);
        self.zoom = zoom;
        if was_shown != self.policy.shown_at(zoom) {
            self.sync_all(graph);
        }
    }

    /// Changes the look of every pre-node.
    pub fn set_appearance(&mut self, appearance: NodeAppearance) {
        let mut host = self.host.borrow_mut();
        for pre_node in self.pre_nodes.values_mut() {
            pre_node.render.update(&mut *host, |marker| {
                marker.content = appearance.content.clone();
                marker.opacity = appearance.opacity;
                marker.z_index = appearance.z_index;
            });
        }
        self.appearance = appearance;
    }

    fn shown_on(&self, way: &GeoWay) -> bool {
        self.policy.shown_at(self.zoom) && way.is_visible() && way.is_enabled()
    }

    /// Brings the pre-nodes of the way in line with its current segments. Pre-nodes of a deleted or
    /// hidden way are removed.
    pub fn sync_way(&mut self, graph: &impl FeatureGraph, way: WayId) {
        let desired: BTreeMap<LineSegment, LatLng> = graph
            .way(way)
            .filter(|w| self.shown_on(w))
            .map(|w| {
                w.segments()
                    .filter_map(|segment| {
                        let start = graph.node(segment.start).map(GeoNode::rendered_position)?;
                        let end = graph.node(segment.end).map(GeoNode::rendered_position)?;
                        Some((segment, start.midpoint(&end)))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let stale: Vec<LineSegment> = self
            .by_segment
            .keys()
            .filter(|segment| segment.way == way && !desired.contains_key(segment))
            .copied()
            .collect();
        for segment in stale {
            self.remove_segment(&segment);
        }

        let mut host = self.host.borrow_mut();
        for (segment, position) in desired {
            if let Some(pre_node) = self
                .by_segment
                .get(&segment)
                .and_then(|id| self.pre_nodes.get_mut(id))
            {
                pre_node.position = position;
                pre_node.render.update(&mut *host, |marker| marker.position = position);
                continue;
            }

            let id: PreNodeId = self.ids.next_id();
            let mut render = RenderState::new(MarkerPrimitive {
                position,
                content: self.appearance.content.clone(),
                z_index: self.appearance.z_index,
                opacity: self.appearance.opacity,
            });
            render.materialize(&mut *host);

            self.by_segment.insert(segment, id);
            self.pre_nodes.insert(
                id,
                PreNode {
                    id,
                    segment,
                    position,
                    render,
                },
            );
        }
    }

    /// Synchronizes every way of the graph and drops the pre-nodes of ways that do not exist anymore.
    pub fn sync_all(&mut self, graph: &impl FeatureGraph) {
        let mut ways: BTreeSet<WayId> = self.by_segment.keys().map(|segment| segment.way).collect();
        ways.extend(graph.ways().map(GeoWay::id));
        for way in ways {
            self.sync_way(graph, way);
        }
    }

    fn remove_segment(&mut self, segment: &LineSegment) -> Option<PreNode> {
        let id = self.by_segment.remove(segment)?;
        let mut pre_node = self.pre_nodes.remove(&id)?;
        pre_node.render.release(&mut *self.host.borrow_mut());
        Some(pre_node)
    }

    /// Pre-node by id.
    pub fn pre_node(&self, id: PreNodeId) -> Option<&PreNode> {
        self.pre_nodes.get(&id)
    }

    /// Pre-node of the segment.
    pub fn pre_node_of(&self, segment: &LineSegment) -> Option<&PreNode> {
        self.by_segment
            .get(segment)
            .and_then(|id| self.pre_nodes.get(id))
    }

    /// All pre-nodes in ascending id order.
    pub fn pre_nodes(&self) -> impl Iterator<Item = &PreNode> + '_ {
        self.pre_nodes.values()
    }

    /// Number of pre-nodes.
    pub fn len(&self) -> usize {
        self.pre_nodes.len()
    }

    /// Returns true if there are no pre-nodes.
    pub fn is_empty(&self) -> bool {
        self.pre_nodes.is_empty()
    }

    /// Closest drawn pre-node within `px` pixels of the point.
    pub fn pre_node_within_px(&self, view: &MapView, point: &LatLng, px: f64) -> Option<PreNodeId> {
        let radius = view.px_to_meters(px, point);
        let mut best: Option<(PreNodeId, f64)> = None;
        for pre_node in self.pre_nodes.values().filter(|p| p.is_visible()) {
            let distance = pre_node.position.distance_to(point);
            if distance <= radius && best.map_or(true, |(_, d)| distance < d) {
                best = Some((pre_node.id, distance));
            }
        }

        best.map(|(id, _)| id)
    }

    /// Removes the pre-node and returns its segment and position, where the caller inserts a real node.
    pub fn promote(&mut self, id: PreNodeId) -> Option<(LineSegment, LatLng)> {
        let segment = self.pre_nodes.get(&id)?.segment;
        let pre_node = self.remove_segment(&segment)?;
        log::debug!("Promoting {id} on {segment:?}");
        Some((pre_node.segment, pre_node.position))
    }

    /// Removes every pre-node.
    pub fn clear(&mut self) {
        let mut host = self.host.borrow_mut();
        for pre_node in self.pre_nodes.values_mut() {
            pre_node.render.release(&mut *host);
        }
        self.pre_nodes.clear();
        self.by_segment.clear();
    }
}
