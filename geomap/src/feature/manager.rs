use std::collections::{BTreeMap, BTreeSet};
use std::mem;

use ahash::AHashMap;
use geomap_types::LatLng;

use crate::event::{Event, EventListenerManager, ListenerHandle};
use crate::feature::{
    topology, FeatureAppearance, FeatureGraph, FeatureVisibility, GeoNode, GeoWay, GraphChange,
    GraphSnapshot, LineSegment, NodeEvent, NodeEventKind, NodeOptions, NodeSnapshot, NodeTypes,
    Tags, WayEvent, WayEventKind, WaySnapshot,
};
use crate::host::{SharedHost, StrokeStyle, WayIcon};
use crate::id::{IdGenerator, NodeId, WayId};
use crate::style::NodeAppearance;

/// Structural change of the graph.
///
/// Listeners are called synchronously inside the mutating call, after the change is applied, and
/// receive the manager as the context.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureEvent {
    /// Node was added.
    NodeAdded(NodeId),
    /// Node was deleted.
    NodeDeleted(NodeId),
    /// Committed position of the node changed.
    NodeMoved(NodeId),
    /// Way was added.
    WayAdded(WayId),
    /// Way was deleted.
    WayDeleted(WayId),
    /// Node list of the way changed.
    WayNodesChanged(WayId),
    /// Classification of the nodes changed.
    NodeTypesChanged(Vec<NodeId>),
    /// Derived enabled state of the ways changed. Emitted once per batch.
    EnabledWaysChanged(Vec<WayId>),
}

/// Kind of [`FeatureEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureEventKind {
    /// [`FeatureEvent::NodeAdded`]
    NodeAdded,
    /// [`FeatureEvent::NodeDeleted`]
    NodeDeleted,
    /// [`FeatureEvent::NodeMoved`]
    NodeMoved,
    /// [`FeatureEvent::WayAdded`]
    WayAdded,
    /// [`FeatureEvent::WayDeleted`]
    WayDeleted,
    /// [`FeatureEvent::WayNodesChanged`]
    WayNodesChanged,
    /// [`FeatureEvent::NodeTypesChanged`]
    NodeTypesChanged,
    /// [`FeatureEvent::EnabledWaysChanged`]
    EnabledWaysChanged,
}

impl Event for FeatureEvent {
    type Kind = FeatureEventKind;

    fn kind(&self) -> FeatureEventKind {
        match self {
            FeatureEvent::NodeAdded(_) => FeatureEventKind::NodeAdded,
            FeatureEvent::NodeDeleted(_) => FeatureEventKind::NodeDeleted,
            FeatureEvent::NodeMoved(_) => FeatureEventKind::NodeMoved,
            FeatureEvent::WayAdded(_) => FeatureEventKind::WayAdded,
            FeatureEvent::WayDeleted(_) => FeatureEventKind::WayDeleted,
            FeatureEvent::WayNodesChanged(_) => FeatureEventKind::WayNodesChanged,
            FeatureEvent::NodeTypesChanged(_) => FeatureEventKind::NodeTypesChanged,
            FeatureEvent::EnabledWaysChanged(_) => FeatureEventKind::EnabledWaysChanged,
        }
    }
}

/// Features changed since the last call to [`GeoFeatureManager::take_changes`].
///
/// A feature added and then deleted within one batch is reported in neither `added` nor `removed`
/// set, but is still listed as touched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureChanges {
    /// Nodes that did not exist at the start of the batch.
    pub added_nodes: BTreeSet<NodeId>,
    /// Nodes that existed at the start of the batch and do not exist anymore.
    pub removed_nodes: BTreeSet<NodeId>,
    /// Every node that changed in any way, including classification.
    pub nodes: BTreeSet<NodeId>,
    /// Ways that did not exist at the start of the batch.
    pub added_ways: BTreeSet<WayId>,
    /// Ways that existed at the start of the batch and do not exist anymore.
    pub removed_ways: BTreeSet<WayId>,
    /// Every way that changed in any way, including its path.
    pub ways: BTreeSet<WayId>,
}

impl FeatureChanges {
    /// Returns true if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.ways.is_empty()
    }

    fn node_added(&mut self, id: NodeId) {
        if !self.removed_nodes.remove(&id) {
            self.added_nodes.insert(id);
        }
        self.nodes.insert(id);
    }

    fn node_removed(&mut self, id: NodeId) {
        if !self.added_nodes.remove(&id) {
            self.removed_nodes.insert(id);
        }
        self.nodes.insert(id);
    }

    fn way_added(&mut self, id: WayId) {
        if !self.removed_ways.remove(&id) {
            self.added_ways.insert(id);
        }
        self.ways.insert(id);
    }

    fn way_removed(&mut self, id: WayId) {
        if !self.added_ways.remove(&id) {
            self.removed_ways.insert(id);
        }
        self.ways.insert(id);
    }
}

/// Result of [`GeoFeatureManager::merge_node`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Ways whose node lists were rewritten.
    pub affected: Vec<WayId>,
    /// Nodes that are not referenced by any way anymore.
    pub orphaned: Vec<NodeId>,
    /// Ways left with fewer than two nodes.
    pub collapsed: Vec<WayId>,
}

/// Proposed partition of a way node list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaySplit {
    /// Way being split.
    pub way: WayId,
    /// Node lists of the pieces, in the way order.
    pub pieces: Vec<Vec<NodeId>>,
}

/// Owner of the node/way graph.
///
/// All structural changes of the graph go through the manager. It keeps the membership index
/// `node -> ways` up to date, redraws ways whose nodes change, notifies listeners, and collects the
/// touched features into a change set that the layer drains to update visibility, pre-nodes and
/// styles.
///
/// Operations on missing ids do nothing and return `false` or `None`.
pub struct GeoFeatureManager {
    nodes: BTreeMap<NodeId, GeoNode>,
    ways: BTreeMap<WayId, GeoWay>,
    memberships: AHashMap<NodeId, BTreeSet<WayId>>,
    ids: IdGenerator,
    host: SharedHost,
    listeners: EventListenerManager<FeatureEvent, GeoFeatureManager>,
    changes: FeatureChanges,
    enabled_dirty: BTreeSet<WayId>,
    journal: Option<GraphSnapshot>,
}

impl std::fmt::Debug for GeoFeatureManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoFeatureManager")
            .field("nodes", &self.nodes.len())
            .field("ways", &self.ways.len())
            .field("listeners", &self.listeners)
            .finish()
    }
}

impl GeoFeatureManager {
    /// Creates an empty graph drawing into the host.
    pub fn new(ids: IdGenerator, host: SharedHost) -> Self {
        Self {
            nodes: BTreeMap::new(),
            ways: BTreeMap::new(),
            memberships: AHashMap::new(),
            ids,
            host,
            listeners: EventListenerManager::new(),
            changes: FeatureChanges::default(),
            enabled_dirty: BTreeSet::new(),
            journal: None,
        }
    }

    /// Id generator of the session.
    pub fn ids(&self) -> &IdGenerator {
        &self.ids
    }

    /// Returns true if the node exists.
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Returns true if the way exists.
    pub fn contains_way(&self, id: WayId) -> bool {
        self.ways.contains_key(&id)
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of ways.
    pub fn way_count(&self) -> usize {
        self.ways.len()
    }

    /// Subscribes to structural changes.
    pub fn add_listener(
        &mut self,
        kind: FeatureEventKind,
        callback: impl FnMut(&FeatureEvent, &GeoFeatureManager) + 'static,
    ) -> ListenerHandle<FeatureEventKind> {
        self.listeners.add_listener(kind, callback)
    }

    /// Removes a listener added by [`GeoFeatureManager::add_listener`].
    pub fn remove_listener(&mut self, handle: &ListenerHandle<FeatureEventKind>) -> bool {
        self.listeners.remove_listener(handle)
    }

    /// Subscribes to the changes of a single node.
    pub fn add_node_listener(
        &mut self,
        id: NodeId,
        kind: NodeEventKind,
        callback: impl FnMut(&NodeEvent, &()) + 'static,
    ) -> Option<ListenerHandle<NodeEventKind>> {
        Some(self.nodes.get_mut(&id)?.add_listener(kind, callback))
    }

    /// Subscribes to the changes of a single way.
    pub fn add_way_listener(
        &mut self,
        id: WayId,
        kind: WayEventKind,
        callback: impl FnMut(&WayEvent, &()) + 'static,
    ) -> Option<ListenerHandle<WayEventKind>> {
        Some(self.ways.get_mut(&id)?.add_listener(kind, callback))
    }

    /// Removes a listener added by [`GeoFeatureManager::add_node_listener`].
    pub fn remove_node_listener(&mut self, id: NodeId, handle: &ListenerHandle<NodeEventKind>) -> bool {
        self.nodes
            .get_mut(&id)
            .is_some_and(|node| node.remove_listener(handle))
    }

    /// Removes a listener added by [`GeoFeatureManager::add_way_listener`].
    pub fn remove_way_listener(&mut self, id: WayId, handle: &ListenerHandle<WayEventKind>) -> bool {
        self.ways
            .get_mut(&id)
            .is_some_and(|way| way.remove_listener(handle))
    }

    fn emit(&mut self, event: FeatureEvent) {
        if !self.listeners.has_listeners(event.kind()) {
            return;
        }

        let mut listeners = mem::take(&mut self.listeners);
        listeners.invoke(&event, self);
        self.listeners = listeners;
    }

    /// Creates a new node with an id from the session generator.
    pub fn create_node(&mut self, position: LatLng, options: NodeOptions, tags: Tags) -> NodeId {
        let id: NodeId = self.ids.next_id();
        self.insert_node(GeoNode::new(id, position, options, tags));
        id
    }

    /// Adds a node created elsewhere. Returns false if a node with the same id already exists.
    pub fn add_node(&mut self, node: GeoNode) -> bool {
        if self.nodes.contains_key(&node.id()) {
            log::warn!("Cannot add {}: id is already taken", node.id());
            return false;
        }

        self.ids.reserve(node.id().value());
        self.insert_node(node);
        true
    }

    fn insert_node(&mut self, node: GeoNode) {
        let id = node.id();
        self.touch_node(id);
        self.nodes.insert(id, node);
        self.changes.node_added(id);

        // Ways referencing a resurrected node can draw it again.
        for way in self.ways_of_node(id) {
            self.redraw_way(way);
            self.enabled_dirty.insert(way);
            self.changes.ways.insert(way);
        }

        log::debug!("Added {id}");
        self.emit(FeatureEvent::NodeAdded(id));
    }

    /// Deletes the node. The node is not removed from the ways that reference it: callers must detach
    /// it first.
    pub fn delete_node(&mut self, id: NodeId) -> bool {
        if !self.nodes.contains_key(&id) {
            return false;
        }

        self.touch_node(id);
        if let Some(mut node) = self.nodes.remove(&id) {
            node.destroy(&mut *self.host.borrow_mut());
        }
        self.changes.node_removed(id);

        for way in self.ways_of_node(id) {
            log::warn!("Deleted {id} is still referenced by {way}");
            self.redraw_way(way);
            self.enabled_dirty.insert(way);
            self.changes.ways.insert(way);
        }

        log::debug!("Deleted {id}");
        self.emit(FeatureEvent::NodeDeleted(id));
        true
    }

    /// Creates a way through the nodes. Returns `None` if the list is empty or references a missing
    /// node.
    pub fn add_way(&mut self, nodes: Vec<NodeId>, tags: Tags) -> Option<WayId> {
        if nodes.is_empty() {
            return None;
        }

        let id: WayId = self.ids.next_id();
        self.add_way_with_id(id, nodes, tags).then_some(id)
    }

    /// Creates a way with a given id. Returns false if the id is taken or a node is missing.
    pub fn add_way_with_id(&mut self, id: WayId, nodes: Vec<NodeId>, tags: Tags) -> bool {
        if self.ways.contains_key(&id) {
            log::warn!("Cannot add {id}: id is already taken");
            return false;
        }
        if let Some(missing) = nodes.iter().find(|n| !self.nodes.contains_key(n)) {
            log::warn!("Cannot add {id}: {missing} does not exist");
            return false;
        }

        self.ids.reserve(id.value());
        self.touch_way(id);
        for node in &nodes {
            self.touch_node(*node);
        }

        let types_before = self.types_of(nodes.iter().copied());
        self.index(id, &nodes);
        self.ways.insert(id, GeoWay::new(id, nodes, tags));
        self.redraw_way(id);
        self.changes.way_added(id);
        self.enabled_dirty.insert(id);

        log::debug!("Added {id}");
        self.report_types(types_before);
        self.emit(FeatureEvent::WayAdded(id));
        true
    }

    /// Deletes the way. Its nodes stay in the graph.
    pub fn delete_way(&mut self, id: WayId) -> bool {
        if !self.ways.contains_key(&id) {
            return false;
        }

        self.touch_way(id);
        let Some(mut way) = self.ways.remove(&id) else {
            return false;
        };

        let types_before = self.types_of(way.nodes().iter().copied());
        self.unindex(id, way.nodes());
        way.destroy(&mut *self.host.borrow_mut());
        self.changes.way_removed(id);
        self.enabled_dirty.remove(&id);

        log::debug!("Deleted {id}");
        self.report_types(types_before);
        self.emit(FeatureEvent::WayDeleted(id));
        true
    }

    /// Inserts the node into the way before the given index. `index` equal to the way length appends
    /// the node.
    pub fn add_node_to_way(&mut self, node: NodeId, way: WayId, index: usize) -> bool {
        if !self.nodes.contains_key(&node) {
            return false;
        }
        let Some(nodes) = self.ways.get(&way).map(|w| w.nodes().to_vec()) else {
            return false;
        };
        if index > nodes.len() {
            log::warn!("Cannot insert {node} into {way} at {index}: way has {} nodes", nodes.len());
            return false;
        }

        let mut nodes = nodes;
        nodes.insert(index, node);
        self.write_way_nodes(way, nodes)
    }

    /// Removes the node reference at the index. The way is kept even if it becomes unavailable.
    pub fn delete_node_from_way_by_index(&mut self, way: WayId, index: usize) -> Option<NodeId> {
        let mut nodes = self.ways.get(&way)?.nodes().to_vec();
        if index >= nodes.len() {
            return None;
        }

        let removed = nodes.remove(index);
        self.write_way_nodes(way, nodes);
        Some(removed)
    }

    /// Replaces the node list of the way. Returns false if the way or any of the nodes is missing.
    pub fn set_way_nodes(&mut self, way: WayId, nodes: Vec<NodeId>) -> bool {
        if nodes.iter().any(|n| !self.nodes.contains_key(n)) {
            return false;
        }
        self.write_way_nodes(way, nodes)
    }

    fn write_way_nodes(&mut self, id: WayId, nodes: Vec<NodeId>) -> bool {
        let Some(old) = self.ways.get(&id).map(|w| w.nodes().to_vec()) else {
            return false;
        };

        self.touch_way(id);
        for node in &nodes {
            self.touch_node(*node);
        }

        let types_before = self.types_of(old.iter().chain(nodes.iter()).copied());
        self.unindex(id, &old);
        self.index(id, &nodes);
        if let Some(way) = self.ways.get_mut(&id) {
            way.set_nodes(nodes);
        }
        self.redraw_way(id);
        self.changes.ways.insert(id);
        self.enabled_dirty.insert(id);

        self.report_types(types_before);
        self.emit(FeatureEvent::WayNodesChanged(id));
        true
    }

    /// Partitions every way containing any of the cut nodes at those nodes.
    ///
    /// Only ways that contain a cut node are returned. See [`WaySplit`].
    pub fn split_way_nodes_by_nodes(&self, cuts: &BTreeSet<NodeId>) -> Vec<WaySplit> {
        let ways: BTreeSet<WayId> = cuts
            .iter()
            .filter_map(|node| self.memberships.get(node))
            .flatten()
            .copied()
            .collect();

        ways.into_iter()
            .filter_map(|id| self.ways.get(&id))
            .map(|way| WaySplit {
                way: way.id(),
                pieces: topology::split_at(way.nodes(), cuts),
            })
            .collect()
    }

    /// Partitions the ways of the segments so that the segments are removed from them.
    pub fn split_way_nodes_excluding_segments(
        &self,
        segments: &BTreeSet<LineSegment>,
    ) -> Vec<WaySplit> {
        let mut pairs: BTreeMap<WayId, BTreeSet<(NodeId, NodeId)>> = BTreeMap::new();
        for segment in segments {
            pairs.entry(segment.way).or_default().insert(segment.pair());
        }

        pairs
            .into_iter()
            .filter_map(|(id, pairs)| {
                let way = self.ways.get(&id)?;
                Some(WaySplit {
                    way: id,
                    pieces: topology::split_between(way.nodes(), &pairs),
                })
            })
            .collect()
    }

    /// Replaces every reference to `old` with `new`, collapsing consecutive duplicates.
    ///
    /// Nothing is deleted: the caller decides what to do with the orphaned nodes and collapsed ways
    /// reported in the outcome. Returns `None` if either node is missing or they are the same node.
    pub fn merge_node(&mut self, old: NodeId, new: NodeId) -> Option<MergeOutcome> {
        if old == new || !self.nodes.contains_key(&old) || !self.nodes.contains_key(&new) {
            return None;
        }

        let mut outcome = MergeOutcome::default();
        for way_id in self.ways_of_node(old) {
            let Some(nodes) = self
                .ways
                .get(&way_id)
                .map(|way| topology::substitute(way.nodes(), old, new))
            else {
                continue;
            };

            let available = nodes.len() >= 2;
            self.write_way_nodes(way_id, nodes);
            outcome.affected.push(way_id);
            if !available {
                outcome.collapsed.push(way_id);
            }
        }

        if !self.memberships.contains_key(&old) {
            outcome.orphaned.push(old);
        }

        log::debug!("Merged {old} into {new}: {outcome:?}");
        Some(outcome)
    }

    /// Merges `old` into `new`, then deletes collapsed ways and orphaned nodes.
    pub fn merge_node_and_cleanup(&mut self, old: NodeId, new: NodeId) -> Option<MergeOutcome> {
        let outcome = self.merge_node(old, new)?;
        for way in &outcome.collapsed {
            self.delete_way(*way);
        }
        for node in &outcome.orphaned {
            self.delete_node(*node);
        }

        Some(outcome)
    }

    /// Deletes the way and creates a way for every piece with at least two nodes. Pieces inherit the
    /// tags of the replaced way.
    pub fn replace_way(&mut self, pieces: Vec<Vec<NodeId>>, old: WayId) -> Vec<WayId> {
        let Some(tags) = self.ways.get(&old).map(|way| way.tags().clone()) else {
            return vec![];
        };

        self.delete_way(old);
        pieces
            .into_iter()
            .filter(|piece| piece.len() >= 2)
            .filter_map(|piece| self.add_way(piece, tags.clone()))
            .collect()
    }

    /// Moves the node.
    pub fn set_node_position(&mut self, id: NodeId, position: LatLng) -> bool {
        if !self.nodes.contains_key(&id) {
            return false;
        }

        self.touch_node(id);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.set_position(position, &mut *self.host.borrow_mut());
        }
        self.changes.nodes.insert(id);
        self.redraw_ways_of(id);

        self.emit(FeatureEvent::NodeMoved(id));
        true
    }

    /// Draws the node and its ways at a temporary position, or back at the committed position if
    /// `None` is given. The committed position does not change.
    pub fn set_node_preview(&mut self, id: NodeId, position: Option<LatLng>) -> bool {
        let Some(node) = self.nodes.get_mut(&id) else {
            return false;
        };

        {
            let mut host = self.host.borrow_mut();
            match position {
                Some(position) => node.set_position_only_visible(position, &mut *host),
                None => node.clear_position_only_visible(&mut *host),
            }
        }

        self.redraw_ways_of(id);
        true
    }

    /// Sets editing flags of the node.
    pub fn set_node_options(&mut self, id: NodeId, options: NodeOptions) -> bool {
        if !self.nodes.contains_key(&id) {
            return false;
        }

        self.touch_node(id);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.set_options(options);
        }
        self.changes.nodes.insert(id);
        for way in self.ways_of_node(id) {
            self.enabled_dirty.insert(way);
        }
        true
    }

    /// Sets semantic attributes of the node.
    pub fn set_node_tags(&mut self, id: NodeId, tags: Tags) -> bool {
        if !self.nodes.contains_key(&id) {
            return false;
        }

        self.touch_node(id);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.set_tags(tags);
        }
        self.changes.nodes.insert(id);
        true
    }

    /// Sets semantic attributes of the way.
    pub fn set_way_tags(&mut self, id: WayId, tags: Tags) -> bool {
        if !self.ways.contains_key(&id) {
            return false;
        }

        self.touch_way(id);
        if let Some(way) = self.ways.get_mut(&id) {
            way.set_tags(tags);
        }
        self.changes.ways.insert(id);
        true
    }

    /// Deletes every way and node.
    pub fn clear(&mut self) {
        let ways: Vec<WayId> = self.ways.keys().copied().collect();
        for way in ways {
            self.delete_way(way);
        }
        let nodes: Vec<NodeId> = self.nodes.keys().copied().collect();
        for node in nodes {
            self.delete_node(node);
        }
    }

    fn redraw_way(&mut self, id: WayId) {
        let Some(way) = self.ways.get_mut(&id) else {
            return;
        };

        let path = way
            .nodes()
            .iter()
            .filter_map(|node| self.nodes.get(node))
            .map(GeoNode::rendered_position)
            .collect();
        way.set_path(path, &mut *self.host.borrow_mut());
    }

    fn redraw_ways_of(&mut self, node: NodeId) {
        for way in self.ways_of_node(node) {
            self.redraw_way(way);
            self.changes.ways.insert(way);
        }
    }

    fn index(&mut self, way: WayId, nodes: &[NodeId]) {
        for node in nodes {
            self.memberships.entry(*node).or_default().insert(way);
        }
    }

    fn unindex(&mut self, way: WayId, nodes: &[NodeId]) {
        for node in nodes {
            if let Some(ways) = self.memberships.get_mut(node) {
                ways.remove(&way);
                if ways.is_empty() {
                    self.memberships.remove(node);
                }
            }
        }
    }

    fn types_of(&self, nodes: impl Iterator<Item = NodeId>) -> BTreeMap<NodeId, NodeTypes> {
        nodes.map(|node| (node, self.node_types(node))).collect()
    }

    fn report_types(&mut self, before: BTreeMap<NodeId, NodeTypes>) {
        let mut changed = vec![];
        for (node, types) in before {
            self.changes.nodes.insert(node);
            if self.nodes.contains_key(&node) && self.node_types(node) != types {
                changed.push(node);
            }
        }

        if !changed.is_empty() {
            self.emit(FeatureEvent::NodeTypesChanged(changed));
        }
    }

    /// Recomputes the enabled state of every way. See [`GeoWay::is_enabled`].
    pub fn refresh_enabled_ways(&mut self) {
        self.enabled_dirty.clear();
        let ways: Vec<WayId> = self.ways.keys().copied().collect();
        self.recompute_enabled(ways);
    }

    /// Recomputes the enabled state of the ways touched since the last flush and emits one
    /// [`FeatureEvent::EnabledWaysChanged`] for all of them.
    pub fn flush(&mut self) {
        let ways: Vec<WayId> = mem::take(&mut self.enabled_dirty).into_iter().collect();
        self.recompute_enabled(ways);
    }

    fn recompute_enabled(&mut self, ways: Vec<WayId>) {
        let mut changed = vec![];
        for id in ways {
            let Some(way) = self.ways.get(&id) else {
                continue;
            };
            let enabled = way.is_available()
                && way
                    .nodes()
                    .iter()
                    .all(|node| self.nodes.get(node).is_some_and(GeoNode::is_enabled));

            if let Some(way) = self.ways.get_mut(&id) {
                if way.set_enabled(enabled) {
                    changed.push(id);
                }
            }
        }

        if !changed.is_empty() {
            self.changes.ways.extend(changed.iter().copied());
            self.emit(FeatureEvent::EnabledWaysChanged(changed));
        }
    }

    /// Takes the set of features changed since the previous call.
    pub fn take_changes(&mut self) -> FeatureChanges {
        mem::take(&mut self.changes)
    }

    /// Full state of the graph.
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self
                .nodes
                .iter()
                .map(|(id, node)| (*id, Some(node.snapshot())))
                .collect(),
            ways: self
                .ways
                .iter()
                .map(|(id, way)| (*id, Some(way.snapshot())))
                .collect(),
        }
    }

    /// Brings every feature listed in the snapshot into its recorded state: missing features are
    /// recreated with their original ids, features recorded as absent are deleted.
    ///
    /// Way node references to nodes that do not exist are skipped.
    pub fn restore(&mut self, snapshot: &GraphSnapshot) {
        for node in snapshot.nodes.values().flatten() {
            self.upsert_node(node);
        }
        for (id, way) in &snapshot.ways {
            if way.is_none() {
                self.delete_way(*id);
            }
        }
        for way in snapshot.ways.values().flatten() {
            self.upsert_way(way);
        }
        for (id, node) in &snapshot.nodes {
            if node.is_none() {
                self.delete_node(*id);
            }
        }
    }

    fn upsert_node(&mut self, snapshot: &NodeSnapshot) {
        let Some(node) = self.nodes.get(&snapshot.id) else {
            self.ids.reserve(snapshot.id.value());
            self.insert_node(GeoNode::from_snapshot(snapshot));
            return;
        };

        let moved = node.position() != snapshot.position;
        let options_changed = *node.options() != snapshot.options;
        let tags_changed = *node.tags() != snapshot.tags;

        if moved {
            self.set_node_position(snapshot.id, snapshot.position);
        }
        if options_changed {
            self.set_node_options(snapshot.id, snapshot.options);
        }
        if tags_changed {
            self.set_node_tags(snapshot.id, snapshot.tags.clone());
        }
    }

    fn upsert_way(&mut self, snapshot: &WaySnapshot) {
        let nodes: Vec<NodeId> = snapshot
            .nodes
            .iter()
            .copied()
            .filter(|node| self.nodes.contains_key(node))
            .collect();

        let Some(way) = self.ways.get(&snapshot.id) else {
            self.add_way_with_id(snapshot.id, nodes, snapshot.tags.clone());
            return;
        };

        let nodes_changed = way.nodes() != nodes.as_slice();
        let tags_changed = *way.tags() != snapshot.tags;
        if nodes_changed {
            self.write_way_nodes(snapshot.id, nodes);
        }
        if tags_changed {
            self.set_way_tags(snapshot.id, snapshot.tags.clone());
        }
    }

    /// Runs the edit and returns the state of every touched feature before and after it.
    ///
    /// Nested calls are part of the outer edit and return an empty change.
    pub fn record<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> (R, GraphChange) {
        if self.journal.is_some() {
            return (f(self), GraphChange::default());
        }

        self.journal = Some(GraphSnapshot::default());
        let result = f(self);
        let before = self.journal.take().unwrap_or_default();

        let after = GraphSnapshot {
            nodes: before
                .nodes
                .keys()
                .map(|id| (*id, self.nodes.get(id).map(GeoNode::snapshot)))
                .collect(),
            ways: before
                .ways
                .keys()
                .map(|id| (*id, self.ways.get(id).map(GeoWay::snapshot)))
                .collect(),
        };

        (result, GraphChange::new(before, after))
    }

    fn touch_node(&mut self, id: NodeId) {
        if let Some(journal) = &mut self.journal {
            journal
                .nodes
                .entry(id)
                .or_insert_with(|| self.nodes.get(&id).map(GeoNode::snapshot));
        }
    }

    fn touch_way(&mut self, id: WayId) {
        let Some(journal) = &mut self.journal else {
            return;
        };
        if journal.ways.contains_key(&id) {
            return;
        }

        let way = self.ways.get(&id);
        journal.ways.insert(id, way.map(GeoWay::snapshot));
        for node in way.map(GeoWay::nodes).unwrap_or_default() {
            journal
                .nodes
                .entry(*node)
                .or_insert_with(|| self.nodes.get(node).map(GeoNode::snapshot));
        }
    }
}

impl FeatureGraph for GeoFeatureManager {
    fn node(&self, id: NodeId) -> Option<&GeoNode> {
        self.nodes.get(&id)
    }

    fn way(&self, id: WayId) -> Option<&GeoWay> {
        self.ways.get(&id)
    }

    fn nodes(&self) -> Box<dyn Iterator<Item = &GeoNode> + '_> {
        Box::new(self.nodes.values())
    }

    fn ways(&self) -> Box<dyn Iterator<Item = &GeoWay> + '_> {
        Box::new(self.ways.values())
    }

    fn ways_of_node(&self, id: NodeId) -> Vec<WayId> {
        self.memberships
            .get(&id)
            .map(|ways| ways.iter().copied().collect())
            .unwrap_or_default()
    }

    fn node_types(&self, id: NodeId) -> NodeTypes {
        let Some(ways) = self.memberships.get(&id) else {
            return NodeTypes::empty();
        };

        let ends = ways
            .iter()
            .filter_map(|way| self.ways.get(way))
            .filter(|way| way.nodes().first() == Some(&id) || way.nodes().last() == Some(&id))
            .count();
        let multiple = ends > 1;
        let mut types = NodeTypes::empty();
        for way in ways.iter().filter_map(|way| self.ways.get(way)) {
            let last = way.len() - 1;
            for (index, node) in way.nodes().iter().enumerate() {
                if *node != id {
                    continue;
                }

                if index == 0 {
                    types |= NodeTypes::START;
                    if multiple {
                        types |= NodeTypes::START_MULTIPLE;
                    }
                }
                if index == last {
                    types |= NodeTypes::END;
                    if multiple {
                        types |= NodeTypes::END_MULTIPLE;
                    }
                }
                if index != 0 && index != last {
                    types |= NodeTypes::SEGMENTAL;
                }
            }
        }

        types
    }

    fn is_multiple_ways(&self, id: NodeId) -> bool {
        self.memberships.get(&id).is_some_and(|ways| ways.len() > 1)
    }
}

impl FeatureVisibility for GeoFeatureManager {
    fn set_node_visible(&mut self, id: NodeId, visible: bool) -> bool {
        let Some(node) = self.nodes.get_mut(&id) else {
            return false;
        };
        node.set_visible(visible, &mut *self.host.borrow_mut());
        true
    }

    fn set_way_visible(&mut self, id: WayId, visible: bool) -> bool {
        let Some(way) = self.ways.get_mut(&id) else {
            return false;
        };
        way.set_visible(visible, &mut *self.host.borrow_mut());
        true
    }
}

impl FeatureAppearance for GeoFeatureManager {
    fn set_node_appearance(&mut self, id: NodeId, appearance: &NodeAppearance) -> bool {
        let Some(node) = self.nodes.get_mut(&id) else {
            return false;
        };
        node.set_appearance(appearance, &mut *self.host.borrow_mut());
        true
    }

    fn set_way_appearance(
        &mut self,
        id: WayId,
        stroke: &StrokeStyle,
        z_index: i32,
        icons: &[WayIcon],
    ) -> bool {
        let Some(way) = self.ways.get_mut(&id) else {
            return false;
        };
        way.set_appearance(stroke, z_index, icons, &mut *self.host.borrow_mut());
        true
    }

    fn rendered_path(&self, id: WayId) -> Vec<LatLng> {
        self.ways
            .get(&id)
            .map(|way| {
                way.nodes()
                    .iter()
                    .filter_map(|node| self.nodes.get(node))
                    .map(GeoNode::rendered_position)
                    .collect()
            })
            .unwrap_or_default()
    }
}
