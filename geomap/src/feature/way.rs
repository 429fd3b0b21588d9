use geomap_types::LatLng;

use crate::event::{Event, EventListenerManager, ListenerHandle};
use crate::feature::{LineSegment, RenderState, Tags, WaySnapshot};
use crate::host::{MapHost, PolylinePrimitive, StrokeStyle, WayIcon};
use crate::id::{NodeId, WayId};

/// Change of a single way.
#[derive(Debug, Clone, PartialEq)]
pub enum WayEvent {
    /// The list of nodes of the way changed.
    NodesChanged(WayId),
    /// Way was shown or hidden.
    VisibilityChanged {
        /// Way id.
        id: WayId,
        /// New visibility.
        visible: bool,
    },
    /// Way became editable or not editable.
    EnabledChanged {
        /// Way id.
        id: WayId,
        /// New state.
        enabled: bool,
    },
    /// Way was removed from the graph.
    Destroyed(WayId),
}

/// Kind of [`WayEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WayEventKind {
    /// [`WayEvent::NodesChanged`]
    NodesChanged,
    /// [`WayEvent::VisibilityChanged`]
    VisibilityChanged,
    /// [`WayEvent::EnabledChanged`]
    EnabledChanged,
    /// [`WayEvent::Destroyed`]
    Destroyed,
}

impl Event for WayEvent {
    type Kind = WayEventKind;

    fn kind(&self) -> WayEventKind {
        match self {
            WayEvent::NodesChanged(_) => WayEventKind::NodesChanged,
            WayEvent::VisibilityChanged { .. } => WayEventKind::VisibilityChanged,
            WayEvent::EnabledChanged { .. } => WayEventKind::EnabledChanged,
            WayEvent::Destroyed(_) => WayEventKind::Destroyed,
        }
    }
}

/// Polyline through an ordered list of nodes.
///
/// A way references its nodes by id and does not own them: one node can be shared by several ways.
/// A way with fewer than two nodes is kept in the graph but is not [available](GeoWay::is_available).
#[derive(Debug)]
pub struct GeoWay {
    id: WayId,
    nodes: Vec<NodeId>,
    tags: Tags,
    visible: bool,
    enabled: bool,
    render: RenderState<PolylinePrimitive>,
    listeners: EventListenerManager<WayEvent>,
}

impl GeoWay {
    pub(crate) fn new(id: WayId, nodes: Vec<NodeId>, tags: Tags) -> Self {
        Self {
            id,
            nodes,
            tags,
            visible: false,
            enabled: false,
            render: RenderState::default(),
            listeners: EventListenerManager::new(),
        }
    }

    /// Id of the way.
    pub fn id(&self) -> WayId {
        self.id
    }

    /// Ordered node ids.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Number of node references.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the way has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the way can be drawn and edited as a line.
    pub fn is_available(&self) -> bool {
        self.nodes.len() >= 2
    }

    /// Whether the way starts and ends at the same node.
    pub fn is_closed(&self) -> bool {
        self.nodes.len() > 2 && self.nodes.first() == self.nodes.last()
    }

    /// First node.
    pub fn first(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    /// Last node.
    pub fn last(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }

    /// Returns true if the way references the node.
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    /// Index of the segment `start -> end` in the way.
    pub fn segment_index(&self, start: NodeId, end: NodeId) -> Option<usize> {
        self.nodes
            .windows(2)
            .position(|pair| pair[0] == start && pair[1] == end)
    }

    /// Consecutive node pairs.
    pub fn segments(&self) -> impl Iterator<Item = LineSegment> + '_ {
        self.nodes
            .windows(2)
            .map(|pair| LineSegment::new(self.id, pair[0], pair[1]))
    }

    /// Semantic attributes.
    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// Whether the way is displayed.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether the way is available and all its nodes exist and are enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Stroke the way is drawn with.
    pub fn stroke(&self) -> &StrokeStyle {
        &self.render.primitive().stroke
    }

    /// Positions the way is drawn through.
    pub fn path(&self) -> &[LatLng] {
        &self.render.primitive().path
    }

    /// Rendering state of the way.
    pub fn render_state(&self) -> &RenderState<PolylinePrimitive> {
        &self.render
    }

    /// Subscribes to the way changes.
    pub fn add_listener(
        &mut self,
        kind: WayEventKind,
        callback: impl FnMut(&WayEvent, &()) + 'static,
    ) -> ListenerHandle<WayEventKind> {
        self.listeners.add_listener(kind, callback)
    }

    /// Removes a listener added by [`GeoWay::add_listener`].
    pub fn remove_listener(&mut self, handle: &ListenerHandle<WayEventKind>) -> bool {
        self.listeners.remove_listener(handle)
    }

    pub(crate) fn set_nodes(&mut self, nodes: Vec<NodeId>) {
        self.nodes = nodes;
        self.listeners.invoke(&WayEvent::NodesChanged(self.id), &());
    }

    pub(crate) fn set_tags(&mut self, tags: Tags) {
        self.tags = tags;
    }

    pub(crate) fn set_path(&mut self, path: Vec<LatLng>, host: &mut dyn MapHost) {
        self.render.update(host, |polyline| polyline.path = path);
    }

    pub(crate) fn set_appearance(
        &mut self,
        stroke: &StrokeStyle,
        z_index: i32,
        icons: &[WayIcon],
        host: &mut dyn MapHost,
    ) {
        self.render.update(host, |polyline| {
            polyline.stroke.clone_from(stroke);
            polyline.z_index = z_index;
            polyline.icons = icons.to_vec();
        });
    }

    pub(crate) fn set_visible(&mut self, visible: bool, host: &mut dyn MapHost) -> bool {
        if self.visible == visible {
            return false;
        }

        self.visible = visible;
        self.render.set_materialized(visible, host);
        self.listeners.invoke(
            &WayEvent::VisibilityChanged {
                id: self.id,
                visible,
            },
            &(),
        );
        true
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) -> bool {
        if self.enabled == enabled {
            return false;
        }

        self.enabled = enabled;
        self.listeners.invoke(
            &WayEvent::EnabledChanged {
                id: self.id,
                enabled,
            },
            &(),
        );
        true
    }

    pub(crate) fn snapshot(&self) -> WaySnapshot {
        WaySnapshot {
            id: self.id,
            nodes: self.nodes.clone(),
            tags: self.tags.clone(),
        }
    }

    pub(crate) fn destroy(&mut self, host: &mut dyn MapHost) {
        self.render.release(host);
        self.visible = false;
        self.listeners.invoke(&WayEvent::Destroyed(self.id), &());
        self.listeners.clear();
    }
}
