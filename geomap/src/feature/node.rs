use geomap_types::LatLng;
use serde::{Deserialize, Serialize};

use crate::event::{Event, EventListenerManager, ListenerHandle};
use crate::feature::{NodeSnapshot, RenderState, Tags};
use crate::host::{MapHost, MarkerPrimitive};
use crate::id::NodeId;
use crate::style::NodeAppearance;

/// Editing flags of a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeOptions {
    /// Disabled nodes cannot be edited, and ways containing them are disabled too.
    pub enabled: bool,
    /// Whether the node reacts to clicks.
    pub clickable: bool,
    /// Whether the node can be dragged.
    pub draggable: bool,
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            clickable: true,
            draggable: true,
        }
    }
}

/// Change of a single node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeEvent {
    /// Committed position of the node changed.
    PositionChanged {
        /// Node id.
        id: NodeId,
        /// New position.
        position: LatLng,
    },
    /// Node was shown or hidden.
    VisibilityChanged {
        /// Node id.
        id: NodeId,
        /// New visibility.
        visible: bool,
    },
    /// Node was removed from the graph.
    Destroyed(NodeId),
}

/// Kind of [`NodeEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeEventKind {
    /// [`NodeEvent::PositionChanged`]
    PositionChanged,
    /// [`NodeEvent::VisibilityChanged`]
    VisibilityChanged,
    /// [`NodeEvent::Destroyed`]
    Destroyed,
}

impl Event for NodeEvent {
    type Kind = NodeEventKind;

    fn kind(&self) -> NodeEventKind {
        match self {
            NodeEvent::PositionChanged { .. } => NodeEventKind::PositionChanged,
            NodeEvent::VisibilityChanged { .. } => NodeEventKind::VisibilityChanged,
            NodeEvent::Destroyed(_) => NodeEventKind::Destroyed,
        }
    }
}

/// Point feature of the editable graph.
///
/// A node has a committed position and, while it is being dragged, a preview position it is drawn
/// at instead. Clearing the preview draws the node at the committed position again.
///
/// Nodes are owned by the [`GeoFeatureManager`](super::GeoFeatureManager); all changes go through
/// it.
#[derive(Debug)]
pub struct GeoNode {
    id: NodeId,
    position: LatLng,
    preview: Option<LatLng>,
    options: NodeOptions,
    tags: Tags,
    visible: bool,
    render: RenderState<MarkerPrimitive>,
    listeners: EventListenerManager<NodeEvent>,
}

impl GeoNode {
    pub(crate) fn new(id: NodeId, position: LatLng, options: NodeOptions, tags: Tags) -> Self {
        Self {
            id,
            position,
            preview: None,
            options,
            tags,
            visible: false,
            render: RenderState::new(MarkerPrimitive {
                position,
                opacity: 1.0,
                ..Default::default()
            }),
            listeners: EventListenerManager::new(),
        }
    }

    pub(crate) fn from_snapshot(snapshot: &NodeSnapshot) -> Self {
        Self::new(
            snapshot.id,
            snapshot.position,
            snapshot.options,
            snapshot.tags.clone(),
        )
    }

    /// Id of the node.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Committed position.
    pub fn position(&self) -> LatLng {
        self.position
    }

    /// Position shown while the node is dragged.
    pub fn preview_position(&self) -> Option<LatLng> {
        self.preview
    }

    /// Position the node is drawn at.
    pub fn rendered_position(&self) -> LatLng {
        self.preview.unwrap_or(self.position)
    }

    /// Editing flags.
    pub fn options(&self) -> &NodeOptions {
        &self.options
    }

    /// Semantic attributes.
    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// Whether the node is displayed.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether the node can be edited.
    pub fn is_enabled(&self) -> bool {
        self.options.enabled
    }

    /// Opacity the node is drawn with.
    pub fn opacity(&self) -> f64 {
        self.render.primitive().opacity
    }

    /// Rendering state of the node.
    pub fn render_state(&self) -> &RenderState<MarkerPrimitive> {
        &self.render
    }

    /// Subscribes to the node changes.
    pub fn add_listener(
        &mut self,
        kind: NodeEventKind,
        callback: impl FnMut(&NodeEvent, &()) + 'static,
    ) -> ListenerHandle<NodeEventKind> {
        self.listeners.add_listener(kind, callback)
    }

    /// Removes a listener added by [`GeoNode::add_listener`].
    pub fn remove_listener(&mut self, handle: &ListenerHandle<NodeEventKind>) -> bool {
        self.listeners.remove_listener(handle)
    }

    pub(crate) fn set_position(&mut self, position: LatLng, host: &mut dyn MapHost) {
        self.position = position;
        self.redraw_position(host);
        self.listeners.invoke(
            &NodeEvent::PositionChanged {
                id: self.id,
                position,
            },
            &(),
        );
    }

    pub(crate) fn set_position_only_visible(&mut self, position: LatLng, host: &mut dyn MapHost) {
        self.preview = Some(position);
        self.redraw_position(host);
    }

    pub(crate) fn clear_position_only_visible(&mut self, host: &mut dyn MapHost) {
        if self.preview.take().is_some() {
            self.redraw_position(host);
        }
    }

    fn redraw_position(&mut self, host: &mut dyn MapHost) {
        let position = self.rendered_position();
        self.render.update(host, |marker| marker.position = position);
    }

    pub(crate) fn set_options(&mut self, options: NodeOptions) {
        self.options = options;
    }

    pub(crate) fn set_tags(&mut self, tags: Tags) {
        self.tags = tags;
    }

    pub(crate) fn set_visible(&mut self, visible: bool, host: &mut dyn MapHost) -> bool {
        if self.visible == visible {
            return false;
        }

        self.visible = visible;
        self.render.set_materialized(visible, host);
        self.listeners.invoke(
            &NodeEvent::VisibilityChanged {
                id: self.id,
                visible,
            },
            &(),
        );
        true
    }

    pub(crate) fn set_appearance(&mut self, appearance: &NodeAppearance, host: &mut dyn MapHost) {
        self.render.update(host, |marker| {
            marker.content.clone_from(&appearance.content);
            marker.opacity = appearance.opacity;
            marker.z_index = appearance.z_index;
        });
    }

    pub(crate) fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            id: self.id,
            position: self.position,
            options: self.options,
            tags: self.tags.clone(),
        }
    }

    /// Releases the primitive and notifies and detaches all listeners.
    pub(crate) fn destroy(&mut self, host: &mut dyn MapHost) {
        self.render.release(host);
        self.visible = false;
        self.listeners.invoke(&NodeEvent::Destroyed(self.id), &());
        self.listeners.clear();
    }
}
