//! One editable layer: the managers of its features wired together.
//!
//! [`GeoLayerDelegator`] owns every manager of a layer and is the only place where they meet. Each
//! public operation mutates the graph through [`GeoFeatureManager`] (directly, through a history
//! command or through one of the pointer state machines), and then calls `sync`, which drains the
//! change sets of the graph and the markers and brings visibility, selection, pre-nodes and styles
//! in line with them. Layer events are emitted at the end of `sync`, after every manager is
//! consistent again.

use std::collections::BTreeSet;
use std::mem;

use geojson::FeatureCollection;
use geomap_types::LatLng;

use crate::activation::{ActivationChange, GeoFeatureActivationManager};
use crate::candidate::GeoNodeCandidateManager;
use crate::error::{FeatureRef, GeomapError};
use crate::event::{Event, EventListenerManager, ListenerHandle};
use crate::feature::{FeatureGraph, GeoFeatureManager, LineSegment};
use crate::geojson::{
    import_feature_collection, parse_feature_collection, to_feature_collection, ImportSummary,
};
use crate::history::{CommandContext, FeatureCommand, GeoHistoryManager};
use crate::host::{SharedHost, StrokeStyle};
use crate::id::{IdGenerator, LayerId, MarkerId, NodeId, WayId};
use crate::invoker::GeoLayerEventInvoker;
use crate::marker::{GeoMarkerManager, MarkerOptions, MarkerSource};
use crate::policy::GeoMapConfig;
use crate::pre_node::GeoPreNodeManager;
use crate::style::GeoFeatureStyleManager;
use crate::view::MapView;
use crate::visible::{GeoFeatureVisibleManager, VisibilityChange};

mod edit;
mod pointer;

pub use edit::Tool;

/// What pointer input does in a layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EditMode {
    /// Features are shown but cannot be edited. Every pointer event goes to the map.
    View,
    /// Features can be selected and dragged.
    #[default]
    Edit,
    /// Pointer presses draw a new way.
    Create,
}

/// Change of a layer, emitted after the layer is consistent again.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerEvent {
    /// Node was added.
    NodeAdded(NodeId),
    /// Node was deleted.
    NodeDeleted(NodeId),
    /// Way was added.
    WayAdded(WayId),
    /// Way was deleted.
    WayDeleted(WayId),
    /// Marker was added.
    MarkerAdded(MarkerId),
    /// Marker was deleted.
    MarkerDeleted(MarkerId),
    /// Features were shown or hidden.
    VisibilityChanged(VisibilityChange),
    /// Features were selected or deselected.
    ActivationChanged(ActivationChange),
    /// Undo or redo became available or unavailable.
    HistoryChanged {
        /// Whether there is something to undo.
        undo: bool,
        /// Whether there is something to redo.
        redo: bool,
    },
    /// Edit mode changed.
    ModeChanged(EditMode),
    /// A tool button was pressed.
    ToolButtonClicked(Tool),
    /// Selected features were exported for the clipboard.
    FeaturesCopied(FeatureCollection),
}

/// Kind of [`LayerEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerEventKind {
    /// [`LayerEvent::NodeAdded`]
    NodeAdded,
    /// [`LayerEvent::NodeDeleted`]
    NodeDeleted,
    /// [`LayerEvent::WayAdded`]
    WayAdded,
    /// [`LayerEvent::WayDeleted`]
    WayDeleted,
    /// [`LayerEvent::MarkerAdded`]
    MarkerAdded,
    /// [`LayerEvent::MarkerDeleted`]
    MarkerDeleted,
    /// [`LayerEvent::VisibilityChanged`]
    VisibilityChanged,
    /// [`LayerEvent::ActivationChanged`]
    ActivationChanged,
    /// [`LayerEvent::HistoryChanged`]
    HistoryChanged,
    /// [`LayerEvent::ModeChanged`]
    ModeChanged,
    /// [`LayerEvent::ToolButtonClicked`]
    ToolButtonClicked,
    /// [`LayerEvent::FeaturesCopied`]
    FeaturesCopied,
}

impl Event for LayerEvent {
    type Kind = LayerEventKind;

    fn kind(&self) -> LayerEventKind {
        match self {
            LayerEvent::NodeAdded(_) => LayerEventKind::NodeAdded,
            LayerEvent::NodeDeleted(_) => LayerEventKind::NodeDeleted,
            LayerEvent::WayAdded(_) => LayerEventKind::WayAdded,
            LayerEvent::WayDeleted(_) => LayerEventKind::WayDeleted,
            LayerEvent::MarkerAdded(_) => LayerEventKind::MarkerAdded,
            LayerEvent::MarkerDeleted(_) => LayerEventKind::MarkerDeleted,
            LayerEvent::VisibilityChanged(_) => LayerEventKind::VisibilityChanged,
            LayerEvent::ActivationChanged(_) => LayerEventKind::ActivationChanged,
            LayerEvent::HistoryChanged { .. } => LayerEventKind::HistoryChanged,
            LayerEvent::ModeChanged(_) => LayerEventKind::ModeChanged,
            LayerEvent::ToolButtonClicked(_) => LayerEventKind::ToolButtonClicked,
            LayerEvent::FeaturesCopied(_) => LayerEventKind::FeaturesCopied,
        }
    }
}

/// Editable layer.
pub struct GeoLayerDelegator {
    id: LayerId,
    config: GeoMapConfig,
    mode: EditMode,
    features: GeoFeatureManager,
    markers: GeoMarkerManager,
    visible: GeoFeatureVisibleManager,
    activation: GeoFeatureActivationManager,
    pre_nodes: GeoPreNodeManager,
    candidate: GeoNodeCandidateManager,
    invoker: GeoLayerEventInvoker,
    history: GeoHistoryManager,
    style: GeoFeatureStyleManager,
    listeners: EventListenerManager<LayerEvent>,
    host: SharedHost,
    history_state: (bool, bool),
    pending_activation: ActivationChange,
    pending_visibility: VisibilityChange,
}

impl std::fmt::Debug for GeoLayerDelegator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoLayerDelegator")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("features", &self.features)
            .field("markers", &self.markers)
            .field("history", &self.history)
            .finish()
    }
}

impl GeoLayerDelegator {
    /// Creates an empty layer.
    pub fn new(
        id: LayerId,
        config: GeoMapConfig,
        view: MapView,
        ids: IdGenerator,
        host: SharedHost,
    ) -> Self {
        let mut style = GeoFeatureStyleManager::new(config.style.clone(), host.clone());
        style.set_map_type(view.map_type());
        let pre_node_appearance = style.pre_node_appearance();
        let stroke = preview_stroke(&style);

        let mut layer = Self {
            id,
            mode: EditMode::default(),
            features: GeoFeatureManager::new(ids.clone(), host.clone()),
            markers: GeoMarkerManager::new(ids, host.clone()),
            visible: GeoFeatureVisibleManager::new(
                view,
                config.visibility,
                config.strict_invariants,
            ),
            activation: GeoFeatureActivationManager::new(),
            pre_nodes: GeoPreNodeManager::new(config.pre_node, pre_node_appearance.clone(), host.clone()),
            candidate: GeoNodeCandidateManager::new(
                stroke.clone(),
                pre_node_appearance,
                host.clone(),
            ),
            invoker: GeoLayerEventInvoker::new(stroke, host.clone()),
            history: GeoHistoryManager::new(config.history_depth),
            style,
            listeners: EventListenerManager::new(),
            host,
            history_state: (false, false),
            pending_activation: ActivationChange::default(),
            pending_visibility: VisibilityChange::default(),
            config,
        };

        layer.markers.set_zoom(view.zoom());
        layer.pre_nodes.set_zoom(view.zoom(), &layer.features);
        layer
    }

    /// Id of the layer.
    pub fn id(&self) -> LayerId {
        self.id
    }

    /// Current configuration.
    pub fn config(&self) -> &GeoMapConfig {
        &self.config
    }

    /// Current edit mode.
    pub fn mode(&self) -> EditMode {
        self.mode
    }

    /// Node/way graph of the layer.
    pub fn features(&self) -> &GeoFeatureManager {
        &self.features
    }

    /// Markers of the layer.
    pub fn markers(&self) -> &GeoMarkerManager {
        &self.markers
    }

    /// Visibility state and spatial queries.
    pub fn visible(&self) -> &GeoFeatureVisibleManager {
        &self.visible
    }

    /// Selection.
    pub fn activation(&self) -> &GeoFeatureActivationManager {
        &self.activation
    }

    /// Insertion handles.
    pub fn pre_nodes(&self) -> &GeoPreNodeManager {
        &self.pre_nodes
    }

    /// Way drawing state.
    pub fn candidate(&self) -> &GeoNodeCandidateManager {
        &self.candidate
    }

    /// Gesture state of the edit mode.
    pub fn invoker(&self) -> &GeoLayerEventInvoker {
        &self.invoker
    }

    /// Undo/redo history.
    pub fn history(&self) -> &GeoHistoryManager {
        &self.history
    }

    /// Style derivation.
    pub fn style(&self) -> &GeoFeatureStyleManager {
        &self.style
    }

    /// Subscribes to layer events.
    pub fn add_listener(
        &mut self,
        kind: LayerEventKind,
        callback: impl FnMut(&LayerEvent, &()) + 'static,
    ) -> ListenerHandle<LayerEventKind> {
        self.listeners.add_listener(kind, callback)
    }

    /// Removes a listener added by [`GeoLayerDelegator::add_listener`].
    pub fn remove_listener(&mut self, handle: &ListenerHandle<LayerEventKind>) -> bool {
        self.listeners.remove_listener(handle)
    }

    fn emit(&mut self, event: LayerEvent) {
        self.listeners.invoke(&event, &());
    }

    /// Changes what pointer input does. Gestures in progress are abandoned.
    pub fn set_mode(&mut self, mode: EditMode) {
        if self.mode == mode {
            return;
        }

        self.cancel_gestures();
        log::debug!("{} switched from {:?} to {:?}", self.id, self.mode, mode);
        self.mode = mode;
        self.emit(LayerEvent::ModeChanged(mode));
        self.sync();
    }

    /// Abandons the pointer gesture in progress and the way being drawn.
    pub fn cancel_gesture(&mut self) {
        self.cancel_gestures();
        self.sync();
    }

    fn cancel_gestures(&mut self) {
        self.invoker.cancel(&mut self.features, &mut self.markers);
        self.candidate.cancel(&mut self.features);
    }

    /// Applies a new viewport reported by the map widget.
    pub fn set_view(&mut self, view: MapView) {
        let change = self
            .visible
            .on_view_changed(view, &mut self.features, &mut self.markers);
        self.pending_visibility.merge(change);
        self.markers.set_zoom(view.zoom());
        self.pre_nodes.set_zoom(view.zoom(), &self.features);

        if self.style.set_map_type(view.map_type()) {
            self.restyle_all();
        }
        self.sync();
    }

    /// Applies a new configuration. The history depth is fixed when the layer is created.
    pub fn set_config(&mut self, config: GeoMapConfig) {
        let change = self.visible.set_policy(config.visibility, &mut self.features);
        self.pending_visibility.merge(change);
        self.pre_nodes.set_policy(config.pre_node, &self.features);
        self.style.set_preset(config.style.clone());
        self.config = config;
        self.restyle_all();
        self.sync();
    }

    fn restyle_all(&mut self) {
        self.features.refresh_enabled_ways();
        let nodes: Vec<NodeId> = self.features.nodes().map(|node| node.id()).collect();
        let ways: Vec<WayId> = self.features.ways().map(|way| way.id()).collect();
        self.style.refresh_nodes(&mut self.features, &self.activation, nodes);
        self.style.refresh_ways(&mut self.features, &self.activation, ways);
        self.pre_nodes.set_appearance(self.style.pre_node_appearance());
        self.candidate
            .set_preview_style(preview_stroke(&self.style), self.style.pre_node_appearance());
    }

    /// Brings every manager in line with the changes made since the previous call and emits the
    /// layer events.
    fn sync(&mut self) {
        self.features.flush();
        let changes = self.features.take_changes();

        let mut activation = self.activation.retain(&self.features, &self.markers);
        activation.merge(mem::take(&mut self.pending_activation));
        for marker in &activation.markers {
            let active = self.activation.is_marker_active(*marker);
            self.markers.set_marker_activated(*marker, active);
        }
        let marker_changes = self.markers.take_changes();

        let mut visibility = mem::take(&mut self.pending_visibility);
        visibility.merge(
            self.visible.refresh_nodes(
                &mut self.features,
                changes.nodes.iter().chain(&changes.removed_nodes).copied(),
            ),
        );
        visibility.merge(
            self.visible.refresh_ways(
                &mut self.features,
                changes.ways.iter().chain(&changes.removed_ways).copied(),
            ),
        );
        visibility.merge(
            self.visible.refresh_markers(
                &mut self.markers,
                marker_changes.touched.iter().chain(&marker_changes.removed).copied(),
            ),
        );

        let mut ways: BTreeSet<WayId> = changes.ways.clone();
        ways.extend(changes.removed_ways.iter().copied());
        ways.extend(visibility.ways.iter().map(|(id, _)| *id));
        ways.extend(activation.ways.iter().copied());
        for way in &ways {
            self.pre_nodes.sync_way(&self.features, *way);
        }

        let mut nodes: BTreeSet<NodeId> = changes.nodes.clone();
        nodes.extend(activation.nodes.iter().copied());
        self.style
            .refresh_nodes(&mut self.features, &self.activation, nodes);
        self.style
            .refresh_ways(&mut self.features, &self.activation, ways);
        self.style
            .refresh_segments(&self.features, &self.activation);

        if self.config.strict_invariants {
            self.visible.verify(&self.features, &self.markers);
        }

        for id in &changes.added_nodes {
            self.emit(LayerEvent::NodeAdded(*id));
        }
        for id in &changes.added_ways {
            self.emit(LayerEvent::WayAdded(*id));
        }
        for id in &changes.removed_ways {
            self.emit(LayerEvent::WayDeleted(*id));
        }
        for id in &changes.removed_nodes {
            self.emit(LayerEvent::NodeDeleted(*id));
        }
        for id in &marker_changes.added {
            self.emit(LayerEvent::MarkerAdded(*id));
        }
        for id in &marker_changes.removed {
            self.emit(LayerEvent::MarkerDeleted(*id));
        }
        if !visibility.is_empty() {
            self.emit(LayerEvent::VisibilityChanged(visibility));
        }
        if !activation.is_empty() {
            self.emit(LayerEvent::ActivationChanged(activation));
        }

        let history_state = (self.history.is_undo_enable(), self.history.is_redo_enable());
        if history_state != self.history_state {
            self.history_state = history_state;
            self.emit(LayerEvent::HistoryChanged {
                undo: history_state.0,
                redo: history_state.1,
            });
        }
    }

    /// Runs an edit of the graph and registers it in the history as one step.
    pub fn edit<R>(&mut self, label: &'static str, f: impl FnOnce(&mut GeoFeatureManager) -> R) -> R {
        let (result, change) = self.features.record(f);
        if !change.is_noop() {
            self.history.register(FeatureCommand::new(label, change));
        }
        self.sync();
        result
    }

    /// Reverts the last edit and moves the map to it. Returns false if there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        let mut context = CommandContext {
            features: &mut self.features,
            markers: &mut self.markers,
        };
        let Some(step) = self.history.undo(&mut context) else {
            return false;
        };

        if let Some(center) = step.center {
            self.host.borrow_mut().pan_to(center);
        }
        self.sync();
        true
    }

    /// Applies the last undone edit again and moves the map to it. Returns false if there was
    /// nothing to redo.
    pub fn redo(&mut self) -> bool {
        let mut context = CommandContext {
            features: &mut self.features,
            markers: &mut self.markers,
        };
        let Some(step) = self.history.redo(&mut context) else {
            return false;
        };

        if let Some(center) = step.center {
            self.host.borrow_mut().pan_to(center);
        }
        self.sync();
        true
    }

    /// Forgets every undo and redo step.
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.sync();
    }

    /// Adds features from a GeoJSON feature collection. The import is one undo step.
    pub fn import_json(&mut self, json: &str, preserve_ids: bool) -> Result<ImportSummary, GeomapError> {
        let collection = parse_feature_collection(json)?;
        let (result, change) = self
            .features
            .record(|features| import_feature_collection(features, &collection, preserve_ids));
        if result.is_ok() && !change.is_noop() {
            self.history.register(FeatureCommand::new("import", change));
        }
        self.sync();
        result
    }

    /// Exports every node and way as a GeoJSON feature collection.
    pub fn export_json(&self) -> Result<String, GeomapError> {
        Ok(serde_json::to_string(&to_feature_collection(&self.features))?)
    }

    /// Selects the features in addition to the current selection.
    pub fn activate_nodes(&mut self, ids: &[NodeId]) -> Result<(), GeomapError> {
        if let Some(missing) = ids.iter().find(|id| !self.features.contains_node(**id)) {
            return Err(GeomapError::NotFound(FeatureRef::Node(*missing)));
        }
        let change = self.activation.activate_nodes(ids.iter().copied());
        self.pending_activation.nodes.extend(change);
        self.sync();
        Ok(())
    }

    /// Deselects the nodes.
    pub fn deactivate_nodes(&mut self, ids: &[NodeId]) {
        let change = self.activation.deactivate_nodes(ids.iter().copied());
        self.pending_activation.nodes.extend(change);
        self.sync();
    }

    /// Selects the ways in addition to the current selection.
    pub fn activate_ways(&mut self, ids: &[WayId]) -> Result<(), GeomapError> {
        if let Some(missing) = ids.iter().find(|id| !self.features.contains_way(**id)) {
            return Err(GeomapError::NotFound(FeatureRef::Way(*missing)));
        }
        let change = self.activation.activate_ways(ids.iter().copied());
        self.pending_activation.ways.extend(change);
        self.sync();
        Ok(())
    }

    /// Deselects the ways.
    pub fn deactivate_ways(&mut self, ids: &[WayId]) {
        let change = self.activation.deactivate_ways(ids.iter().copied());
        self.pending_activation.ways.extend(change);
        self.sync();
    }

    /// Selects the line segments in addition to the current selection. Segments that are not part of
    /// their way are rejected.
    pub fn activate_segments(&mut self, segments: &[LineSegment]) -> Result<(), GeomapError> {
        if let Some(missing) = segments.iter().find(|segment| {
            self.features
                .way(segment.way)
                .and_then(|way| way.segment_index(segment.start, segment.end))
                .is_none()
        }) {
            return Err(GeomapError::NotFound(FeatureRef::Way(missing.way)));
        }
        let change = self.activation.activate_segments(segments.iter().copied());
        self.pending_activation.segments.extend(change);
        self.sync();
        Ok(())
    }

    /// Deselects everything.
    pub fn clear_activation(&mut self) {
        let change = self.activation.clear();
        self.pending_activation.merge(change);
        self.sync();
    }

    /// Adds a marker.
    pub fn add_marker(&mut self, position: LatLng, options: MarkerOptions) -> MarkerId {
        let id = self.markers.add_marker(position, options);
        self.sync();
        id
    }

    /// Deletes the marker.
    pub fn delete_marker(&mut self, id: MarkerId) -> Result<(), GeomapError> {
        if !self.markers.delete_marker(id) {
            return Err(GeomapError::NotFound(FeatureRef::Marker(id)));
        }
        self.sync();
        Ok(())
    }

    /// Moves the marker. Programmatic moves are not recorded in the history.
    pub fn set_marker_position(
        &mut self,
        id: MarkerId,
        position: LatLng,
    ) -> Result<(), GeomapError> {
        if !self.markers.set_marker_position(id, position) {
            return Err(GeomapError::NotFound(FeatureRef::Marker(id)));
        }
        self.sync();
        Ok(())
    }

    /// Allows or forbids dragging the marker to fix its position.
    pub fn set_marker_fixing_position(&mut self, id: MarkerId, fixing: bool) -> Result<(), GeomapError> {
        if !self.markers.set_marker_fixing_position(id, fixing) {
            return Err(GeomapError::NotFound(FeatureRef::Marker(id)));
        }
        self.sync();
        Ok(())
    }

    /// Shows or hides the marker.
    pub fn set_marker_shown(&mut self, id: MarkerId, shown: bool) -> Result<(), GeomapError> {
        if !self.markers.set_marker_shown(id, shown) {
            return Err(GeomapError::NotFound(FeatureRef::Marker(id)));
        }
        self.sync();
        Ok(())
    }

    /// Selects or deselects the marker.
    pub fn activate_marker(&mut self, id: MarkerId, active: bool) -> Result<(), GeomapError> {
        if self.markers.marker(id).is_none() {
            return Err(GeomapError::NotFound(FeatureRef::Marker(id)));
        }
        let change = if active {
            self.activation.activate_markers([id])
        } else {
            self.activation.deactivate_markers([id])
        };
        self.pending_activation.markers.extend(change);
        self.sync();
        Ok(())
    }

    /// Removes everything the layer has drawn and forgets all features and history.
    pub fn clear(&mut self) {
        self.cancel_gestures();
        self.features.clear();
        self.markers.clear();
        let change = self.activation.clear();
        self.pending_activation.merge(change);
        self.history.clear();
        self.sync();
        self.pre_nodes.clear();
        self.style.clear();
        self.visible.clear();
    }
}

/// Stroke of the way being drawn and of the selection rectangle.
fn preview_stroke(style: &GeoFeatureStyleManager) -> StrokeStyle {
    let palette = style.preset().palette(style.map_type());
    StrokeStyle {
        color: palette.way_active_color.clone(),
        weight: palette.way_weight,
        opacity: 0.7,
    }
}

#[cfg(test)]
mod tests;
