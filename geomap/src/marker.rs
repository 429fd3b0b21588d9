//! Markers: point features outside of the node/way graph, such as robots or points of interest.

use std::collections::{BTreeMap, BTreeSet};

use geomap_types::LatLng;
use serde::{Deserialize, Serialize};

use crate::event::{Event, EventListenerManager, ListenerHandle};
use crate::feature::RenderState;
use crate::host::{MapHost, MarkerPrimitive, SharedHost};
use crate::id::{IdGenerator, MarkerId};

/// HTML content of a marker for each of its states. Missing variants fall back to `normal`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerContents {
    /// Default content.
    pub normal: String,
    /// Content of a selected marker.
    pub activated: Option<String>,
    /// Content shown when the map is zoomed out.
    pub simplified: Option<String>,
    /// Content shown while the user fixes the marker position.
    pub fixing_position: Option<String>,
}

impl MarkerContents {
    /// Contents with only the normal variant.
    pub fn new(normal: impl Into<String>) -> Self {
        Self {
            normal: normal.into(),
            ..Default::default()
        }
    }

    /// Content for the state.
    pub fn for_state(&self, state: MarkerState) -> &str {
        let variant = match state {
            MarkerState::Normal => None,
            MarkerState::Activated => self.activated.as_ref(),
            MarkerState::Simplified => self.simplified.as_ref(),
            MarkerState::FixingPosition => self.fixing_position.as_ref(),
        };
        variant.unwrap_or(&self.normal)
    }
}

/// Display state of a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerState {
    /// Default.
    Normal,
    /// Selected.
    Activated,
    /// Map is zoomed out below the marker simplification level.
    Simplified,
    /// The user is fixing the marker position. Only in this state the marker can be dragged.
    FixingPosition,
}

/// Options of a marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerOptions {
    /// Content variants.
    pub contents: MarkerContents,
    /// Content of a secondary point drawn under the marker at its exact position.
    pub point: Option<String>,
    /// Stacking order.
    pub z_index: i32,
    /// Opacity in `0.0..=1.0`.
    pub opacity: f64,
    /// Below this zoom level the simplified content is shown.
    pub simplify_below_zoom: f64,
}

impl Default for MarkerOptions {
    fn default() -> Self {
        Self {
            contents: MarkerContents::default(),
            point: None,
            z_index: 200,
            opacity: 1.0,
            simplify_below_zoom: 15.0,
        }
    }
}

/// Change of a single marker.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerEvent {
    /// Marker moved.
    PositionChanged {
        /// Marker id.
        id: MarkerId,
        /// New position.
        position: LatLng,
    },
    /// Display state changed.
    StateChanged {
        /// Marker id.
        id: MarkerId,
        /// New state.
        state: MarkerState,
    },
    /// Marker was shown or hidden.
    VisibilityChanged {
        /// Marker id.
        id: MarkerId,
        /// New visibility.
        visible: bool,
    },
    /// Marker was deleted.
    Destroyed(MarkerId),
}

/// Kind of [`MarkerEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerEventKind {
    /// [`MarkerEvent::PositionChanged`]
    PositionChanged,
    /// [`MarkerEvent::StateChanged`]
    StateChanged,
    /// [`MarkerEvent::VisibilityChanged`]
    VisibilityChanged,
    /// [`MarkerEvent::Destroyed`]
    Destroyed,
}

impl Event for MarkerEvent {
    type Kind = MarkerEventKind;

    fn kind(&self) -> MarkerEventKind {
        match self {
            MarkerEvent::PositionChanged { .. } => MarkerEventKind::PositionChanged,
            MarkerEvent::StateChanged { .. } => MarkerEventKind::StateChanged,
            MarkerEvent::VisibilityChanged { .. } => MarkerEventKind::VisibilityChanged,
            MarkerEvent::Destroyed(_) => MarkerEventKind::Destroyed,
        }
    }
}

/// Point feature with state dependent content.
#[derive(Debug)]
pub struct GeoMarker {
    id: MarkerId,
    position: LatLng,
    options: MarkerOptions,
    activated: bool,
    fixing_position: bool,
    simplified: bool,
    shown: bool,
    visible: bool,
    render: RenderState<MarkerPrimitive>,
    point_render: RenderState<MarkerPrimitive>,
    listeners: EventListenerManager<MarkerEvent>,
}

impl GeoMarker {
    fn new(id: MarkerId, position: LatLng, options: MarkerOptions, zoom: f64) -> Self {
        let mut marker = Self {
            id,
            position,
            simplified: zoom < options.simplify_below_zoom,
            options,
            activated: false,
            fixing_position: false,
            shown: true,
            visible: false,
            render: RenderState::default(),
            point_render: RenderState::default(),
            listeners: EventListenerManager::new(),
        };

        let primitive = marker.primitive();
        marker.render = RenderState::new(primitive);
        marker.point_render = RenderState::new(MarkerPrimitive {
            position,
            content: marker.options.point.clone().unwrap_or_default(),
            z_index: marker.options.z_index - 1,
            opacity: marker.options.opacity,
        });
        marker
    }

    fn primitive(&self) -> MarkerPrimitive {
        MarkerPrimitive {
            position: self.position,
            content: self.content().to_string(),
            z_index: self.options.z_index,
            opacity: self.options.opacity,
        }
    }

    /// Id of the marker.
    pub fn id(&self) -> MarkerId {
        self.id
    }

    /// Position of the marker.
    pub fn position(&self) -> LatLng {
        self.position
    }

    /// Options.
    pub fn options(&self) -> &MarkerOptions {
        &self.options
    }

    /// Current display state. Fixing position takes priority over selection, which takes priority
    /// over simplification.
    pub fn state(&self) -> MarkerState {
        if self.fixing_position {
            MarkerState::FixingPosition
        } else if self.activated {
            MarkerState::Activated
        } else if self.simplified {
            MarkerState::Simplified
        } else {
            MarkerState::Normal
        }
    }

    /// Content for the current state.
    pub fn content(&self) -> &str {
        self.options.contents.for_state(self.state())
    }

    /// Whether the application wants the marker displayed. A shown marker is visible only inside the
    /// map viewport.
    pub fn is_shown(&self) -> bool {
        self.shown
    }

    /// Whether the marker is displayed.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether the marker can be dragged.
    pub fn is_draggable(&self) -> bool {
        self.fixing_position
    }

    /// Rendering state of the marker.
    pub fn render_state(&self) -> &RenderState<MarkerPrimitive> {
        &self.render
    }

    /// Rendering state of the secondary point.
    pub fn point_render_state(&self) -> &RenderState<MarkerPrimitive> {
        &self.point_render
    }

    /// Subscribes to the marker changes.
    pub fn add_listener(
        &mut self,
        kind: MarkerEventKind,
        callback: impl FnMut(&MarkerEvent, &()) + 'static,
    ) -> ListenerHandle<MarkerEventKind> {
        self.listeners.add_listener(kind, callback)
    }

    /// Removes a listener added by [`GeoMarker::add_listener`].
    pub fn remove_listener(&mut self, handle: &ListenerHandle<MarkerEventKind>) -> bool {
        self.listeners.remove_listener(handle)
    }

    fn set_position(&mut self, position: LatLng, host: &mut dyn MapHost) {
        self.position = position;
        self.render.update(host, |m| m.position = position);
        self.point_render.update(host, |m| m.position = position);
        self.listeners
            .invoke(&MarkerEvent::PositionChanged { id: self.id, position }, &());
    }

    fn update_state(&mut self, host: &mut dyn MapHost, f: impl FnOnce(&mut Self)) -> bool {
        let before = self.state();
        f(self);
        let state = self.state();
        if state == before {
            return false;
        }

        let content = self.content().to_string();
        self.render.update(host, |m| m.content = content);
        self.listeners
            .invoke(&MarkerEvent::StateChanged { id: self.id, state }, &());
        true
    }

    fn set_visible(&mut self, visible: bool, host: &mut dyn MapHost) -> bool {
        if self.visible == visible {
            return false;
        }

        self.visible = visible;
        self.render.set_materialized(visible, host);
        self.point_render
            .set_materialized(visible && self.options.point.is_some(), host);
        self.listeners
            .invoke(&MarkerEvent::VisibilityChanged { id: self.id, visible }, &());
        true
    }

    fn destroy(&mut self, host: &mut dyn MapHost) {
        self.render.release(host);
        self.point_render.release(host);
        self.visible = false;
        self.listeners.invoke(&MarkerEvent::Destroyed(self.id), &());
        self.listeners.clear();
    }
}

/// Read access to markers and control over their visibility.
pub trait MarkerSource {
    /// Marker by id.
    fn marker(&self, id: MarkerId) -> Option<&GeoMarker>;
    /// All markers in ascending id order.
    fn markers(&self) -> Box<dyn Iterator<Item = &GeoMarker> + '_>;
    /// Shows or hides the marker. Returns false if there is no such marker.
    fn set_marker_visible(&mut self, id: MarkerId, visible: bool) -> bool;
}

/// Markers changed since the last call to [`GeoMarkerManager::take_changes`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerChanges {
    /// New markers.
    pub added: BTreeSet<MarkerId>,
    /// Deleted markers.
    pub removed: BTreeSet<MarkerId>,
    /// Every changed marker.
    pub touched: BTreeSet<MarkerId>,
}

/// Owner of the markers of a layer.
pub struct GeoMarkerManager {
    markers: BTreeMap<MarkerId, GeoMarker>,
    ids: IdGenerator,
    host: SharedHost,
    zoom: f64,
    changes: MarkerChanges,
}

impl std::fmt::Debug for GeoMarkerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoMarkerManager")
            .field("markers", &self.markers.len())
            .field("zoom", &self.zoom)
            .finish()
    }
}

impl GeoMarkerManager {
    /// Creates an empty manager.
    pub fn new(ids: IdGenerator, host: SharedHost) -> Self {
        Self {
            markers: BTreeMap::new(),
            ids,
            host,
            zoom: f64::MAX,
            changes: MarkerChanges::default(),
        }
    }

    /// Adds a new marker. It becomes visible once the visibility manager finds it inside the viewport.
    pub fn add_marker(&mut self, position: LatLng, options: MarkerOptions) -> MarkerId {
        let id: MarkerId = self.ids.next_id();
        self.markers
            .insert(id, GeoMarker::new(id, position, options, self.zoom));
        if !self.changes.removed.remove(&id) {
            self.changes.added.insert(id);
        }
        self.changes.touched.insert(id);
        log::debug!("Added {id}");
        id
    }

    /// Deletes the marker.
    pub fn delete_marker(&mut self, id: MarkerId) -> bool {
        let Some(mut marker) = self.markers.remove(&id) else {
            return false;
        };

        marker.destroy(&mut *self.host.borrow_mut());
        if !self.changes.added.remove(&id) {
            self.changes.removed.insert(id);
        }
        self.changes.touched.insert(id);
        log::debug!("Deleted {id}");
        true
    }

    /// Deletes every marker.
    pub fn clear(&mut self) {
        let ids: Vec<MarkerId> = self.markers.keys().copied().collect();
        for id in ids {
            self.delete_marker(id);
        }
    }

    /// Moves the marker.
    pub fn set_marker_position(&mut self, id: MarkerId, position: LatLng) -> bool {
        let Some(marker) = self.markers.get_mut(&id) else {
            return false;
        };

        marker.set_position(position, &mut *self.host.borrow_mut());
        self.changes.touched.insert(id);
        true
    }

    /// Marks the marker as selected or not.
    pub fn set_marker_activated(&mut self, id: MarkerId, activated: bool) -> bool {
        self.update_state(id, |marker| marker.activated = activated)
    }

    /// Starts or stops fixing the marker position.
    pub fn set_marker_fixing_position(&mut self, id: MarkerId, fixing: bool) -> bool {
        self.update_state(id, |marker| marker.fixing_position = fixing)
    }

    fn update_state(&mut self, id: MarkerId, f: impl FnOnce(&mut GeoMarker)) -> bool {
        let Some(marker) = self.markers.get_mut(&id) else {
            return false;
        };

        if marker.update_state(&mut *self.host.borrow_mut(), f) {
            self.changes.touched.insert(id);
        }
        true
    }

    /// Shows or hides the marker regardless of the viewport.
    pub fn set_marker_shown(&mut self, id: MarkerId, shown: bool) -> bool {
        let Some(marker) = self.markers.get_mut(&id) else {
            return false;
        };

        if marker.shown != shown {
            marker.shown = shown;
            self.changes.touched.insert(id);
        }
        true
    }

    /// Switches markers between simplified and full content.
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom;
        let mut host = self.host.borrow_mut();
        for (id, marker) in self.markers.iter_mut() {
            let simplified = zoom < marker.options.simplify_below_zoom;
            if marker.update_state(&mut *host, |m| m.simplified = simplified) {
                self.changes.touched.insert(*id);
            }
        }
    }

    /// Subscribes to the changes of a single marker.
    pub fn add_marker_listener(
        &mut self,
        id: MarkerId,
        kind: MarkerEventKind,
        callback: impl FnMut(&MarkerEvent, &()) + 'static,
    ) -> Option<ListenerHandle<MarkerEventKind>> {
        Some(self.markers.get_mut(&id)?.add_listener(kind, callback))
    }

    /// Removes a listener added by [`GeoMarkerManager::add_marker_listener`].
    pub fn remove_marker_listener(
        &mut self,
        id: MarkerId,
        handle: &ListenerHandle<MarkerEventKind>,
    ) -> bool {
        self.markers
            .get_mut(&id)
            .is_some_and(|marker| marker.remove_listener(handle))
    }

    /// Number of markers.
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    /// Returns true if there are no markers.
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Takes the set of markers changed since the previous call.
    pub fn take_changes(&mut self) -> MarkerChanges {
        std::mem::take(&mut self.changes)
    }
}

impl MarkerSource for GeoMarkerManager {
    fn marker(&self, id: MarkerId) -> Option<&GeoMarker> {
        self.markers.get(&id)
    }

    fn markers(&self) -> Box<dyn Iterator<Item = &GeoMarker> + '_> {
        Box::new(self.markers.values())
    }

    fn set_marker_visible(&mut self, id: MarkerId, visible: bool) -> bool {
        let Some(marker) = self.markers.get_mut(&id) else {
            return false;
        };
        marker.set_visible(visible, &mut *self.host.borrow_mut());
        true
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use geomap_types::latlng;

    use super::*;
    use crate::host::HeadlessHost;

    fn options() -> MarkerOptions {
        MarkerOptions {
            contents: MarkerContents {
                normal: "robot".into(),
                activated: Some("robot-active".into()),
                simplified: Some("dot".into()),
                fixing_position: Some("robot-fixing".into()),
            },
            point: Some("point".into()),
            ..Default::default()
        }
    }

    #[test]
    fn marker_listeners() {
        let mut manager = GeoMarkerManager::new(IdGenerator::new(), HeadlessHost::shared());
        let id = manager.add_marker(latlng!(0.0, 0.0), options());
        let other = manager.add_marker(latlng!(0.0, 1.0), options());

        let moved = Rc::new(RefCell::new(Vec::new()));
        let log = moved.clone();
        let handle = manager
            .add_marker_listener(id, MarkerEventKind::PositionChanged, move |event, _| {
                if let MarkerEvent::PositionChanged { id, position } = event {
                    log.borrow_mut().push((*id, *position));
                }
            })
            .expect("marker exists");

        manager.set_marker_position(id, latlng!(1.0, 1.0));
        manager.set_marker_position(other, latlng!(1.0, 2.0));
        assert_eq!(*moved.borrow(), vec![(id, latlng!(1.0, 1.0))]);

        assert!(manager.remove_marker_listener(id, &handle));
        manager.set_marker_position(id, latlng!(2.0, 2.0));
        assert_eq!(moved.borrow().len(), 1);
    }

    #[test]
    fn state_priority() {
        let mut manager = GeoMarkerManager::new(IdGenerator::new(), HeadlessHost::shared());
        let id = manager.add_marker(latlng!(0.0, 0.0), options());
        let content = |m: &GeoMarkerManager| m.marker(id).map(|m| m.content().to_string());

        assert_eq!(content(&manager).as_deref(), Some("robot"));
        manager.set_zoom(10.0);
        assert_eq!(content(&manager).as_deref(), Some("dot"));
        manager.set_marker_activated(id, true);
        assert_eq!(content(&manager).as_deref(), Some("robot-active"));
        manager.set_marker_fixing_position(id, true);
        assert_eq!(content(&manager).as_deref(), Some("robot-fixing"));
        assert!(manager.marker(id).is_some_and(GeoMarker::is_draggable));
        manager.set_marker_fixing_position(id, false);
        manager.set_marker_activated(id, false);
        assert_eq!(
            manager.marker(id).map(GeoMarker::state),
            Some(MarkerState::Simplified)
        );
    }

    #[test]
    fn missing_variant_falls_back_to_normal() {
        let contents = MarkerContents::new("pin");
        assert_eq!(contents.for_state(MarkerState::Activated), "pin");
        assert_eq!(contents.for_state(MarkerState::FixingPosition), "pin");
    }

    #[test]
    fn visible_marker_draws_point_overlay() {
        let host = HeadlessHost::shared();
        let mut manager = GeoMarkerManager::new(IdGenerator::new(), host.clone());
        let id = manager.add_marker(latlng!(1.0, 1.0), options());
        assert_eq!(host.borrow().marker_count(), 0);

        manager.set_marker_visible(id, true);
        assert_eq!(host.borrow().marker_count(), 2);

        manager.set_marker_position(id, latlng!(2.0, 2.0));
        assert!(host
            .borrow()
            .markers()
            .all(|(_, m)| m.position == latlng!(2.0, 2.0)));

        assert!(manager.delete_marker(id));
        assert_eq!(host.borrow().marker_count(), 0);
        assert!(!manager.delete_marker(id));
    }
}
