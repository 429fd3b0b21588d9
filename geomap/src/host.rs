//! Capability surface of the map widget that displays the editor.
//!
//! The editor never draws anything itself. Every node, way, marker and preview is described by a
//! primitive ([`MarkerPrimitive`] or [`PolylinePrimitive`]) that is handed to a [`MapHost`]. The
//! host returns a [`PrimitiveHandle`] that is used for later updates and removal.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use geomap_types::LatLng;
use serde::{Deserialize, Serialize};

/// Handle of a primitive created by a [`MapHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrimitiveHandle(u64);

impl PrimitiveHandle {
    /// Creates a handle from the host's own id.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Host's id of the primitive.
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Point marker with custom HTML content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerPrimitive {
    /// Position of the marker anchor.
    pub position: LatLng,
    /// HTML content of the marker.
    pub content: String,
    /// Stacking order; higher values are drawn on top.
    pub z_index: i32,
    /// Opacity in `0.0..=1.0`.
    pub opacity: f64,
}

/// Stroke of a polyline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    /// CSS color.
    pub color: String,
    /// Width in pixels.
    pub weight: f64,
    /// Opacity in `0.0..=1.0`.
    pub opacity: f64,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: "#1e88e5".to_string(),
            weight: 4.0,
            opacity: 1.0,
        }
    }
}

/// Symbol repeated along a polyline, such as a direction arrow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WayIcon {
    /// SVG path of the symbol.
    pub path: String,
    /// Offset of the first symbol along the line, in percent of its length.
    pub offset_percent: f64,
    /// Distance between repeated symbols in pixels. `None` draws one symbol.
    pub repeat_px: Option<f64>,
}

impl WayIcon {
    /// Arrow pointing in the direction of the line, drawn in the middle of it.
    pub fn direction_arrow() -> Self {
        Self {
            path: "M -2,2 0,-2 2,2".to_string(),
            offset_percent: 50.0,
            repeat_px: None,
        }
    }
}

/// Polyline through an ordered list of positions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolylinePrimitive {
    /// Vertices of the line.
    pub path: Vec<LatLng>,
    /// Stroke of the line.
    pub stroke: StrokeStyle,
    /// Stacking order; higher values are drawn on top.
    pub z_index: i32,
    /// Symbols along the line.
    pub icons: Vec<WayIcon>,
}

/// Map widget the editor renders into.
pub trait MapHost: std::fmt::Debug {
    /// Shows a new marker.
    fn create_marker(&mut self, marker: &MarkerPrimitive) -> PrimitiveHandle;
    /// Replaces the marker's properties.
    fn update_marker(&mut self, handle: PrimitiveHandle, marker: &MarkerPrimitive);
    /// Removes the marker from the map.
    fn remove_marker(&mut self, handle: PrimitiveHandle);

    /// Shows a new polyline.
    fn create_polyline(&mut self, polyline: &PolylinePrimitive) -> PrimitiveHandle;
    /// Replaces the polyline's properties.
    fn update_polyline(&mut self, handle: PrimitiveHandle, polyline: &PolylinePrimitive);
    /// Removes the polyline from the map.
    fn remove_polyline(&mut self, handle: PrimitiveHandle);

    /// Moves the map so that the given point is in the center.
    fn pan_to(&mut self, center: LatLng);
}

/// Host shared by all managers of one map session.
pub type SharedHost = Rc<RefCell<dyn MapHost>>;

/// Something that can be drawn by a [`MapHost`].
pub trait Primitive: Clone + Default + PartialEq {
    /// Shows the primitive.
    fn create(&self, host: &mut dyn MapHost) -> PrimitiveHandle;
    /// Pushes the new state of the primitive to the host.
    fn update(&self, handle: PrimitiveHandle, host: &mut dyn MapHost);
    /// Removes the primitive.
    fn remove(handle: PrimitiveHandle, host: &mut dyn MapHost);
}

impl Primitive for MarkerPrimitive {
    fn create(&self, host: &mut dyn MapHost) -> PrimitiveHandle {
        host.create_marker(self)
    }

    fn update(&self, handle: PrimitiveHandle, host: &mut dyn MapHost) {
        host.update_marker(handle, self);
    }

    fn remove(handle: PrimitiveHandle, host: &mut dyn MapHost) {
        host.remove_marker(handle);
    }
}

impl Primitive for PolylinePrimitive {
    fn create(&self, host: &mut dyn MapHost) -> PrimitiveHandle {
        host.create_polyline(self)
    }

    fn update(&self, handle: PrimitiveHandle, host: &mut dyn MapHost) {
        host.update_polyline(handle, self);
    }

    fn remove(handle: PrimitiveHandle, host: &mut dyn MapHost) {
        host.remove_polyline(handle);
    }
}

/// Host that keeps primitives in memory instead of drawing them.
///
/// Useful for running the editor without a map widget (tests, server side validation of edits).
#[derive(Debug, Default)]
pub struct HeadlessHost {
    markers: BTreeMap<PrimitiveHandle, MarkerPrimitive>,
    polylines: BTreeMap<PrimitiveHandle, PolylinePrimitive>,
    last_id: u64,
    last_pan: Option<LatLng>,
}

impl HeadlessHost {
    /// Creates an empty host.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty host wrapped for sharing between managers.
    pub fn shared() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Markers currently shown.
    pub fn markers(&self) -> impl Iterator<Item = (&PrimitiveHandle, &MarkerPrimitive)> {
        self.markers.iter()
    }

    /// Polylines currently shown.
    pub fn polylines(&self) -> impl Iterator<Item = (&PrimitiveHandle, &PolylinePrimitive)> {
        self.polylines.iter()
    }

    /// Marker by handle.
    pub fn marker(&self, handle: PrimitiveHandle) -> Option<&MarkerPrimitive> {
        self.markers.get(&handle)
    }

    /// Polyline by handle.
    pub fn polyline(&self, handle: PrimitiveHandle) -> Option<&PolylinePrimitive> {
        self.polylines.get(&handle)
    }

    /// Number of markers currently shown.
    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Number of polylines currently shown.
    pub fn polyline_count(&self) -> usize {
        self.polylines.len()
    }

    /// Last position given to [`MapHost::pan_to`].
    pub fn last_pan(&self) -> Option<LatLng> {
        self.last_pan
    }

    fn next_handle(&mut self) -> PrimitiveHandle {
        self.last_id += 1;
        PrimitiveHandle(self.last_id)
    }
}

impl MapHost for HeadlessHost {
    fn create_marker(&mut self, marker: &MarkerPrimitive) -> PrimitiveHandle {
        let handle = self.next_handle();
        self.markers.insert(handle, marker.clone());
        handle
    }

    fn update_marker(&mut self, handle: PrimitiveHandle, marker: &MarkerPrimitive) {
        if let Some(stored) = self.markers.get_mut(&handle) {
            *stored = marker.clone();
        } else {
            log::warn!("Update of unknown marker primitive {handle:?}");
        }
    }

    fn remove_marker(&mut self, handle: PrimitiveHandle) {
        self.markers.remove(&handle);
    }

    fn create_polyline(&mut self, polyline: &PolylinePrimitive) -> PrimitiveHandle {
        let handle = self.next_handle();
        self.polylines.insert(handle, polyline.clone());
        handle
    }

    fn update_polyline(&mut self, handle: PrimitiveHandle, polyline: &PolylinePrimitive) {
        if let Some(stored) = self.polylines.get_mut(&handle) {
            *stored = polyline.clone();
        } else {
            log::warn!("Update of unknown polyline primitive {handle:?}");
        }
    }

    fn remove_polyline(&mut self, handle: PrimitiveHandle) {
        self.polylines.remove(&handle);
    }

    fn pan_to(&mut self, center: LatLng) {
        self.last_pan = Some(center);
    }
}
