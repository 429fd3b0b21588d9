//! Configuration of the editor behavior.
//!
//! Every policy is a plain struct with a [`Default`] implementation and builder-like accessors.
//! Policies can also be loaded from JSON as a part of [`GeoMapConfig`]; missing fields take their
//! default values.

use serde::{Deserialize, Serialize};

use crate::control::PointerKind;
use crate::error::GeomapError;
use crate::feature::{GeoNode, NodeTypes};
use crate::style::StylePreset;

/// Hit testing and selection rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionPolicy {
    node_hit_radius_px: f64,
    line_segment_hit_radius_px: f64,
    marker_hit_radius_px: f64,
    clickable_types: NodeTypes,
    draggable_types: NodeTypes,
    standalone_clickable: bool,
    standalone_draggable: bool,
    drag_box_enabled: bool,
}

impl Default for InteractionPolicy {
    fn default() -> Self {
        Self {
            node_hit_radius_px: 12.0,
            line_segment_hit_radius_px: 8.0,
            marker_hit_radius_px: 16.0,
            clickable_types: NodeTypes::all(),
            draggable_types: NodeTypes::all(),
            standalone_clickable: true,
            standalone_draggable: true,
            drag_box_enabled: true,
        }
    }
}

impl InteractionPolicy {
    /// Radius around a node, in pixels, that counts as hitting it.
    ///
    /// The same radius is the threshold between a click and a drag, and the minimum distance between
    /// consecutive nodes of a way being created.
    pub fn node_hit_radius_px(&self) -> f64 {
        self.node_hit_radius_px
    }

    /// Sets the node hit radius.
    pub fn with_node_hit_radius_px(mut self, px: f64) -> Self {
        self.node_hit_radius_px = px;
        self
    }

    /// Sets the node hit radius.
    pub fn set_node_hit_radius_px(&mut self, px: f64) {
        self.node_hit_radius_px = px;
    }

    /// Radius around a line segment, in pixels, that counts as hitting it.
    pub fn line_segment_hit_radius_px(&self) -> f64 {
        self.line_segment_hit_radius_px
    }

    /// Sets the line segment hit radius.
    pub fn with_line_segment_hit_radius_px(mut self, px: f64) -> Self {
        self.line_segment_hit_radius_px = px;
        self
    }

    /// Sets the line segment hit radius.
    pub fn set_line_segment_hit_radius_px(&mut self, px: f64) {
        self.line_segment_hit_radius_px = px;
    }

    /// Radius around a marker, in pixels, that counts as hitting it.
    pub fn marker_hit_radius_px(&self) -> f64 {
        self.marker_hit_radius_px
    }

    /// Sets the marker hit radius.
    pub fn with_marker_hit_radius_px(mut self, px: f64) -> Self {
        self.marker_hit_radius_px = px;
        self
    }

    /// Sets the marker hit radius.
    pub fn set_marker_hit_radius_px(&mut self, px: f64) {
        self.marker_hit_radius_px = px;
    }

    /// Node classifications that can be clicked.
    pub fn clickable_types(&self) -> NodeTypes {
        self.clickable_types
    }

    /// Sets node classifications that can be clicked.
    pub fn with_clickable_types(mut self, types: NodeTypes) -> Self {
        self.clickable_types = types;
        self
    }

    /// Sets node classifications that can be clicked.
    pub fn set_clickable_types(&mut self, types: NodeTypes) {
        self.clickable_types = types;
    }

    /// Node classifications that can be dragged.
    pub fn draggable_types(&self) -> NodeTypes {
        self.draggable_types
    }

    /// Sets node classifications that can be dragged.
    pub fn with_draggable_types(mut self, types: NodeTypes) -> Self {
        self.draggable_types = types;
        self
    }

    /// Sets node classifications that can be dragged.
    pub fn set_draggable_types(&mut self, types: NodeTypes) {
        self.draggable_types = types;
    }

    /// Whether nodes that do not belong to any way can be clicked.
    pub fn standalone_clickable(&self) -> bool {
        self.standalone_clickable
    }

    /// Sets whether nodes that do not belong to any way can be clicked.
    pub fn with_standalone_clickable(mut self, value: bool) -> Self {
        self.standalone_clickable = value;
        self
    }

    /// Whether nodes that do not belong to any way can be dragged.
    pub fn standalone_draggable(&self) -> bool {
        self.standalone_draggable
    }

    /// Sets whether nodes that do not belong to any way can be dragged.
    pub fn with_standalone_draggable(mut self, value: bool) -> Self {
        self.standalone_draggable = value;
        self
    }

    /// Whether dragging over an empty place selects the nodes inside the dragged box.
    pub fn drag_box_enabled(&self) -> bool {
        self.drag_box_enabled
    }

    /// Sets whether dragging over an empty place selects nodes.
    pub fn with_drag_box_enabled(mut self, value: bool) -> Self {
        self.drag_box_enabled = value;
        self
    }

    /// Sets whether dragging over an empty place selects nodes.
    pub fn set_drag_box_enabled(&mut self, value: bool) {
        self.drag_box_enabled = value;
    }

    /// Returns true if the node with the given classification can be clicked.
    pub fn is_clickable(&self, node: &GeoNode, types: NodeTypes) -> bool {
        node.is_enabled()
            && node.options().clickable
            && Self::type_allowed(types, self.clickable_types, self.standalone_clickable)
    }

    /// Returns true if the node with the given classification can be dragged.
    pub fn is_draggable(&self, node: &GeoNode, types: NodeTypes) -> bool {
        node.is_enabled()
            && node.options().draggable
            && Self::type_allowed(types, self.draggable_types, self.standalone_draggable)
    }

    fn type_allowed(types: NodeTypes, allowed: NodeTypes, standalone: bool) -> bool {
        if types.is_empty() {
            standalone
        } else {
            types.intersects(allowed)
        }
    }
}

/// Snapping of dragged and created nodes to existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapPolicy {
    enabled: bool,
    radius_px: f64,
}

impl Default for SnapPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            radius_px: 16.0,
        }
    }
}

impl SnapPolicy {
    /// Whether snapping is on.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Turns snapping on or off.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Turns snapping on or off.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Distance in pixels at which a node snaps to another one.
    pub fn radius_px(&self) -> f64 {
        self.radius_px
    }

    /// Sets the snapping distance.
    pub fn with_radius_px(mut self, px: f64) -> Self {
        self.radius_px = px;
        self
    }

    /// Sets the snapping distance.
    pub fn set_radius_px(&mut self, px: f64) {
        self.radius_px = px;
    }
}

/// When insertion points are shown in the middle of way segments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreNodePolicy {
    visible: bool,
    min_zoom: f64,
}

impl Default for PreNodePolicy {
    fn default() -> Self {
        Self {
            visible: true,
            min_zoom: 17.0,
        }
    }
}

impl PreNodePolicy {
    /// Whether pre-nodes are shown at all.
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Sets whether pre-nodes are shown.
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Sets whether pre-nodes are shown.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Pre-nodes are hidden below this zoom level.
    pub fn min_zoom(&self) -> f64 {
        self.min_zoom
    }

    /// Sets minimum zoom level for pre-nodes.
    pub fn with_min_zoom(mut self, zoom: f64) -> Self {
        self.min_zoom = zoom;
        self
    }

    /// Sets minimum zoom level for pre-nodes.
    pub fn set_min_zoom(&mut self, zoom: f64) {
        self.min_zoom = zoom;
    }

    /// Returns true if pre-nodes should be displayed at the zoom level.
    pub fn shown_at(&self, zoom: f64) -> bool {
        self.visible && zoom >= self.min_zoom
    }
}

/// Node culling rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityPolicy {
    endpoint_visible: bool,
    segment_visible: bool,
    hide_zoom: f64,
}

impl Default for VisibilityPolicy {
    fn default() -> Self {
        Self {
            endpoint_visible: true,
            segment_visible: true,
            hide_zoom: 16.0,
        }
    }
}

impl VisibilityPolicy {
    /// Whether start and end nodes of ways are shown.
    pub fn endpoint_visible(&self) -> bool {
        self.endpoint_visible
    }

    /// Sets whether start and end nodes of ways are shown.
    pub fn with_endpoint_visible(mut self, visible: bool) -> Self {
        self.endpoint_visible = visible;
        self
    }

    /// Sets whether start and end nodes of ways are shown.
    pub fn set_endpoint_visible(&mut self, visible: bool) {
        self.endpoint_visible = visible;
    }

    /// Whether interior nodes of ways and standalone nodes are shown.
    pub fn segment_visible(&self) -> bool {
        self.segment_visible
    }

    /// Sets whether interior and standalone nodes are shown.
    pub fn with_segment_visible(mut self, visible: bool) -> Self {
        self.segment_visible = visible;
        self
    }

    /// Sets whether interior and standalone nodes are shown.
    pub fn set_segment_visible(&mut self, visible: bool) {
        self.segment_visible = visible;
    }

    /// Below this zoom level only junction nodes are shown.
    pub fn hide_zoom(&self) -> f64 {
        self.hide_zoom
    }

    /// Sets the zoom level below which nodes are hidden.
    pub fn with_hide_zoom(mut self, zoom: f64) -> Self {
        self.hide_zoom = zoom;
        self
    }

    /// Sets the zoom level below which nodes are hidden.
    pub fn set_hide_zoom(&mut self, zoom: f64) {
        self.hide_zoom = zoom;
    }

    /// Returns true if the policy allows nodes of this classification.
    pub fn allows(&self, types: NodeTypes) -> bool {
        (types.is_endpoint() && self.endpoint_visible) || (types.is_segmental() && self.segment_visible)
    }
}

/// Which pointer devices edit the map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputPolicy {
    pencil_mode: bool,
}

impl InputPolicy {
    /// If true, only pencil input edits the map and mouse or touch input is left to the map widget.
    /// Otherwise pencil input is ignored.
    pub fn pencil_mode(&self) -> bool {
        self.pencil_mode
    }

    /// Sets pencil mode.
    pub fn with_pencil_mode(mut self, pencil_mode: bool) -> Self {
        self.pencil_mode = pencil_mode;
        self
    }

    /// Sets pencil mode.
    pub fn set_pencil_mode(&mut self, pencil_mode: bool) {
        self.pencil_mode = pencil_mode;
    }

    /// Returns true if events of the device must be handled by the editor.
    pub fn accepts(&self, kind: PointerKind) -> bool {
        match kind {
            PointerKind::MultiTouch => false,
            PointerKind::Pencil => self.pencil_mode,
            PointerKind::Mouse | PointerKind::Touch => !self.pencil_mode,
        }
    }
}

/// Tool buttons available to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPolicy {
    divide: bool,
    delete: bool,
    copy: bool,
    close: bool,
}

impl Default for ToolPolicy {
    fn default() -> Self {
        Self {
            divide: true,
            delete: true,
            copy: true,
            close: true,
        }
    }
}

impl ToolPolicy {
    /// Whether the divide button is wired.
    pub fn divide(&self) -> bool {
        self.divide
    }

    /// Sets whether the divide button is wired.
    pub fn with_divide(mut self, enabled: bool) -> Self {
        self.divide = enabled;
        self
    }

    /// Whether the delete button is wired.
    pub fn delete(&self) -> bool {
        self.delete
    }

    /// Sets whether the delete button is wired.
    pub fn with_delete(mut self, enabled: bool) -> Self {
        self.delete = enabled;
        self
    }

    /// Whether the copy button is wired.
    pub fn copy(&self) -> bool {
        self.copy
    }

    /// Sets whether the copy button is wired.
    pub fn with_copy(mut self, enabled: bool) -> Self {
        self.copy = enabled;
        self
    }

    /// Whether the close button is wired.
    pub fn close(&self) -> bool {
        self.close
    }

    /// Sets whether the close button is wired.
    pub fn with_close(mut self, enabled: bool) -> Self {
        self.close = enabled;
        self
    }
}

/// Complete configuration of a [`GeoMap`](crate::GeoMap).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoMapConfig {
    /// Hit testing and selection.
    pub interaction: InteractionPolicy,
    /// Snapping.
    pub snap: SnapPolicy,
    /// Insertion points.
    pub pre_node: PreNodePolicy,
    /// Node culling.
    pub visibility: VisibilityPolicy,
    /// Input devices.
    pub input: InputPolicy,
    /// Tool buttons.
    pub tools: ToolPolicy,
    /// Colors and weights.
    pub style: StylePreset,
    /// Maximum number of undo steps.
    pub history_depth: usize,
    /// Panic on broken internal invariants instead of logging them.
    pub strict_invariants: bool,
}

impl Default for GeoMapConfig {
    fn default() -> Self {
        Self {
            interaction: InteractionPolicy::default(),
            snap: SnapPolicy::default(),
            pre_node: PreNodePolicy::default(),
            visibility: VisibilityPolicy::default(),
            input: InputPolicy::default(),
            tools: ToolPolicy::default(),
            style: StylePreset::default(),
            history_depth: 10,
            strict_invariants: cfg!(debug_assertions),
        }
    }
}

impl GeoMapConfig {
    /// Parses the configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, GeomapError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the configuration into JSON.
    pub fn to_json(&self) -> Result<String, GeomapError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() {
        let config = GeoMapConfig::from_json(
            r#"{"snap": {"radius_px": 30.0}, "history_depth": 5, "input": {"pencil_mode": true}}"#,
        )
        .expect("valid config");

        assert_eq!(config.snap.radius_px(), 30.0);
        assert!(config.snap.enabled());
        assert_eq!(config.history_depth, 5);
        assert!(config.input.pencil_mode());
        assert_eq!(config.interaction, InteractionPolicy::default());
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(matches!(
            GeoMapConfig::from_json("{\"history_depth\": \"ten\"}"),
            Err(GeomapError::Serialization(_))
        ));
    }

    #[test]
    fn config_survives_serialization() {
        let config = GeoMapConfig {
            visibility: VisibilityPolicy::default().with_hide_zoom(12.0),
            ..Default::default()
        };
        let json = config.to_json().expect("serializable");
        assert_eq!(GeoMapConfig::from_json(&json).expect("valid"), config);
    }

    #[test]
    fn pencil_mode_selects_devices() {
        let policy = InputPolicy::default();
        assert!(policy.accepts(PointerKind::Mouse));
        assert!(policy.accepts(PointerKind::Touch));
        assert!(!policy.accepts(PointerKind::Pencil));
        assert!(!policy.accepts(PointerKind::MultiTouch));

        let policy = policy.with_pencil_mode(true);
        assert!(policy.accepts(PointerKind::Pencil));
        assert!(!policy.accepts(PointerKind::Mouse));
        assert!(!policy.accepts(PointerKind::MultiTouch));
    }

    #[test]
    fn visibility_policy_by_classification() {
        let policy = VisibilityPolicy::default().with_endpoint_visible(false);
        assert!(!policy.allows(NodeTypes::START));
        assert!(policy.allows(NodeTypes::SEGMENTAL));
        assert!(policy.allows(NodeTypes::empty()));
        assert!(policy.allows(NodeTypes::START | NodeTypes::SEGMENTAL));

        let policy = VisibilityPolicy::default().with_segment_visible(false);
        assert!(policy.allows(NodeTypes::END | NodeTypes::END_MULTIPLE));
        assert!(!policy.allows(NodeTypes::empty()));
    }
}
