//! Derivation of the look of features from the graph state, selection and base map.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::activation::GeoFeatureActivationManager;
use crate::feature::{FeatureAppearance, FeatureGraph, GeoNode, GeoWay, LineSegment, NodeTypes, RenderState};
use crate::host::{PolylinePrimitive, SharedHost, StrokeStyle, WayIcon};
use crate::id::{NodeId, WayId};
use crate::view::MapType;

/// Colors and weights for one base map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    /// Stroke of a way.
    pub way_color: String,
    /// Stroke of a selected way.
    pub way_active_color: String,
    /// Stroke of a disabled way.
    pub way_disabled_color: String,
    /// Width of a way.
    pub way_weight: f64,
    /// Width of a selected way or segment.
    pub way_active_weight: f64,
    /// Stroke of a selected line segment.
    pub segment_active_color: String,
    /// Fill of an interior or standalone node.
    pub node_color: String,
    /// Fill of a way start or end.
    pub node_endpoint_color: String,
    /// Fill of a node shared by several ways.
    pub node_junction_color: String,
    /// Fill of a selected node.
    pub node_active_color: String,
    /// Fill of a disabled node.
    pub node_disabled_color: String,
    /// Fill of a pre-node.
    pub pre_node_color: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self::road()
    }
}

impl Palette {
    /// Palette for the road map.
    pub fn road() -> Self {
        Self {
            way_color: "#1e88e5".into(),
            way_active_color: "#ff7043".into(),
            way_disabled_color: "#9e9e9e".into(),
            way_weight: 4.0,
            way_active_weight: 6.0,
            segment_active_color: "#e53935".into(),
            node_color: "#ffffff".into(),
            node_endpoint_color: "#1565c0".into(),
            node_junction_color: "#6a1b9a".into(),
            node_active_color: "#ff7043".into(),
            node_disabled_color: "#bdbdbd".into(),
            pre_node_color: "#90caf9".into(),
        }
    }

    /// Palette for the satellite imagery: brighter colors over a dark background.
    pub fn satellite() -> Self {
        Self {
            way_color: "#ffeb3b".into(),
            way_active_color: "#00e5ff".into(),
            way_disabled_color: "#e0e0e0".into(),
            segment_active_color: "#ff1744".into(),
            node_endpoint_color: "#ffc107".into(),
            node_junction_color: "#e040fb".into(),
            node_active_color: "#00e5ff".into(),
            pre_node_color: "#fff59d".into(),
            ..Self::road()
        }
    }
}

/// Style presets for every base map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StylePreset {
    /// Palette for [`MapType::Road`].
    pub road: Palette,
    /// Palette for [`MapType::Satellite`].
    pub satellite: Palette,
    /// Base z-index of ways.
    pub way_z_index: i32,
    /// Base z-index of nodes.
    pub node_z_index: i32,
    /// Added to z-index of selected features.
    pub active_z_boost: i32,
}

impl Default for StylePreset {
    fn default() -> Self {
        Self {
            road: Palette::road(),
            satellite: Palette::satellite(),
            way_z_index: 10,
            node_z_index: 100,
            active_z_boost: 50,
        }
    }
}

impl StylePreset {
    /// Palette for the base map.
    pub fn palette(&self, map_type: MapType) -> &Palette {
        match map_type {
            MapType::Road => &self.road,
            MapType::Satellite => &self.satellite,
        }
    }
}

/// Look of a point feature.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeAppearance {
    /// HTML content of the marker.
    pub content: String,
    /// Opacity in `0.0..=1.0`.
    pub opacity: f64,
    /// Stacking order.
    pub z_index: i32,
}

fn node_html(kind: &str, color: &str) -> String {
    format!(r#"<div class="geomap-node geomap-node-{kind}" style="background-color:{color}"></div>"#)
}

/// Keeps the look of nodes, ways and selected segments in line with their state.
///
/// The manager does not observe anything by itself: the layer calls the `refresh_*` methods for the
/// features that changed.
#[derive(Debug)]
pub struct GeoFeatureStyleManager {
    preset: StylePreset,
    map_type: MapType,
    host: SharedHost,
    segment_overlays: BTreeMap<LineSegment, RenderState<PolylinePrimitive>>,
}

impl GeoFeatureStyleManager {
    /// Creates a new manager.
    pub fn new(preset: StylePreset, host: SharedHost) -> Self {
        Self {
            preset,
            map_type: MapType::Road,
            host,
            segment_overlays: BTreeMap::new(),
        }
    }

    /// Current preset.
    pub fn preset(&self) -> &StylePreset {
        &self.preset
    }

    /// Current base map.
    pub fn map_type(&self) -> MapType {
        self.map_type
    }

    /// Sets the base map. Returns true if it changed, in which case everything must be refreshed.
    pub fn set_map_type(&mut self, map_type: MapType) -> bool {
        if self.map_type == map_type {
            return false;
        }
        self.map_type = map_type;
        true
    }

    /// Replaces the preset. Everything must be refreshed after that.
    pub fn set_preset(&mut self, preset: StylePreset) {
        self.preset = preset;
    }

    fn palette(&self) -> &Palette {
        self.preset.palette(self.map_type)
    }

    /// Look of the node in its current state.
    pub fn node_appearance(&self, node: &GeoNode, types: NodeTypes, active: bool) -> NodeAppearance {
        let palette = self.palette();
        let (kind, color) = if !node.is_enabled() {
            ("disabled", &palette.node_disabled_color)
        } else if active {
            ("active", &palette.node_active_color)
        } else if types.is_multiple() {
            ("junction", &palette.node_junction_color)
        } else if types.is_endpoint() {
            ("endpoint", &palette.node_endpoint_color)
        } else {
            ("segmental", &palette.node_color)
        };

        NodeAppearance {
            content: node_html(kind, color),
            opacity: if node.is_enabled() { 1.0 } else { 0.5 },
            z_index: self.preset.node_z_index + if active { self.preset.active_z_boost } else { 0 },
        }
    }

    /// Look of a pre-node.
    pub fn pre_node_appearance(&self) -> NodeAppearance {
        NodeAppearance {
            content: node_html("pre", &self.palette().pre_node_color),
            opacity: 0.8,
            z_index: self.preset.node_z_index - 1,
        }
    }

    /// Stroke and z-index of the way in its current state.
    pub fn way_appearance(&self, way: &GeoWay, active: bool) -> (StrokeStyle, i32) {
        let palette = self.palette();
        let (color, weight) = if !way.is_enabled() {
            (&palette.way_disabled_color, palette.way_weight)
        } else if active {
            (&palette.way_active_color, palette.way_active_weight)
        } else {
            (&palette.way_color, palette.way_weight)
        };

        let stroke = StrokeStyle {
            color: color.clone(),
            weight,
            opacity: if way.is_enabled() { 1.0 } else { 0.6 },
        };
        let z_index = self.preset.way_z_index + if active { self.preset.active_z_boost } else { 0 };
        (stroke, z_index)
    }

    /// Updates the look of the nodes.
    pub fn refresh_nodes(
        &self,
        graph: &mut impl FeatureAppearance,
        activation: &GeoFeatureActivationManager,
        ids: impl IntoIterator<Item = NodeId>,
    ) {
        for id in ids {
            let Some(node) = graph.node(id) else {
                continue;
            };
            let appearance = self.node_appearance(node, graph.node_types(id), activation.is_node_active(id));
            graph.set_node_appearance(id, &appearance);
        }
    }

    /// Updates the look of the ways. Selected ways show their direction.
    pub fn refresh_ways(
        &self,
        graph: &mut impl FeatureAppearance,
        activation: &GeoFeatureActivationManager,
        ids: impl IntoIterator<Item = WayId>,
    ) {
        for id in ids {
            let Some(way) = graph.way(id) else {
                continue;
            };
            let active = activation.is_way_active(id);
            let (stroke, z_index) = self.way_appearance(way, active);
            let icons = if active {
                vec![WayIcon {
                    repeat_px: Some(80.0),
                    ..WayIcon::direction_arrow()
                }]
            } else {
                vec![]
            };
            graph.set_way_appearance(id, &stroke, z_index, &icons);
        }
    }

    /// Draws an overlay with a direction arrow over every selected segment, and removes the overlays
    /// of segments that are not selected anymore.
    pub fn refresh_segments(
        &mut self,
        graph: &impl FeatureGraph,
        activation: &GeoFeatureActivationManager,
    ) {
        let mut host = self.host.borrow_mut();

        self.segment_overlays.retain(|segment, overlay| {
            let keep = activation.is_segment_active(segment)
                && graph
                    .way(segment.way)
                    .is_some_and(|way| way.is_visible() && way.segment_index(segment.start, segment.end).is_some());
            if !keep {
                overlay.release(&mut *host);
            }
            keep
        });

        let palette = self.preset.palette(self.map_type);
        let z_index = self.preset.way_z_index + self.preset.active_z_boost + 1;
        for segment in activation.segments() {
            let visible = graph.way(segment.way).is_some_and(GeoWay::is_visible);
            let (Some(start), Some(end)) = (graph.node(segment.start), graph.node(segment.end)) else {
                continue;
            };
            if !visible {
                continue;
            }

            let overlay = self.segment_overlays.entry(*segment).or_default();
            overlay.update(&mut *host, |polyline| {
                polyline.path = vec![start.rendered_position(), end.rendered_position()];
                polyline.stroke = StrokeStyle {
                    color: palette.segment_active_color.clone(),
                    weight: palette.way_active_weight,
                    opacity: 1.0,
                };
                polyline.z_index = z_index;
                polyline.icons = vec![WayIcon::direction_arrow()];
            });
            overlay.materialize(&mut *host);
        }
    }

    /// Number of segment overlays currently drawn.
    pub fn segment_overlay_count(&self) -> usize {
        self.segment_overlays.len()
    }

    /// Removes every overlay from the host.
    pub fn clear(&mut self) {
        let mut host = self.host.borrow_mut();
        for overlay in self.segment_overlays.values_mut() {
            overlay.release(&mut *host);
        }
        self.segment_overlays.clear();
    }
}
