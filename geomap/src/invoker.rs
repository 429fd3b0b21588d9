//! Clicks and drags on existing features.

use std::collections::BTreeMap;

use geomap_types::{LatLng, LatLngBounds};

use crate::activation::GeoFeatureActivationManager;
use crate::control::{DragStep, DragTracker, PointerEvent, PointerPhase};
use crate::feature::{FeatureGraph, GeoFeatureManager, LineSegment, RenderState};
use crate::history::NodeMove;
use crate::host::{PolylinePrimitive, SharedHost, StrokeStyle};
use crate::id::{MarkerId, NodeId, PreNodeId};
use crate::marker::{GeoMarker, GeoMarkerManager, MarkerSource};
use crate::policy::InteractionPolicy;
use crate::pre_node::GeoPreNodeManager;
use crate::visible::GeoFeatureVisibleManager;

/// What was under the pointer when it was pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    /// A node. The closest clickable and the closest draggable nodes are found independently.
    Node {
        /// Node to click.
        clickable: Option<NodeId>,
        /// Node to drag.
        draggable: Option<NodeId>,
    },
    /// A marker.
    Marker(MarkerId),
    /// A pre-node.
    PreNode(PreNodeId),
    /// A segment of a way.
    LineSegment(LineSegment),
    /// Empty place.
    Nothing,
}

/// Result of a pointer event.
#[derive(Debug, Clone, PartialEq)]
pub enum InvokerOutcome {
    /// Nothing to do.
    None,
    /// A gesture started on the target.
    Pressed(HitTarget),
    /// The pointer moved far enough for the gesture to become a drag.
    DragStarted(HitTarget),
    /// The pointer was released without dragging.
    Clicked {
        /// Pressed target.
        target: HitTarget,
        /// Whether the selection should be extended rather than replaced.
        additive: bool,
    },
    /// Nodes were dragged. Their committed positions did not change yet.
    DragEnded {
        /// Position changes of every dragged node.
        moves: Vec<NodeMove>,
        /// Node under the pointer, the candidate for snapping.
        dragged: NodeId,
    },
    /// A marker was dragged to a new position.
    MarkerMoved {
        /// Moved marker.
        marker: MarkerId,
        /// Position before the drag.
        from: LatLng,
        /// Position after the drag.
        to: LatLng,
    },
    /// A rectangle was dragged over an empty place.
    BoxSelected {
        /// Dragged rectangle.
        bounds: LatLngBounds,
        /// Whether the selection should be extended rather than replaced.
        additive: bool,
    },
    /// The gesture ended with an action that is not supported, such as dragging a segment.
    Ignored,
}

/// Managers used to process a gesture.
pub struct InvokerContext<'a> {
    /// Graph of the layer.
    pub features: &'a mut GeoFeatureManager,
    /// Markers of the layer.
    pub markers: &'a mut GeoMarkerManager,
    /// Visible features used for hit-testing.
    pub visible: &'a GeoFeatureVisibleManager,
    /// Pre-nodes used for hit-testing.
    pub pre_nodes: &'a GeoPreNodeManager,
    /// Selection, dragged together with the node under the pointer.
    pub activation: &'a GeoFeatureActivationManager,
    /// Hit radii and editing rules.
    pub interaction: &'a InteractionPolicy,
}

#[derive(Debug)]
struct Gesture {
    target: HitTarget,
    tracker: DragTracker,
    group: BTreeMap<NodeId, LatLng>,
    marker: Option<(MarkerId, LatLng)>,
    additive: bool,
}

/// State machine turning pointer gestures over existing features into clicks and drags.
///
/// On pointer down the target is found in priority order: node, marker, pre-node, segment, empty
/// place. Moves closer to the origin than the hit radius only preview the offset. Once the pointer
/// crosses that distance the gesture becomes a drag and is reported with
/// [`InvokerOutcome::DragStarted`]. Releasing the pointer yields either a click or the end of the
/// drag, never both.
///
/// Dragging a selected node moves every selected node by the same offset. Dragging an empty place
/// draws a selection rectangle if the policy allows it.
#[derive(Debug)]
pub struct GeoLayerEventInvoker {
    gesture: Option<Gesture>,
    drag_box: RenderState<PolylinePrimitive>,
    host: SharedHost,
}

impl GeoLayerEventInvoker {
    /// Creates an idle invoker.
    pub fn new(box_stroke: StrokeStyle, host: SharedHost) -> Self {
        Self {
            gesture: None,
            drag_box: RenderState::new(PolylinePrimitive {
                stroke: box_stroke,
                z_index: i32::MAX,
                ..Default::default()
            }),
            host,
        }
    }

    /// Returns true if a gesture is in progress.
    pub fn is_active(&self) -> bool {
        self.gesture.is_some()
    }

    /// Target of the current gesture.
    pub fn target(&self) -> Option<HitTarget> {
        self.gesture.as_ref().map(|g| g.target)
    }

    /// Returns true if the current gesture is a drag.
    pub fn is_dragging(&self) -> bool {
        self.gesture
            .as_ref()
            .is_some_and(|g| g.tracker.is_dragging())
    }

    /// Whether the selection rectangle is drawn.
    pub fn is_drag_box_visible(&self) -> bool {
        self.drag_box.is_materialized()
    }

    /// Finds the feature under the point.
    pub fn hit_test(&self, position: &LatLng, context: &InvokerContext<'_>) -> HitTarget {
        let interaction = context.interaction;
        let (clickable, draggable) = context.visible.node_clickable_and_draggable_within_px(
            &*context.features,
            interaction,
            position,
            interaction.node_hit_radius_px(),
        );
        if clickable.is_some() || draggable.is_some() {
            return HitTarget::Node {
                clickable,
                draggable,
            };
        }

        if let Some(marker) = context.visible.marker_visible_within_px(
            &*context.markers,
            position,
            interaction.marker_hit_radius_px(),
        ) {
            return HitTarget::Marker(marker);
        }

        if let Some(pre_node) = context.pre_nodes.pre_node_within_px(
            context.visible.view(),
            position,
            interaction.node_hit_radius_px(),
        ) {
            return HitTarget::PreNode(pre_node);
        }

        if let Some(segment) = context.visible.line_segment_visible_within_px(
            &*context.features,
            position,
            interaction.line_segment_hit_radius_px(),
        ) {
            return HitTarget::LineSegment(segment);
        }

        HitTarget::Nothing
    }

    /// Processes a pointer event.
    pub fn handle(&mut self, event: &PointerEvent, context: &mut InvokerContext<'_>) -> InvokerOutcome {
        match event.phase {
            PointerPhase::Down => self.on_down(event, context),
            PointerPhase::Move => self.on_move(event.position, context),
            PointerPhase::Up => self.on_up(event.position, context),
        }
    }

    fn threshold(&self, position: &LatLng, px: f64, context: &InvokerContext<'_>) -> f64 {
        context.visible.radius_m(position, px)
    }

    fn on_down(&mut self, event: &PointerEvent, context: &mut InvokerContext<'_>) -> InvokerOutcome {
        if self.gesture.is_some() {
            log::trace!("Pointer pressed during a gesture, restarting it");
            self.cancel(context.features, context.markers);
        }

        let position = event.position;
        let target = self.hit_test(&position, context);
        let interaction = context.interaction;

        let mut group = BTreeMap::new();
        let mut marker = None;
        let px = match target {
            HitTarget::Node { draggable, .. } => {
                if let Some(node) = draggable {
                    for id in self.drag_group(node, context) {
                        if let Some(n) = context.features.node(id) {
                            group.insert(id, n.position());
                        }
                    }
                }
                interaction.node_hit_radius_px()
            }
            HitTarget::Marker(id) => {
                marker = context
                    .markers
                    .marker(id)
                    .filter(|m| m.is_draggable())
                    .map(|m: &GeoMarker| (id, m.position()));
                interaction.marker_hit_radius_px()
            }
            HitTarget::LineSegment(_) => interaction.line_segment_hit_radius_px(),
            HitTarget::PreNode(_) | HitTarget::Nothing => interaction.node_hit_radius_px(),
        };

        log::trace!("Pointer down on {target:?}");
        self.gesture = Some(Gesture {
            target,
            tracker: DragTracker::new(position, self.threshold(&position, px, context)),
            group,
            marker,
            additive: event.additive,
        });

        InvokerOutcome::Pressed(target)
    }

    /// Nodes moved by dragging the node: the whole selection if the node is selected, only the node
    /// otherwise. Nodes that cannot be dragged are left in place.
    fn drag_group(&self, node: NodeId, context: &InvokerContext<'_>) -> Vec<NodeId> {
        if !context.activation.is_node_active(node) {
            return vec![node];
        }

        let features = &*context.features;
        let mut group: Vec<NodeId> = context
            .activation
            .drag_group(features)
            .into_iter()
            .filter(|id| {
                features.node(*id).is_some_and(|n| {
                    context.interaction.is_draggable(n, features.node_types(*id))
                })
            })
            .collect();
        if !group.contains(&node) {
            group.push(node);
        }
        group
    }

    /// Turns the current gesture into a drag of the node, as if the node was pressed. Used when a
    /// pre-node is promoted to a real node on pointer down.
    pub fn begin_node_drag(&mut self, node: NodeId, context: &InvokerContext<'_>) {
        let Some(gesture) = &mut self.gesture else {
            return;
        };
        let Some(position) = context.features.node(node).map(|n| n.position()) else {
            return;
        };

        gesture.target = HitTarget::Node {
            clickable: Some(node),
            draggable: Some(node),
        };
        gesture.group = BTreeMap::from([(node, position)]);
    }

    fn on_move(&mut self, position: LatLng, context: &mut InvokerContext<'_>) -> InvokerOutcome {
        let Some(gesture) = &mut self.gesture else {
            return InvokerOutcome::None;
        };

        let step = gesture.tracker.update(position);
        let target = gesture.target;

        for (node, origin) in &gesture.group {
            context
                .features
                .set_node_preview(*node, Some(gesture.tracker.shift(origin)));
        }

        if let Some((marker, origin)) = gesture.marker {
            if gesture.tracker.is_dragging() {
                context
                    .markers
                    .set_marker_position(marker, gesture.tracker.shift(&origin));
            }
        }

        if target == HitTarget::Nothing && context.interaction.drag_box_enabled() {
            if gesture.tracker.is_dragging() {
                let origin = gesture.tracker.origin();
                let mut host = self.host.borrow_mut();
                self.drag_box
                    .update(&mut *host, |polyline| polyline.path = rectangle(&origin, &position));
                self.drag_box.materialize(&mut *host);
            }
        }

        match step {
            DragStep::Started => {
                log::trace!("Drag started on {target:?}");
                InvokerOutcome::DragStarted(target)
            }
            DragStep::Preview | DragStep::Dragging => InvokerOutcome::None,
        }
    }

    fn on_up(&mut self, position: LatLng, context: &mut InvokerContext<'_>) -> InvokerOutcome {
        let Some(mut gesture) = self.gesture.take() else {
            return InvokerOutcome::None;
        };

        gesture.tracker.update(position);
        self.clear_previews(&gesture, context.features);
        self.drag_box.release(&mut *self.host.borrow_mut());

        if !gesture.tracker.is_dragging() {
            if let Some((marker, origin)) = gesture.marker {
                context.markers.set_marker_position(marker, origin);
            }
            return InvokerOutcome::Clicked {
                target: gesture.target,
                additive: gesture.additive,
            };
        }

        match gesture.target {
            HitTarget::Node {
                draggable: Some(dragged),
                ..
            } => {
                let moves = gesture
                    .group
                    .iter()
                    .filter(|(node, _)| context.features.contains_node(**node))
                    .map(|(node, origin)| NodeMove {
                        node: *node,
                        from: *origin,
                        to: gesture.tracker.shift(origin),
                    })
                    .collect();
                InvokerOutcome::DragEnded { moves, dragged }
            }
            HitTarget::Marker(marker) => match gesture.marker {
                Some((_, from)) => InvokerOutcome::MarkerMoved {
                    marker,
                    from,
                    to: gesture.tracker.shift(&from),
                },
                None => InvokerOutcome::Ignored,
            },
            HitTarget::Nothing if context.interaction.drag_box_enabled() => {
                let origin = gesture.tracker.origin();
                InvokerOutcome::BoxSelected {
                    bounds: LatLngBounds::from_points([origin, position].iter())
                        .unwrap_or_else(|| LatLngBounds::from_point(&origin)),
                    additive: gesture.additive,
                }
            }
            _ => {
                log::trace!("Drag of {:?} is not supported", gesture.target);
                InvokerOutcome::Ignored
            }
        }
    }

    fn clear_previews(&self, gesture: &Gesture, features: &mut GeoFeatureManager) {
        for node in gesture.group.keys() {
            features.set_node_preview(*node, None);
        }
    }

    /// Abandons the current gesture, putting dragged features back.
    pub fn cancel(&mut self, features: &mut GeoFeatureManager, markers: &mut GeoMarkerManager) {
        self.drag_box.release(&mut *self.host.borrow_mut());
        let Some(gesture) = self.gesture.take() else {
            return;
        };

        self.clear_previews(&gesture, features);
        if let Some((marker, origin)) = gesture.marker {
            markers.set_marker_position(marker, origin);
        }
        log::trace!("Gesture on {:?} cancelled", gesture.target);
    }
}

fn rectangle(a: &LatLng, b: &LatLng) -> Vec<LatLng> {
    vec![
        *a,
        LatLng::new(a.lat(), b.lng()),
        *b,
        LatLng::new(b.lat(), a.lng()),
        *a,
    ]
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use assert_matches::assert_matches;
    use geomap_types::latlng;

    use super::*;
    use crate::marker::{MarkerContents, MarkerOptions};
    use crate::style::NodeAppearance;
    use crate::tests::{features, path, view_at};

    struct Fixture {
        features: GeoFeatureManager,
        markers: GeoMarkerManager,
        visible: GeoFeatureVisibleManager,
        pre_nodes: GeoPreNodeManager,
        activation: GeoFeatureActivationManager,
        interaction: InteractionPolicy,
        invoker: GeoLayerEventInvoker,
    }

    impl Fixture {
        fn new() -> Self {
            let (features, host) = features();
            Self {
                markers: GeoMarkerManager::new(features.ids().clone(), host.clone()),
                features,
                visible: GeoFeatureVisibleManager::new(
                    view_at(latlng!(10.0, 20.001), 18.0),
                    Default::default(),
                    true,
                ),
                pre_nodes: GeoPreNodeManager::new(
                    Default::default(),
                    NodeAppearance {
                        content: "pre".into(),
                        opacity: 1.0,
                        z_index: 0,
                    },
                    host.clone(),
                ),
                activation: GeoFeatureActivationManager::new(),
                interaction: InteractionPolicy::default(),
                invoker: GeoLayerEventInvoker::new(StrokeStyle::default(), host),
            }
        }

        fn refresh(&mut self) {
            let view = *self.visible.view();
            self.visible
                .on_view_changed(view, &mut self.features, &mut self.markers);
        }

        fn send(&mut self, event: PointerEvent) -> InvokerOutcome {
            let mut context = InvokerContext {
                features: &mut self.features,
                markers: &mut self.markers,
                visible: &self.visible,
                pre_nodes: &self.pre_nodes,
                activation: &self.activation,
                interaction: &self.interaction,
            };
            self.invoker.handle(&event, &mut context)
        }
    }

    #[test]
    fn release_without_move_is_a_click() {
        let mut fixture = Fixture::new();
        let node = fixture
            .features
            .create_node(latlng!(10.0, 20.0), Default::default(), Default::default());
        fixture.refresh();

        let target = HitTarget::Node {
            clickable: Some(node),
            draggable: Some(node),
        };
        assert_eq!(
            fixture.send(PointerEvent::down(latlng!(10.0, 20.00001))),
            InvokerOutcome::Pressed(target)
        );
        assert_eq!(
            fixture.send(PointerEvent::moved(latlng!(10.0, 20.00002))),
            InvokerOutcome::None
        );
        assert_eq!(
            fixture.send(PointerEvent::up(latlng!(10.0, 20.00002))),
            InvokerOutcome::Clicked {
                target,
                additive: false
            }
        );
        assert_eq!(
            fixture.features.node(node).map(|n| n.rendered_position()),
            Some(latlng!(10.0, 20.0))
        );
    }

    #[test]
    fn selected_nodes_are_dragged_together() {
        let mut fixture = Fixture::new();
        let (nodes, _) = path(
            &mut fixture.features,
            &[latlng!(10.0, 20.0), latlng!(10.0, 20.001), latlng!(10.0, 20.002)],
        );
        fixture.refresh();
        fixture.activation.activate_nodes([nodes[0], nodes[1]]);

        fixture.send(PointerEvent::down(latlng!(10.0, 20.0)));
        assert_matches!(
            fixture.send(PointerEvent::moved(latlng!(10.001, 20.0))),
            InvokerOutcome::DragStarted(HitTarget::Node { .. })
        );
        let preview = fixture
            .features
            .node(nodes[1])
            .map(|n| n.rendered_position())
            .expect("dragged node");
        assert_abs_diff_eq!(preview, latlng!(10.001, 20.001), epsilon = 1e-9);

        let outcome = fixture.send(PointerEvent::up(latlng!(10.001, 20.0)));
        let InvokerOutcome::DragEnded { moves, dragged } = outcome else {
            panic!("expected drag end, got {outcome:?}");
        };
        assert_eq!(dragged, nodes[0]);
        assert_eq!(moves.len(), 2);
        assert!(moves.iter().all(|m| m.node != nodes[2]));
        assert_eq!(
            fixture.features.node(nodes[0]).map(|n| n.rendered_position()),
            Some(latlng!(10.0, 20.0))
        );
    }

    #[test]
    fn segment_drag_is_ignored() {
        let mut fixture = Fixture::new();
        let (nodes, way) = path(&mut fixture.features, &[latlng!(10.0, 20.0), latlng!(10.0, 20.002)]);
        fixture.refresh();

        assert_eq!(
            fixture.send(PointerEvent::down(latlng!(10.0, 20.0007))),
            InvokerOutcome::Pressed(HitTarget::LineSegment(LineSegment::new(way, nodes[0], nodes[1])))
        );
        fixture.send(PointerEvent::moved(latlng!(10.001, 20.0007)));
        assert_eq!(fixture.send(PointerEvent::up(latlng!(10.001, 20.0007))), InvokerOutcome::Ignored);
    }

    #[test]
    fn drag_over_empty_place_selects_box() {
        let mut fixture = Fixture::new();
        fixture.send(PointerEvent::down(latlng!(10.0, 20.0)));
        fixture.send(PointerEvent::moved(latlng!(10.001, 20.001)));
        assert!(fixture.invoker.is_drag_box_visible());

        let outcome = fixture.send(PointerEvent::up(latlng!(10.001, 20.001)).with_additive(true));
        assert_matches!(outcome, InvokerOutcome::BoxSelected { additive: false, .. });
        assert!(!fixture.invoker.is_drag_box_visible());
    }

    #[test]
    fn only_markers_fixing_position_are_dragged() {
        let mut fixture = Fixture::new();
        let marker = fixture.markers.add_marker(
            latlng!(10.0, 20.0),
            MarkerOptions {
                contents: MarkerContents::new("robot"),
                ..Default::default()
            },
        );
        fixture.refresh();

        fixture.send(PointerEvent::down(latlng!(10.0, 20.0)));
        fixture.send(PointerEvent::moved(latlng!(10.001, 20.0)));
        assert_eq!(fixture.send(PointerEvent::up(latlng!(10.001, 20.0))), InvokerOutcome::Ignored);

        fixture.markers.set_marker_fixing_position(marker, true);
        fixture.send(PointerEvent::down(latlng!(10.0, 20.0)));
        fixture.send(PointerEvent::moved(latlng!(10.001, 20.0)));
        assert_eq!(
            fixture.markers.marker(marker).map(|m| m.position()),
            Some(latlng!(10.001, 20.0))
        );
        assert_matches!(
            fixture.send(PointerEvent::up(latlng!(10.001, 20.0))),
            InvokerOutcome::MarkerMoved { .. }
        );
    }
}
