use std::collections::BTreeSet;

use geomap_types::LatLngBounds;

use crate::candidate::CandidateContext;
use crate::control::{EventPropagation, PointerEvent, PointerPhase};
use crate::delegator::{EditMode, GeoLayerDelegator};
use crate::feature::FeatureGraph;
use crate::history::{FeatureCommand, MoveMarkerCommand, MoveNodeCommand, NodeMerge, NodeMove};
use crate::id::{NodeId, PreNodeId};
use crate::invoker::{HitTarget, InvokerContext, InvokerOutcome};

impl GeoLayerDelegator {
    /// Processes a pointer event of the map widget.
    pub fn handle_pointer(&mut self, event: &PointerEvent) -> EventPropagation {
        if !self.config.input.accepts(event.kind) {
            return EventPropagation::Propagate;
        }

        let propagation = match self.mode {
            EditMode::View => return EventPropagation::Propagate,
            EditMode::Create => self.handle_create(event),
            EditMode::Edit => self.handle_edit(event),
        };

        self.sync();
        propagation
    }

    fn handle_create(&mut self, event: &PointerEvent) -> EventPropagation {
        let mut context = CandidateContext {
            features: &mut self.features,
            visible: &self.visible,
            interaction: &self.config.interaction,
            snap: &self.config.snap,
        };

        if let Some(command) = self.candidate.handle(event, &mut context) {
            self.history.register(command);
        }

        match event.phase {
            PointerPhase::Down => EventPropagation::Consume,
            PointerPhase::Move | PointerPhase::Up => EventPropagation::Stop,
        }
    }

    fn handle_edit(&mut self, event: &PointerEvent) -> EventPropagation {
        let outcome = {
            let mut context = InvokerContext {
                features: &mut self.features,
                markers: &mut self.markers,
                visible: &self.visible,
                pre_nodes: &self.pre_nodes,
                activation: &self.activation,
                interaction: &self.config.interaction,
            };
            self.invoker.handle(event, &mut context)
        };

        // Presses on empty place leave panning to the map unless they draw a selection rectangle.
        let drag_box = self.config.interaction.drag_box_enabled();
        let passive = move |target: HitTarget| target == HitTarget::Nothing && !drag_box;
        let ownership = move |target: HitTarget| {
            if passive(target) {
                EventPropagation::Propagate
            } else {
                EventPropagation::Consume
            }
        };

        match outcome {
            InvokerOutcome::None | InvokerOutcome::DragStarted(_) => match self.invoker.target() {
                Some(target) => ownership(target),
                None => EventPropagation::Propagate,
            },
            InvokerOutcome::Pressed(HitTarget::PreNode(id)) => {
                self.promote_pre_node(id);
                EventPropagation::Consume
            }
            InvokerOutcome::Pressed(target) => ownership(target),
            InvokerOutcome::Clicked { target, additive } => {
                self.select(target, additive);
                if passive(target) {
                    EventPropagation::Propagate
                } else {
                    EventPropagation::Stop
                }
            }
            InvokerOutcome::DragEnded { moves, dragged } => {
                self.commit_node_drag(moves, dragged);
                EventPropagation::Stop
            }
            InvokerOutcome::MarkerMoved { marker, from, to } => {
                self.markers.set_marker_position(marker, to);
                self.history.register(MoveMarkerCommand::new(marker, from, to));
                EventPropagation::Stop
            }
            InvokerOutcome::BoxSelected { bounds, additive } => {
                self.select_box(&bounds, additive);
                EventPropagation::Stop
            }
            InvokerOutcome::Ignored => EventPropagation::Stop,
        }
    }

    /// Turns the pressed pre-node into a real node of its way and starts dragging it.
    fn promote_pre_node(&mut self, id: PreNodeId) {
        let Some((segment, position)) = self.pre_nodes.promote(id) else {
            return;
        };
        let Some(index) = self
            .features
            .way(segment.way)
            .and_then(|way| way.segment_index(segment.start, segment.end))
        else {
            log::debug!("Pre-node {id} points to a missing segment");
            return;
        };

        let (node, change) = self.features.record(|features| {
            let node = features.create_node(position, Default::default(), Default::default());
            features.add_node_to_way(node, segment.way, index + 1);
            node
        });
        log::debug!("Inserted {node} into {}", segment.way);
        self.history.register(FeatureCommand::new("insert node", change));

        let context = InvokerContext {
            features: &mut self.features,
            markers: &mut self.markers,
            visible: &self.visible,
            pre_nodes: &self.pre_nodes,
            activation: &self.activation,
            interaction: &self.config.interaction,
        };
        self.invoker.begin_node_drag(node, &context);
    }

    /// Applies a click to the selection. Without the modifier the clicked feature replaces the
    /// selection, with it the feature is toggled.
    fn select(&mut self, target: HitTarget, additive: bool) {
        let before = self.activation.clone();
        let activation = &mut self.activation;

        match target {
            HitTarget::Node {
                clickable: Some(node),
                ..
            } => {
                if additive && activation.is_node_active(node) {
                    activation.deactivate_nodes([node]);
                } else {
                    if !additive {
                        activation.clear();
                    }
                    activation.activate_nodes([node]);
                }
            }
            HitTarget::Marker(marker) => {
                if additive && activation.is_marker_active(marker) {
                    activation.deactivate_markers([marker]);
                } else {
                    if !additive {
                        activation.clear();
                    }
                    activation.activate_markers([marker]);
                }
            }
            HitTarget::LineSegment(segment) => {
                if additive && activation.is_segment_active(&segment) {
                    activation.deactivate_segments([segment]);
                } else {
                    if !additive {
                        activation.clear();
                    }
                    activation.activate_segments([segment]);
                }
            }
            HitTarget::Nothing if !additive => {
                activation.clear();
            }
            HitTarget::Node { clickable: None, .. } | HitTarget::PreNode(_) | HitTarget::Nothing => {}
        }

        let change = before.difference(&self.activation);
        self.pending_activation.merge(change);
    }

    fn select_box(&mut self, bounds: &LatLngBounds, additive: bool) {
        let before = self.activation.clone();
        let nodes = self.visible.nodes_visible_in_bounds(&self.features, bounds);
        if !additive {
            self.activation.clear();
        }
        self.activation.activate_nodes(nodes);

        let change = before.difference(&self.activation);
        self.pending_activation.merge(change);
    }

    /// Commits dragged positions. A dragged node dropped onto another visible node is merged into it.
    fn commit_node_drag(&mut self, moves: Vec<NodeMove>, dragged: NodeId) {
        if moves.is_empty() {
            return;
        }

        let moved: BTreeSet<NodeId> = moves.iter().map(|step| step.node).collect();
        let snap = self.config.snap;
        let target = moves
            .iter()
            .find(|step| step.node == dragged)
            .filter(|_| snap.enabled())
            .and_then(|step| {
                self.visible.node_visible_within_px_excluding(
                    &self.features,
                    &step.to,
                    snap.radius_px(),
                    &moved,
                )
            });

        let Some(target) = target else {
            for step in &moves {
                self.features.set_node_position(step.node, step.to);
            }
            self.history.register(MoveNodeCommand::new(moves));
            return;
        };

        let (outcome, change) = self.features.record(|features| {
            for step in &moves {
                features.set_node_position(step.node, step.to);
            }
            features.merge_node_and_cleanup(dragged, target)
        });

        match outcome {
            Some(outcome) => {
                log::debug!("Snapped {dragged} to {target}, {} ways affected", outcome.affected.len());
                self.history.register(MoveNodeCommand::with_merge(
                    moves,
                    NodeMerge {
                        pairs: vec![(dragged, target)],
                        change,
                    },
                ));
            }
            None => self.history.register(MoveNodeCommand::new(moves)),
        }
    }
}
