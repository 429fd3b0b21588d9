//! Drawing of new ways point by point.

use geomap_types::LatLng;

use crate::control::{PointerEvent, PointerPhase};
use crate::feature::{FeatureGraph, GeoFeatureManager, GraphChange, RenderState};
use crate::history::FeatureCommand;
use crate::host::{MarkerPrimitive, PolylinePrimitive, SharedHost, StrokeStyle};
use crate::id::{NodeId, WayId};
use crate::policy::{InteractionPolicy, SnapPolicy};
use crate::style::NodeAppearance;
use crate::visible::GeoFeatureVisibleManager;

/// Step of way drawing.
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateState {
    /// Nothing is being drawn.
    Idle,
    /// The first node is placed, the way does not exist yet.
    FirstPointPlaced {
        /// First node of the future way.
        node: NodeId,
        /// Whether the node was created for the way, rather than snapped to an existing one.
        created: bool,
        /// Creation of the node, registered in the history together with the way.
        change: GraphChange,
    },
    /// The way exists and new nodes are appended to it.
    Extending {
        /// Way being drawn.
        way: WayId,
        /// Last appended node.
        last: NodeId,
    },
}

/// Managers used while drawing.
pub struct CandidateContext<'a> {
    /// Graph to draw into.
    pub features: &'a mut GeoFeatureManager,
    /// Visible nodes used as snap targets.
    pub visible: &'a GeoFeatureVisibleManager,
    /// Hit radius of nodes, used as the minimum segment length.
    pub interaction: &'a InteractionPolicy,
    /// Snapping to existing nodes.
    pub snap: &'a SnapPolicy,
}

/// State machine turning pointer events into a new way.
///
/// Pressing or releasing the pointer places a node, unless it is closer to the last placed node than
/// the node hit radius. A node placed near an existing visible node reuses that node instead. The
/// first placed node starts the way, the second one creates it, and every next one extends it.
///
/// While the pointer moves, a preview line from the last placed node to the pointer is drawn. When
/// the pointer is over a snap target the line ends at the target and the preview point is hidden.
#[derive(Debug)]
pub struct GeoNodeCandidateManager {
    state: CandidateState,
    preview_line: RenderState<PolylinePrimitive>,
    preview_point: RenderState<MarkerPrimitive>,
    host: SharedHost,
}

impl GeoNodeCandidateManager {
    /// Creates an idle manager.
    pub fn new(stroke: StrokeStyle, point: NodeAppearance, host: SharedHost) -> Self {
        Self {
            state: CandidateState::Idle,
            preview_line: RenderState::new(PolylinePrimitive {
                stroke,
                ..Default::default()
            }),
            preview_point: RenderState::new(MarkerPrimitive {
                content: point.content,
                opacity: point.opacity,
                z_index: point.z_index,
                ..Default::default()
            }),
            host,
        }
    }

    /// Current step.
    pub fn state(&self) -> &CandidateState {
        &self.state
    }

    /// Returns true if nothing is being drawn.
    pub fn is_idle(&self) -> bool {
        self.state == CandidateState::Idle
    }

    /// Way being drawn.
    pub fn way(&self) -> Option<WayId> {
        match self.state {
            CandidateState::Extending { way, .. } => Some(way),
            _ => None,
        }
    }

    /// Whether the preview line is drawn.
    pub fn is_preview_visible(&self) -> bool {
        self.preview_line.is_materialized()
    }

    /// Whether the preview point is drawn.
    pub fn is_preview_point_visible(&self) -> bool {
        self.preview_point.is_materialized()
    }

    /// Changes the look of the preview.
    pub fn set_preview_style(&mut self, stroke: StrokeStyle, point: NodeAppearance) {
        let mut host = self.host.borrow_mut();
        self.preview_line
            .update(&mut *host, |polyline| polyline.stroke = stroke);
        self.preview_point.update(&mut *host, |marker| {
            marker.content = point.content;
            marker.opacity = point.opacity;
            marker.z_index = point.z_index;
        });
    }

    /// Processes a pointer event. Returns the command to register in the history when the graph was
    /// changed.
    pub fn handle(
        &mut self,
        event: &PointerEvent,
        context: &mut CandidateContext<'_>,
    ) -> Option<FeatureCommand> {
        let command = match event.phase {
            PointerPhase::Down | PointerPhase::Up => self.place(event.position, context),
            PointerPhase::Move => None,
        };

        self.update_preview(event.position, context);
        command
    }

    fn last_node(&self) -> Option<NodeId> {
        match &self.state {
            CandidateState::Idle => None,
            CandidateState::FirstPointPlaced { node, .. } => Some(*node),
            CandidateState::Extending { last, .. } => Some(*last),
        }
    }

    fn snap_target(&self, position: &LatLng, context: &CandidateContext<'_>) -> Option<NodeId> {
        if !context.snap.enabled() {
            return None;
        }

        context
            .visible
            .node_visible_within_px(&*context.features, position, context.snap.radius_px())
    }

    fn target_position(
        &self,
        position: LatLng,
        snap: Option<NodeId>,
        context: &CandidateContext<'_>,
    ) -> LatLng {
        snap.and_then(|id| context.features.node(id))
            .map(|node| node.position())
            .unwrap_or(position)
    }

    fn far_enough(&self, last: NodeId, target: &LatLng, context: &CandidateContext<'_>) -> bool {
        let radius = context
            .visible
            .radius_m(target, context.interaction.node_hit_radius_px());
        context
            .features
            .node(last)
            .is_some_and(|node| node.position().distance_to(target) > radius)
    }

    /// Drops the state referencing features that do not exist anymore, for example after undo.
    fn validate(&mut self, features: &GeoFeatureManager) {
        let valid = match &self.state {
            CandidateState::Idle => true,
            CandidateState::FirstPointPlaced { node, .. } => features.contains_node(*node),
            CandidateState::Extending { way, last } => {
                features.way(*way).is_some_and(|w| w.last() == Some(*last))
            }
        };

        if !valid {
            log::debug!("Drawn features changed, starting a new way");
            self.state = CandidateState::Idle;
        }
    }

    fn place(
        &mut self,
        position: LatLng,
        context: &mut CandidateContext<'_>,
    ) -> Option<FeatureCommand> {
        self.validate(context.features);

        let snap = self.snap_target(&position, context);
        let target = self.target_position(position, snap, context);
        if let Some(last) = self.last_node() {
            if !self.far_enough(last, &target, context) {
                return None;
            }
        }

        let place_node = move |features: &mut GeoFeatureManager| match snap {
            Some(node) => node,
            None => features.create_node(position, Default::default(), Default::default()),
        };

        match std::mem::replace(&mut self.state, CandidateState::Idle) {
            CandidateState::Idle => {
                let (node, change) = context.features.record(place_node);
                log::trace!("First point of a new way: {node}");
                self.state = CandidateState::FirstPointPlaced {
                    node,
                    created: snap.is_none(),
                    change,
                };
                None
            }
            CandidateState::FirstPointPlaced {
                node: first,
                created,
                change: first_change,
            } => {
                let ((node, way), change) = context.features.record(|features| {
                    let node = place_node(features);
                    (node, features.add_way(vec![first, node], Default::default()))
                });

                let Some(way) = way else {
                    self.state = CandidateState::FirstPointPlaced {
                        node: first,
                        created,
                        change: first_change,
                    };
                    return None;
                };

                log::debug!("Created {way} by drawing");
                self.state = CandidateState::Extending { way, last: node };
                Some(FeatureCommand::new("create way", first_change.then(change)))
            }
            CandidateState::Extending { way, last } => {
                let (node, change) = context.features.record(|features| {
                    let node = place_node(features);
                    let len = features.way(way).map_or(0, |w| w.len());
                    features.add_node_to_way(node, way, len).then_some(node)
                });

                match node {
                    Some(node) => {
                        log::trace!("Extended {way} with {node}");
                        self.state = CandidateState::Extending { way, last: node };
                        Some(FeatureCommand::new("extend way", change))
                    }
                    None => {
                        self.state = CandidateState::Extending { way, last };
                        None
                    }
                }
            }
        }
    }

    fn update_preview(&mut self, position: LatLng, context: &CandidateContext<'_>) {
        let mut host = self.host.borrow_mut();
        let Some(last) = self
            .last_node()
            .and_then(|id| context.features.node(id))
            .map(|node| node.position())
        else {
            self.preview_line.release(&mut *host);
            self.preview_point.release(&mut *host);
            return;
        };

        let snap = self.snap_target(&position, context);
        let target = self.target_position(position, snap, context);

        self.preview_line
            .update(&mut *host, |polyline| polyline.path = vec![last, target]);
        self.preview_line.materialize(&mut *host);

        self.preview_point
            .update(&mut *host, |marker| marker.position = position);
        self.preview_point.set_materialized(snap.is_none(), &mut *host);
    }

    /// Stops drawing. A first node created for a way that was never made is deleted. Returns true if
    /// drawing was in progress.
    pub fn cancel(&mut self, features: &mut GeoFeatureManager) -> bool {
        {
            let mut host = self.host.borrow_mut();
            self.preview_line.release(&mut *host);
            self.preview_point.release(&mut *host);
        }

        match std::mem::replace(&mut self.state, CandidateState::Idle) {
            CandidateState::Idle => false,
            CandidateState::FirstPointPlaced { node, created, .. } => {
                if created && features.ways_of_node(node).is_empty() {
                    features.delete_node(node);
                    log::debug!("Discarded orphan first point {node}");
                }
                true
            }
            CandidateState::Extending { .. } => true,
        }
    }
}
