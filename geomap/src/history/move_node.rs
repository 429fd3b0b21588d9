use geomap_types::{LatLng, LatLngBounds};

use crate::feature::GraphChange;
use crate::history::{Command, CommandContext};
use crate::id::NodeId;

/// Position change of one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeMove {
    /// Moved node.
    pub node: NodeId,
    /// Position before the move.
    pub from: LatLng,
    /// Position after the move.
    pub to: LatLng,
}

/// Snap merge that happened at the end of a move.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeMerge {
    /// `(merged, into)` node pairs, in the order the merges were made.
    pub pairs: Vec<(NodeId, NodeId)>,
    /// State of every feature touched by the move and the merges.
    pub change: GraphChange,
}

/// Move of one or several nodes, optionally ending with the moved node snapped to another one.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveNodeCommand {
    moves: Vec<NodeMove>,
    merge: Option<NodeMerge>,
}

impl MoveNodeCommand {
    /// Plain move.
    pub fn new(moves: Vec<NodeMove>) -> Self {
        Self { moves, merge: None }
    }

    /// Move followed by merges.
    pub fn with_merge(moves: Vec<NodeMove>, merge: NodeMerge) -> Self {
        Self {
            moves,
            merge: Some(merge),
        }
    }

    /// Moved nodes.
    pub fn moves(&self) -> &[NodeMove] {
        &self.moves
    }

    /// Merge part of the command.
    pub fn merge(&self) -> Option<&NodeMerge> {
        self.merge.as_ref()
    }
}

impl Command for MoveNodeCommand {
    fn execute(&mut self, context: &mut CommandContext<'_>) {
        for step in &self.moves {
            if !context.features.set_node_position(step.node, step.to) {
                log::debug!("Skipping move of missing {}", step.node);
            }
        }

        if let Some(merge) = &self.merge {
            for (from, into) in &merge.pairs {
                if context.features.merge_node_and_cleanup(*from, *into).is_none() {
                    log::debug!("Skipping merge of {from} into {into}");
                }
            }
        }
    }

    fn undo(&mut self, context: &mut CommandContext<'_>) {
        if let Some(merge) = &self.merge {
            context.features.restore(&merge.change.before);
            return;
        }

        for step in &self.moves {
            if !context.features.set_node_position(step.node, step.from) {
                log::debug!("Skipping move of missing {}", step.node);
            }
        }
    }

    fn current_center(&self) -> Option<LatLng> {
        LatLngBounds::from_points(self.moves.iter().flat_map(|m| [&m.from, &m.to]))
            .map(|bounds| bounds.center())
    }
}

#[cfg(test)]
mod tests {
    use geomap_types::latlng;

    use super::*;
    use crate::feature::FeatureGraph;
    use crate::marker::GeoMarkerManager;
    use crate::tests::{features, path, way_nodes};

    #[test]
    fn plain_move_round_trip() {
        let (mut graph, host) = features();
        let mut markers = GeoMarkerManager::new(graph.ids().clone(), host);
        let a = graph.create_node(latlng!(10.0, 20.0), Default::default(), Default::default());
        graph.set_node_position(a, latlng!(10.5, 20.5));

        let mut command = MoveNodeCommand::new(vec![NodeMove {
            node: a,
            from: latlng!(10.0, 20.0),
            to: latlng!(10.5, 20.5),
        }]);
        let mut context = CommandContext {
            features: &mut graph,
            markers: &mut markers,
        };

        command.undo(&mut context);
        assert_eq!(context.features.node(a).map(|n| n.position()), Some(latlng!(10.0, 20.0)));
        command.execute(&mut context);
        assert_eq!(context.features.node(a).map(|n| n.position()), Some(latlng!(10.5, 20.5)));
        assert_eq!(command.current_center(), Some(latlng!(10.25, 20.25)));
    }

    #[test]
    fn undo_of_merge_resurrects_the_merged_node() {
        let (mut graph, host) = features();
        let mut markers = GeoMarkerManager::new(graph.ids().clone(), host);
        let (nodes, way) = path(
            &mut graph,
            &[latlng!(10.0, 20.0), latlng!(10.0, 20.001), latlng!(10.0, 20.002)],
        );
        let target = nodes[1];
        let dragged = nodes[2];

        let moves = vec![NodeMove {
            node: dragged,
            from: latlng!(10.0, 20.002),
            to: latlng!(10.0, 20.001),
        }];
        let (_, change) = graph.record(|f| {
            f.set_node_position(dragged, latlng!(10.0, 20.001));
            f.merge_node_and_cleanup(dragged, target);
        });
        assert_eq!(way_nodes(&graph, way), vec![nodes[0], target]);
        assert!(!graph.contains_node(dragged));

        let mut command = MoveNodeCommand::with_merge(
            moves,
            NodeMerge {
                pairs: vec![(dragged, target)],
                change,
            },
        );
        let mut context = CommandContext {
            features: &mut graph,
            markers: &mut markers,
        };

        command.undo(&mut context);
        assert_eq!(way_nodes(context.features, way), nodes);
        assert_eq!(
            context.features.node(dragged).map(|n| n.position()),
            Some(latlng!(10.0, 20.002))
        );

        command.execute(&mut context);
        assert_eq!(way_nodes(context.features, way), vec![nodes[0], target]);
        assert!(!context.features.contains_node(dragged));
    }
}
