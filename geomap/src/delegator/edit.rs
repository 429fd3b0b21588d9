use std::collections::BTreeSet;

use crate::delegator::{EditMode, GeoLayerDelegator, LayerEvent};
use crate::feature::topology::strip;
use crate::feature::{FeatureGraph, GeoFeatureManager, WaySplit};
use crate::geojson::selection_to_feature_collection;
use crate::id::{NodeId, WayId};

/// Tool buttons of the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    /// Splits ways at the selected nodes.
    Divide,
    /// Deletes the selected features.
    Delete,
    /// Exports the selected features for the clipboard.
    Copy,
    /// Leaves the edit mode.
    Close,
}

impl GeoLayerDelegator {
    /// Runs the tool on the current selection. Returns false if the tool is disabled.
    pub fn press_tool(&mut self, tool: Tool) -> bool {
        let tools = self.config.tools;
        let enabled = match tool {
            Tool::Divide => tools.divide(),
            Tool::Delete => tools.delete(),
            Tool::Copy => tools.copy(),
            Tool::Close => tools.close(),
        };
        if !enabled {
            log::debug!("{tool:?} is disabled");
            return false;
        }

        self.emit(LayerEvent::ToolButtonClicked(tool));
        match tool {
            Tool::Divide => {
                self.divide_selection();
            }
            Tool::Delete => self.delete_selection(),
            Tool::Copy => self.copy_selection(),
            Tool::Close => {
                self.set_mode(EditMode::View);
                self.clear_activation();
            }
        }

        true
    }

    /// Deletes the selected ways, segments and nodes in one undo step.
    ///
    /// Ways lose the selected segments and nodes and are split where they became disconnected. Pieces
    /// shorter than two nodes are dropped, and nodes of the touched ways that are left without a way
    /// are deleted too.
    pub fn delete_selection(&mut self) {
        if self.activation.is_empty() {
            return;
        }

        let nodes = self.activation.nodes().clone();
        let ways = self.activation.ways().clone();
        let segments = self.activation.segments().clone();

        self.cancel_gestures();
        self.edit("delete", |features| {
            let mut touched: BTreeSet<NodeId> = BTreeSet::new();
            for way in ways.iter().chain(segments.iter().map(|segment| &segment.way)) {
                if let Some(way) = features.way(*way) {
                    touched.extend(way.nodes().iter().copied());
                }
            }
            for node in &nodes {
                for way in features.ways_of_node(*node) {
                    if let Some(way) = features.way(way) {
                        touched.extend(way.nodes().iter().copied());
                    }
                }
            }

            for way in &ways {
                features.delete_way(*way);
            }

            let splits = features.split_way_nodes_excluding_segments(&segments);
            apply_splits(features, splits);

            let splits = features
                .split_way_nodes_by_nodes(&nodes)
                .into_iter()
                .map(|split| WaySplit {
                    way: split.way,
                    pieces: strip(split.pieces, &nodes),
                })
                .collect();
            apply_splits(features, splits);

            for node in &nodes {
                features.delete_node(*node);
            }
            for node in touched.difference(&nodes) {
                if features.ways_of_node(*node).is_empty() {
                    features.delete_node(*node);
                }
            }
        });

        self.clear_activation();
    }

    /// Splits ways at the selected nodes in one undo step. If ways are selected too, only they are
    /// split. Returns the ids of the created ways.
    pub fn divide_selection(&mut self) -> Vec<WayId> {
        let cuts = self.activation.nodes().clone();
        if cuts.is_empty() {
            return vec![];
        }
        let restrict = self.activation.ways().clone();

        self.edit("divide", |features| {
            let mut created = vec![];
            for split in features.split_way_nodes_by_nodes(&cuts) {
                if !restrict.is_empty() && !restrict.contains(&split.way) {
                    continue;
                }
                if split.pieces.len() < 2 {
                    continue;
                }

                log::debug!("Dividing {} into {} pieces", split.way, split.pieces.len());
                created.extend(features.replace_way(split.pieces, split.way));
            }
            created
        })
    }

    /// Exports the selected nodes, ways and ways of the selected segments and emits
    /// [`LayerEvent::FeaturesCopied`].
    pub fn copy_selection(&mut self) {
        let mut ways = self.activation.ways().clone();
        ways.extend(self.activation.segments().iter().map(|segment| segment.way));
        let collection =
            selection_to_feature_collection(&self.features, self.activation.nodes(), &ways);

        log::debug!("Copied {} features", collection.features.len());
        self.emit(LayerEvent::FeaturesCopied(collection));
    }
}

fn apply_splits(features: &mut GeoFeatureManager, splits: Vec<WaySplit>) {
    for split in splits {
        let pieces: Vec<Vec<NodeId>> = split
            .pieces
            .into_iter()
            .filter(|piece| piece.len() >= 2)
            .collect();

        if pieces.is_empty() {
            features.delete_way(split.way);
        } else {
            features.replace_way(pieces, split.way);
        }
    }
}
