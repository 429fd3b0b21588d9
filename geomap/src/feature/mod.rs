//! Editable feature graph: nodes, ways connecting them, and the manager that owns both.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::host::{StrokeStyle, WayIcon};
use crate::id::{NodeId, WayId};
use crate::style::NodeAppearance;

mod line_segment;
mod manager;
mod node;
mod render_state;
mod snapshot;
pub(crate) mod topology;
mod way;

pub use line_segment::LineSegment;
pub use manager::{FeatureChanges, FeatureEvent, FeatureEventKind, GeoFeatureManager, MergeOutcome, WaySplit};
pub use node::{GeoNode, NodeEvent, NodeEventKind, NodeOptions};
pub use render_state::RenderState;
pub use snapshot::{GraphChange, GraphSnapshot, NodeSnapshot, WaySnapshot};
pub use way::{GeoWay, WayEvent, WayEventKind};

/// Free-form semantic attributes of a node or a way.
pub type Tags = serde_json::Map<String, serde_json::Value>;

bitflags! {
    /// Role of a node in the ways it belongs to.
    ///
    /// Node types are never stored: they are derived from the way membership every time they are
    /// requested (see [`FeatureGraph::node_types`]). A node that belongs to no way has no type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct NodeTypes: u8 {
        /// First node of a way.
        const START = 0b0000_0001;
        /// Last node of a way.
        const END = 0b0000_0010;
        /// Interior node of a way.
        const SEGMENTAL = 0b0000_0100;
        /// First node of a way, and the node also belongs to other ways.
        const START_MULTIPLE = 0b0000_1000;
        /// Last node of a way, and the node also belongs to other ways.
        const END_MULTIPLE = 0b0001_0000;
    }
}

impl NodeTypes {
    /// The node starts or ends at least one way.
    pub fn is_endpoint(&self) -> bool {
        self.intersects(Self::START | Self::END | Self::START_MULTIPLE | Self::END_MULTIPLE)
    }

    /// The node is interior to at least one way, or belongs to no way at all.
    pub fn is_segmental(&self) -> bool {
        self.contains(Self::SEGMENTAL) || self.is_empty()
    }

    /// The node is an endpoint shared with other ways.
    pub fn is_multiple(&self) -> bool {
        self.intersects(Self::START_MULTIPLE | Self::END_MULTIPLE)
    }
}

/// Read access to the node/way graph.
pub trait FeatureGraph {
    /// Node by id.
    fn node(&self, id: NodeId) -> Option<&GeoNode>;
    /// Way by id.
    fn way(&self, id: WayId) -> Option<&GeoWay>;
    /// All nodes in ascending id order.
    fn nodes(&self) -> Box<dyn Iterator<Item = &GeoNode> + '_>;
    /// All ways in ascending id order.
    fn ways(&self) -> Box<dyn Iterator<Item = &GeoWay> + '_>;
    /// Ways the node belongs to, in ascending id order.
    fn ways_of_node(&self, id: NodeId) -> Vec<WayId>;
    /// Classification of the node.
    fn node_types(&self, id: NodeId) -> NodeTypes;

    /// Returns true if the node belongs to more than one way.
    fn is_multiple_ways(&self, id: NodeId) -> bool {
        self.ways_of_node(id).len() > 1
    }
}

/// Control over which features are displayed.
pub trait FeatureVisibility: FeatureGraph {
    /// Shows or hides the node. Returns false if there is no such node.
    fn set_node_visible(&mut self, id: NodeId, visible: bool) -> bool;
    /// Shows or hides the way. Returns false if there is no such way.
    fn set_way_visible(&mut self, id: WayId, visible: bool) -> bool;
}

/// Control over how features look.
pub trait FeatureAppearance: FeatureGraph {
    /// Sets the look of the node.
    fn set_node_appearance(&mut self, id: NodeId, appearance: &NodeAppearance) -> bool;
    /// Sets the look of the way.
    fn set_way_appearance(&mut self, id: WayId, stroke: &StrokeStyle, z_index: i32, icons: &[WayIcon]) -> bool;
    /// Positions the way is currently drawn through.
    fn rendered_path(&self, id: WayId) -> Vec<geomap_types::LatLng>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_predicates() {
        assert!(NodeTypes::START.is_endpoint());
        assert!((NodeTypes::END | NodeTypes::END_MULTIPLE).is_multiple());
        assert!(!NodeTypes::START.is_segmental());
        assert!(NodeTypes::empty().is_segmental());
        assert!(!NodeTypes::empty().is_endpoint());
        assert!((NodeTypes::SEGMENTAL | NodeTypes::START).is_segmental());
    }
}
