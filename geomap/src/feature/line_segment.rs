use serde::{Deserialize, Serialize};

use crate::id::{NodeId, WayId};

/// Pair of consecutive nodes of a way.
///
/// Segments are not stored in the graph. They are derived from the way node lists and can be selected
/// independently from the whole way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineSegment {
    /// Way the segment belongs to.
    pub way: WayId,
    /// First node of the segment in the way order.
    pub start: NodeId,
    /// Second node of the segment in the way order.
    pub end: NodeId,
}

impl LineSegment {
    /// Creates a new segment.
    pub fn new(way: WayId, start: NodeId, end: NodeId) -> Self {
        Self { way, start, end }
    }

    /// Returns true if the node is one of the segment ends.
    pub fn touches(&self, node: NodeId) -> bool {
        self.start == node || self.end == node
    }

    /// Node pair of the segment.
    pub fn pair(&self) -> (NodeId, NodeId) {
        (self.start, self.end)
    }
}
