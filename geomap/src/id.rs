//! Identifiers of the editable features and the generator that hands them out.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

macro_rules! feature_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Raw numeric value of the id.
            pub fn value(&self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, " {}"), self.0)
            }
        }
    };
}

feature_id!(
    /// Id of a [`GeoNode`](crate::feature::GeoNode).
    NodeId,
    "node"
);
feature_id!(
    /// Id of a [`GeoWay`](crate::feature::GeoWay).
    WayId,
    "way"
);
feature_id!(
    /// Id of a [`GeoMarker`](crate::marker::GeoMarker).
    MarkerId,
    "marker"
);
feature_id!(
    /// Id of a layer in a [`GeoMap`](crate::GeoMap).
    LayerId,
    "layer"
);
feature_id!(
    /// Id of a [`PreNode`](crate::pre_node::PreNode). Pre-nodes are not persisted and have their own id space.
    PreNodeId,
    "pre-node"
);

/// Monotonic id allocator.
///
/// Cloning the generator produces a handle to the same counter, so every manager of a map session
/// shares one id space. Ids start at `1`.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    last: Rc<Cell<u64>>,
}

impl IdGenerator {
    /// Creates a new generator with its own counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next id.
    pub fn next_id<I: From<u64>>(&self) -> I {
        let id = self.last.get() + 1;
        self.last.set(id);
        I::from(id)
    }

    /// Makes sure the generator never returns `id` or anything below it. Used when features with
    /// externally assigned ids are added.
    pub fn reserve(&self, id: u64) {
        if self.last.get() < id {
            self.last.set(id);
        }
    }

    /// The last allocated (or reserved) id value.
    pub fn last(&self) -> u64 {
        self.last.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_shared() {
        let generator = IdGenerator::new();
        let handle = generator.clone();

        let a: NodeId = generator.next_id();
        let b: WayId = handle.next_id();
        let c: NodeId = generator.next_id();

        assert_eq!(a.value(), 1);
        assert_eq!(b.value(), 2);
        assert_eq!(c.value(), 3);
    }

    #[test]
    fn reserve_skips_taken_ids() {
        let generator = IdGenerator::new();
        generator.reserve(41);
        let id: NodeId = generator.next_id();
        assert_eq!(id, NodeId::from(42));

        generator.reserve(10);
        let id: NodeId = generator.next_id();
        assert_eq!(id, NodeId::from(43));
    }

    #[test]
    fn display() {
        assert_eq!(NodeId::from(7).to_string(), "node 7");
        assert_eq!(LayerId::from(2).to_string(), "layer 2");
    }
}
