//! Error types used by the crate.

use std::fmt;

use geomap_types::error::GeomapTypesError;
use thiserror::Error;

use crate::id::{LayerId, MarkerId, NodeId, WayId};

/// Reference to something that can be missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureRef {
    /// A layer of the map.
    Layer(LayerId),
    /// A node.
    Node(NodeId),
    /// A way.
    Way(WayId),
    /// A marker.
    Marker(MarkerId),
}

impl fmt::Display for FeatureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureRef::Layer(id) => id.fmt(f),
            FeatureRef::Node(id) => id.fmt(f),
            FeatureRef::Way(id) => id.fmt(f),
            FeatureRef::Marker(id) => id.fmt(f),
        }
    }
}

/// Geomap error type.
#[derive(Debug, Error)]
pub enum GeomapError {
    /// The referenced item does not exist.
    #[error("{0} not found")]
    NotFound(FeatureRef),
    /// The imported document is not a valid feature collection.
    #[error("invalid geojson: {0}")]
    InvalidGeoJson(String),
    /// JSON (de)serialization failed.
    #[error("failed to process json")]
    Serialization(#[from] serde_json::Error),
    /// Invalid geometry.
    #[error("invalid geometry")]
    Geometry(#[from] GeomapTypesError),
    /// Internal state of the editor became inconsistent.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

/// Reports a broken internal invariant.
///
/// In strict mode (the default for debug builds, see
/// [`GeoMapConfig::strict_invariants`](crate::GeoMapConfig::strict_invariants)) this panics, so
/// regressions are caught in tests. Otherwise the violation is only logged and the editor continues.
pub(crate) fn invariant_violation(strict: bool, message: impl Into<String>) {
    let error = GeomapError::Invariant(message.into());
    if strict {
        panic!("{error}");
    }

    log::error!("{error}");
}
