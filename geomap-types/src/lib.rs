//! Geometry primitives for the geomap editor.
//!
//! Everything the editor knows about the shape of the earth lives here: points in geographic
//! coordinates ([`geo::LatLng`]), the reference ellipsoid ([`geo::Datum`]), projection into
//! web-mercator meters ([`geo::WebMercator`]), viewport rectangles ([`LatLngBounds`]) and
//! distances from a point to a polyline segment ([`GeoSegment`]).
//!
//! Screen space uses [`nalgebra`] points and vectors, see [`cartesian`].

#![warn(clippy::unwrap_used)]
#![warn(missing_docs)]

pub mod bounds;
pub mod cartesian;
pub mod error;
pub mod geo;
#[cfg(feature = "geojson")]
pub mod geojson;
pub mod segment;

pub use bounds::LatLngBounds;
pub use geo::{GeoPoint, LatLng, NewGeoPoint};
pub use segment::GeoSegment;
