//! Geometries in geographic coordinates (latitude and longitude) (see [`GeoPoint`]) and the
//! web-mercator projection used by the map widgets (see [`Projection`]).

mod datum;
mod point;
mod projection;

pub use datum::Datum;
pub use point::{GeoPoint, LatLng, NewGeoPoint};
pub use projection::{Projection, WebMercator};
