//! Screen space types. Pixel positions are measured from the top-left corner of the map widget.

pub use nalgebra::{Point2, Vector2};

/// Position on the screen in pixels.
pub type Point2d = Point2<f64>;

/// Offset on the screen in pixels.
pub type Vector2d = Vector2<f64>;
