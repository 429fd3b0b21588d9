//! Rectangular area on the map in geographic coordinates.

use serde::{Deserialize, Serialize};

use crate::geo::LatLng;

/// Rectangle between two meridians and two parallels, such as the visible area of the map.
///
/// Bounds crossing the antimeridian are not supported: `west` is always expected to be less than or
/// equal to `east`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLngBounds {
    south: f64,
    west: f64,
    north: f64,
    east: f64,
}

impl LatLngBounds {
    /// Creates bounds from the south-west and north-east corners. Corners are normalized so that
    /// passing them in the wrong order still produces a valid rectangle.
    pub fn new(south_west: LatLng, north_east: LatLng) -> Self {
        Self {
            south: south_west.lat().min(north_east.lat()),
            west: south_west.lng().min(north_east.lng()),
            north: south_west.lat().max(north_east.lat()),
            east: south_west.lng().max(north_east.lng()),
        }
    }

    /// Bounds containing a single point.
    pub fn from_point(point: &LatLng) -> Self {
        Self::new(*point, *point)
    }

    /// Smallest bounds containing all the points. Returns `None` for an empty iterator.
    pub fn from_points<'a>(mut points: impl Iterator<Item = &'a LatLng>) -> Option<Self> {
        let first = points.next()?;
        let mut bounds = Self::from_point(first);
        for p in points {
            bounds.extend(p);
        }

        Some(bounds)
    }

    /// Southern latitude.
    pub fn south(&self) -> f64 {
        self.south
    }

    /// Western longitude.
    pub fn west(&self) -> f64 {
        self.west
    }

    /// Northern latitude.
    pub fn north(&self) -> f64 {
        self.north
    }

    /// Eastern longitude.
    pub fn east(&self) -> f64 {
        self.east
    }

    /// South-west corner.
    pub fn south_west(&self) -> LatLng {
        LatLng::new(self.south, self.west)
    }

    /// North-east corner.
    pub fn north_east(&self) -> LatLng {
        LatLng::new(self.north, self.east)
    }

    /// Center of the rectangle in degrees.
    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    /// Grows the bounds to include the point.
    pub fn extend(&mut self, point: &LatLng) {
        self.south = self.south.min(point.lat());
        self.west = self.west.min(point.lng());
        self.north = self.north.max(point.lat());
        self.east = self.east.max(point.lng());
    }

    /// Smallest bounds containing both rectangles.
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            south: self.south.min(other.south),
            west: self.west.min(other.west),
            north: self.north.max(other.north),
            east: self.east.max(other.east),
        }
    }

    /// Returns true if the point is inside the rectangle or on its border.
    pub fn contains(&self, point: &LatLng) -> bool {
        self.south <= point.lat()
            && self.north >= point.lat()
            && self.west <= point.lng()
            && self.east >= point.lng()
    }

    /// Returns true if the two rectangles have at least one common point.
    pub fn intersects(&self, other: &Self) -> bool {
        self.south <= other.north
            && self.north >= other.south
            && self.west <= other.east
            && self.east >= other.west
    }

    /// Scales the rectangle around its center by `factor`.
    pub fn magnify(&self, factor: f64) -> Self {
        let center = self.center();
        let half_lat = (self.north - self.south) / 2.0 * factor;
        let half_lng = (self.east - self.west) / 2.0 * factor;
        Self {
            south: center.lat() - half_lat,
            west: center.lng() - half_lng,
            north: center.lat() + half_lat,
            east: center.lng() + half_lng,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_are_normalized() {
        let bounds = LatLngBounds::new(LatLng::new(10.0, 20.0), LatLng::new(0.0, 0.0));
        assert_eq!(bounds.south_west(), LatLng::new(0.0, 0.0));
        assert_eq!(bounds.north_east(), LatLng::new(10.0, 20.0));
    }

    #[test]
    fn contains_border() {
        let bounds = LatLngBounds::new(LatLng::new(0.0, 0.0), LatLng::new(1.0, 1.0));
        assert!(bounds.contains(&LatLng::new(0.0, 0.5)));
        assert!(bounds.contains(&LatLng::new(0.5, 0.5)));
        assert!(!bounds.contains(&LatLng::new(1.5, 0.5)));
    }

    #[test]
    fn intersection() {
        let a = LatLngBounds::new(LatLng::new(0.0, 0.0), LatLng::new(1.0, 1.0));
        let b = LatLngBounds::new(LatLng::new(0.5, 0.5), LatLng::new(2.0, 2.0));
        let c = LatLngBounds::new(LatLng::new(3.0, 3.0), LatLng::new(4.0, 4.0));
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn from_points_and_magnify() {
        let points = [LatLng::new(1.0, 1.0), LatLng::new(-1.0, 3.0)];
        let bounds = LatLngBounds::from_points(points.iter()).expect("not empty");
        assert_eq!(bounds.center(), LatLng::new(0.0, 2.0));

        let magnified = bounds.magnify(2.0);
        assert_eq!(magnified.south_west(), LatLng::new(-2.0, 0.0));
        assert_eq!(magnified.north_east(), LatLng::new(2.0, 4.0));

        assert!(LatLngBounds::from_points(std::iter::empty()).is_none());
    }
}
