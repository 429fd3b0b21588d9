//! Straight line segments between two geographic points.

use crate::cartesian::Point2d;
use crate::geo::{GeoPoint, LatLng};

/// A segment of a polyline between two points.
///
/// Segments used by the editor are short (a few kilometers at most), so distance computations are
/// done in a local equirectangular plane centered on the query point.
#[derive(Debug, PartialEq)]
pub struct GeoSegment<'a>(pub &'a LatLng, pub &'a LatLng);

impl GeoSegment<'_> {
    /// Midpoint of the segment.
    pub fn midpoint(&self) -> LatLng {
        self.0.midpoint(self.1)
    }

    /// Length of the segment in meters.
    pub fn length(&self) -> f64 {
        self.0.distance_to(self.1)
    }

    /// Shortest distance in meters between the point and the segment:
    ///
    /// * if the normal from the point to the segment ends inside the segment, the returned value is
    ///   the length of the normal
    /// * otherwise it is the smaller one of the distances between the point and the endpoints
    pub fn distance_to_point(&self, point: &LatLng) -> f64 {
        let a = local_plane(point, self.0);
        let b = local_plane(point, self.1);

        let ds = b - a;
        let ds_len = ds.x * ds.x + ds.y * ds.y;
        if ds_len == 0.0 {
            return self.0.distance_to(point);
        }

        let dp = -a.coords;
        let r = (dp.x * ds.x + dp.y * ds.y) / ds_len;
        if r <= 0.0 {
            self.0.distance_to(point)
        } else if r >= 1.0 {
            self.1.distance_to(point)
        } else {
            let s = (dp.y * ds.x - dp.x * ds.y) / ds_len;
            s.abs() * ds_len.sqrt()
        }
    }
}

/// Offset of `point` from `origin` in meters on the tangent plane at `origin`.
fn local_plane(origin: &LatLng, point: &LatLng) -> Point2d {
    const METERS_PER_DEGREE: f64 = 111_195.08;

    let x = (point.lng() - origin.lng()) * METERS_PER_DEGREE * origin.lat_rad().cos();
    let y = (point.lat() - origin.lat()) * METERS_PER_DEGREE;
    Point2d::new(x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn distance_to_point_inside_segment() {
        let a = LatLng::new(0.0, 0.0);
        let b = LatLng::new(0.0, 0.01);
        let p = LatLng::new(0.001, 0.005);

        let distance = GeoSegment(&a, &b).distance_to_point(&p);
        assert_abs_diff_eq!(distance, 111.195, epsilon = 0.01);
    }

    #[test]
    fn distance_to_point_beyond_endpoint() {
        let a = LatLng::new(0.0, 0.0);
        let b = LatLng::new(0.0, 0.01);
        let p = LatLng::new(0.0, 0.02);

        let distance = GeoSegment(&a, &b).distance_to_point(&p);
        assert_abs_diff_eq!(distance, b.distance_to(&p), epsilon = 1e-6);
    }

    #[test]
    fn degenerate_segment() {
        let a = LatLng::new(1.0, 1.0);
        let p = LatLng::new(1.0, 1.001);
        assert_abs_diff_eq!(
            GeoSegment(&a, &a).distance_to_point(&p),
            a.distance_to(&p),
            epsilon = 1e-9
        );
    }
}
