use crate::cartesian::Point2d;
use crate::geo::{Datum, GeoPoint, LatLng};

/// Conversion between two coordinate systems.
pub trait Projection {
    /// Source point type.
    type InPoint;
    /// Target point type.
    type OutPoint;

    /// Projects the point. Returns `None` if the point cannot be represented in the target system.
    fn project(&self, input: &Self::InPoint) -> Option<Self::OutPoint>;
    /// Inverse of [`Projection::project`].
    fn unproject(&self, input: &Self::OutPoint) -> Option<Self::InPoint>;
}

/// Spherical (web) mercator. Output is in meters from the intersection of the equator and the
/// prime meridian, `y` pointing north.
#[derive(Debug, Copy, Clone)]
pub struct WebMercator {
    datum: Datum,
}

impl WebMercator {
    /// Latitude limit of the projection in degrees.
    pub const MAX_LAT: f64 = 85.051_128_779_806_6;

    /// Creates a projection over the given datum.
    pub fn new(datum: Datum) -> Self {
        Self { datum }
    }

    /// Earth circumference at the equator in projected meters.
    pub fn world_size(&self) -> f64 {
        2.0 * std::f64::consts::PI * self.datum.semimajor()
    }
}

impl Default for WebMercator {
    fn default() -> Self {
        Self::new(Datum::WGS84)
    }
}

impl Projection for WebMercator {
    type InPoint = LatLng;
    type OutPoint = Point2d;

    fn project(&self, input: &LatLng) -> Option<Point2d> {
        let lat = input.lat().clamp(-Self::MAX_LAT, Self::MAX_LAT).to_radians();
        let x = self.datum.semimajor() * input.lon_rad();
        let y = self.datum.semimajor() * (std::f64::consts::FRAC_PI_4 + lat / 2.0).tan().ln();

        if x.is_finite() && y.is_finite() {
            Some(Point2d::new(x, y))
        } else {
            None
        }
    }

    fn unproject(&self, input: &Point2d) -> Option<LatLng> {
        let lat = 2.0 * (input.y / self.datum.semimajor()).exp().atan() - std::f64::consts::FRAC_PI_2;
        let lon = input.x / self.datum.semimajor();

        if lat.is_finite() && lon.is_finite() {
            Some(LatLng::new(lat.to_degrees(), lon.to_degrees()))
        } else {
            None
        }
    }
}
